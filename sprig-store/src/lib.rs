//! Sprig Store - JSON persistence for tracked projects
//!
//! Implements [`sprig_core::ProjectStore`] on top of a single pretty
//! printed JSON file, rewritten atomically on every change.

mod json;

pub use json::JsonProjectStore;
