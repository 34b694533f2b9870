//! CLI command implementations.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use sprig_core::{AppConfig, FileRecord, Notifier, ProjectId, ProjectManager};
use sprig_store::JsonProjectStore;
use sprig_watcher::{FileChange, FileWatcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

type Manager = ProjectManager<JsonProjectStore, FileWatcher, TerminalNotifier>;

/// Where the config and the project database live.
pub struct Paths {
    config: PathBuf,
    db: PathBuf,
}

impl Paths {
    pub fn resolve(config: Option<PathBuf>, db: Option<PathBuf>) -> Self {
        let config = config.unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("sprig")
                .join("config.json")
        });
        let db = db.unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("sprig")
                .join("projects.json")
        });
        Self { config, db }
    }
}

/// Prints alerts to stderr.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn alert(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }
}

fn open(paths: &Paths) -> Result<Manager> {
    debug!(
        "Using config {} and database {}",
        paths.config.display(),
        paths.db.display()
    );
    let config = AppConfig::load(&paths.config)?;
    let manager = ProjectManager::open(
        JsonProjectStore::new(&paths.db),
        FileWatcher::new()?,
        TerminalNotifier,
        &config,
    )?;
    Ok(manager)
}

fn project_id(manager: &Manager, id: &str) -> Result<ProjectId> {
    let id = ProjectId::from_string(id);
    if manager.project(&id).is_none() {
        return Err(sprig_core::Error::ProjectNotFound(id).into());
    }
    Ok(id)
}

/// Write the default config file.
pub fn init(paths: &Paths) -> Result<()> {
    if paths.config.exists() {
        println!("{} Already initialized", "✓".green());
        return Ok(());
    }

    AppConfig::write_default(&paths.config)?;

    println!(
        "{} Wrote default config to {}",
        "✓".green(),
        paths.config.display()
    );
    println!("  Run {} to track a directory", "sprig add <dir>".cyan());

    Ok(())
}

/// Start tracking a directory.
pub fn add(paths: &Paths, path: &Path) -> Result<()> {
    let src = fs::canonicalize(path)?;
    let mut manager = open(paths)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message("Scanning files...");

    let added = manager.add_project(&src);
    spinner.finish_and_clear();

    if let Some(project) = added? {
        println!(
            "{} Added {} ({} files) as {}",
            "✓".green(),
            project.name.cyan(),
            project.files.len(),
            project.id.to_string().dimmed()
        );
    }

    Ok(())
}

/// Stop tracking a project.
pub fn remove(paths: &Paths, id: &str) -> Result<()> {
    let mut manager = open(paths)?;
    manager.delete_project(&ProjectId::from_string(id))?;
    println!("{} Removed {}", "✓".green(), id);
    Ok(())
}

/// List tracked projects.
pub fn list(paths: &Paths) -> Result<()> {
    let manager = open(paths)?;

    if manager.projects().is_empty() {
        println!("No projects yet. Run {} to add one.", "sprig add <dir>".cyan());
        return Ok(());
    }

    for project in manager.projects().values() {
        println!(
            "  {} {} {}",
            project.id.to_string().dimmed(),
            project.name.cyan(),
            format!("({}, {} files)", project.src, project.files.len()).dimmed()
        );
    }

    Ok(())
}

/// List the files of a project.
pub fn files(paths: &Paths, id: &str, valid: bool) -> Result<()> {
    let manager = open(paths)?;
    let id = project_id(&manager, id)?;

    let files: Vec<&FileRecord> = if valid {
        manager.valid_files(&id)?
    } else {
        manager
            .project(&id)
            .map(|p| p.files.values().collect())
            .unwrap_or_default()
    };

    for file in files {
        print_file(file);
    }

    Ok(())
}

fn print_file(file: &FileRecord) {
    let output = file.output.as_deref().unwrap_or("-");
    println!(
        "  {} {} {}",
        file.kind.yellow(),
        file.src,
        format!("-> {}", output).dimmed()
    );
}

/// Reconcile a project with its directory.
pub fn refresh(paths: &Paths, id: &str) -> Result<()> {
    let mut manager = open(paths)?;
    let id = project_id(&manager, id)?;

    let refresh = manager.refresh_project(&id)?;

    for src in &refresh.invalid_files {
        println!("  {} {}", "-".red(), src);
    }
    for file in &refresh.new_files {
        println!("  {} {}", "+".green(), file.src);
    }
    println!(
        "{} {} files ({} removed, {} added)",
        "✓".green(),
        refresh.files.len(),
        refresh.invalid_files.len(),
        refresh.new_files.len()
    );

    Ok(())
}

/// Drop projects and files that no longer exist.
pub fn check(paths: &Paths) -> Result<()> {
    let mut manager = open(paths)?;
    let report = manager.check_status()?;

    if !report.has_changes() {
        println!("{} Everything is in place", "✓".green());
        return Ok(());
    }

    for id in &report.removed_projects {
        println!("  {} project {}", "-".red(), id);
    }
    for src in &report.removed_files {
        println!("  {} {}", "-".red(), src);
    }

    Ok(())
}

/// Change the settings of a tracked file.
pub fn set(
    paths: &Paths,
    id: &str,
    file: &Path,
    output: Option<&Path>,
    settings: &[String],
) -> Result<()> {
    let mut manager = open(paths)?;
    let id = project_id(&manager, id)?;
    let src = fs::canonicalize(file)?.to_string_lossy().into_owned();

    let mut record = manager
        .project(&id)
        .and_then(|p| p.files.get(&src))
        .cloned()
        .ok_or_else(|| format!("'{}' is not tracked by project {}", src, id))?;

    if let Some(output) = output {
        record = record.with_output(output.to_string_lossy());
    }
    for setting in settings {
        let (key, value) = parse_setting(setting)?;
        record = record.with_setting(key, value);
    }

    manager.update_file(&id, record.clone())?;
    print_file(&record);

    Ok(())
}

/// Splits `key=value`, reading the value as JSON and falling back to a
/// plain string.
fn parse_setting(setting: &str) -> Result<(String, serde_json::Value)> {
    let (key, raw) = setting
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", setting))?;

    let value = serde_json::from_str(raw)
        .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));

    Ok((key.trim().to_string(), value))
}

/// Watch every tracked file and report changes.
pub fn watch(paths: &Paths) -> Result<()> {
    let mut manager = open(paths)?;
    manager.check_status()?;
    manager.watch_all();

    println!(
        "{} Watching {} files in {} projects",
        "✓".green(),
        manager.watcher().watched(),
        manager.projects().len()
    );
    println!("  Press {} to stop", "Ctrl+C".cyan());

    loop {
        let Some(change) = manager.watcher().recv_timeout(Duration::from_secs(1)) else {
            continue;
        };

        match change {
            FileChange::Modified(path) => {
                let src = path.to_string_lossy().into_owned();
                let output = manager
                    .projects()
                    .values()
                    .find_map(|p| p.files.get(&src))
                    .and_then(|f| f.output.clone())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "  {} {} {}",
                    "changed".cyan(),
                    path.display(),
                    format!("-> {}", output).dimmed()
                );
            }
            FileChange::Deleted(path) => {
                println!("  {} {}", "deleted".red(), path.display());
            }
        }
    }
}
