//! Project manager.
//!
//! Owns the in-memory project set and keeps it, the store and the
//! watcher consistent with what is actually on disk. Every mutation that
//! changes the set is persisted before the watcher hears about it.

use crate::collab::{FileWatch, Notifier, ProjectStore};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::filter::PathFilter;
use crate::model::{path_string, FileMap, FileRecord, Project, ProjectId, ProjectSet};
use crate::walker::{walk_directory, WalkOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What `check_status` dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusReport {
    /// Projects whose directory no longer exists.
    pub removed_projects: Vec<ProjectId>,

    /// Files that vanished from surviving projects.
    pub removed_files: Vec<String>,
}

impl StatusReport {
    pub fn has_changes(&self) -> bool {
        !self.removed_projects.is_empty() || !self.removed_files.is_empty()
    }
}

/// Result of reconciling one project against its directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Refresh {
    /// The project's files after the refresh.
    pub files: FileMap,

    /// Source paths that were tracked but no longer exist.
    pub invalid_files: Vec<String>,

    /// Records created for newly discovered files.
    pub new_files: Vec<FileRecord>,
}

/// How files are found under a project root.
#[derive(Debug, Clone)]
struct Discovery {
    options: WalkOptions,
    filter: PathFilter,
    apply_filter: bool,
}

impl Discovery {
    fn scan(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let files = walk_directory(root, &self.options)?;

        let valid: Vec<&PathBuf> = files
            .iter()
            .filter(|f| self.filter.is_valid_file(f))
            .collect();
        debug!("Valid files under {}: {:?}", root.display(), valid);

        if self.apply_filter {
            return Ok(valid.into_iter().cloned().collect());
        }
        Ok(files)
    }
}

/// Tracks projects and reconciles them against the filesystem.
pub struct ProjectManager<S, W, N> {
    projects: ProjectSet,
    store: S,
    watcher: W,
    notifier: N,
    discovery: Discovery,
}

impl<S, W, N> ProjectManager<S, W, N>
where
    S: ProjectStore,
    W: FileWatch,
    N: Notifier,
{
    /// Loads the project set from `store` and takes ownership of the
    /// collaborators.
    pub fn open(mut store: S, watcher: W, notifier: N, config: &AppConfig) -> Result<Self> {
        let projects = store.load()?;
        info!("Loaded {} projects", projects.len());

        Ok(Self {
            projects,
            store,
            watcher,
            notifier,
            discovery: Discovery {
                options: WalkOptions {
                    follow_symlinks: config.follow_symlinks,
                },
                filter: PathFilter::from_config(config),
                apply_filter: config.filter_on_discovery,
            },
        })
    }

    pub fn projects(&self) -> &ProjectSet {
        &self.projects
    }

    pub fn project(&self, id: &ProjectId) -> Option<&Project> {
        self.projects.get(id)
    }

    /// Finds the project tracking this directory. Paths are compared
    /// component-wise, so trailing separators don't matter.
    pub fn find_by_src(&self, src: &Path) -> Option<&Project> {
        self.projects.values().find(|p| Path::new(&p.src) == src)
    }

    pub fn watcher(&self) -> &W {
        &self.watcher
    }

    /// Starts tracking a directory.
    ///
    /// Returns `Ok(None)` after alerting the user if the directory is
    /// already a project. Nothing is persisted in that case.
    pub fn add_project(&mut self, src: &Path) -> Result<Option<Project>> {
        if self.find_by_src(src).is_some() {
            self.notifier.alert(&format!(
                "{} is already a project, no need to add it again.",
                src.display()
            ));
            return Ok(None);
        }

        let src: PathBuf = src.components().collect();
        let files = self.files_of_directory(&src)?;
        let project = Project::new(&src, files);

        self.store.save_project(&project)?;
        self.projects.insert(project.id.clone(), project.clone());

        info!(
            "Added project {} ({}) with {} files",
            project.name,
            project.id,
            project.files.len()
        );

        Ok(Some(project))
    }

    /// Stops tracking a project. Unknown ids are a no-op here.
    ///
    /// The store is updated first; on failure the project stays tracked.
    pub fn delete_project(&mut self, id: &ProjectId) -> Result<()> {
        self.store.delete_project(id)?;
        match self.projects.remove(id) {
            Some(project) => info!("Deleted project {} ({})", project.name, id),
            None => debug!("Delete of unknown project {}", id),
        }
        Ok(())
    }

    /// Reserved for project-level metadata. Only checks that the
    /// project exists.
    pub fn update_project(&mut self, id: &ProjectId) -> Result<()> {
        if !self.projects.contains_key(id) {
            return Err(Error::ProjectNotFound(id.clone()));
        }
        Ok(())
    }

    /// Replaces a file record wholesale and tells the watcher its mode
    /// may have changed.
    pub fn update_file(&mut self, pid: &ProjectId, file: FileRecord) -> Result<()> {
        let project = self
            .projects
            .get_mut(pid)
            .ok_or_else(|| Error::ProjectNotFound(pid.clone()))?;

        project.files.insert(file.id.clone(), file.clone());
        self.store.flush(&self.projects)?;

        debug!("Updated file {} in project {}", file.id, pid);
        self.watcher.update(&file);

        Ok(())
    }

    /// Drops projects whose directory is gone and files that no longer
    /// exist. Persists once if anything changed.
    pub fn check_status(&mut self) -> Result<StatusReport> {
        let mut report = StatusReport::default();

        self.projects.retain(|id, project| {
            if !Path::new(&project.src).exists() {
                info!("Project directory {} is gone, dropping {}", project.src, id);
                report.removed_projects.push(id.clone());
                return false;
            }

            project.files.retain(|path, file| {
                let exists = Path::new(&file.src).exists();
                if !exists {
                    debug!("File {} is gone", file.src);
                    report.removed_files.push(path.clone());
                }
                exists
            });
            true
        });

        if report.has_changes() {
            self.store.flush(&self.projects)?;
        }

        Ok(report)
    }

    /// Reconciles one project's files against a fresh walk of its
    /// directory.
    pub fn refresh_project(&mut self, id: &ProjectId) -> Result<Refresh> {
        let project = self
            .projects
            .get_mut(id)
            .ok_or_else(|| Error::ProjectNotFound(id.clone()))?;

        let discovered = self.discovery.scan(Path::new(&project.src))?;

        let mut invalid_files = Vec::new();
        project.files.retain(|_, file| {
            let exists = Path::new(&file.src).exists();
            if !exists {
                invalid_files.push(file.src.clone());
            }
            exists
        });

        let mut new_files = Vec::new();
        for path in discovered {
            let key = path_string(&path);
            if project.files.contains_key(&key) {
                continue;
            }
            let record = FileRecord::from_path(&path);
            project.files.insert(key, record.clone());
            new_files.push(record);
        }

        let files = project.files.clone();

        info!(
            "Refreshed {}: {} removed, {} added",
            project.name,
            invalid_files.len(),
            new_files.len()
        );

        if !invalid_files.is_empty() || !new_files.is_empty() {
            self.store.flush(&self.projects)?;
        }
        if !invalid_files.is_empty() {
            self.watcher.remove(&invalid_files);
        }
        if !new_files.is_empty() {
            self.watcher.add(&new_files);
        }

        Ok(Refresh {
            files,
            invalid_files,
            new_files,
        })
    }

    /// Files of a project that pass the extension and ignore rules.
    pub fn valid_files(&self, id: &ProjectId) -> Result<Vec<&FileRecord>> {
        let project = self
            .projects
            .get(id)
            .ok_or_else(|| Error::ProjectNotFound(id.clone()))?;

        Ok(project
            .files
            .values()
            .filter(|f| self.discovery.filter.is_valid_file(Path::new(&f.src)))
            .collect())
    }

    /// Hands every tracked file to the watcher.
    pub fn watch_all(&mut self) {
        let files: Vec<FileRecord> = self
            .projects
            .values()
            .flat_map(|p| p.files.values().cloned())
            .collect();

        if !files.is_empty() {
            self.watcher.add(&files);
        }
    }

    fn files_of_directory(&self, src: &Path) -> Result<FileMap> {
        Ok(self
            .discovery
            .scan(src)?
            .iter()
            .map(|path| {
                let record = FileRecord::from_path(path);
                (record.id.clone(), record)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use std::cell::RefCell;
    use std::fs;
    use std::rc::Rc;
    use tempfile::tempdir;

    #[derive(Default)]
    struct Calls {
        saved: Vec<ProjectId>,
        deleted: Vec<ProjectId>,
        flushes: usize,
        watch_added: Vec<Vec<String>>,
        watch_removed: Vec<Vec<String>>,
        watch_updated: Vec<String>,
        alerts: Vec<String>,
        fail_deletes: bool,
    }

    type Log = Rc<RefCell<Calls>>;

    struct FakeStore {
        initial: ProjectSet,
        log: Log,
    }

    impl ProjectStore for FakeStore {
        fn load(&mut self) -> std::result::Result<ProjectSet, StoreError> {
            Ok(std::mem::take(&mut self.initial))
        }

        fn save_project(&mut self, project: &Project) -> std::result::Result<(), StoreError> {
            self.log.borrow_mut().saved.push(project.id.clone());
            Ok(())
        }

        fn delete_project(&mut self, id: &ProjectId) -> std::result::Result<(), StoreError> {
            let mut log = self.log.borrow_mut();
            if log.fail_deletes {
                return Err(StoreError::Invalid("disk full".into()));
            }
            log.deleted.push(id.clone());
            Ok(())
        }

        fn flush(&mut self, _projects: &ProjectSet) -> std::result::Result<(), StoreError> {
            self.log.borrow_mut().flushes += 1;
            Ok(())
        }
    }

    struct FakeWatcher(Log);

    impl FileWatch for FakeWatcher {
        fn update(&mut self, file: &FileRecord) {
            self.0.borrow_mut().watch_updated.push(file.id.clone());
        }

        fn remove(&mut self, paths: &[String]) {
            self.0.borrow_mut().watch_removed.push(paths.to_vec());
        }

        fn add(&mut self, files: &[FileRecord]) {
            let ids = files.iter().map(|f| f.id.clone()).collect();
            self.0.borrow_mut().watch_added.push(ids);
        }
    }

    struct FakeNotifier(Log);

    impl Notifier for FakeNotifier {
        fn alert(&self, message: &str) {
            self.0.borrow_mut().alerts.push(message.to_string());
        }
    }

    type TestManager = ProjectManager<FakeStore, FakeWatcher, FakeNotifier>;

    fn manager_with(initial: ProjectSet, config: &AppConfig) -> (TestManager, Log) {
        let log = Log::default();
        let store = FakeStore {
            initial,
            log: log.clone(),
        };
        let manager = ProjectManager::open(
            store,
            FakeWatcher(log.clone()),
            FakeNotifier(log.clone()),
            config,
        )
        .unwrap();
        (manager, log)
    }

    fn manager() -> (TestManager, Log) {
        manager_with(ProjectSet::new(), &AppConfig::default())
    }

    fn key(path: &Path) -> String {
        path_string(path)
    }

    #[test]
    fn test_add_project_tracks_every_walked_file() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("css")).unwrap();
        fs::write(dir.path().join("css").join("site.less"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let (mut manager, log) = manager();
        let project = manager.add_project(dir.path()).unwrap().unwrap();

        assert_eq!(project.files.len(), 2);
        assert!(project
            .files
            .contains_key(&key(&dir.path().join("notes.txt"))));
        assert_eq!(
            project.name,
            dir.path().file_name().unwrap().to_string_lossy()
        );
        assert_eq!(log.borrow().saved, vec![project.id.clone()]);
        assert_eq!(manager.projects().len(), 1);
    }

    #[test]
    fn test_add_project_applies_filter_when_configured() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("site.less"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let config = AppConfig {
            filter_on_discovery: true,
            ..AppConfig::default()
        };
        let (mut manager, _log) = manager_with(ProjectSet::new(), &config);
        let project = manager.add_project(dir.path()).unwrap().unwrap();

        let names: Vec<&str> = project.files.values().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["site.less"]);
    }

    #[test]
    fn test_add_duplicate_project_alerts_and_does_not_persist() {
        let dir = tempdir().unwrap();
        let (mut manager, log) = manager();

        manager.add_project(dir.path()).unwrap().unwrap();
        let before = manager.projects().clone();

        let second = manager.add_project(dir.path()).unwrap();

        assert!(second.is_none());
        assert_eq!(manager.projects(), &before);
        assert_eq!(log.borrow().saved.len(), 1);
        assert_eq!(log.borrow().flushes, 0);
        assert_eq!(log.borrow().alerts.len(), 1);
    }

    #[test]
    fn test_add_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let (mut manager, log) = manager();

        let err = manager.add_project(&dir.path().join("gone")).unwrap_err();

        assert!(matches!(err, Error::Walk { .. }));
        assert!(manager.projects().is_empty());
        assert!(log.borrow().saved.is_empty());
    }

    #[test]
    fn test_delete_project_is_idempotent() {
        let dir = tempdir().unwrap();
        let (mut manager, log) = manager();
        let project = manager.add_project(dir.path()).unwrap().unwrap();

        manager.delete_project(&project.id).unwrap();
        manager.delete_project(&project.id).unwrap();

        assert!(manager.projects().is_empty());
        assert_eq!(log.borrow().deleted.len(), 2);
    }

    #[test]
    fn test_delete_project_keeps_project_when_store_fails() {
        let dir = tempdir().unwrap();
        let (mut manager, log) = manager();
        let project = manager.add_project(dir.path()).unwrap().unwrap();

        log.borrow_mut().fail_deletes = true;
        let err = manager.delete_project(&project.id).unwrap_err();

        assert!(matches!(err, Error::Store(_)));
        assert!(manager.project(&project.id).is_some());
        assert!(log.borrow().deleted.is_empty());
    }

    #[test]
    fn test_add_same_directory_with_trailing_separator() {
        let dir = tempdir().unwrap();
        let (mut manager, log) = manager();
        let project = manager.add_project(dir.path()).unwrap().unwrap();

        let with_slash = PathBuf::from(format!("{}/", dir.path().display()));
        let second = manager.add_project(&with_slash).unwrap();

        assert!(second.is_none());
        assert_eq!(manager.projects().len(), 1);
        assert_eq!(manager.find_by_src(&with_slash), Some(&project));
        assert_eq!(log.borrow().saved.len(), 1);
        assert_eq!(log.borrow().alerts.len(), 1);
    }

    #[test]
    fn test_add_project_stores_normalized_src() {
        let dir = tempdir().unwrap();
        let (mut manager, _log) = manager();

        let with_slash = PathBuf::from(format!("{}/", dir.path().display()));
        let project = manager.add_project(&with_slash).unwrap().unwrap();

        assert_eq!(project.src, key(dir.path()));
        assert_eq!(
            project.name,
            dir.path().file_name().unwrap().to_string_lossy()
        );
    }

    #[test]
    fn test_update_project_unknown_id() {
        let (mut manager, _log) = manager();
        let err = manager
            .update_project(&ProjectId::from_string("missing"))
            .unwrap_err();
        assert!(matches!(err, Error::ProjectNotFound(_)));
    }

    #[test]
    fn test_update_file_replaces_record_and_notifies_watcher() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("site.less");
        fs::write(&file, "").unwrap();

        let (mut manager, log) = manager();
        let project = manager.add_project(dir.path()).unwrap().unwrap();

        let updated = FileRecord::from_path(&file)
            .with_output(key(&dir.path().join("out.css")))
            .with_setting("compress", serde_json::json!(true));
        manager.update_file(&project.id, updated.clone()).unwrap();

        let stored = &manager.project(&project.id).unwrap().files[&key(&file)];
        assert_eq!(stored, &updated);
        assert_eq!(log.borrow().flushes, 1);
        assert_eq!(log.borrow().watch_updated, vec![key(&file)]);
    }

    #[test]
    fn test_update_file_unknown_project() {
        let (mut manager, log) = manager();
        let record = FileRecord::from_path(Path::new("/nowhere/a.less"));

        let err = manager
            .update_file(&ProjectId::from_string("missing"), record)
            .unwrap_err();

        assert!(matches!(err, Error::ProjectNotFound(_)));
        assert_eq!(log.borrow().flushes, 0);
        assert!(log.borrow().watch_updated.is_empty());
    }

    #[test]
    fn test_check_status_drops_missing_projects_and_files() {
        let kept = tempdir().unwrap();
        let doomed = tempdir().unwrap();
        let a = kept.path().join("a.less");
        let b = kept.path().join("b.less");
        fs::write(&a, "").unwrap();
        fs::write(&b, "").unwrap();

        let (mut manager, log) = manager();
        let kept_project = manager.add_project(kept.path()).unwrap().unwrap();
        let doomed_project = manager.add_project(doomed.path()).unwrap().unwrap();

        fs::remove_file(&b).unwrap();
        let doomed_path = doomed.path().to_path_buf();
        doomed.close().unwrap();
        assert!(!doomed_path.exists());

        let report = manager.check_status().unwrap();

        assert_eq!(report.removed_projects, vec![doomed_project.id.clone()]);
        assert_eq!(report.removed_files, vec![key(&b)]);
        assert!(manager.project(&doomed_project.id).is_none());

        let files = &manager.project(&kept_project.id).unwrap().files;
        assert_eq!(files.keys().cloned().collect::<Vec<_>>(), vec![key(&a)]);
        assert_eq!(log.borrow().flushes, 1);
    }

    #[test]
    fn test_check_status_without_changes_does_not_persist() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.less"), "").unwrap();

        let (mut manager, log) = manager();
        manager.add_project(dir.path()).unwrap();

        let report = manager.check_status().unwrap();

        assert!(!report.has_changes());
        assert_eq!(log.borrow().flushes, 0);
    }

    #[test]
    fn test_refresh_reconciles_with_disk() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.less");
        let b = dir.path().join("b.less");
        let c = dir.path().join("c.scss");
        fs::write(&a, "").unwrap();
        fs::write(&b, "").unwrap();

        let (mut manager, log) = manager();
        let project = manager.add_project(dir.path()).unwrap().unwrap();

        fs::remove_file(&b).unwrap();
        fs::write(&c, "").unwrap();

        let refresh = manager.refresh_project(&project.id).unwrap();

        assert_eq!(
            refresh.files.keys().cloned().collect::<Vec<_>>(),
            vec![key(&a), key(&c)]
        );
        assert_eq!(refresh.invalid_files, vec![key(&b)]);
        assert_eq!(refresh.new_files, vec![FileRecord::from_path(&c)]);
        assert_eq!(manager.project(&project.id).unwrap().files, refresh.files);

        let log = log.borrow();
        assert_eq!(log.flushes, 1);
        assert_eq!(log.watch_removed, vec![vec![key(&b)]]);
        assert_eq!(log.watch_added, vec![vec![key(&c)]]);
    }

    #[test]
    fn test_refresh_keeps_existing_settings() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.less");
        fs::write(&a, "").unwrap();

        let (mut manager, _log) = manager();
        let project = manager.add_project(dir.path()).unwrap().unwrap();
        let customised =
            FileRecord::from_path(&a).with_setting("compress", serde_json::json!(true));
        manager.update_file(&project.id, customised.clone()).unwrap();

        let refresh = manager.refresh_project(&project.id).unwrap();

        assert_eq!(refresh.files[&key(&a)], customised);
        assert!(refresh.new_files.is_empty());
    }

    #[test]
    fn test_refresh_without_changes_is_quiet() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.less"), "").unwrap();

        let (mut manager, log) = manager();
        let project = manager.add_project(dir.path()).unwrap().unwrap();

        let refresh = manager.refresh_project(&project.id).unwrap();

        assert!(refresh.invalid_files.is_empty());
        assert!(refresh.new_files.is_empty());
        let log = log.borrow();
        assert_eq!(log.flushes, 0);
        assert!(log.watch_added.is_empty());
        assert!(log.watch_removed.is_empty());
    }

    #[test]
    fn test_refresh_of_vanished_directory_changes_nothing() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.less"), "").unwrap();

        let (mut manager, log) = manager();
        let project = manager.add_project(dir.path()).unwrap().unwrap();
        dir.close().unwrap();

        let err = manager.refresh_project(&project.id).unwrap_err();

        assert!(matches!(err, Error::Walk { .. }));
        assert_eq!(manager.project(&project.id).unwrap().files, project.files);
        let log = log.borrow();
        assert_eq!(log.flushes, 0);
        assert!(log.watch_removed.is_empty());
        assert!(log.watch_added.is_empty());
    }

    #[test]
    fn test_refresh_unknown_project() {
        let (mut manager, _log) = manager();
        let err = manager
            .refresh_project(&ProjectId::from_string("missing"))
            .unwrap_err();
        assert!(matches!(err, Error::ProjectNotFound(_)));
    }

    #[test]
    fn test_open_uses_stored_projects() {
        let dir = tempdir().unwrap();
        let project = Project::new(dir.path(), FileMap::new());
        let mut initial = ProjectSet::new();
        initial.insert(project.id.clone(), project.clone());

        let (mut manager, log) = manager_with(initial, &AppConfig::default());

        assert_eq!(manager.find_by_src(dir.path()), Some(&project));
        assert!(manager.add_project(dir.path()).unwrap().is_none());
        assert_eq!(log.borrow().alerts.len(), 1);
    }

    #[test]
    fn test_valid_files_and_watch_all() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("site.less"), "").unwrap();
        fs::write(dir.path().join("site.less~"), "").unwrap();
        fs::write(dir.path().join("readme.md"), "").unwrap();

        let (mut manager, log) = manager();
        let project = manager.add_project(dir.path()).unwrap().unwrap();

        let valid: Vec<&str> = manager
            .valid_files(&project.id)
            .unwrap()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(valid, vec!["site.less"]);

        manager.watch_all();
        assert_eq!(log.borrow().watch_added[0].len(), 3);
    }
}
