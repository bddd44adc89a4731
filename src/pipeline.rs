use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::exif;
use crate::sidecar::SidecarRecord;

/// Where sidecars come from and how they are removed.
///
/// [`FsSidecarStore`] is the real filesystem; tests substitute an in-memory
/// store.
pub trait SidecarStore {
    /// All sidecar files under `root`, in processing order.
    fn list_sidecars(&self, root: &Path) -> Result<Vec<PathBuf>>;
    fn read_sidecar(&self, path: &Path) -> Result<String>;
    fn remove_sidecar(&self, path: &Path) -> Result<()>;
}

/// Compares and writes image metadata.
pub trait MetadataEngine {
    fn has_difference(&self, image: &Path, record: &SidecarRecord) -> Result<bool>;
    fn write(&self, image: &Path, record: &SidecarRecord) -> Result<()>;
}

/// Sidecars on the local filesystem, found by extension.
#[derive(Debug, Clone)]
pub struct FsSidecarStore {
    extension: String,
}

impl FsSidecarStore {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }

    fn is_sidecar(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == self.extension)
    }
}

impl Default for FsSidecarStore {
    fn default() -> Self {
        Self::new("json")
    }
}

impl SidecarStore for FsSidecarStore {
    /// Walk `root` recursively (following symlinks), sorted by file name
    /// within each directory.
    fn list_sidecars(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut sidecars = Vec::new();
        for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() && self.is_sidecar(entry.path()) {
                sidecars.push(entry.into_path());
            }
        }
        Ok(sidecars)
    }

    fn read_sidecar(&self, path: &Path) -> Result<String> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn remove_sidecar(&self, path: &Path) -> Result<()> {
        std::fs::remove_file(path).map_err(|source| Error::RemoveSidecar {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// The EXIF implementation of [`MetadataEngine`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifEngine;

impl MetadataEngine for ExifEngine {
    fn has_difference(&self, image: &Path, record: &SidecarRecord) -> Result<bool> {
        exif::has_difference(image, record)
    }

    fn write(&self, image: &Path, record: &SidecarRecord) -> Result<()> {
        exif::write_record(image, record)
    }
}

/// How one sidecar was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The image differed and was rewritten.
    Updated,
    /// Nothing to do: image missing, metadata unreadable, or already in sync.
    Unchanged,
    /// The sidecar's image is not a supported type.
    Unsupported,
    /// The sidecar itself could not be decoded.
    Unreadable,
}

/// Counters for a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub found: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub unsupported: usize,
    pub unreadable: usize,
    pub sidecars_removed: usize,
}

impl SyncSummary {
    fn record(&mut self, disposition: Disposition) {
        match disposition {
            Disposition::Updated => self.updated += 1,
            Disposition::Unchanged => self.unchanged += 1,
            Disposition::Unsupported => self.unsupported += 1,
            Disposition::Unreadable => self.unreadable += 1,
        }
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} updated, {} unchanged, {} unsupported, {} unreadable out of {} sidecar file(s)",
            self.updated, self.unchanged, self.unsupported, self.unreadable, self.found
        )
    }
}

/// Handle a single sidecar: detect, write if needed, and optionally remove
/// the sidecar.
///
/// Only an unsupported image type and an undecodable sidecar are tolerated;
/// any other error is returned and should stop the run.
pub fn process_sidecar<S, E>(
    store: &S,
    engine: &E,
    sidecar: &Path,
    delete_sidecars: bool,
) -> Result<Disposition>
where
    S: SidecarStore + ?Sized,
    E: MetadataEngine + ?Sized,
{
    log::info!("Found: {}", sidecar.display());
    let text = store.read_sidecar(sidecar)?;
    let record = match SidecarRecord::from_json(&text) {
        Ok(record) => record,
        Err(e) => {
            log::warn!("Skipping unreadable sidecar {}: {e}", sidecar.display());
            return Ok(Disposition::Unreadable);
        }
    };

    let dir = sidecar.parent().unwrap_or_else(|| Path::new(""));
    let image = record.image_path(dir);

    let disposition = match engine.has_difference(&image, &record) {
        Err(e) if e.is_unsupported() => {
            log::info!("Skipping unsupported file: {}", sidecar.display());
            log::debug!("  {e}");
            Disposition::Unsupported
        }
        Err(e) => return Err(e),
        Ok(false) => {
            log::info!("Skipping: {}", sidecar.display());
            Disposition::Unchanged
        }
        Ok(true) => {
            log::info!("Processing: {}", sidecar.display());
            engine.write(&image, &record)?;
            Disposition::Updated
        }
    };

    if delete_sidecars {
        store.remove_sidecar(sidecar)?;
        log::debug!("Removed {}", sidecar.display());
    }

    Ok(disposition)
}

/// Run the whole synchronization with the given store and engine.
///
/// Sidecars are listed once up front and processed in order. The first fatal
/// error aborts the run; images already rewritten stay rewritten.
pub fn run_sync<S, E>(store: &S, engine: &E, config: &SyncConfig) -> Result<SyncSummary>
where
    S: SidecarStore + ?Sized,
    E: MetadataEngine + ?Sized,
{
    let sidecars = store.list_sidecars(&config.root)?;
    let mut summary = SyncSummary {
        found: sidecars.len(),
        ..Default::default()
    };

    for sidecar in &sidecars {
        let disposition = process_sidecar(store, engine, sidecar, config.delete_sidecars)?;
        summary.record(disposition);
        if config.delete_sidecars && disposition != Disposition::Unreadable {
            summary.sidecars_removed += 1;
        }
    }

    log::info!("Done: {summary}");
    Ok(summary)
}

/// Synchronize every sidecar under `config.root` against its image on disk.
///
/// # Example
///
/// ```rust,no_run
/// use takeout_exif_sync::config::SyncConfig;
/// use takeout_exif_sync::pipeline::sync_directory;
///
/// let summary = sync_directory(&SyncConfig::new("Takeout/Google Photos", false)).unwrap();
/// println!("{} images updated", summary.updated);
/// ```
pub fn sync_directory(config: &SyncConfig) -> Result<SyncSummary> {
    config.validate()?;
    let store = FsSidecarStore::new(config.sidecar_extension.clone());
    run_sync(&store, &ExifEngine, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    // ── fakes ─────────────────────────────────────────────────────────

    #[derive(Default)]
    struct MemoryStore {
        files: Vec<(PathBuf, String)>,
        read: RefCell<Vec<PathBuf>>,
        removed: RefCell<Vec<PathBuf>>,
        fail_remove: bool,
    }

    impl MemoryStore {
        fn with(mut self, path: &str, json: &str) -> Self {
            self.files.push((PathBuf::from(path), json.to_string()));
            self
        }
    }

    impl SidecarStore for MemoryStore {
        fn list_sidecars(&self, _root: &Path) -> Result<Vec<PathBuf>> {
            Ok(self.files.iter().map(|(p, _)| p.clone()).collect())
        }

        fn read_sidecar(&self, path: &Path) -> Result<String> {
            self.read.borrow_mut().push(path.to_path_buf());
            self.files
                .iter()
                .find(|(p, _)| p == path)
                .map(|(_, json)| json.clone())
                .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound).into())
        }

        fn remove_sidecar(&self, path: &Path) -> Result<()> {
            if self.fail_remove {
                return Err(Error::RemoveSidecar {
                    path: path.to_path_buf(),
                    source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
                });
            }
            self.removed.borrow_mut().push(path.to_path_buf());
            Ok(())
        }
    }

    #[derive(Clone, Copy)]
    enum Outcome {
        InSync,
        Differs,
        WriteFails,
        DetectFails,
    }

    #[derive(Default)]
    struct ScriptedEngine {
        outcomes: HashMap<PathBuf, Outcome>,
        written: RefCell<Vec<PathBuf>>,
    }

    impl ScriptedEngine {
        fn with(mut self, image: &str, outcome: Outcome) -> Self {
            self.outcomes.insert(PathBuf::from(image), outcome);
            self
        }

        fn outcome(&self, image: &Path) -> Outcome {
            self.outcomes.get(image).copied().unwrap_or(Outcome::InSync)
        }
    }

    impl MetadataEngine for ScriptedEngine {
        fn has_difference(&self, image: &Path, _record: &SidecarRecord) -> Result<bool> {
            exif::ensure_jpeg(image)?;
            match self.outcome(image) {
                Outcome::InSync => Ok(false),
                Outcome::Differs | Outcome::WriteFails => Ok(true),
                Outcome::DetectFails => Err(Error::MalformedExif {
                    path: image.to_path_buf(),
                    message: "truncated IFD".to_string(),
                }),
            }
        }

        fn write(&self, image: &Path, _record: &SidecarRecord) -> Result<()> {
            if let Outcome::WriteFails = self.outcome(image) {
                return Err(Error::ExifWrite {
                    path: image.to_path_buf(),
                    message: "disk full".to_string(),
                });
            }
            self.written.borrow_mut().push(image.to_path_buf());
            Ok(())
        }
    }

    fn sidecar_json(title: &str) -> String {
        format!(r#"{{"title": "{title}", "photoTakenTime": {{"timestamp": "1665675691"}}}}"#)
    }

    fn config(delete: bool) -> SyncConfig {
        SyncConfig::new("/album", delete)
    }

    // ── run_sync ──────────────────────────────────────────────────────

    #[test]
    fn dispositions_are_counted() {
        let store = MemoryStore::default()
            .with("/album/a.jpg.json", &sidecar_json("a.jpg"))
            .with("/album/b.png.json", &sidecar_json("b.png"))
            .with("/album/c.jpg.json", &sidecar_json("c.jpg"))
            .with("/album/broken.json", "{not json");
        let engine = ScriptedEngine::default().with("/album/a.jpg", Outcome::Differs);

        let summary = run_sync(&store, &engine, &config(false)).unwrap();

        assert_eq!(
            summary,
            SyncSummary {
                found: 4,
                updated: 1,
                unchanged: 1,
                unsupported: 1,
                unreadable: 1,
                sidecars_removed: 0,
            }
        );
        assert_eq!(*engine.written.borrow(), vec![PathBuf::from("/album/a.jpg")]);
        assert!(store.removed.borrow().is_empty());
    }

    #[test]
    fn delete_flag_removes_all_handled_sidecars() {
        let store = MemoryStore::default()
            .with("/album/a.jpg.json", &sidecar_json("a.jpg"))
            .with("/album/b.png.json", &sidecar_json("b.png"))
            .with("/album/broken.json", "[1, 2");
        let engine = ScriptedEngine::default().with("/album/a.jpg", Outcome::Differs);

        let summary = run_sync(&store, &engine, &config(true)).unwrap();

        assert_eq!(summary.sidecars_removed, 2);
        assert_eq!(
            *store.removed.borrow(),
            vec![
                PathBuf::from("/album/a.jpg.json"),
                PathBuf::from("/album/b.png.json"),
            ]
        );
    }

    #[test]
    fn write_failure_aborts_remaining_files() {
        let store = MemoryStore::default()
            .with("/album/a.jpg.json", &sidecar_json("a.jpg"))
            .with("/album/b.jpg.json", &sidecar_json("b.jpg"));
        let engine = ScriptedEngine::default()
            .with("/album/a.jpg", Outcome::WriteFails)
            .with("/album/b.jpg", Outcome::Differs);

        let err = run_sync(&store, &engine, &config(true)).unwrap_err();

        assert!(matches!(err, Error::ExifWrite { .. }));
        assert!(engine.written.borrow().is_empty());
        assert!(store.removed.borrow().is_empty());
    }

    #[test]
    fn sidecars_are_handled_one_at_a_time() {
        let store = MemoryStore::default()
            .with("/album/a.jpg.json", &sidecar_json("a.jpg"))
            .with("/album/b.jpg.json", &sidecar_json("b.jpg"));
        let engine = ScriptedEngine::default().with("/album/a.jpg", Outcome::DetectFails);

        assert!(run_sync(&store, &engine, &config(false)).is_err());
        assert_eq!(*store.read.borrow(), vec![PathBuf::from("/album/a.jpg.json")]);
    }

    #[test]
    fn detector_error_aborts_run() {
        let store = MemoryStore::default().with("/album/a.jpg.json", &sidecar_json("a.jpg"));
        let engine = ScriptedEngine::default().with("/album/a.jpg", Outcome::DetectFails);

        assert!(run_sync(&store, &engine, &config(false)).is_err());
    }

    #[test]
    fn deletion_failure_aborts_run() {
        let store = MemoryStore {
            fail_remove: true,
            ..Default::default()
        }
        .with("/album/a.jpg.json", &sidecar_json("a.jpg"))
        .with("/album/b.jpg.json", &sidecar_json("b.jpg"));
        let engine = ScriptedEngine::default().with("/album/b.jpg", Outcome::Differs);

        let err = run_sync(&store, &engine, &config(true)).unwrap_err();

        assert!(matches!(err, Error::RemoveSidecar { .. }));
        assert!(engine.written.borrow().is_empty());
    }

    #[test]
    fn unsupported_image_is_skipped_not_fatal() {
        let store = MemoryStore::default().with("/album/b.png.json", &sidecar_json("b.png"));
        let engine = ScriptedEngine::default();

        let disposition =
            process_sidecar(&store, &engine, Path::new("/album/b.png.json"), true).unwrap();

        assert_eq!(disposition, Disposition::Unsupported);
        assert_eq!(*store.removed.borrow(), vec![PathBuf::from("/album/b.png.json")]);
    }

    #[test]
    fn unreadable_sidecar_is_kept() {
        let store = MemoryStore::default().with("/album/x.json", "");
        let engine = ScriptedEngine::default();

        let disposition =
            process_sidecar(&store, &engine, Path::new("/album/x.json"), true).unwrap();

        assert_eq!(disposition, Disposition::Unreadable);
        assert!(store.removed.borrow().is_empty());
    }

    #[test]
    fn summary_display() {
        let summary = SyncSummary {
            found: 5,
            updated: 2,
            unchanged: 1,
            unsupported: 1,
            unreadable: 1,
            sidecars_removed: 0,
        };
        assert_eq!(
            summary.to_string(),
            "2 updated, 1 unchanged, 1 unsupported, 1 unreadable out of 5 sidecar file(s)"
        );
    }

    // ── FsSidecarStore ────────────────────────────────────────────────

    #[test]
    fn lists_json_files_recursively_in_name_order() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir(root.join("2019")).unwrap();
        fs::write(root.join("b.jpg.json"), "{}").unwrap();
        fs::write(root.join("a.jpg.json"), "{}").unwrap();
        fs::write(root.join("a.jpg"), b"").unwrap();
        fs::write(root.join("2019").join("c.jpg.json"), "{}").unwrap();
        fs::write(root.join("notes.txt"), "").unwrap();

        let found = FsSidecarStore::default().list_sidecars(root).unwrap();

        assert_eq!(
            found,
            vec![
                root.join("2019").join("c.jpg.json"),
                root.join("a.jpg.json"),
                root.join("b.jpg.json"),
            ]
        );
    }

    #[test]
    fn directory_named_like_sidecar_is_ignored() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("album.json")).unwrap();

        let found = FsSidecarStore::default().list_sidecars(tmp.path()).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn remove_missing_sidecar_fails() {
        let tmp = TempDir::new().unwrap();
        let err = FsSidecarStore::default()
            .remove_sidecar(&tmp.path().join("gone.json"))
            .unwrap_err();
        assert!(matches!(err, Error::RemoveSidecar { .. }));
    }

    #[test]
    fn sync_directory_rejects_missing_root() {
        let tmp = TempDir::new().unwrap();
        let config = SyncConfig::new(tmp.path().join("missing"), false);
        assert!(matches!(
            sync_directory(&config),
            Err(Error::NotADirectory { .. })
        ));
    }
}
