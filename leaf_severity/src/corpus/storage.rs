// THEORY:
// `CorpusStorage` is the only door between the sorter and a file system. The
// sorter needs very little: list a folder, read a file, make sure a folder
// exists, and copy a file into a folder. Keeping that surface small means
// the whole sorting flow can run against `MemoryStorage` in tests, while
// production uses `FsStorage` over `std::fs`.
//
// Listings are sorted by path so a run visits files in a stable order.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// The file-system operations the corpus sorter and weather generator rely on.
pub trait CorpusStorage: Send + Sync {
    /// Regular files directly inside `dir`, sorted by path.
    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    /// Directories directly inside `dir`, sorted by path.
    fn list_directories(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    fn is_directory(&self, path: &Path) -> bool;

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Copies `src` into `dest_dir` under its own file name, overwriting. Returns the new path.
    fn copy_file(&self, src: &Path, dest_dir: &Path) -> io::Result<PathBuf>;

    /// Creates `dir` and any missing parents.
    fn ensure_directory(&self, dir: &Path) -> io::Result<()>;
}

fn file_name_of(path: &Path) -> io::Result<&std::ffi::OsStr> {
    path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no file name", path.display()),
        )
    })
}

// ----------------------------------------------------------------------------

/// `CorpusStorage` over the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl FsStorage {
    fn list_entries(dir: &Path, want_dirs: bool) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            // Symlinks count as what they point to. A dangling link is listed as a
            // file so that reading it reports the failure.
            let (is_file, is_dir) = match fs::metadata(&path) {
                Ok(meta) => (meta.is_file(), meta.is_dir()),
                Err(_) if entry.file_type()?.is_symlink() => (true, false),
                Err(err) => return Err(err),
            };
            if (want_dirs && is_dir) || (!want_dirs && is_file) {
                entries.push(path);
            }
        }
        entries.sort();
        Ok(entries)
    }
}

impl CorpusStorage for FsStorage {
    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        Self::list_entries(dir, false)
    }

    fn list_directories(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        Self::list_entries(dir, true)
    }

    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn copy_file(&self, src: &Path, dest_dir: &Path) -> io::Result<PathBuf> {
        let dest = dest_dir.join(file_name_of(src)?);
        fs::copy(src, &dest)?;
        Ok(dest)
    }

    fn ensure_directory(&self, dir: &Path) -> io::Result<()> {
        fs::create_dir_all(dir)
    }
}

// ----------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryTree {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
}

impl MemoryTree {
    fn add_dir_with_parents(&mut self, dir: &Path) {
        for ancestor in dir.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            self.dirs.insert(ancestor.to_path_buf());
        }
    }
}

/// An in-memory `CorpusStorage`, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tree: Mutex<MemoryTree>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `contents` at `path`, creating parent directories.
    pub fn insert_file(&self, path: impl Into<PathBuf>, contents: Vec<u8>) {
        let path = path.into();
        let mut tree = self.lock();
        if let Some(parent) = path.parent() {
            tree.add_dir_with_parents(parent);
        }
        tree.files.insert(path, contents);
    }

    /// The contents stored at `path`, if any.
    pub fn file(&self, path: &Path) -> Option<Vec<u8>> {
        self.lock().files.get(path).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryTree> {
        // Every mutation is a single insert, so a poisoned tree is still consistent.
        self.tree.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display()))
    }
}

impl CorpusStorage for MemoryStorage {
    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let tree = self.lock();
        if !tree.dirs.contains(dir) {
            return Err(Self::not_found(dir));
        }
        Ok(tree
            .files
            .keys()
            .filter(|path| path.parent() == Some(dir))
            .cloned()
            .collect())
    }

    fn list_directories(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let tree = self.lock();
        if !tree.dirs.contains(dir) {
            return Err(Self::not_found(dir));
        }
        Ok(tree
            .dirs
            .iter()
            .filter(|path| path.parent() == Some(dir))
            .cloned()
            .collect())
    }

    fn is_directory(&self, path: &Path) -> bool {
        self.lock().dirs.contains(path)
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.lock().files.get(path).cloned().ok_or_else(|| Self::not_found(path))
    }

    fn copy_file(&self, src: &Path, dest_dir: &Path) -> io::Result<PathBuf> {
        let mut tree = self.lock();
        if !tree.dirs.contains(dest_dir) {
            return Err(Self::not_found(dest_dir));
        }
        let contents = tree.files.get(src).cloned().ok_or_else(|| Self::not_found(src))?;
        let dest = dest_dir.join(file_name_of(src)?);
        tree.files.insert(dest.clone(), contents);
        Ok(dest)
    }

    fn ensure_directory(&self, dir: &Path) -> io::Result<()> {
        self.lock().add_dir_with_parents(dir);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_lists_direct_children_only() {
        let storage = MemoryStorage::new();
        storage.insert_file("raw/a/one.png", vec![1]);
        storage.insert_file("raw/a/two.jpg", vec![2]);
        storage.insert_file("raw/a/nested/three.png", vec![3]);

        let files = storage.list_files(Path::new("raw/a")).unwrap();
        assert_eq!(files, vec![PathBuf::from("raw/a/one.png"), PathBuf::from("raw/a/two.jpg")]);

        let dirs = storage.list_directories(Path::new("raw")).unwrap();
        assert_eq!(dirs, vec![PathBuf::from("raw/a")]);
        assert!(storage.list_files(Path::new("missing")).is_err());
    }

    #[test]
    fn memory_copy_requires_destination() {
        let storage = MemoryStorage::new();
        storage.insert_file("raw/leaf.png", vec![7, 7]);
        assert!(storage.copy_file(Path::new("raw/leaf.png"), Path::new("out")).is_err());

        storage.ensure_directory(Path::new("out/Healthy")).unwrap();
        assert!(storage.is_directory(Path::new("out")));
        let dest = storage.copy_file(Path::new("raw/leaf.png"), Path::new("out/Healthy")).unwrap();
        assert_eq!(dest, PathBuf::from("out/Healthy/leaf.png"));
        assert_eq!(storage.file(&dest), Some(vec![7, 7]));
    }

    #[test]
    fn fs_storage_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = FsStorage;
        let raw = tmp.path().join("raw");
        let out = tmp.path().join("processed/Healthy");
        storage.ensure_directory(&raw).unwrap();
        storage.ensure_directory(&raw.join("subdir")).unwrap();
        std::fs::write(raw.join("b.png"), b"b").unwrap();
        std::fs::write(raw.join("a.png"), b"a").unwrap();

        let files = storage.list_files(&raw).unwrap();
        assert_eq!(files, vec![raw.join("a.png"), raw.join("b.png")]);
        assert_eq!(storage.list_directories(&raw).unwrap(), vec![raw.join("subdir")]);

        storage.ensure_directory(&out).unwrap();
        let dest = storage.copy_file(&raw.join("a.png"), &out).unwrap();
        assert_eq!(storage.read_file(&dest).unwrap(), b"a");
    }

    #[cfg(unix)]
    #[test]
    fn fs_storage_follows_symlinks() {
        use std::os::unix::fs::symlink;

        let tmp = tempfile::tempdir().unwrap();
        let storage = FsStorage;
        let shared = tmp.path().join("shared");
        let raw = tmp.path().join("raw");
        let out = tmp.path().join("out");
        for dir in [&shared, &raw, &out] {
            storage.ensure_directory(dir).unwrap();
        }
        std::fs::write(shared.join("leaf.png"), b"pixels").unwrap();
        symlink(shared.join("leaf.png"), raw.join("leaf.png")).unwrap();
        symlink(&shared, raw.join("linked_class")).unwrap();
        symlink(shared.join("gone.png"), raw.join("dangling.png")).unwrap();

        let files = storage.list_files(&raw).unwrap();
        assert_eq!(files, vec![raw.join("dangling.png"), raw.join("leaf.png")]);
        assert_eq!(storage.list_directories(&raw).unwrap(), vec![raw.join("linked_class")]);
        assert!(storage.read_file(&raw.join("dangling.png")).is_err());

        // The copy holds the target's bytes, not a link.
        let dest = storage.copy_file(&raw.join("leaf.png"), &out).unwrap();
        assert!(!std::fs::symlink_metadata(&dest).unwrap().file_type().is_symlink());
        assert_eq!(storage.read_file(&dest).unwrap(), b"pixels");
    }
}
