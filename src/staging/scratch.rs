/// Scoped temporary files and directories
///
/// Every submission stages its bundle in uniquely named scratch entries under a
/// configured root. Entries are owner-only, and are removed when their handle is
/// dropped, on every exit path. Removal failures are logged and never propagated,
/// so they cannot mask the outcome of the operation that owned the entry.

use std::io;
use std::path::{Path, PathBuf};

/// What kind of filesystem entry a scratch handle owns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScratchKind {
    File,
    Directory,
}

/// Handle to a scratch file or directory, deleted on drop
#[derive(Debug)]
pub struct Scratch {
    path: PathBuf,
    kind: ScratchKind,
    released: bool,
}

impl Scratch {
    /// Acquire a new scratch entry under `root`.
    ///
    /// The name is `prefix` followed by a random suffix, so concurrent callers
    /// using the same prefix never collide.
    pub fn acquire(root: &Path, kind: ScratchKind, prefix: &str) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix);

        let path = match kind {
            ScratchKind::File => {
                let (_file, path) = builder.tempfile_in(root)?.keep().map_err(io::Error::from)?;
                path
            }
            ScratchKind::Directory => builder.tempdir_in(root)?.keep(),
        };

        restrict_to_owner(&path, kind)?;
        tracing::debug!("🧪 Acquired scratch {:?}: {}", kind, path.display());

        Ok(Self {
            path,
            kind,
            released: false,
        })
    }

    pub fn file(root: &Path, prefix: &str) -> io::Result<Self> {
        Self::acquire(root, ScratchKind::File, prefix)
    }

    pub fn directory(root: &Path, prefix: &str) -> io::Result<Self> {
        Self::acquire(root, ScratchKind::Directory, prefix)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ScratchKind {
        self.kind
    }

    /// Delete the entry now. Idempotent; failures are logged, not returned.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let result = match self.kind {
            ScratchKind::File => std::fs::remove_file(&self.path),
            ScratchKind::Directory => std::fs::remove_dir_all(&self.path),
        };

        match result {
            Ok(()) => tracing::debug!("🧹 Released scratch: {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("🧹 Scratch already gone: {}", self.path.display())
            }
            Err(e) => tracing::warn!("⚠️ Failed to delete scratch {}: {}", self.path.display(), e),
        }
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(unix)]
fn restrict_to_owner(path: &Path, kind: ScratchKind) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = match kind {
        ScratchKind::File => 0o600,
        ScratchKind::Directory => 0o700,
    };
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path, _kind: ScratchKind) -> io::Result<()> {
    Ok(())
}

/// Group of scratch entries released in reverse acquisition order
///
/// A submission acquires several entries; the arena owns them all so a single
/// drop (including during unwinding or an early `?` return) cleans up the lot.
#[derive(Debug)]
pub struct ScratchArena {
    root: PathBuf,
    entries: Vec<Scratch>,
}

impl ScratchArena {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: Vec::new(),
        }
    }

    /// Acquire an entry and return its path; the arena keeps the handle
    pub fn acquire(&mut self, kind: ScratchKind, prefix: &str) -> io::Result<PathBuf> {
        let scratch = Scratch::acquire(&self.root, kind, prefix)?;
        let path = scratch.path().to_path_buf();
        self.entries.push(scratch);
        Ok(path)
    }

    pub fn file(&mut self, prefix: &str) -> io::Result<PathBuf> {
        self.acquire(ScratchKind::File, prefix)
    }

    pub fn directory(&mut self, prefix: &str) -> io::Result<PathBuf> {
        self.acquire(ScratchKind::Directory, prefix)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Release everything now, newest first
    pub fn release_all(&mut self) {
        while let Some(mut scratch) = self.entries.pop() {
            scratch.release();
        }
    }
}

impl Drop for ScratchArena {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::tempdir;

    #[test]
    fn file_is_removed_on_drop() {
        let root = tempdir().unwrap();
        let path = {
            let scratch = Scratch::file(root.path(), "inputs-").unwrap();
            assert!(scratch.path().is_file());
            assert!(scratch.path().file_name().unwrap().to_str().unwrap().starts_with("inputs-"));
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn directory_is_removed_recursively() {
        let root = tempdir().unwrap();
        let mut scratch = Scratch::directory(root.path(), "deps-").unwrap();
        std::fs::create_dir(scratch.path().join("nested")).unwrap();
        std::fs::write(scratch.path().join("nested/a.wdl"), "task a {}").unwrap();

        scratch.release();
        assert!(!scratch.path().exists());
        // second release is a no-op
        scratch.release();
    }

    #[test]
    fn same_prefix_never_collides() {
        let root = tempdir().unwrap();
        let handles: Vec<Scratch> = (0..32)
            .map(|_| Scratch::file(root.path(), "options-").unwrap())
            .collect();
        let names: HashSet<_> = handles.iter().map(|s| s.path().to_path_buf()).collect();
        assert_eq!(names.len(), 32);
    }

    #[test]
    fn vanished_entry_does_not_panic() {
        let root = tempdir().unwrap();
        let scratch = Scratch::file(root.path(), "labels-").unwrap();
        std::fs::remove_file(scratch.path()).unwrap();
        drop(scratch);
    }

    #[cfg(unix)]
    #[test]
    fn entries_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempdir().unwrap();
        let file = Scratch::file(root.path(), "f-").unwrap();
        let dir = Scratch::directory(root.path(), "d-").unwrap();
        let file_mode = std::fs::metadata(file.path()).unwrap().permissions().mode() & 0o777;
        let dir_mode = std::fs::metadata(dir.path()).unwrap().permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn arena_releases_everything() {
        let root = tempdir().unwrap();
        {
            let mut arena = ScratchArena::new(root.path());
            let dir = arena.directory("deps-").unwrap();
            let file = arena.file("source-").unwrap();
            std::fs::write(dir.join("lib.wdl"), "task lib {}").unwrap();
            std::fs::write(&file, "workflow main {}").unwrap();
            assert_eq!(arena.len(), 2);
        }
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn arena_releases_on_early_return() {
        fn stage(root: &Path) -> io::Result<()> {
            let mut arena = ScratchArena::new(root);
            arena.file("inputs-")?;
            arena.file("options-")?;
            Err(io::Error::new(io::ErrorKind::Other, "engine rejected submission"))
        }

        let root = tempdir().unwrap();
        assert!(stage(root.path()).is_err());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
