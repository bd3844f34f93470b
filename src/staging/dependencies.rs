/// Workflow dependency resolution
///
/// A main source document that contains at least one `import "..."` line is
/// treated as having dependencies. Import targets are NOT resolved one by one:
/// every sibling object with the same extension in the main document's storage
/// "directory" is downloaded into a staging directory, then zipped into a single
/// archive the engine accepts as a side file.
///
/// This over-fetches (unrelated siblings come along) and misses imports that
/// point outside the parent directory, but never drops a sibling import. Precise
/// per-import transitive resolution is a possible replacement and would change
/// what gets shipped to the engine.

use crate::clients::storage::{ObjectStorage, StorageError};
use crate::workflow::types::ObjectLocator;
use regex::Regex;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use zip::write::SimpleFileOptions;

#[derive(Debug, Error)]
pub enum DependencyError {
    #[error("failed to read staged source {path}: {source}")]
    ReadSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("failed to archive dependencies: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("failed to archive dependencies: {0}")]
    Io(#[from] io::Error),
    #[error("archiving task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Line-anchored import declaration: `import "path"` or `import 'path'`, anything may follow
fn import_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"^import\s+("[^"]*"|'[^']*')"#).expect("import pattern is valid"))
}

/// Whether any line of `source` is an import declaration
pub fn has_imports(source: &str) -> bool {
    source.lines().any(|line| import_pattern().is_match(line))
}

/// Stages sibling source files for workflows that import other documents
#[derive(Clone)]
pub struct DependencyResolver {
    storage: Arc<dyn ObjectStorage>,
}

impl DependencyResolver {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    /// Download same-extension siblings of `source` into `staging_dir` if the
    /// staged main document at `source_path` has any import lines.
    ///
    /// Returns `false` without touching storage when there are no imports.
    pub async fn download_dependencies_if_exist(
        &self,
        source_path: &Path,
        source: &ObjectLocator,
        staging_dir: &Path,
    ) -> Result<bool, DependencyError> {
        let document = tokio::fs::read(source_path)
            .await
            .map_err(|e| DependencyError::ReadSource {
                path: source_path.to_path_buf(),
                source: e,
            })?;

        // Undecodable bytes (e.g. Latin-1 comments) cannot form an import line
        if !has_imports(&String::from_utf8_lossy(&document)) {
            tracing::debug!("📄 {} has no imports, skipping dependency staging", source);
            return Ok(false);
        }

        let extension = source.extension().unwrap_or_default();
        let siblings = self
            .storage
            .list_objects(&source.bucket, source.parent_prefix(), extension)
            .await?;
        tracing::info!(
            "📦 {} imports other documents, staging {} sibling file(s) from gs://{}/{}",
            source,
            siblings.len(),
            source.bucket,
            source.parent_prefix()
        );

        self.storage.download_all(&siblings, staging_dir).await?;
        Ok(true)
    }
}

/// Zip every regular file directly inside `staging_dir` into `archive_path`.
/// Returns the number of archived files.
///
/// `archive_path` must already exist (it is a scratch file owned by the
/// caller). It is opened without `create`, so a blocking task that outlives a
/// released scratch arena fails instead of leaving a new file behind.
pub async fn archive_dependencies(staging_dir: &Path, archive_path: &Path) -> Result<usize, DependencyError> {
    let staging_dir = staging_dir.to_path_buf();
    let archive_path = archive_path.to_path_buf();
    tokio::task::spawn_blocking(move || write_archive(&staging_dir, &archive_path)).await?
}

fn write_archive(staging_dir: &Path, archive_path: &Path) -> Result<usize, DependencyError> {
    let mut entries = std::fs::read_dir(staging_dir)?.collect::<Result<Vec<_>, io::Error>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    let archive = std::fs::OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(archive_path)?;
    let mut writer = zip::ZipWriter::new(archive);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut count = 0;
    for entry in entries {
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        writer.start_file(name, options)?;
        let mut file = std::fs::File::open(entry.path())?;
        io::copy(&mut file, &mut writer)?;
        count += 1;
    }
    writer.finish()?;

    tracing::debug!("🗜️ Archived {} dependency file(s) into {}", count, archive_path.display());
    Ok(count)
}
