//! Bundle builder and extractor
//!
//! A bundle is a gzipped tar snapshot of the configured include set. It is
//! written into the parent directory of the project root and named
//! `<folderName>-<epochMillis>-secrets.tar.gz`, so it can never collide
//! with the project folder itself. Entries are added as
//! `<folderName>/<relativePath>`, keeping the project folder as the
//! archive's top-level entry; extraction therefore unpacks into the parent
//! of the destination root.

use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::{debug, info};

use crate::{Result, SvrError};

/// Suffix embedded in every bundle file name.
const BUNDLE_SUFFIX: &str = "secrets";

/// Extension of the bundle archive format.
const BUNDLE_EXT: &str = "tar.gz";

/// Bundle file name for a project folder built at the given instant.
pub fn bundle_file_name(folder_name: &str, epoch_millis: i64) -> String {
    format!("{folder_name}-{epoch_millis}-{BUNDLE_SUFFIX}.{BUNDLE_EXT}")
}

/// Resolve a project root to its canonical folder name and parent directory.
fn resolve_root(project_root: &Path) -> Result<(String, PathBuf)> {
    let canonical = fs::canonicalize(project_root)?;
    let folder = canonical
        .file_name()
        .ok_or_else(|| SvrError::config_invalid("project root has no folder name"))?
        .to_string_lossy()
        .into_owned();
    let parent = canonical
        .parent()
        .ok_or_else(|| SvrError::config_invalid("project root has no parent directory"))?
        .to_path_buf();
    Ok((folder, parent))
}

/// Build a bundle from the include set rooted at `project_root`.
///
/// Returns the path of the written archive, in the parent directory of the
/// (canonicalized) root. The archive is streamed straight to disk; callers
/// that upload it should stream from the returned path rather than reading
/// it back into memory.
///
/// # Errors
/// * `ConfigInvalid` if an include entry is absolute or steps outside the
///   root via `..`
/// * `Io` if any include path does not exist under the root
/// * `Compression` if the tar/gzip pipeline fails; a partial output file is
///   removed before the error is returned
pub fn build_bundle(project_root: &Path, include: &[String]) -> Result<PathBuf> {
    let (folder, parent) = resolve_root(project_root)?;
    let root = parent.join(&folder);

    // Fail before touching the output file if the include set is stale or
    // reaches outside the project root.
    for rel in include {
        let rel_path = Path::new(rel);
        if rel_path.is_absolute()
            || rel_path
                .components()
                .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(SvrError::config_invalid(format!(
                "include path must stay relative to the project root: {rel}"
            )));
        }

        let abs = root.join(rel);
        if !abs.exists() {
            return Err(SvrError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("include path not found: {}", abs.display()),
            )));
        }
    }

    let dest = parent.join(bundle_file_name(&folder, Utc::now().timestamp_millis()));
    debug!(bundle = %dest.display(), files = include.len(), "Building bundle");

    let result = write_bundle(&root, &folder, include, &dest);
    if let Err(e) = result {
        // Never leave a partial archive behind.
        let _ = fs::remove_file(&dest);
        return Err(e);
    }

    info!(bundle = %dest.display(), files = include.len(), "Bundle created");
    Ok(dest)
}

fn write_bundle(root: &Path, folder: &str, include: &[String], dest: &Path) -> Result<()> {
    let file = File::create(dest)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for rel in include {
        let abs = root.join(rel);
        let name = Path::new(folder).join(rel);
        let added = if abs.is_dir() {
            builder.append_dir_all(&name, &abs)
        } else {
            builder.append_path_with_name(&abs, &name)
        };
        added.map_err(|e| {
            SvrError::compression(format!("failed to add {} to bundle: {e}", abs.display()))
        })?;
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| SvrError::compression(format!("failed to finalize bundle: {e}")))?;
    encoder
        .finish()
        .map_err(|e| SvrError::compression(format!("failed to finish compression: {e}")))?;
    Ok(())
}

/// Extract a bundle under the configured project root.
///
/// The archive's top-level entry is the project folder name, so the actual
/// unpack target is the parent of the canonicalized root.
pub fn extract_bundle(archive: &Path, project_root: &Path) -> Result<()> {
    let (_, parent) = resolve_root(project_root)?;

    let file = File::open(archive).map_err(|e| {
        SvrError::extraction(format!("failed to open {}: {e}", archive.display()))
    })?;
    let decoder = GzDecoder::new(file);
    let mut unpacker = tar::Archive::new(decoder);
    unpacker.unpack(&parent).map_err(|e| {
        SvrError::extraction(format!(
            "failed to extract {} into {}: {e}",
            archive.display(),
            parent.display()
        ))
    })?;

    info!(archive = %archive.display(), dest = %parent.display(), "Bundle extracted");
    Ok(())
}

/// Landing spot for a downloaded bundle: `<parent-of-root>/<file_name>`.
///
/// Mirrors the builder's convention so the staged file sits next to the
/// project folder until it is extracted and removed.
pub fn staging_path(project_root: &Path, file_name: &str) -> Result<PathBuf> {
    let (_, parent) = resolve_root(project_root)?;
    Ok(parent.join(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn make_project(parent: &Path, folder: &str) -> PathBuf {
        let root = parent.join(folder);
        fs::create_dir_all(root.join("config")).unwrap();
        fs::write(root.join("secrets.env"), "A=1").unwrap();
        fs::write(root.join("config/key.pem"), "---KEY---").unwrap();
        root
    }

    #[test]
    fn test_bundle_file_name_pattern() {
        assert_eq!(bundle_file_name("foo", 1234), "foo-1234-secrets.tar.gz");
        assert_ne!(bundle_file_name("foo", 1234), bundle_file_name("foo", 1235));
    }

    #[test]
    fn test_build_writes_into_parent_with_folder_prefix() {
        let dir = TempDir::new().unwrap();
        let root = make_project(dir.path(), "app");

        let bundle = build_bundle(&root, &["secrets.env".into()]).unwrap();
        assert_eq!(bundle.parent().unwrap(), dir.path().canonicalize().unwrap());
        let name = bundle.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("app-"));
        assert!(name.ends_with("-secrets.tar.gz"));

        // The archive's entries are rooted at the project folder name.
        let decoder = GzDecoder::new(File::open(&bundle).unwrap());
        let mut archive = tar::Archive::new(decoder);
        let mut entries = Vec::new();
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            let path = entry.path().unwrap().to_string_lossy().into_owned();
            let mut content = String::new();
            entry.read_to_string(&mut content).unwrap();
            entries.push((path, content));
        }
        assert_eq!(entries, vec![("app/secrets.env".to_string(), "A=1".to_string())]);
    }

    #[test]
    fn test_build_then_extract_roundtrip() {
        let src = TempDir::new().unwrap();
        let root = make_project(src.path(), "app");
        let include = vec!["secrets.env".to_string(), "config/key.pem".to_string()];

        let bundle = build_bundle(&root, &include).unwrap();

        let dst = TempDir::new().unwrap();
        let restored_root = dst.path().join("app");
        fs::create_dir(&restored_root).unwrap();
        extract_bundle(&bundle, &restored_root).unwrap();

        assert_eq!(fs::read(restored_root.join("secrets.env")).unwrap(), b"A=1");
        assert_eq!(
            fs::read(restored_root.join("config/key.pem")).unwrap(),
            b"---KEY---"
        );
    }

    #[test]
    fn test_build_with_directory_include() {
        let src = TempDir::new().unwrap();
        let root = make_project(src.path(), "app");

        let bundle = build_bundle(&root, &["config".to_string()]).unwrap();

        let dst = TempDir::new().unwrap();
        let restored_root = dst.path().join("app");
        fs::create_dir(&restored_root).unwrap();
        extract_bundle(&bundle, &restored_root).unwrap();

        assert_eq!(
            fs::read(restored_root.join("config/key.pem")).unwrap(),
            b"---KEY---"
        );
    }

    #[test]
    fn test_missing_include_path_fails_without_output() {
        let dir = TempDir::new().unwrap();
        let root = make_project(dir.path(), "app");

        let result = build_bundle(&root, &["nope.env".into()]);
        assert!(matches!(result, Err(SvrError::Io(_))));

        // No bundle file may appear in the parent directory.
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains("secrets.tar.gz"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_absolute_include_path_is_rejected() {
        let dir = TempDir::new().unwrap();
        let root = make_project(dir.path(), "app");
        let escape = root.join("secrets.env").to_string_lossy().into_owned();

        let result = build_bundle(&root, &[escape]);
        assert!(matches!(result, Err(SvrError::ConfigInvalid(_))));
        assert!(local_bundle_count(dir.path()) == 0);
    }

    #[test]
    fn test_parent_dir_include_path_is_rejected() {
        let dir = TempDir::new().unwrap();
        let root = make_project(dir.path(), "app");
        fs::write(dir.path().join("outside.env"), "B=2").unwrap();

        let result = build_bundle(&root, &["../outside.env".into()]);
        assert!(matches!(result, Err(SvrError::ConfigInvalid(_))));
        assert!(local_bundle_count(dir.path()) == 0);
    }

    fn local_bundle_count(parent: &Path) -> usize {
        fs::read_dir(parent)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with("-secrets.tar.gz"))
            .count()
    }

    #[test]
    fn test_staging_path_sits_next_to_root() {
        let dir = TempDir::new().unwrap();
        let root = make_project(dir.path(), "app");

        let staged = staging_path(&root, "app-1-secrets.tar.gz").unwrap();
        assert_eq!(
            staged,
            dir.path().canonicalize().unwrap().join("app-1-secrets.tar.gz")
        );
    }

    #[test]
    fn test_extract_rejects_garbage_archive() {
        let dir = TempDir::new().unwrap();
        let root = make_project(dir.path(), "app");
        let bogus = dir.path().join("bogus.tar.gz");
        fs::write(&bogus, "not an archive").unwrap();

        let result = extract_bundle(&bogus, &root);
        assert!(matches!(result, Err(SvrError::Extraction(_))));
    }
}
