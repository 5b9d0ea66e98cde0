//! Uploaded-bundle extraction and layout lookup.
//!
//! The file and directory structure inside an uploaded zip:
//!
//! ```not_rust
//! projectfolder/
//! |
//! +-- metadata.xml
//! |
//! +-- data/
//!    |
//!    +-- tridas.xml
//!    |
//!    +-- associated/
//!    |  |
//!    |  +-- project.pdf
//!    |
//!    +-- values/
//!       |
//!       +-- heidelberg.fh
//! ```
//!
//! The archive is unpacked into a scoped temporary directory which is
//! removed (best effort) when the [`tempfile::TempDir`] guard drops,
//! whatever the import outcome.

use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use thiserror::Error;
use tracing::warn;

/// Errors while unpacking or navigating a bundle.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("failed to unzip deposited file: {message}")]
    Zip { message: String },

    #[error("uploaded archive contains no project folder")]
    NoProjectFolder,

    #[error("no '{name}' folder found in {folder}")]
    NoDataFolder { name: String, folder: String },

    #[error("bundle file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Creates the scoped temporary directory an upload is unpacked into.
pub fn create_temp_dir(prefix: &str) -> Result<TempDir, BundleError> {
    Ok(tempfile::Builder::new().prefix(prefix).tempdir()?)
}

/// Unpacks a zip stream below `target`, refusing entries that would
/// escape it. Returns the paths written.
pub fn unzip<R: Read + Seek>(reader: R, target: &Path) -> Result<Vec<PathBuf>, BundleError> {
    let mut archive = zip::ZipArchive::new(reader).map_err(zip_error)?;
    let mut written = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(zip_error)?;
        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            warn!(name = entry.name(), "skipping zip entry with unsafe path");
            continue;
        };
        let path = target.join(relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&path)?;
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut out = std::fs::File::create(&path)?;
            std::io::copy(&mut entry, &mut out)?;
        }
        written.push(path);
    }
    Ok(written)
}

fn zip_error(e: zip::result::ZipError) -> BundleError {
    BundleError::Zip {
        message: e.to_string(),
    }
}

/// The bundle's root folder: the single directory at the top of the
/// extraction target.
pub fn bundle_root(target: &Path) -> Result<PathBuf, BundleError> {
    folders(target)?
        .into_iter()
        .next()
        .ok_or(BundleError::NoProjectFolder)
}

/// Finds the bundle's data folder by its configured name.
pub fn data_folder(root: &Path, name: &str) -> Result<PathBuf, BundleError> {
    folders(root)?
        .into_iter()
        .find(|f| f.file_name().map(|n| n == name).unwrap_or(false))
        .ok_or_else(|| BundleError::NoDataFolder {
            name: name.to_string(),
            folder: root.display().to_string(),
        })
}

/// The bundle metadata file: the first XML file in the bundle root.
pub fn metadata_file(root: &Path) -> Result<Option<PathBuf>, std::io::Error> {
    Ok(xml_files(root)?.into_iter().next())
}

/// Subdirectories of `dir`, sorted by name.
pub fn folders(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut result = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            result.push(path);
        }
    }
    result.sort();
    Ok(result)
}

/// Files in `dir` with the `.xml` extension, sorted by name.
pub fn xml_files(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    files_with_extension(dir, "xml")
}

/// Files in `dir` whose extension matches case-insensitively, sorted.
pub fn files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut result = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path.is_file()
            && path
                .extension()
                .map(|e| e.to_string_lossy().eq_ignore_ascii_case(extension))
                .unwrap_or(false);
        if matches {
            result.push(path);
        }
    }
    result.sort();
    Ok(result)
}

/// Finds a file with the given name in `dir`, case-insensitively.
pub fn find_file_no_case(dir: &Path, file_name: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        let matches = path.is_file()
            && path
                .file_name()
                .map(|n| n.to_string_lossy().eq_ignore_ascii_case(file_name))
                .unwrap_or(false);
        if matches {
            return Some(path);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buffer = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            let options = zip::write::FileOptions::default();
            for (name, content) in entries {
                if name.ends_with('/') {
                    writer.add_directory(name.trim_end_matches('/'), options).unwrap();
                } else {
                    writer.start_file(*name, options).unwrap();
                    writer.write_all(content).unwrap();
                }
            }
            writer.finish().unwrap();
        }
        buffer.into_inner()
    }

    #[test]
    fn test_unzip_and_navigate_bundle_layout() {
        let bytes = write_zip(&[
            ("proj/metadata.xml", b"<dccdmetadata/>".as_slice()),
            ("proj/data/tridas.xml", b"<project/>".as_slice()),
            ("proj/data/values/beam1.fh", b"HEADER:".as_slice()),
        ]);
        let temp = create_temp_dir("dccd-test-unzip").unwrap();
        unzip(std::io::Cursor::new(bytes), temp.path()).unwrap();

        let root = bundle_root(temp.path()).unwrap();
        assert_eq!(root.file_name().unwrap(), "proj");

        let data = data_folder(&root, "data").unwrap();
        assert_eq!(xml_files(&data).unwrap().len(), 1);
        assert!(metadata_file(&root).unwrap().is_some());
        assert_eq!(folders(&data).unwrap().len(), 1);
    }

    #[test]
    fn test_bundle_root_requires_a_folder() {
        let temp = create_temp_dir("dccd-test-empty").unwrap();
        assert!(matches!(
            bundle_root(temp.path()),
            Err(BundleError::NoProjectFolder)
        ));
    }

    #[test]
    fn test_find_file_no_case() {
        let temp = create_temp_dir("dccd-test-case").unwrap();
        std::fs::write(temp.path().join("Beam1.FH"), b"x").unwrap();

        let found = find_file_no_case(temp.path(), "beam1.fh").unwrap();
        assert_eq!(found.file_name().unwrap(), "Beam1.FH");
        assert!(find_file_no_case(temp.path(), "other.fh").is_none());
    }

    #[test]
    fn test_unzip_skips_escaping_entries() {
        let bytes = write_zip(&[("../evil.txt", b"x".as_slice())]);
        let temp = create_temp_dir("dccd-test-escape").unwrap();
        unzip(std::io::Cursor::new(bytes), temp.path()).unwrap();
        assert!(!temp.path().parent().unwrap().join("evil.txt").exists());
    }
}
