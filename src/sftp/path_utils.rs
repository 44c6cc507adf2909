//! Path checks for SFTP downloads
//!
//! Remote SFTP paths always use `/` (per SFTP protocol), local paths use the
//! platform separators.

use std::path::{Path, PathBuf};

use super::error::SftpError;

/// Final `/`-separated segment of a remote path, if it is non-empty
pub fn remote_file_name(path: &str) -> Option<&str> {
    path.rsplit('/').next().filter(|name| !name.is_empty())
}

/// Final segment of a local path, if it names a file.
///
/// `Path::file_name` ignores a trailing separator (`/tmp/` yields `tmp`), so
/// the raw string is checked first.
pub fn local_file_name(path: &Path) -> Option<&str> {
    let raw = path.to_str()?;
    if raw.is_empty() || raw.ends_with('/') || (cfg!(windows) && raw.ends_with('\\')) {
        return None;
    }
    path.file_name().and_then(|name| name.to_str())
}

/// Reject remote or local paths that do not name a file
pub fn validate_file_paths(remote_path: &str, local_path: &Path) -> Result<(), SftpError> {
    if remote_file_name(remote_path).is_none() {
        return Err(SftpError::InvalidPath(format!(
            "remote path must name a file: {:?}",
            remote_path
        )));
    }
    if local_file_name(local_path).is_none() {
        return Err(SftpError::InvalidPath(format!(
            "local path must name a file: {:?}",
            local_path
        )));
    }
    Ok(())
}

/// Directory that will hold `local_path`; `.` for bare file names
pub fn local_parent_dir(local_path: &Path) -> PathBuf {
    match local_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_file_name() {
        assert_eq!(remote_file_name("/data/report.csv"), Some("report.csv"));
        assert_eq!(remote_file_name("report.csv"), Some("report.csv"));
        assert_eq!(remote_file_name("/a/"), None);
        assert_eq!(remote_file_name("/"), None);
        assert_eq!(remote_file_name(""), None);
    }

    #[test]
    fn test_local_file_name() {
        assert_eq!(local_file_name(Path::new("/tmp/x")), Some("x"));
        assert_eq!(local_file_name(Path::new("out/report.csv")), Some("report.csv"));
        assert_eq!(local_file_name(Path::new("/tmp/")), None);
        assert_eq!(local_file_name(Path::new("")), None);
        assert_eq!(local_file_name(Path::new("..")), None);
    }

    #[test]
    fn test_validate_file_paths() {
        assert!(validate_file_paths("/a/b", Path::new("/tmp/x")).is_ok());
        assert!(matches!(
            validate_file_paths("/a/", Path::new("/tmp/x")),
            Err(SftpError::InvalidPath(_))
        ));
        assert!(matches!(
            validate_file_paths("/a/b", Path::new("/tmp/")),
            Err(SftpError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_local_parent_dir() {
        assert_eq!(local_parent_dir(Path::new("report.csv")), PathBuf::from("."));
        assert_eq!(local_parent_dir(Path::new("./out/report.csv")), PathBuf::from("./out"));
        assert_eq!(local_parent_dir(Path::new("/var/data/r.csv")), PathBuf::from("/var/data"));
    }
}
