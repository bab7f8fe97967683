//! Upload intake: store the uploaded PDF and sanity-check its bytes.
//!
//! Uploads land in the configured upload directory under the name the
//! browser sent. Two uploads with the same filename overwrite each other;
//! only the final path component is kept so a name like `../../etc/passwd`
//! stays inside the directory.

use crate::error::GraderError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolve the on-disk path for a client-supplied filename.
///
/// Returns `None` when the name has no usable final component
/// (empty, `.`, `..`, or a bare directory separator).
pub fn upload_path(upload_dir: &Path, client_filename: &str) -> Option<PathBuf> {
    // Browsers on Windows may send `C:\Users\…\scan.pdf`.
    let normalised = client_filename.replace('\\', "/");
    let name = Path::new(&normalised).file_name()?;
    Some(upload_dir.join(name))
}

/// Write the uploaded bytes to `{upload_dir}/{client_filename}`.
pub async fn save_upload(
    upload_dir: &Path,
    client_filename: &str,
    bytes: &[u8],
) -> Result<PathBuf, GraderError> {
    let path = upload_path(upload_dir, client_filename).ok_or_else(|| {
        GraderError::UploadWriteFailed {
            path: upload_dir.join(client_filename),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty filename"),
        }
    })?;

    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| GraderError::UploadWriteFailed {
            path: upload_dir.to_path_buf(),
            source: e,
        })?;

    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| GraderError::UploadWriteFailed {
            path: path.clone(),
            source: e,
        })?;

    debug!("Saved upload ({} bytes) to {}", bytes.len(), path.display());
    Ok(path)
}

/// Verify the `%PDF` magic bytes so callers get a meaningful error rather
/// than an opaque pdfium failure.
pub fn check_pdf_magic(bytes: &[u8]) -> Result<(), GraderError> {
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        return Err(GraderError::NotAPdf {
            magic: bytes.iter().take(4).copied().collect(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_path_keeps_only_file_name() {
        let dir = Path::new("static/uploads");
        assert_eq!(
            upload_path(dir, "scan.pdf"),
            Some(PathBuf::from("static/uploads/scan.pdf"))
        );
        assert_eq!(
            upload_path(dir, "../../etc/passwd"),
            Some(PathBuf::from("static/uploads/passwd"))
        );
        assert_eq!(
            upload_path(dir, r"C:\Users\ada\scan 1.pdf"),
            Some(PathBuf::from("static/uploads/scan 1.pdf"))
        );
        assert_eq!(upload_path(dir, ""), None);
        assert_eq!(upload_path(dir, ".."), None);
    }

    #[test]
    fn pdf_magic() {
        assert!(check_pdf_magic(b"%PDF-1.7\n...").is_ok());
        assert!(matches!(
            check_pdf_magic(b"PK\x03\x04zip"),
            Err(GraderError::NotAPdf { .. })
        ));
        assert!(check_pdf_magic(b"%P").is_err());
    }

    #[tokio::test]
    async fn save_upload_creates_directory_and_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("uploads");

        let first = save_upload(&dir, "sheet.pdf", b"%PDF-first").await.unwrap();
        assert_eq!(std::fs::read(&first).unwrap(), b"%PDF-first");

        let second = save_upload(&dir, "sheet.pdf", b"%PDF-second").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read(&second).unwrap(), b"%PDF-second");
    }

    #[tokio::test]
    async fn save_upload_rejects_empty_name() {
        let tmp = tempfile::tempdir().unwrap();
        let err = save_upload(tmp.path(), "", b"%PDF").await.unwrap_err();
        assert!(matches!(err, GraderError::UploadWriteFailed { .. }));
    }
}
