use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::TransferError;
use crate::types::AssembledFile;
use crate::validation::sanitize_filename;

/// Upper bound on `name (n).ext` attempts before giving up.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Writes an assembled file into `dir` and returns the path written.
///
/// The peer-supplied name is sanitized first. An existing file is never
/// overwritten: `name.ext` becomes `name (1).ext`, `name (2).ext`, ...
pub async fn write_assembled_file(
    dir: &Path,
    file: &AssembledFile,
) -> Result<PathBuf, TransferError> {
    tokio::fs::create_dir_all(dir).await?;

    let name = sanitize_filename(&file.filename);
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let path = dir.join(numbered_name(&name, attempt));
        let mut out = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        };

        out.write_all(&file.bytes).await?;
        out.flush().await?;
        tracing::info!(
            path = %path.display(),
            bytes = file.bytes.len(),
            "received file saved"
        );
        return Ok(path);
    }

    Err(TransferError::InvalidPath(format!(
        "no free name for {name} in {}",
        dir.display()
    )))
}

/// `report.pdf` -> `report (n).pdf`; attempt 0 keeps the name unchanged.
fn numbered_name(name: &str, attempt: u32) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{} ({attempt}){}", &name[..dot], &name[dot..]),
        _ => format!("{name} ({attempt})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembled(name: &str, bytes: &[u8]) -> AssembledFile {
        AssembledFile {
            filename: name.into(),
            bytes: bytes.to_vec(),
            fragments: 1,
        }
    }

    #[test]
    fn numbered_name_variants() {
        assert_eq!(numbered_name("a.txt", 0), "a.txt");
        assert_eq!(numbered_name("a.txt", 2), "a (2).txt");
        assert_eq!(numbered_name("archive.tar.gz", 1), "archive.tar (1).gz");
        assert_eq!(numbered_name("README", 1), "README (1)");
        assert_eq!(numbered_name(".env", 1), ".env (1)");
    }

    #[tokio::test]
    async fn writes_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_assembled_file(dir.path(), &assembled("hello.txt", b"hi"))
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("hello.txt"));
        assert_eq!(std::fs::read(&path).unwrap(), b"hi");
    }

    #[tokio::test]
    async fn creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("downloads/today");
        let path = write_assembled_file(&target, &assembled("x.bin", b"x"))
            .await
            .unwrap();
        assert!(path.starts_with(&target));
    }

    #[tokio::test]
    async fn never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_assembled_file(dir.path(), &assembled("a.txt", b"one"))
            .await
            .unwrap();
        let second = write_assembled_file(dir.path(), &assembled("a.txt", b"two"))
            .await
            .unwrap();
        assert_eq!(second, dir.path().join("a (1).txt"));
        assert_eq!(std::fs::read(first).unwrap(), b"one");
        assert_eq!(std::fs::read(second).unwrap(), b"two");
    }

    #[tokio::test]
    async fn traversal_stays_inside_directory() {
        let dir = tempfile::tempdir().unwrap();
        let inner = dir.path().join("inbox");
        let path = write_assembled_file(&inner, &assembled("../../escape.sh", b"#!"))
            .await
            .unwrap();
        assert_eq!(path, inner.join("escape.sh"));
    }

    #[tokio::test]
    async fn empty_name_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_assembled_file(dir.path(), &assembled("", b"data"))
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("received_file"));
    }

    #[tokio::test]
    async fn padded_parent_dir_name_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        let inner = dir.path().join("inbox");
        let path = write_assembled_file(&inner, &assembled("x/ ..", b"data"))
            .await
            .unwrap();
        assert_eq!(path, inner.join("received_file"));
        assert_eq!(std::fs::read(path).unwrap(), b"data");
    }
}
