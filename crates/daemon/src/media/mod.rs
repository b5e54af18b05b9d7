pub mod ffmpeg;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, BufReader};

/// `<export_dir>/project-<id>/export-<id>.<ext>`
pub fn export_path(export_dir: &Path, project_id: i64, export_id: i64, extension: &str) -> PathBuf {
    export_dir
        .join(format!("project-{}", project_id))
        .join(format!("export-{}.{}", export_id, extension))
}

pub fn checksum_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub async fn compute_file_checksum(file_path: &Path) -> Result<String> {
    let file = File::open(file_path)
        .await
        .with_context(|| format!("Failed to open {} for hashing", file_path.display()))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 64 * 1024];

    loop {
        let n = reader.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Write a text export (EDL, bible JSON) and return its checksum.
pub async fn write_text_export(path: &Path, contents: &str) -> Result<String> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("Failed to write export {}", path.display()))?;
    Ok(checksum_bytes(contents.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_paths_are_grouped_by_project() {
        let path = export_path(Path::new("/exports"), 3, 17, "edl");
        assert_eq!(path, PathBuf::from("/exports/project-3/export-17.edl"));
    }

    #[tokio::test]
    async fn written_exports_hash_like_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = export_path(dir.path(), 1, 1, "edl");

        let checksum = write_text_export(&path, "TITLE: X\n").await.unwrap();
        assert_eq!(checksum, compute_file_checksum(&path).await.unwrap());
        assert_eq!(
            checksum_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
