//! MD5 digests of local files

use md5::{Digest, Md5};
use std::path::Path;
use tokio::io::AsyncReadExt;
use vocp_types::{Checksum, Error, Result};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Digest of an in-memory buffer
pub fn md5_bytes(data: &[u8]) -> Checksum {
    to_checksum(&Md5::digest(data))
}

fn to_checksum(digest: &[u8]) -> Checksum {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(digest);
    Checksum::new(bytes)
}

/// Stream a file through MD5
pub async fn md5_file(path: &Path) -> Result<Checksum> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| Error::from_io(&e, path.display().to_string()))?;

    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let read = file
            .read(&mut buffer)
            .await
            .map_err(|e| Error::from_io(&e, path.display().to_string()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(to_checksum(&hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_md5_bytes() {
        assert_eq!(md5_bytes(b"").to_string(), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(
            md5_bytes(b"hello").to_string(),
            "5d41402abc4b2a76b9719d911017c592"
        );
    }

    #[tokio::test]
    async fn test_md5_file_matches_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.bin");
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        tokio::fs::write(&path, &data).await.unwrap();

        assert_eq!(md5_file(&path).await.unwrap(), md5_bytes(&data));
    }

    #[tokio::test]
    async fn test_md5_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = md5_file(&temp_dir.path().join("absent")).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }
}
