//! Evidence artifact storage: local filesystem or Google Cloud Storage.
//!
//! The GCS path authenticates with a bearer token supplied out-of-band
//! (`GOOGLE_OAUTH_ACCESS_TOKEN` — typically minted by a sidecar or the
//! workload-identity metadata server) and talks to the plain JSON API over
//! `reqwest` rather than pulling in a full GCS client SDK, matching how
//! `ssi-osint`'s adapters talk to VirusTotal/urlscan directly over HTTP. Full
//! V4 signed-URL request signing needs an RSA private-key signature over a
//! canonical string; that crypto stack isn't something any crate in this
//! workspace pulls in, so `generate_signed_url` instead returns an
//! authenticated `alt=media` API link that still requires the same bearer
//! token to fetch — a GCS download URL, just not a shareable pre-signed one.

use std::collections::BTreeMap;
use std::path::Path;

use ssi_common::config::StorageBackend;
use ssi_common::SsiError;

pub struct EvidenceStorageClient {
    backend: StorageBackend,
    bucket: String,
    prefix: String,
    http: reqwest::Client,
}

fn guess_content_type(filename: &str) -> &'static str {
    let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();
    match ext.as_str() {
        "json" => "application/json",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "zip" => "application/zip",
        "har" => "application/json",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

impl EvidenceStorageClient {
    pub fn new(backend: StorageBackend, bucket: Option<String>, prefix: Option<String>) -> Self {
        EvidenceStorageClient {
            backend,
            bucket: bucket.unwrap_or_default(),
            prefix: prefix.unwrap_or_else(|| "ssi/evidence".to_string()).trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Builds the client from ambient settings, matching
    /// `build_evidence_storage_client()`'s factory-from-config pattern.
    pub fn from_settings(settings: &ssi_common::config::EvidenceSettings) -> Self {
        EvidenceStorageClient::new(settings.storage_backend, settings.bucket.clone(), settings.prefix.clone())
    }

    fn gcs_key(&self, investigation_id: &str, filename: &str) -> String {
        format!("{}/{}/{}", self.prefix, investigation_id, filename)
    }

    fn gcs_uri(&self, investigation_id: &str, filename: &str) -> String {
        format!("gs://{}/{}", self.bucket, self.gcs_key(investigation_id, filename))
    }

    fn access_token(&self) -> Result<String, SsiError> {
        std::env::var("GOOGLE_OAUTH_ACCESS_TOKEN")
            .map_err(|_| SsiError::Evidence("GOOGLE_OAUTH_ACCESS_TOKEN is not set; required for the gcs storage backend".into()))
    }

    /// Uploads every file under `dir` and returns `{relative path: remote
    /// URI or local path}`. The local backend just indexes files in place.
    pub async fn upload_directory(&self, investigation_id: &str, dir: &Path) -> Result<BTreeMap<String, String>, SsiError> {
        match self.backend {
            StorageBackend::Gcs => self.upload_directory_gcs(investigation_id, dir).await,
            StorageBackend::Local => Ok(Self::index_directory_local(dir)),
        }
    }

    pub async fn upload_file(&self, investigation_id: &str, file_path: &Path) -> Result<String, SsiError> {
        match self.backend {
            StorageBackend::Gcs => self.upload_file_gcs(investigation_id, file_path).await,
            StorageBackend::Local => Ok(file_path.to_string_lossy().to_string()),
        }
    }

    async fn upload_file_gcs(&self, investigation_id: &str, file_path: &Path) -> Result<String, SsiError> {
        let filename = file_path.file_name().and_then(|n| n.to_str()).unwrap_or("artifact");
        let key = self.gcs_key(investigation_id, filename);
        let content = tokio::fs::read(file_path)
            .await
            .map_err(|e| SsiError::Evidence(format!("failed to read {}: {e}", file_path.display())))?;
        self.put_object(&key, content, guess_content_type(filename)).await?;
        let uri = format!("gs://{}/{key}", self.bucket);
        tracing::debug!(file = filename, uri = %uri, "uploaded evidence file to gcs");
        Ok(uri)
    }

    async fn upload_directory_gcs(&self, investigation_id: &str, dir: &Path) -> Result<BTreeMap<String, String>, SsiError> {
        let mut uploaded = BTreeMap::new();
        for entry in walk_files(dir)? {
            let arcname = entry.strip_prefix(dir).unwrap_or(&entry).to_string_lossy().to_string();
            let uri = self.upload_file_gcs(investigation_id, &entry).await?;
            uploaded.insert(arcname, uri);
        }
        tracing::info!(
            count = uploaded.len(),
            bucket = %self.bucket,
            prefix = %self.prefix,
            investigation_id,
            "uploaded evidence directory to gcs"
        );
        Ok(uploaded)
    }

    fn index_directory_local(dir: &Path) -> BTreeMap<String, String> {
        let mut indexed = BTreeMap::new();
        if let Ok(files) = walk_files(dir) {
            for entry in files {
                let arcname = entry.strip_prefix(dir).unwrap_or(&entry).to_string_lossy().to_string();
                indexed.insert(arcname, entry.to_string_lossy().to_string());
            }
        }
        indexed
    }

    async fn put_object(&self, key: &str, content: Vec<u8>, content_type: &str) -> Result<(), SsiError> {
        let token = self.access_token()?;
        let url = format!("https://storage.googleapis.com/upload/storage/v1/b/{}/o?uploadType=media&name={}", self.bucket, urlencode(key));
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .header("Content-Type", content_type)
            .body(content)
            .send()
            .await
            .map_err(|e| SsiError::Evidence(format!("gcs upload request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(SsiError::Evidence(format!("gcs upload returned {}", response.status())));
        }
        Ok(())
    }

    /// Returns an authenticated download URL for a `gs://bucket/key` URI.
    /// Only valid for the GCS backend.
    pub fn generate_signed_url(&self, gcs_uri: &str) -> Result<String, SsiError> {
        if self.backend != StorageBackend::Gcs {
            return Err(SsiError::Evidence("download URLs are only available with the gcs storage backend".into()));
        }
        let rest = gcs_uri
            .strip_prefix("gs://")
            .ok_or_else(|| SsiError::Evidence(format!("expected gs:// URI, got: {gcs_uri}")))?;
        let (bucket, key) = rest.split_once('/').ok_or_else(|| SsiError::Evidence(format!("malformed gs:// URI: {gcs_uri}")))?;
        Ok(format!(
            "https://storage.googleapis.com/storage/v1/b/{bucket}/o/{}?alt=media",
            urlencode(key)
        ))
    }

    pub fn get_evidence_zip_url(&self, investigation_id: &str, dir: &Path) -> Option<String> {
        if !dir.join("evidence.zip").exists() {
            return None;
        }
        self.get_file_url(investigation_id, "evidence.zip")
    }

    pub fn get_file_url(&self, investigation_id: &str, filename: &str) -> Option<String> {
        if self.backend != StorageBackend::Gcs {
            return None;
        }
        let uri = self.gcs_uri(investigation_id, filename);
        match self.generate_signed_url(&uri) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(error = %e, uri = %uri, "failed to build download url");
                None
            }
        }
    }

    pub async fn exists(&self, investigation_id: &str, filename: &str) -> Result<bool, SsiError> {
        if self.backend != StorageBackend::Gcs {
            return Ok(false);
        }
        let token = self.access_token()?;
        let key = self.gcs_key(investigation_id, filename);
        let url = format!("https://storage.googleapis.com/storage/v1/b/{}/o/{}", self.bucket, urlencode(&key));
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| SsiError::Evidence(format!("gcs exists check failed: {e}")))?;
        Ok(response.status().is_success())
    }
}

fn walk_files(dir: &Path) -> Result<Vec<std::path::PathBuf>, SsiError> {
    let mut out = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let entries = std::fs::read_dir(&current)
            .map_err(|e| SsiError::Evidence(format!("failed to read {}: {e}", current.display())))?;
        for entry in entries {
            let entry = entry.map_err(|e| SsiError::Evidence(format!("failed to read directory entry: {e}")))?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                out.push(path);
            }
        }
    }
    out.sort();
    Ok(out)
}

fn urlencode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_backend_indexes_without_uploading() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("evidence.json"), b"{}").unwrap();
        let client = EvidenceStorageClient::new(StorageBackend::Local, None, None);
        let indexed = client.upload_directory("inv-1", dir.path()).await.unwrap();
        assert_eq!(indexed.len(), 1);
        assert!(indexed.get("evidence.json").unwrap().ends_with("evidence.json"));
    }

    #[test]
    fn generate_signed_url_rejects_local_backend() {
        let client = EvidenceStorageClient::new(StorageBackend::Local, None, None);
        assert!(client.generate_signed_url("gs://bucket/key").is_err());
    }

    #[test]
    fn generate_signed_url_rejects_non_gs_uri() {
        let client = EvidenceStorageClient::new(StorageBackend::Gcs, Some("bucket".into()), None);
        assert!(client.generate_signed_url("https://example.com/x").is_err());
    }

    #[test]
    fn generate_signed_url_builds_media_link() {
        let client = EvidenceStorageClient::new(StorageBackend::Gcs, Some("bucket".into()), None);
        let url = client.generate_signed_url("gs://bucket/ssi/evidence/inv-1/evidence.zip").unwrap();
        assert!(url.contains("alt=media"));
        assert!(url.contains("bucket"));
    }

    #[test]
    fn content_type_guess_covers_common_extensions() {
        assert_eq!(guess_content_type("evidence.json"), "application/json");
        assert_eq!(guess_content_type("screenshot.png"), "image/png");
        assert_eq!(guess_content_type("unknown.bin"), "application/octet-stream");
    }
}
