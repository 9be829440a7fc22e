//! Screenshot capture and on-disk layout for a single site run. Grounded on
//! the controller's `ScreenshotStore` — milestone/error/stuck captures land
//! under `output_dir/run_id/site_id/`.

use base64::Engine;
use std::path::{Path, PathBuf};

pub struct ScreenshotStore {
    dir: PathBuf,
    pub paths: Vec<String>,
}

impl ScreenshotStore {
    pub fn new(output_dir: &Path, site_id: &str, run_id: &str) -> Self {
        ScreenshotStore {
            dir: output_dir.join(run_id).join(site_id),
            paths: Vec::new(),
        }
    }

    async fn save(&mut self, screenshot_b64: &str, filename: &str) -> Option<String> {
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            tracing::warn!(error = %e, "failed to create screenshot directory");
            return None;
        }
        let bytes = match base64::engine::general_purpose::STANDARD.decode(screenshot_b64) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, "failed to decode screenshot base64");
                return None;
            }
        };
        let path = self.dir.join(filename);
        if let Err(e) = tokio::fs::write(&path, bytes).await {
            tracing::warn!(error = %e, path = %path.display(), "failed to write screenshot");
            return None;
        }
        let rel = path.to_string_lossy().to_string();
        self.paths.push(rel.clone());
        Some(rel)
    }

    pub async fn capture_milestone(&mut self, screenshot_b64: &str, label: &str) -> Option<String> {
        self.save(screenshot_b64, &format!("milestone_{label}.png")).await
    }

    pub async fn capture_error(&mut self, screenshot_b64: &str) -> Option<String> {
        self.save(screenshot_b64, "error.png").await
    }

    pub async fn capture_stuck(&mut self, screenshot_b64: &str) -> Option<String> {
        self.save(screenshot_b64, &format!("stuck_{}.png", chrono::Utc::now().timestamp_millis())).await
    }
}
