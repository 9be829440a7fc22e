//! Evidence archive assembly: bundles the investigation record, STIX export,
//! a per-artifact manifest, chain-of-custody documentation, and every
//! collected artifact into a single ZIP, verifies the archive's CRC-32
//! integrity by re-reading it, then hashes the finished archive for the
//! custody record.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use sha2::{Digest, Sha256};
use ssi_common::{ChainOfCustody, CustodyArtifact, Investigation, SsiError};
use zip::write::FileOptions;
use zip::ZipWriter;

use crate::stix::{custody_to_text, investigation_to_stix_bundle};

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn sha256_file(path: &Path) -> Result<String, SsiError> {
    let mut file = File::open(path).map_err(|e| SsiError::Evidence(format!("failed to open {}: {e}", path.display())))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = file.read(&mut buffer).map_err(|e| SsiError::Evidence(format!("failed to read {}: {e}", path.display())))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex_encode(&hasher.finalize()))
}

fn readme_document(investigation: &Investigation) -> String {
    format!(
        "SSI Evidence Package\n\
         =====================\n\n\
         This archive contains the automated investigation record for a suspected\n\
         scam site, along with STIX indicators and chain-of-custody documentation.\n\n\
         Investigation ID: {}\n\
         Target URL: {}\n\
         Collected: {}\n\n\
         Contents:\n\
         - investigation.json: Full investigation record\n\
         - stix_bundle.json: STIX 2.1 indicator bundle for TIP import\n\
         - manifest.json: Per-artifact SHA-256 manifest\n\
         - chain_of_custody.txt: Chain-of-custody documentation\n\
         - artifacts/: Screenshots, HAR files, and downloaded files collected during the investigation\n\n\
         Integrity Verification:\n\
         1. Extract investigation.json\n\
         2. Compute its SHA-256 hash\n\
         3. Compare against the corresponding entry in chain_of_custody.txt\n\n\
         This evidence was collected by an automated tool. Verify hashes before\n\
         relying on this evidence in any proceeding.\n",
        investigation.id, investigation.url, investigation.started_at.to_rfc3339()
    )
}

/// Packages an investigation's output directory into `evidence.zip` at its
/// root, returning the finished [`ChainOfCustody`] record (including the
/// package's own SHA-256).
pub fn package_investigation(investigation: &mut Investigation, output_dir: &Path) -> Result<ChainOfCustody, SsiError> {
    std::fs::create_dir_all(output_dir).map_err(|e| SsiError::Evidence(format!("failed to create {}: {e}", output_dir.display())))?;

    let mut custody = ChainOfCustody::new(investigation.id, investigation.url.clone());

    let zip_path = output_dir.join("evidence.zip");
    let file = File::create(&zip_path).map_err(|e| SsiError::Evidence(format!("failed to create {}: {e}", zip_path.display())))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let investigation_json =
        serde_json::to_string_pretty(&*investigation).map_err(|e| SsiError::Evidence(format!("failed to serialise investigation: {e}")))?;
    write_and_record(&mut zip, options, "investigation.json", investigation_json.as_bytes(), &mut custody)?;

    let stix_bundle = investigation_to_stix_bundle(investigation);
    let stix_json =
        serde_json::to_string_pretty(&stix_bundle).map_err(|e| SsiError::Evidence(format!("failed to serialise stix bundle: {e}")))?;
    write_and_record(&mut zip, options, "stix_bundle.json", stix_json.as_bytes(), &mut custody)?;

    let readme = readme_document(investigation);
    write_and_record(&mut zip, options, "README.txt", readme.as_bytes(), &mut custody)?;

    for artifact_path in collect_artifacts(investigation, output_dir) {
        let Ok(bytes) = std::fs::read(&artifact_path) else {
            tracing::warn!(path = %artifact_path.display(), "skipping missing evidence artifact");
            continue;
        };
        let arcname = format!("artifacts/{}", artifact_path.file_name().and_then(|n| n.to_str()).unwrap_or("artifact"));
        write_and_record(&mut zip, options, &arcname, &bytes, &mut custody)?;
    }

    // The manifest mirrors the custody record's artifact list so a recipient
    // can verify hashes without parsing chain_of_custody.txt's prose; it is
    // written directly (not through write_and_record) since recording it
    // would require describing its own content.
    let manifest_artifacts: Vec<_> = custody
        .artifacts
        .iter()
        .map(|a| serde_json::json!({"file": a.file_name, "size_bytes": a.size_bytes, "sha256": a.sha256, "description": a.description}))
        .collect();
    let manifest_json = serde_json::to_string_pretty(&serde_json::json!({ "artifacts": manifest_artifacts }))
        .map_err(|e| SsiError::Evidence(format!("failed to serialise manifest: {e}")))?;
    zip.start_file("manifest.json", options)
        .map_err(|e| SsiError::Evidence(format!("failed to start manifest.json: {e}")))?;
    zip.write_all(manifest_json.as_bytes())
        .map_err(|e| SsiError::Evidence(format!("failed to write manifest.json: {e}")))?;

    // The chain-of-custody document is written last since it describes the
    // other entries; it isn't itself hash-recorded to avoid a circular
    // dependency on its own content.
    let custody_text = custody_to_text(&custody);
    zip.start_file("chain_of_custody.txt", options)
        .map_err(|e| SsiError::Evidence(format!("failed to start chain_of_custody.txt: {e}")))?;
    zip.write_all(custody_text.as_bytes())
        .map_err(|e| SsiError::Evidence(format!("failed to write chain_of_custody.txt: {e}")))?;

    zip.finish().map_err(|e| SsiError::Evidence(format!("failed to finalise evidence.zip: {e}")))?;

    verify_zip_integrity(&zip_path)?;

    let package_hash = sha256_file(&zip_path)?;
    custody.package_sha256 = Some(package_hash);
    investigation.evidence_zip_path = Some(zip_path.to_string_lossy().to_string());
    investigation.chain_of_custody = Some(custody.clone());

    tracing::info!(
        investigation_id = %investigation.id,
        artifacts = custody.artifact_count,
        total_bytes = custody.total_bytes,
        "packaged evidence archive"
    );

    Ok(custody)
}

/// Re-opens a just-written ZIP and decompresses every entry, forcing the
/// `zip` crate's CRC-32 check on read so a truncated or corrupted archive is
/// caught before it is handed off as evidence.
fn verify_zip_integrity(zip_path: &Path) -> Result<(), SsiError> {
    let file = File::open(zip_path).map_err(|e| SsiError::Evidence(format!("failed to reopen {} for verification: {e}", zip_path.display())))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| SsiError::Evidence(format!("failed to read {} as zip: {e}", zip_path.display())))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| SsiError::Evidence(format!("corrupt entry at index {i} in {}: {e}", zip_path.display())))?;
        let name = entry.name().to_string();
        let mut sink = std::io::sink();
        std::io::copy(&mut entry, &mut sink).map_err(|e| SsiError::Evidence(format!("CRC check failed for {name} in {}: {e}", zip_path.display())))?;
    }

    Ok(())
}

/// Finished law-enforcement package: a zip-of-zips plus its own hash.
pub struct LeaBundle {
    pub zip_path: std::path::PathBuf,
    pub sha256: String,
}

/// Streams together whatever of the PDF report, LEO markdown, STIX bundle,
/// evidence ZIP, and wallet manifest exist under `output_dir` into a second,
/// on-demand archive for law-enforcement handoff, plus a
/// `chain_of_custody.json` recording the evidence ZIP's hash and a legal
/// notice. Report rendering (the PDF/Markdown) is produced by a collaborator
/// outside this crate, so those two files are optional best-effort
/// inclusions rather than required inputs.
///
/// Returns `SsiError::Evidence` if none of the expected source files exist.
pub fn package_lea_bundle(investigation_id: uuid::Uuid, output_dir: &Path) -> Result<LeaBundle, SsiError> {
    let evidence_zip = output_dir.join("evidence.zip");
    let report_pdf = output_dir.join("report.pdf");
    let leo_report = output_dir.join("leo_report.md");
    let wallet_manifest = output_dir.join("wallet_manifest.json");

    let stix_bundle = if evidence_zip.exists() { extract_zip_entry(&evidence_zip, "stix_bundle.json").ok() } else { None };

    if !evidence_zip.exists() && !report_pdf.exists() && !leo_report.exists() && !wallet_manifest.exists() && stix_bundle.is_none() {
        return Err(SsiError::Evidence(format!("no LEA package source files exist for investigation {investigation_id}")));
    }

    let lea_path = output_dir.join("lea_package.zip");
    let file = File::create(&lea_path).map_err(|e| SsiError::Evidence(format!("failed to create {}: {e}", lea_path.display())))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut included = Vec::new();
    for (path, arcname) in [(&report_pdf, "report.pdf"), (&leo_report, "leo_report.md"), (&evidence_zip, "evidence.zip"), (&wallet_manifest, "wallet_manifest.json")] {
        if !path.exists() {
            continue;
        }
        let bytes = std::fs::read(path).map_err(|e| SsiError::Evidence(format!("failed to read {}: {e}", path.display())))?;
        zip.start_file(arcname, options).map_err(|e| SsiError::Evidence(format!("failed to start {arcname}: {e}")))?;
        zip.write_all(&bytes).map_err(|e| SsiError::Evidence(format!("failed to write {arcname}: {e}")))?;
        included.push(arcname.to_string());
    }
    if let Some(bytes) = &stix_bundle {
        zip.start_file("stix_bundle.json", options).map_err(|e| SsiError::Evidence(format!("failed to start stix_bundle.json: {e}")))?;
        zip.write_all(bytes).map_err(|e| SsiError::Evidence(format!("failed to write stix_bundle.json: {e}")))?;
        included.push("stix_bundle.json".to_string());
    }

    let evidence_sha256 = if evidence_zip.exists() { Some(sha256_file(&evidence_zip)?) } else { None };
    let custody = serde_json::json!({
        "investigation_id": investigation_id,
        "evidence_zip_sha256": evidence_sha256,
        "included_files": included,
        "legal_notice": "Collected by an automated tool; chain of custody documented herein. \
                         Verify hashes before relying on this evidence in proceedings.",
    });
    let custody_json = serde_json::to_string_pretty(&custody).map_err(|e| SsiError::Evidence(format!("failed to serialise chain_of_custody.json: {e}")))?;
    zip.start_file("chain_of_custody.json", options)
        .map_err(|e| SsiError::Evidence(format!("failed to start chain_of_custody.json: {e}")))?;
    zip.write_all(custody_json.as_bytes())
        .map_err(|e| SsiError::Evidence(format!("failed to write chain_of_custody.json: {e}")))?;

    zip.finish().map_err(|e| SsiError::Evidence(format!("failed to finalise lea_package.zip: {e}")))?;
    verify_zip_integrity(&lea_path)?;

    let package_sha256 = sha256_file(&lea_path)?;
    tracing::info!(investigation_id = %investigation_id, included = included.len(), "packaged lea bundle");
    Ok(LeaBundle { zip_path: lea_path, sha256: package_sha256 })
}

/// Reads a single named entry out of an existing zip without extracting the
/// rest of the archive.
fn extract_zip_entry(zip_path: &Path, name: &str) -> Result<Vec<u8>, SsiError> {
    let file = File::open(zip_path).map_err(|e| SsiError::Evidence(format!("failed to open {}: {e}", zip_path.display())))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| SsiError::Evidence(format!("failed to read {} as zip: {e}", zip_path.display())))?;
    let mut entry = archive.by_name(name).map_err(|e| SsiError::Evidence(format!("{name} not found in {}: {e}", zip_path.display())))?;
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).map_err(|e| SsiError::Evidence(format!("failed to read {name} from {}: {e}", zip_path.display())))?;
    Ok(bytes)
}

fn write_and_record<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    options: FileOptions,
    name: &str,
    content: &[u8],
    custody: &mut ChainOfCustody,
) -> Result<(), SsiError> {
    zip.start_file(name, options).map_err(|e| SsiError::Evidence(format!("failed to start {name}: {e}")))?;
    zip.write_all(content).map_err(|e| SsiError::Evidence(format!("failed to write {name}: {e}")))?;

    custody.artifacts.push(CustodyArtifact {
        file_name: name.to_string(),
        size_bytes: content.len() as u64,
        sha256: sha256_hex(content),
        description: describe_artifact(name),
    });
    custody.artifact_count += 1;
    custody.total_bytes += content.len() as u64;
    Ok(())
}

fn describe_artifact(name: &str) -> String {
    if name == "investigation.json" {
        "Full investigation record".to_string()
    } else if name == "stix_bundle.json" {
        "STIX 2.1 indicator bundle".to_string()
    } else if name == "README.txt" {
        "Package instructions".to_string()
    } else if let Some(stripped) = name.strip_prefix("artifacts/") {
        format!("Collected artifact: {stripped}")
    } else {
        name.to_string()
    }
}

/// Lists screenshot, HAR, and downloaded-file paths referenced by the
/// investigation record that exist under `output_dir`.
fn collect_artifacts(investigation: &Investigation, output_dir: &Path) -> Vec<std::path::PathBuf> {
    let mut paths = Vec::new();
    if let Some(snapshot) = &investigation.page_snapshot {
        if let Some(screenshot) = &snapshot.screenshot_path {
            paths.push(output_dir.join(screenshot));
        }
        if let Some(har) = &snapshot.har_path {
            paths.push(output_dir.join(har));
        }
    }
    for download in &investigation.downloads {
        if !download.path.is_empty() {
            paths.push(std::path::PathBuf::from(&download.path));
        }
    }
    paths.retain(|p| p.exists());
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssi_common::ScanMode;

    #[test]
    fn package_investigation_produces_zip_with_custody_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut investigation = Investigation::new("https://scam.example", ScanMode::Full);
        let custody = package_investigation(&mut investigation, dir.path()).unwrap();

        assert!(dir.path().join("evidence.zip").exists());
        assert!(custody.artifact_count >= 3);
        assert!(custody.package_sha256.is_some());
        assert_eq!(investigation.evidence_zip_path.as_deref(), Some(dir.path().join("evidence.zip").to_string_lossy().as_ref()));
    }

    #[test]
    fn missing_artifact_paths_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut investigation = Investigation::new("https://scam.example", ScanMode::Full);
        investigation.downloads.push(ssi_common::DownloadArtifact {
            origin_url: "https://scam.example/a.exe".to_string(),
            filename: "a.exe".to_string(),
            path: "/nonexistent/a.exe".to_string(),
            sha256: String::new(),
            md5: String::new(),
            size_bytes: 0,
            mime_type: String::new(),
            vt_detections: 0,
            vt_total_engines: 0,
            is_malicious: false,
        });
        let custody = package_investigation(&mut investigation, dir.path()).unwrap();
        assert!(!custody.artifacts.iter().any(|a| a.file_name.contains("a.exe")));
    }

    #[test]
    fn manifest_hashes_match_extracted_artifact_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let mut investigation = Investigation::new("https://scam.example", ScanMode::Full);
        package_investigation(&mut investigation, dir.path()).unwrap();

        let file = File::open(dir.path().join("evidence.zip")).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let manifest: serde_json::Value = {
            let mut entry = archive.by_name("manifest.json").unwrap();
            let mut raw = String::new();
            entry.read_to_string(&mut raw).unwrap();
            serde_json::from_str(&raw).unwrap()
        };

        for artifact in manifest["artifacts"].as_array().unwrap() {
            let name = artifact["file"].as_str().unwrap();
            let expected_sha256 = artifact["sha256"].as_str().unwrap();
            let mut entry = archive.by_name(name).unwrap();
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes).unwrap();
            assert_eq!(sha256_hex(&bytes), expected_sha256, "hash mismatch for {name}");
        }
    }

    #[test]
    fn lea_bundle_includes_evidence_zip_and_custody_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut investigation = Investigation::new("https://scam.example", ScanMode::Full);
        package_investigation(&mut investigation, dir.path()).unwrap();

        let bundle = package_lea_bundle(investigation.id, dir.path()).unwrap();
        assert!(bundle.zip_path.exists());
        assert!(!bundle.sha256.is_empty());

        let file = File::open(&bundle.zip_path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        assert!(archive.by_name("evidence.zip").is_ok());
        assert!(archive.by_name("stix_bundle.json").is_ok());
        assert!(archive.by_name("chain_of_custody.json").is_ok());
    }

    #[test]
    fn lea_bundle_errors_when_no_source_files_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = package_lea_bundle(uuid::Uuid::new_v4(), dir.path());
        assert!(err.is_err());
    }
}
