//! Evidence pipeline (C12): STIX export, chain-of-custody tracking, and
//! archive packaging for a completed investigation, plus upload to the
//! configured storage backend (local filesystem or GCS).

pub mod packaging;
pub mod stix;
pub mod storage;

pub use packaging::{package_investigation, package_lea_bundle, LeaBundle};
pub use stix::{custody_to_text, investigation_to_stix_bundle};
pub use storage::EvidenceStorageClient;
