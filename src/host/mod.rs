//! Host mutations: files that may need elevation, shell profiles, the
//! package repository list, downloads, and fixes to installed sources.

pub mod download;
pub mod files;
pub mod patch;
pub mod profile;
pub mod repository;

pub use download::{fetch_http, Downloader};
pub use files::{copy_privileged, sha256_hex, write_privileged};
pub use patch::{site_packages_dirs, PatchOutcome, SourcePatch};
pub use profile::{ensure_lines, ProfileChange, ProfileMutator};
pub use repository::{RepairOutcome, RepairState, RepositoryBackup, RepositoryRepair};
