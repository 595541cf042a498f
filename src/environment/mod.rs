//! Host environment discovery.
//!
//! Probes the operating system, distribution, python runtime, package
//! manager and network once per run and hands the result around as an
//! immutable [`SystemInfo`].

pub mod network;
pub mod package_manager;
pub mod probe;

pub use network::NetworkProbe;
pub use package_manager::PackageManager;
pub use probe::{EnvironmentProbe, OsFamily, RuntimeVersion, SystemInfo};
