//! Per-tool installation resolution.
//!
//! A [`Tool`] declares how to check it and the ordered methods that may
//! install it. The [`StrategyChain`] tries those methods and asks the
//! [`VerificationGate`] after each one whether the tool is now usable.

pub mod chain;
pub mod method;
pub mod tool;
pub mod verify;

pub use chain::{AttemptOutcome, Resolution, ResolvedVia, StrategyChain};
pub use method::{InstallContext, InstallationMethod, NativeStep, ShellCommand, Tier};
pub use tool::{Category, Tool};
pub use verify::VerificationGate;
