//! Ordered attempt-then-verify resolution of a single tool.
//!
//! The chain walks a tool's primary methods, then its alternatives, and
//! stops at the first method after which the verification gate passes.
//! Method errors are recorded, never propagated; only Ctrl-C ends a
//! resolution early.

use super::method::{InstallContext, InstallationMethod, Tier};
use super::tool::Tool;
use super::verify::VerificationGate;
use crate::error::{ErrorKind, ResolverError, Result};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Record of one method attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptOutcome {
    pub method: String,
    pub tier: Tier,
    /// True only when verification passed after this method.
    pub succeeded: bool,
    pub error_kind: Option<ErrorKind>,
    pub message: String,
    pub duration_ms: u64,
}

/// How a resolved tool came to be available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedVia {
    AlreadyInstalled,
    Primary,
    Alternative,
}

impl From<Tier> for ResolvedVia {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::Primary => Self::Primary,
            Tier::Alternative => Self::Alternative,
        }
    }
}

/// Final state of one `resolve` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved {
        via: ResolvedVia,
        attempts: Vec<AttemptOutcome>,
    },
    Unresolved {
        attempts: Vec<AttemptOutcome>,
    },
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }

    pub fn attempts(&self) -> &[AttemptOutcome] {
        match self {
            Self::Resolved { attempts, .. } | Self::Unresolved { attempts } => attempts,
        }
    }

    pub fn into_attempts(self) -> Vec<AttemptOutcome> {
        match self {
            Self::Resolved { attempts, .. } | Self::Unresolved { attempts } => attempts,
        }
    }
}

/// Resolves tools against one install context.
pub struct StrategyChain<'a> {
    ctx: &'a InstallContext<'a>,
    gate: &'a VerificationGate<'a>,
}

impl<'a> StrategyChain<'a> {
    pub fn new(ctx: &'a InstallContext<'a>, gate: &'a VerificationGate<'a>) -> Self {
        Self { ctx, gate }
    }

    /// Bring `tool` to a verified state, or exhaust its methods trying.
    ///
    /// Returns `Err` only for [`ResolverError::Interrupted`].
    pub fn resolve(&self, tool: &Tool) -> Result<Resolution> {
        self.ctx.interrupt.check()?;
        if self.gate.is_installed(tool) {
            info!(tool = %tool.name, "already installed");
            return Ok(Resolution::Resolved {
                via: ResolvedVia::AlreadyInstalled,
                attempts: Vec::new(),
            });
        }

        let mut attempts = Vec::new();
        let tiers = [
            (Tier::Primary, &tool.primary_methods),
            (Tier::Alternative, &tool.alternative_methods),
        ];
        for (tier, methods) in tiers {
            for method in methods {
                self.ctx.interrupt.check()?;
                let outcome = self.attempt(tool, method, tier)?;
                let succeeded = outcome.succeeded;
                attempts.push(outcome);
                if succeeded {
                    info!(tool = %tool.name, method = %method.label(), ?tier, "resolved");
                    self.run_hooks(tool)?;
                    return Ok(Resolution::Resolved {
                        via: tier.into(),
                        attempts,
                    });
                }
            }
        }

        warn!(tool = %tool.name, attempts = attempts.len(), "unresolved after all methods");
        Ok(Resolution::Unresolved { attempts })
    }

    fn attempt(
        &self,
        tool: &Tool,
        method: &InstallationMethod,
        tier: Tier,
    ) -> Result<AttemptOutcome> {
        let label = method.label().to_string();
        if method.requires_network() && !self.ctx.network_available {
            debug!(tool = %tool.name, method = %label, "skipping, network unavailable");
            return Ok(AttemptOutcome {
                method: label,
                tier,
                succeeded: false,
                error_kind: Some(ErrorKind::NetworkUnavailable),
                message: "skipped: network unavailable".to_string(),
                duration_ms: 0,
            });
        }

        debug!(tool = %tool.name, method = %label, ?tier, "attempting");
        let start = Instant::now();
        let result = method.execute(self.ctx);
        if let Err(e) = &result {
            if e.is_interrupt() {
                return Err(ResolverError::Interrupted);
            }
        }
        let verified = self.gate.is_installed(tool);
        let duration_ms = start.elapsed().as_millis() as u64;

        let (error_kind, message) = match (&result, verified) {
            (_, true) => (None, "verified".to_string()),
            (Ok(()), false) => (
                Some(ErrorKind::VerificationFailed),
                format!("`{}` still failing", tool.check_invocation.join(" ")),
            ),
            (Err(e), false) => (Some(e.kind()), e.to_string()),
        };
        if !verified {
            warn!(tool = %tool.name, method = %label, error = %message, "attempt failed");
        }

        Ok(AttemptOutcome {
            method: label,
            tier,
            succeeded: verified,
            error_kind,
            message,
            duration_ms,
        })
    }

    fn run_hooks(&self, tool: &Tool) -> Result<()> {
        for hook in &tool.post_install_hooks {
            match hook.run(self.ctx) {
                Ok(()) => debug!(tool = %tool.name, hook = %hook.name, "hook applied"),
                Err(e) if e.is_interrupt() => return Err(e),
                Err(e) => warn!(tool = %tool.name, hook = %hook.name, error = %e, "hook failed"),
            }
        }
        Ok(())
    }
}
