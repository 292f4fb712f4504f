//! Rule-based content risk assessment for listings.

mod config;
mod policy;
mod rules;

pub use config::{ModerationConfig, DEFAULT_FORBIDDEN_WORDS};
pub use policy::{AUTO_APPROVE_BELOW, AUTO_REJECT_ABOVE, MAX_RISK_SCORE};

use super::domain::{Listing, ModerationResult};

/// Stateless engine; the caller supplies the listings used for duplicate detection.
#[derive(Debug, Clone, Default)]
pub struct ModerationEngine {
    config: ModerationConfig,
}

impl ModerationEngine {
    pub fn new(config: ModerationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ModerationConfig {
        &self.config
    }

    /// Scores `listing` against the content rules. Never fails: missing content counts as
    /// the "too short" and "no images" cases.
    pub fn run(&self, listing: &Listing, existing: &[Listing]) -> ModerationResult {
        let tally = rules::assess(listing, existing, &self.config);
        let risk_score = policy::clamp_score(tally.raw_score);
        let (status, decision) = policy::decide(risk_score);

        ModerationResult {
            status,
            decision,
            risk_score,
            flags: tally.flags,
            suggestions: tally.suggestions,
            reviewed_by: None,
            reviewed_at: None,
        }
    }
}
