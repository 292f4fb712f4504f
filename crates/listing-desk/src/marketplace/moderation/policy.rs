use super::super::domain::{ModerationDecision, ModerationStatus};

/// Scores strictly below this are auto-approved.
pub const AUTO_APPROVE_BELOW: u8 = 20;
/// Scores strictly above this are auto-rejected.
pub const AUTO_REJECT_ABOVE: u8 = 30;
pub const MAX_RISK_SCORE: u8 = 100;

pub(crate) fn clamp_score(raw: u32) -> u8 {
    raw.min(u32::from(MAX_RISK_SCORE)) as u8
}

pub(crate) fn decide(risk_score: u8) -> (ModerationStatus, ModerationDecision) {
    if risk_score < AUTO_APPROVE_BELOW {
        (ModerationStatus::AutoApproved, ModerationDecision::Approved)
    } else if risk_score > AUTO_REJECT_ABOVE {
        (ModerationStatus::AutoRejected, ModerationDecision::Rejected)
    } else {
        (ModerationStatus::NeedReview, ModerationDecision::NeedReview)
    }
}
