use nadia_core::{Recommendation, SafetyVerdict};
use tracing::{info, warn};

use crate::rules::{default_rules, SafetyRule};

/// Risk above this threshold always recommends at least `Review`, even with
/// no explicit rule hit.
const HIGH_RISK_THRESHOLD: f64 = 0.7;
/// Risk above this threshold (but below `HIGH_RISK_THRESHOLD`) still warrants
/// a human look rather than silent approval.
const LOW_RISK_THRESHOLD: f64 = 0.25;

/// Deterministic rules-based safety gate. Scores the refined bubbles against
/// a fixed keyword registry; the orchestrator never auto-approves on this
/// verdict alone — it only sets review-queue priority and surfaced flags.
pub struct SafetyEvaluator {
    rules: Vec<SafetyRule>,
}

impl SafetyEvaluator {
    pub fn new() -> Self {
        Self { rules: default_rules() }
    }

    pub fn with_rules(rules: Vec<SafetyRule>) -> Self {
        Self { rules }
    }

    /// Evaluate the final bubbles (plus the raw draft, for rules that should
    /// see content the refiner may have softened) and produce a verdict.
    pub fn evaluate(&self, bubbles: &[String]) -> SafetyVerdict {
        let combined = bubbles.join(" ").to_lowercase();

        let mut risk = 0.0_f64;
        let mut flags = Vec::new();
        let mut forced_reject = false;

        for rule in &self.rules {
            if rule.keywords.iter().any(|kw| combined.contains(kw)) {
                flags.push(rule.name.to_string());
                risk += rule.weight;
                if rule.force_reject {
                    forced_reject = true;
                }
            }
        }
        risk = risk.min(1.0);

        let recommendation = if forced_reject {
            Recommendation::Reject
        } else if risk > HIGH_RISK_THRESHOLD {
            Recommendation::Review
        } else if risk > LOW_RISK_THRESHOLD {
            Recommendation::Review
        } else {
            Recommendation::Approve
        };

        if forced_reject {
            warn!(risk, ?flags, "safety evaluator forced rejection");
        } else if !flags.is_empty() {
            info!(risk, ?flags, ?recommendation, "safety evaluator flagged draft");
        }

        SafetyVerdict { risk, flags, recommendation: Some(recommendation) }
    }
}

impl Default for SafetyEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_is_approved_with_zero_risk() {
        let evaluator = SafetyEvaluator::new();
        let verdict = evaluator.evaluate(&["Hey! How was your day?".to_string()]);
        assert_eq!(verdict.risk, 0.0);
        assert!(verdict.flags.is_empty());
        assert_eq!(verdict.recommendation, Some(Recommendation::Approve));
    }

    #[test]
    fn explicit_rule_hit_forces_reject_regardless_of_score() {
        let evaluator = SafetyEvaluator::new();
        let verdict = evaluator.evaluate(&["i want to kill myself".to_string()]);
        assert_eq!(verdict.recommendation, Some(Recommendation::Reject));
        assert!(verdict.flags.contains(&"self_harm".to_string()));
    }

    #[test]
    fn accumulated_risk_above_high_threshold_recommends_review() {
        let evaluator = SafetyEvaluator::new();
        let bubbles = vec![
            "send me money right now".to_string(),
            "wire transfer to this account".to_string(),
            "what's your home address".to_string(),
        ];
        let verdict = evaluator.evaluate(&bubbles);
        assert!(verdict.risk > HIGH_RISK_THRESHOLD);
        assert_eq!(verdict.recommendation, Some(Recommendation::Review));
    }

    #[test]
    fn low_weight_flag_alone_does_not_cross_review_threshold() {
        let evaluator = SafetyEvaluator::new();
        let verdict = evaluator.evaluate(&["add me on whatsapp".to_string()]);
        assert!(verdict.risk > 0.0);
        assert!(!verdict.flags.is_empty());
        assert_eq!(verdict.recommendation, Some(Recommendation::Approve));
    }
}
