//! Audit-readiness scoring.
//!
//! Pure arithmetic over raw counts for one (organization, period). No I/O:
//! callers gather the counts, this crate turns them into four sub-scores
//! and one weighted overall score, all in [0, 100].

use serde::{Deserialize, Serialize};

pub const WEIGHT_CHECKPOINT: f64 = 0.35;
pub const WEIGHT_EVIDENCE: f64 = 0.25;
pub const WEIGHT_POLICY: f64 = 0.25;
pub const WEIGHT_CAPA: f64 = 0.15;

/// Raw counts feeding one scoring pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreInputs {
    pub checkpoints_total: u32,
    pub checkpoints_passed: u32,
    /// Distinct passed checkpoints with at least one evidence item.
    pub passed_with_evidence: u32,
    pub policies_total: u32,
    pub policies_effective: u32,
    pub policies_overdue_review: u32,
    pub capas_closed: u32,
    pub capas_open_active: u32,
    pub capas_overdue_active: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub checkpoint_score: u8,
    pub evidence_score: u8,
    pub policy_score: u8,
    pub capa_score: u8,
    pub overall_score: u8,
}

pub fn compute(inputs: &ScoreInputs) -> ScoreBreakdown {
    let checkpoint_score = checkpoint_score(inputs.checkpoints_total, inputs.checkpoints_passed);
    let evidence_score = evidence_score(inputs.checkpoints_passed, inputs.passed_with_evidence);
    let policy_score = policy_score(
        inputs.policies_total,
        inputs.policies_effective,
        inputs.policies_overdue_review,
    );
    let capa_score = capa_score(
        inputs.capas_closed,
        inputs.capas_open_active,
        inputs.capas_overdue_active,
    );

    let overall = f64::from(checkpoint_score) * WEIGHT_CHECKPOINT
        + f64::from(evidence_score) * WEIGHT_EVIDENCE
        + f64::from(policy_score) * WEIGHT_POLICY
        + f64::from(capa_score) * WEIGHT_CAPA;

    ScoreBreakdown {
        checkpoint_score,
        evidence_score,
        policy_score,
        capa_score,
        overall_score: overall.round() as u8,
    }
}

pub fn checkpoint_score(total: u32, passed: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    ratio_pct(passed, total)
}

pub fn evidence_score(passed: u32, covered: u32) -> u8 {
    if passed == 0 {
        return 0;
    }
    ratio_pct(covered.min(passed), passed)
}

/// Clamped at 0: a library dominated by overdue reviews scores 0, never
/// negative.
pub fn policy_score(total: u32, effective: u32, overdue_review: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let healthy = f64::from(effective) - f64::from(overdue_review);
    let pct = (100.0 * healthy / f64::from(total)).round();
    pct.clamp(0.0, 100.0) as u8
}

/// An organization with no CAPA history scores 100: the metric measures
/// closure discipline, not volume.
pub fn capa_score(closed: u32, open_active: u32, overdue_active: u32) -> u8 {
    let denom = closed + open_active + overdue_active;
    if denom == 0 {
        return 100;
    }
    ratio_pct(closed, denom)
}

fn ratio_pct(num: u32, denom: u32) -> u8 {
    (100.0 * f64::from(num) / f64::from(denom)).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_and_evidence_scenario() {
        // 10 checkpoints, 7 passed, 5 of the passed with evidence.
        let b = compute(&ScoreInputs {
            checkpoints_total: 10,
            checkpoints_passed: 7,
            passed_with_evidence: 5,
            ..Default::default()
        });
        assert_eq!(b.checkpoint_score, 70);
        assert_eq!(b.evidence_score, 71);
    }

    #[test]
    fn zero_checkpoints_score_zero() {
        let b = compute(&ScoreInputs::default());
        assert_eq!(b.checkpoint_score, 0);
        assert_eq!(b.evidence_score, 0);
        assert_eq!(b.policy_score, 0);
    }

    #[test]
    fn no_capa_history_is_perfect() {
        assert_eq!(capa_score(0, 0, 0), 100);
    }

    #[test]
    fn capa_closure_ratio() {
        assert_eq!(capa_score(3, 1, 0), 75);
        assert_eq!(capa_score(0, 2, 2), 0);
    }

    #[test]
    fn policy_score_clamps_at_zero() {
        // 1 effective policy but 4 overdue for review out of 5.
        assert_eq!(policy_score(5, 1, 4), 0);
        assert_eq!(policy_score(5, 0, 5), 0);
    }

    #[test]
    fn policy_score_healthy_library() {
        assert_eq!(policy_score(4, 4, 0), 100);
        assert_eq!(policy_score(4, 3, 1), 50);
    }

    #[test]
    fn overall_is_weighted_sum() {
        let b = compute(&ScoreInputs {
            checkpoints_total: 10,
            checkpoints_passed: 7,
            passed_with_evidence: 5,
            policies_total: 4,
            policies_effective: 4,
            capas_closed: 3,
            capas_open_active: 1,
            ..Default::default()
        });
        // 70*0.35 + 71*0.25 + 100*0.25 + 75*0.15 = 78.5, rounds to 79
        assert_eq!(b.overall_score, 79);
    }

    #[test]
    fn all_scores_bounded() {
        let counts = [0u32, 1, 2, 3, 7, 50];
        for &total in &counts {
            for &passed in &counts {
                for &covered in &counts {
                    let b = compute(&ScoreInputs {
                        checkpoints_total: total,
                        checkpoints_passed: passed.min(total),
                        passed_with_evidence: covered,
                        policies_total: total,
                        policies_effective: passed.min(total),
                        policies_overdue_review: covered,
                        capas_closed: total,
                        capas_open_active: passed,
                        capas_overdue_active: covered,
                    });
                    for score in [
                        b.checkpoint_score,
                        b.evidence_score,
                        b.policy_score,
                        b.capa_score,
                        b.overall_score,
                    ] {
                        assert!(score <= 100, "score {} out of range", score);
                    }
                }
            }
        }
    }
}
