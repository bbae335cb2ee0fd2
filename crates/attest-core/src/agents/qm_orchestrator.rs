use super::{spawn_query, AnalysisAgent, Briefing};
use crate::model::{CapaCounts, CheckpointTally, Period, PolicyCounts};
use crate::storage::Store;
use async_trait::async_trait;
use attest_scoring::{compute, ScoreInputs};
use chrono::NaiveDate;

/// Runs the periodic quality-management pass: computes the audit-readiness
/// score, persists it, and keeps the period's meeting packet current.
pub struct QmOrchestrator;

#[async_trait]
impl AnalysisAgent for QmOrchestrator {
    fn name(&self) -> &'static str {
        "qm-orchestrator"
    }

    fn mission(&self) -> &'static str {
        "You prepare the quality-management review: assess overall audit readiness and propose the agenda items that deserve discussion."
    }

    async fn gather(
        &self,
        store: &Store,
        org: &str,
        today: NaiveDate,
    ) -> anyhow::Result<Briefing> {
        let period = Period::from_date(today);

        let (tally, covered, policies, capas) = tokio::try_join!(
            spawn_query({
                let s = store.clone();
                let o = org.to_string();
                move || s.checkpoint_tally(&o, period)
            }),
            spawn_query({
                let s = store.clone();
                let o = org.to_string();
                move || s.covered_passed_count(&o, period)
            }),
            spawn_query({
                let s = store.clone();
                let o = org.to_string();
                move || s.policy_counts(&o, today)
            }),
            spawn_query({
                let s = store.clone();
                let o = org.to_string();
                move || s.capa_counts(&o, today)
            }),
        )?;

        let breakdown = compute(&build_inputs(tally, covered, policies, capas));

        let facts = vec![
            format!(
                "Period {}: {} checkpoints, {} passed, {} with evidence.",
                period, tally.total, tally.passed, covered
            ),
            format!(
                "Policies: {} total, {} effective, {} overdue for review.",
                policies.total, policies.effective, policies.overdue_review
            ),
            format!(
                "CAPAs: {} closed, {} open, {} overdue.",
                capas.closed, capas.open_active, capas.overdue_active
            ),
            format!(
                "Audit readiness: overall {} (checkpoints {}, evidence {}, policies {}, CAPAs {}).",
                breakdown.overall_score,
                breakdown.checkpoint_score,
                breakdown.evidence_score,
                breakdown.policy_score,
                breakdown.capa_score
            ),
        ];

        let fallback_summary = format!(
            "Audit readiness for {} is {} (checkpoints {}, evidence {}, policies {}, CAPAs {}).",
            period,
            breakdown.overall_score,
            breakdown.checkpoint_score,
            breakdown.evidence_score,
            breakdown.policy_score,
            breakdown.capa_score
        );

        Ok(Briefing {
            facts,
            fallback_summary,
        })
    }

    async fn finalize(
        &self,
        store: &Store,
        org: &str,
        today: NaiveDate,
        summary: &str,
    ) -> anyhow::Result<()> {
        let period = Period::from_date(today);

        let tally = store.checkpoint_tally(org, period)?;
        let covered = store.covered_passed_count(org, period)?;
        let policies = store.policy_counts(org, today)?;
        let capas = store.capa_counts(org, today)?;
        let breakdown = compute(&build_inputs(tally, covered, policies, capas));

        store.upsert_readiness_score(org, period, &breakdown)?;

        match store.find_meeting(org, period)? {
            Some(meeting) => {
                store.update_meeting(meeting.id, summary, breakdown.overall_score)?;
            }
            None => {
                store.insert_meeting(
                    org,
                    period,
                    summary,
                    &default_agenda(),
                    breakdown.overall_score,
                )?;
            }
        }

        tracing::info!(
            event = "attest.qm.scored",
            org,
            period = %period,
            overall = breakdown.overall_score,
        );
        Ok(())
    }
}

fn build_inputs(
    tally: CheckpointTally,
    covered: u32,
    policies: PolicyCounts,
    capas: CapaCounts,
) -> ScoreInputs {
    ScoreInputs {
        checkpoints_total: tally.total,
        checkpoints_passed: tally.passed,
        passed_with_evidence: covered,
        policies_total: policies.total,
        policies_effective: policies.effective,
        policies_overdue_review: policies.overdue_review,
        capas_closed: capas.closed,
        capas_open_active: capas.open_active,
        capas_overdue_active: capas.overdue_active,
    }
}

fn default_agenda() -> Vec<String> {
    [
        "Audit readiness score review",
        "Overdue checkpoints",
        "Evidence coverage gaps",
        "Policy review backlog",
        "Open CAPAs",
        "AI recommendations pending review",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
