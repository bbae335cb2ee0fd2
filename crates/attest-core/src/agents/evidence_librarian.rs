use super::{spawn_query, AnalysisAgent, Briefing};
use crate::model::Period;
use crate::storage::Store;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Audits evidence coverage: passed checkpoints should carry at least one
/// supporting document before an auditor asks for it.
pub struct EvidenceLibrarian;

#[async_trait]
impl AnalysisAgent for EvidenceLibrarian {
    fn name(&self) -> &'static str {
        "evidence-librarian"
    }

    fn mission(&self) -> &'static str {
        "You audit evidence coverage for completed compliance work and point out gaps an auditor would find."
    }

    async fn gather(
        &self,
        store: &Store,
        org: &str,
        today: NaiveDate,
    ) -> anyhow::Result<Briefing> {
        let period = Period::from_date(today);

        let (tally, covered, uncovered, evidence_total) = tokio::try_join!(
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
                move || s.passed_without_evidence(&o, period, 20)
            }),
            spawn_query({
                let s = store.clone();
                let o = org.to_string();
                move || s.evidence_count_for_period(&o, period)
            }),
        )?;

        let mut facts = vec![format!(
            "Period {}: {} passed checkpoints, {} of them have at least one evidence item ({} items total).",
            period, tally.passed, covered, evidence_total
        )];
        if uncovered.is_empty() {
            facts.push("Every passed checkpoint has supporting evidence.".to_string());
        }
        for cp in &uncovered {
            facts.push(format!(
                "Passed without evidence: '{}' (checkpoint {}).",
                cp.control_title, cp.checkpoint_id
            ));
        }

        let fallback_summary = format!(
            "Scanned {} passed checkpoints for {}; {} lack supporting evidence.",
            tally.passed,
            period,
            uncovered.len()
        );

        Ok(Briefing {
            facts,
            fallback_summary,
        })
    }
}
