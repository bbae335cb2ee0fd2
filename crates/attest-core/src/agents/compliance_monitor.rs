use super::{spawn_query, AnalysisAgent, Briefing};
use crate::model::Period;
use crate::storage::Store;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Watches checkpoint discipline: overdue work, upcoming deadlines,
/// controls that keep failing across periods.
pub struct ComplianceMonitor;

#[async_trait]
impl AnalysisAgent for ComplianceMonitor {
    fn name(&self) -> &'static str {
        "compliance-monitor"
    }

    fn mission(&self) -> &'static str {
        "You review checkpoint execution discipline and recommend where the team should act first."
    }

    async fn gather(
        &self,
        store: &Store,
        org: &str,
        today: NaiveDate,
    ) -> anyhow::Result<Briefing> {
        let period = Period::from_date(today);

        let (tally, overdue, due_soon, repeats, coverage) = tokio::try_join!(
            spawn_query({
                let s = store.clone();
                let o = org.to_string();
                move || s.checkpoint_tally(&o, period)
            }),
            spawn_query({
                let s = store.clone();
                let o = org.to_string();
                move || s.overdue_checkpoints(&o, today, 20)
            }),
            spawn_query({
                let s = store.clone();
                let o = org.to_string();
                move || s.due_soon_checkpoints(&o, today, 14, 20)
            }),
            spawn_query({
                let s = store.clone();
                let o = org.to_string();
                move || s.repeat_failures(&o, 10)
            }),
            spawn_query({
                let s = store.clone();
                let o = org.to_string();
                move || s.category_coverage(&o, period)
            }),
        )?;

        let mut facts = vec![format!(
            "Period {}: {} checkpoints total, {} passed, {} failed, {} still pending.",
            period, tally.total, tally.passed, tally.failed, tally.pending
        )];
        facts.push(format!("{} checkpoints are overdue.", overdue.len()));
        for cp in &overdue {
            facts.push(format!(
                "Overdue: '{}' ({}) was due {}.",
                cp.control_title, cp.period, cp.due_date
            ));
        }
        for cp in &due_soon {
            facts.push(format!(
                "Due within 14 days: '{}' on {}.",
                cp.control_title, cp.due_date
            ));
        }
        for rf in &repeats {
            facts.push(format!(
                "Control {} '{}' has failed {} times across periods.",
                rf.code, rf.title, rf.failures
            ));
        }
        for cc in &coverage {
            facts.push(format!(
                "Category '{}': {}/{} checkpoints passed.",
                cc.category, cc.passed, cc.total
            ));
        }

        let fallback_summary = format!(
            "Scanned {} checkpoints for {}; found {} overdue and {} repeat-failure controls.",
            tally.total,
            period,
            overdue.len(),
            repeats.len()
        );

        Ok(Briefing {
            facts,
            fallback_summary,
        })
    }
}
