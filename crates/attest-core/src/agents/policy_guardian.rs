use super::{spawn_query, AnalysisAgent, Briefing};
use crate::storage::Store;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Tracks the policy library's review cadence and CAPA closure
/// discipline.
pub struct PolicyGuardian;

#[async_trait]
impl AnalysisAgent for PolicyGuardian {
    fn name(&self) -> &'static str {
        "policy-guardian"
    }

    fn mission(&self) -> &'static str {
        "You watch the policy library and corrective actions, and recommend which reviews and closures to prioritize."
    }

    async fn gather(
        &self,
        store: &Store,
        org: &str,
        today: NaiveDate,
    ) -> anyhow::Result<Briefing> {
        let (policies, overdue_policies, capas, overdue_capas, findings) = tokio::try_join!(
            spawn_query({
                let s = store.clone();
                let o = org.to_string();
                move || s.policy_counts(&o, today)
            }),
            spawn_query({
                let s = store.clone();
                let o = org.to_string();
                move || s.policies_overdue_review(&o, today, 20)
            }),
            spawn_query({
                let s = store.clone();
                let o = org.to_string();
                move || s.capa_counts(&o, today)
            }),
            spawn_query({
                let s = store.clone();
                let o = org.to_string();
                move || s.overdue_capas(&o, today, 20)
            }),
            spawn_query({
                let s = store.clone();
                let o = org.to_string();
                move || s.open_findings(&o, 10)
            }),
        )?;

        let mut facts = vec![format!(
            "Policy library: {} documents, {} effective, {} in draft, {} in review, {} overdue for review.",
            policies.total, policies.effective, policies.draft, policies.in_review, policies.overdue_review
        )];
        for p in &overdue_policies {
            facts.push(format!(
                "Policy '{}' ({}) was due for review on {}.",
                p.title, p.status, p.next_review_date
            ));
        }
        facts.push(format!(
            "CAPAs: {} total, {} closed, {} open, {} overdue.",
            capas.total, capas.closed, capas.open_active, capas.overdue_active
        ));
        for c in &overdue_capas {
            facts.push(format!(
                "CAPA '{}' (owner: {}) was due {}.",
                c.title,
                c.owner.as_deref().unwrap_or("unassigned"),
                c.due_date
            ));
        }
        for f in &findings {
            facts.push(format!("Open finding ({}): '{}'.", f.severity, f.title));
        }

        let fallback_summary = format!(
            "Reviewed {} policies and {} CAPAs; {} policies overdue for review, {} CAPAs overdue.",
            policies.total,
            capas.total,
            policies.overdue_review,
            capas.overdue_active
        );

        Ok(Briefing {
            facts,
            fallback_summary,
        })
    }
}
