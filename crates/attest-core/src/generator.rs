//! Checkpoint generation: expands active control templates into
//! period-scoped checkpoint records.

use crate::model::{Frequency, Period};
use crate::storage::store::now_rfc3339;
use crate::storage::Store;
use anyhow::Context;
use chrono::NaiveDate;
use rusqlite::params;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationReport {
    pub created: u32,
    pub skipped: u32,
}

/// Instantiates a checkpoint for every active control due in the period.
/// Safely re-runnable: existence is checked per (control, period) before
/// insert, so a second call for the same period creates nothing.
pub fn generate_for_period(
    store: &Store,
    org: &str,
    period: Period,
) -> anyhow::Result<GenerationReport> {
    let controls = store.active_controls(org)?;
    let mut report = GenerationReport::default();

    for control in &controls {
        if !period.matches(control.frequency) {
            continue;
        }
        if store.checkpoint_exists(control.id, period)? {
            report.skipped += 1;
            continue;
        }
        store.insert_checkpoint(org, control.id, period, period.due_date(), None)?;
        report.created += 1;
    }

    tracing::info!(
        event = "attest.checkpoints.generated",
        org,
        period = %period,
        created = report.created,
        skipped = report.skipped,
    );
    Ok(report)
}

/// One row of a bulk schedule import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedRow {
    pub control: SeedControl,
    pub period: String,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub assignee: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedControl {
    pub code: String,
    pub title: String,
    #[serde(default)]
    pub standard: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub frequency: Frequency,
    #[serde(default)]
    pub required_evidence: Vec<String>,
    #[serde(default)]
    pub test_procedure: Option<String>,
    #[serde(default)]
    pub owner_role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    Seeded { controls: u32, checkpoints: u32 },
    /// The organization already has checkpoints. Nothing was written; a
    /// half-completed earlier seed must be resolved deliberately, not
    /// papered over row by row.
    Rejected { reason: String },
}

/// Bulk one-time import of a fixed schedule.
///
/// Two ordered phases inside one transaction: controls are upserted by
/// unique code first (existing codes are reused), then checkpoint rows
/// are inserted against the resolved control ids. A failure in either
/// phase rolls back both, so checkpoints can never reference controls
/// that were not written.
pub fn seed_schedule(store: &Store, org: &str, rows: &[SeedRow]) -> anyhow::Result<SeedOutcome> {
    if store.org_has_checkpoints(org)? {
        tracing::warn!(event = "attest.seed.rejected", org);
        return Ok(SeedOutcome::Rejected {
            reason: format!(
                "organization '{}' already has checkpoints; seeding is a one-time import. \
                 Remove the existing schedule first if you intend to re-seed.",
                org
            ),
        });
    }

    // Parse everything up front so a bad row cannot interrupt the write.
    let mut parsed = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let period = Period::parse(&row.period)
            .with_context(|| format!("seed row {}: invalid period '{}'", i + 1, row.period))?;
        parsed.push((row, period));
    }

    let mut conn = store.conn.lock().unwrap();
    let tx = conn.transaction()?;
    let now = now_rfc3339();
    let mut controls_created = 0u32;

    // Phase 1: resolve every control id.
    let mut resolved: Vec<i64> = Vec::with_capacity(parsed.len());
    for (row, _) in &parsed {
        let existing: Option<i64> = {
            let mut stmt =
                tx.prepare("SELECT id FROM controls WHERE org_id = ?1 AND code = ?2")?;
            let mut found = stmt.query(params![org, row.control.code])?;
            match found.next()? {
                Some(r) => Some(r.get(0)?),
                None => None,
            }
        };

        let id = match existing {
            Some(id) => id,
            None => {
                tx.execute(
                    "INSERT INTO controls(org_id, code, title, standard, category, frequency,
                                          required_evidence_json, test_procedure, owner_role,
                                          active, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, ?10)",
                    params![
                        org,
                        row.control.code,
                        row.control.title,
                        row.control.standard,
                        row.control.category,
                        row.control.frequency.as_str(),
                        serde_json::to_string(&row.control.required_evidence)?,
                        row.control.test_procedure,
                        row.control.owner_role,
                        now
                    ],
                )
                .with_context(|| format!("failed to insert control '{}'", row.control.code))?;
                controls_created += 1;
                tx.last_insert_rowid()
            }
        };
        resolved.push(id);
    }

    // Phase 2: checkpoint rows against the resolved ids.
    let mut checkpoints_created = 0u32;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO checkpoints(org_id, control_id, period, status, due_date, assignee, created_at)
             VALUES (?1, ?2, ?3, 'pending', ?4, ?5, ?6)",
        )?;
        for ((row, period), control_id) in parsed.iter().zip(&resolved) {
            let due = row.due_date.unwrap_or_else(|| period.due_date());
            stmt.execute(params![
                org,
                control_id,
                period.to_string(),
                due.to_string(),
                row.assignee,
                now
            ])?;
            checkpoints_created += 1;
        }
    }

    tx.commit().context("seed transaction failed to commit")?;

    tracing::info!(
        event = "attest.seed.completed",
        org,
        controls = controls_created,
        checkpoints = checkpoints_created,
    );
    Ok(SeedOutcome::Seeded {
        controls: controls_created,
        checkpoints: checkpoints_created,
    })
}
