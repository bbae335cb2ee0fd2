//! Run ledger: the lifecycle of one agent execution.
//!
//! Every run is inserted as `running` and reaches exactly one terminal
//! state, `completed` or `failed`. Suggestions are only ever written by
//! `complete`, in the same transaction that closes the run, so they are
//! never visible under a failed run.

use crate::model::{AgentRunRow, DraftSuggestion, RunStatus, Trigger};
use crate::storage::store::now_rfc3339;
use crate::storage::Store;
use anyhow::Context;
use rusqlite::params;
use std::time::Instant;

#[derive(Clone)]
pub struct RunLedger {
    store: Store,
}

impl RunLedger {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn start(
        &self,
        org: &str,
        agent: &str,
        trigger: Trigger,
        input_summary: &str,
    ) -> anyhow::Result<(i64, Instant)> {
        let conn = self.store.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO agent_runs(org_id, agent, trigger_type, status, input_summary, started_at)
             VALUES (?1, ?2, ?3, 'running', ?4, ?5)",
            params![org, agent, trigger.as_str(), input_summary, now_rfc3339()],
        )
        .context("failed to open agent run")?;
        let run_id = conn.last_insert_rowid();
        tracing::info!(
            event = "attest.run.started",
            run_id,
            org,
            agent,
            trigger = trigger.as_str(),
        );
        Ok((run_id, Instant::now()))
    }

    pub fn complete(
        &self,
        run_id: i64,
        org: &str,
        agent: &str,
        suggestions: &[DraftSuggestion],
        summary: &str,
        tokens_used: u32,
        started: Instant,
    ) -> anyhow::Result<()> {
        let duration_ms = started.elapsed().as_millis() as u64;
        let mut conn = self.store.conn.lock().unwrap();
        let tx = conn.transaction()?;

        if !suggestions.is_empty() {
            let mut stmt = tx.prepare(
                "INSERT INTO suggestions(run_id, org_id, entity_type, entity_id, kind, title,
                                         description, suggested_changes_json, confidence,
                                         review_status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'pending', ?10)",
            )?;
            let now = now_rfc3339();
            for s in suggestions {
                let changes_json = s
                    .suggested_changes
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?;
                stmt.execute(params![
                    run_id,
                    org,
                    s.entity_type,
                    s.entity_id,
                    s.suggestion_type.as_str(),
                    s.title,
                    s.description,
                    changes_json,
                    s.confidence,
                    now
                ])?;
            }
        }

        tx.execute(
            "UPDATE agent_runs
             SET status = 'completed', output_summary = ?1, tokens_used = ?2,
                 duration_ms = ?3, completed_at = ?4
             WHERE id = ?5",
            params![summary, tokens_used, duration_ms, now_rfc3339(), run_id],
        )?;
        tx.commit().context("failed to close agent run")?;

        tracing::info!(
            event = "attest.run.completed",
            run_id,
            agent,
            suggestions = suggestions.len(),
            tokens_used,
            duration_ms,
        );
        Ok(())
    }

    pub fn fail(&self, run_id: i64, error: &str, started: Instant) -> anyhow::Result<()> {
        let duration_ms = started.elapsed().as_millis() as u64;
        let conn = self.store.conn.lock().unwrap();
        conn.execute(
            "UPDATE agent_runs
             SET status = 'failed', error = ?1, duration_ms = ?2, completed_at = ?3
             WHERE id = ?4",
            params![error, duration_ms, now_rfc3339(), run_id],
        )?;
        tracing::warn!(event = "attest.run.failed", run_id, error, duration_ms);
        Ok(())
    }

    pub fn recent(&self, org: &str, limit: u32) -> anyhow::Result<Vec<AgentRunRow>> {
        let conn = self.store.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, org_id, agent, trigger_type, status, input_summary, output_summary,
                    tokens_used, duration_ms, error, started_at, completed_at
             FROM agent_runs
             WHERE org_id = ?1
             ORDER BY id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![org, limit], map_run_row)?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Runs still marked `running` after the given age. A crash between
    /// `start` and a terminal update leaves such rows behind; reporting
    /// must treat them as abandoned, not successful. Read-only: history
    /// is not rewritten.
    pub fn stale_running(
        &self,
        org: &str,
        max_age_minutes: u64,
        now: chrono::DateTime<chrono::Utc>,
    ) -> anyhow::Result<Vec<AgentRunRow>> {
        let cutoff = (now - chrono::Duration::minutes(max_age_minutes as i64)).to_rfc3339();
        let conn = self.store.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, org_id, agent, trigger_type, status, input_summary, output_summary,
                    tokens_used, duration_ms, error, started_at, completed_at
             FROM agent_runs
             WHERE org_id = ?1 AND status = 'running' AND started_at < ?2
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![org, cutoff], map_run_row)?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }
}

fn map_run_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AgentRunRow> {
    Ok(AgentRunRow {
        id: row.get(0)?,
        org_id: row.get(1)?,
        agent: row.get(2)?,
        trigger: Trigger::parse(&row.get::<_, String>(3)?).unwrap_or(Trigger::Manual),
        status: RunStatus::parse(&row.get::<_, String>(4)?),
        input_summary: row.get(5)?,
        output_summary: row.get(6)?,
        tokens_used: row.get::<_, Option<i64>>(7)?.map(|v| v as u32),
        duration_ms: row.get::<_, Option<i64>>(8)?.map(|v| v as u64),
        error: row.get(9)?,
        started_at: row.get(10)?,
        completed_at: row.get(11)?,
    })
}
