use crate::model::{
    CapaCounts, CategoryCoverage, CheckpointTally, Control, FindingRow, Frequency, MeetingRow,
    OverdueCapa, OverdueCheckpoint, Period, PolicyCounts, PolicyReviewRow, RepeatFailure,
    StoredScore, UncoveredCheckpoint,
};
use anyhow::Context;
use attest_scoring::ScoreBreakdown;
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Shared handle on the engine's SQLite datastore. Passed explicitly into
/// every operation; there is no ambient singleton.
#[derive(Clone)]
pub struct Store {
    pub conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path).context("failed to open sqlite db")?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory sqlite db")?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(crate::storage::schema::DDL)?;
        Ok(())
    }

    // ---- controls ----

    pub fn active_controls(&self, org: &str) -> anyhow::Result<Vec<Control>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, org_id, code, title, standard, category, frequency,
                    required_evidence_json, active
             FROM controls
             WHERE org_id = ?1 AND active = 1
             ORDER BY code",
        )?;
        let rows = stmt.query_map(params![org], |row| {
            let evidence_json: Option<String> = row.get(7)?;
            Ok(Control {
                id: row.get(0)?,
                org_id: row.get(1)?,
                code: row.get(2)?,
                title: row.get(3)?,
                standard: row.get(4)?,
                category: row.get(5)?,
                frequency: Frequency::parse(&row.get::<_, String>(6)?),
                required_evidence: evidence_json
                    .and_then(|s| serde_json::from_str(&s).ok())
                    .unwrap_or_default(),
                active: row.get::<_, i64>(8)? != 0,
            })
        })?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn control_id_by_code(&self, org: &str, code: &str) -> anyhow::Result<Option<i64>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id FROM controls WHERE org_id = ?1 AND code = ?2")?;
        let mut rows = stmt.query(params![org, code])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    // ---- checkpoints ----

    pub fn checkpoint_exists(&self, control_id: i64, period: Period) -> anyhow::Result<bool> {
        let conn = self.conn.lock().unwrap();
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM checkpoints WHERE control_id = ?1 AND period = ?2",
            params![control_id, period.to_string()],
            |r| r.get(0),
        )?;
        Ok(n > 0)
    }

    pub fn org_has_checkpoints(&self, org: &str) -> anyhow::Result<bool> {
        let conn = self.conn.lock().unwrap();
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM checkpoints WHERE org_id = ?1",
            params![org],
            |r| r.get(0),
        )?;
        Ok(n > 0)
    }

    pub fn insert_checkpoint(
        &self,
        org: &str,
        control_id: i64,
        period: Period,
        due_date: NaiveDate,
        assignee: Option<&str>,
    ) -> anyhow::Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO checkpoints(org_id, control_id, period, status, due_date, assignee, created_at)
             VALUES (?1, ?2, ?3, 'pending', ?4, ?5, ?6)",
            params![
                org,
                control_id,
                period.to_string(),
                due_date.to_string(),
                assignee,
                now_rfc3339()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn checkpoint_tally(&self, org: &str, period: Period) -> anyhow::Result<CheckpointTally> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN status = 'passed' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status IN ('pending','in_progress') THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'overdue' THEN 1 ELSE 0 END), 0)
             FROM checkpoints
             WHERE org_id = ?1 AND period = ?2",
            params![org, period.to_string()],
            |r| {
                Ok(CheckpointTally {
                    total: r.get::<_, i64>(0)? as u32,
                    passed: r.get::<_, i64>(1)? as u32,
                    failed: r.get::<_, i64>(2)? as u32,
                    pending: r.get::<_, i64>(3)? as u32,
                    overdue: r.get::<_, i64>(4)? as u32,
                })
            },
        )
        .context("checkpoint tally query failed")
    }

    pub fn overdue_checkpoints(
        &self,
        org: &str,
        today: NaiveDate,
        limit: u32,
    ) -> anyhow::Result<Vec<OverdueCheckpoint>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT ct.title, cp.period, cp.due_date, cp.status
             FROM checkpoints cp
             JOIN controls ct ON cp.control_id = ct.id
             WHERE cp.org_id = ?1
               AND (cp.status = 'overdue'
                    OR (cp.status IN ('pending','in_progress') AND cp.due_date < ?2))
             ORDER BY cp.due_date ASC
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![org, today.to_string(), limit], |row| {
            Ok(OverdueCheckpoint {
                control_title: row.get(0)?,
                period: row.get(1)?,
                due_date: row.get(2)?,
                status: row.get(3)?,
            })
        })?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn due_soon_checkpoints(
        &self,
        org: &str,
        today: NaiveDate,
        within_days: i64,
        limit: u32,
    ) -> anyhow::Result<Vec<OverdueCheckpoint>> {
        let horizon = today + chrono::Duration::days(within_days);
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT ct.title, cp.period, cp.due_date, cp.status
             FROM checkpoints cp
             JOIN controls ct ON cp.control_id = ct.id
             WHERE cp.org_id = ?1
               AND cp.status IN ('pending','in_progress')
               AND cp.due_date >= ?2 AND cp.due_date <= ?3
             ORDER BY cp.due_date ASC
             LIMIT ?4",
        )?;
        let rows = stmt.query_map(
            params![org, today.to_string(), horizon.to_string(), limit],
            |row| {
                Ok(OverdueCheckpoint {
                    control_title: row.get(0)?,
                    period: row.get(1)?,
                    due_date: row.get(2)?,
                    status: row.get(3)?,
                })
            },
        )?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Controls whose checkpoints failed in two or more periods.
    pub fn repeat_failures(&self, org: &str, limit: u32) -> anyhow::Result<Vec<RepeatFailure>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT ct.code, ct.title, COUNT(*) AS failures
             FROM checkpoints cp
             JOIN controls ct ON cp.control_id = ct.id
             WHERE cp.org_id = ?1 AND cp.status = 'failed'
             GROUP BY cp.control_id
             HAVING failures >= 2
             ORDER BY failures DESC, ct.code
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![org, limit], |row| {
            Ok(RepeatFailure {
                code: row.get(0)?,
                title: row.get(1)?,
                failures: row.get::<_, i64>(2)? as u32,
            })
        })?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn category_coverage(
        &self,
        org: &str,
        period: Period,
    ) -> anyhow::Result<Vec<CategoryCoverage>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT COALESCE(ct.category, 'uncategorized'),
                    COUNT(*),
                    COALESCE(SUM(CASE WHEN cp.status = 'passed' THEN 1 ELSE 0 END), 0)
             FROM checkpoints cp
             JOIN controls ct ON cp.control_id = ct.id
             WHERE cp.org_id = ?1 AND cp.period = ?2
             GROUP BY 1
             ORDER BY 1",
        )?;
        let rows = stmt.query_map(params![org, period.to_string()], |row| {
            Ok(CategoryCoverage {
                category: row.get(0)?,
                total: row.get::<_, i64>(1)? as u32,
                passed: row.get::<_, i64>(2)? as u32,
            })
        })?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    // ---- evidence ----

    pub fn passed_without_evidence(
        &self,
        org: &str,
        period: Period,
        limit: u32,
    ) -> anyhow::Result<Vec<UncoveredCheckpoint>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT cp.id, ct.title
             FROM checkpoints cp
             JOIN controls ct ON cp.control_id = ct.id
             WHERE cp.org_id = ?1 AND cp.period = ?2 AND cp.status = 'passed'
               AND NOT EXISTS (SELECT 1 FROM evidence e WHERE e.checkpoint_id = cp.id)
             ORDER BY ct.code
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![org, period.to_string(), limit], |row| {
            Ok(UncoveredCheckpoint {
                checkpoint_id: row.get(0)?,
                control_title: row.get(1)?,
            })
        })?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Distinct passed checkpoints for the period with at least one
    /// evidence item.
    pub fn covered_passed_count(&self, org: &str, period: Period) -> anyhow::Result<u32> {
        let conn = self.conn.lock().unwrap();
        let n: i64 = conn.query_row(
            "SELECT COUNT(*)
             FROM checkpoints cp
             WHERE cp.org_id = ?1 AND cp.period = ?2 AND cp.status = 'passed'
               AND EXISTS (SELECT 1 FROM evidence e WHERE e.checkpoint_id = cp.id)",
            params![org, period.to_string()],
            |r| r.get(0),
        )?;
        Ok(n as u32)
    }

    pub fn evidence_count_for_period(&self, org: &str, period: Period) -> anyhow::Result<u32> {
        let conn = self.conn.lock().unwrap();
        let n: i64 = conn.query_row(
            "SELECT COUNT(*)
             FROM evidence e
             JOIN checkpoints cp ON e.checkpoint_id = cp.id
             WHERE cp.org_id = ?1 AND cp.period = ?2",
            params![org, period.to_string()],
            |r| r.get(0),
        )?;
        Ok(n as u32)
    }

    // ---- policies ----

    pub fn policy_counts(&self, org: &str, today: NaiveDate) -> anyhow::Result<PolicyCounts> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN status = 'effective' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'draft' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status = 'in_review' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status != 'retired'
                                       AND next_review_date IS NOT NULL
                                       AND next_review_date < ?2 THEN 1 ELSE 0 END), 0)
             FROM policies
             WHERE org_id = ?1",
            params![org, today.to_string()],
            |r| {
                Ok(PolicyCounts {
                    total: r.get::<_, i64>(0)? as u32,
                    effective: r.get::<_, i64>(1)? as u32,
                    draft: r.get::<_, i64>(2)? as u32,
                    in_review: r.get::<_, i64>(3)? as u32,
                    overdue_review: r.get::<_, i64>(4)? as u32,
                })
            },
        )
        .context("policy counts query failed")
    }

    pub fn policies_overdue_review(
        &self,
        org: &str,
        today: NaiveDate,
        limit: u32,
    ) -> anyhow::Result<Vec<PolicyReviewRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT title, status, next_review_date
             FROM policies
             WHERE org_id = ?1 AND status != 'retired'
               AND next_review_date IS NOT NULL AND next_review_date < ?2
             ORDER BY next_review_date ASC
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![org, today.to_string(), limit], |row| {
            Ok(PolicyReviewRow {
                title: row.get(0)?,
                status: row.get(1)?,
                next_review_date: row.get(2)?,
            })
        })?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    // ---- CAPAs ----

    pub fn capa_counts(&self, org: &str, today: NaiveDate) -> anyhow::Result<CapaCounts> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN status = 'closed' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status != 'closed'
                                       AND (due_date IS NULL OR due_date >= ?2)
                                      THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN status != 'closed'
                                       AND due_date IS NOT NULL AND due_date < ?2
                                      THEN 1 ELSE 0 END), 0)
             FROM capas
             WHERE org_id = ?1",
            params![org, today.to_string()],
            |r| {
                Ok(CapaCounts {
                    total: r.get::<_, i64>(0)? as u32,
                    closed: r.get::<_, i64>(1)? as u32,
                    open_active: r.get::<_, i64>(2)? as u32,
                    overdue_active: r.get::<_, i64>(3)? as u32,
                })
            },
        )
        .context("capa counts query failed")
    }

    pub fn overdue_capas(
        &self,
        org: &str,
        today: NaiveDate,
        limit: u32,
    ) -> anyhow::Result<Vec<OverdueCapa>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT title, owner, due_date
             FROM capas
             WHERE org_id = ?1 AND status != 'closed'
               AND due_date IS NOT NULL AND due_date < ?2
             ORDER BY due_date ASC
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![org, today.to_string(), limit], |row| {
            Ok(OverdueCapa {
                title: row.get(0)?,
                owner: row.get(1)?,
                due_date: row.get(2)?,
            })
        })?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    // ---- findings ----

    pub fn open_findings(&self, org: &str, limit: u32) -> anyhow::Result<Vec<FindingRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT title, severity
             FROM findings
             WHERE org_id = ?1 AND status = 'open'
             ORDER BY CASE severity
                        WHEN 'critical' THEN 0
                        WHEN 'high' THEN 1
                        WHEN 'medium' THEN 2
                        ELSE 3
                      END, id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![org, limit], |row| {
            Ok(FindingRow {
                title: row.get(0)?,
                severity: row.get(1)?,
            })
        })?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    // ---- readiness scores ----

    /// Idempotent per (org, period): recomputation overwrites, never
    /// duplicates.
    pub fn upsert_readiness_score(
        &self,
        org: &str,
        period: Period,
        breakdown: &ScoreBreakdown,
    ) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO readiness_scores(
                org_id, period, overall_score, checkpoint_score, evidence_score,
                policy_score, capa_score, calculated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(org_id, period) DO UPDATE SET
                overall_score=excluded.overall_score,
                checkpoint_score=excluded.checkpoint_score,
                evidence_score=excluded.evidence_score,
                policy_score=excluded.policy_score,
                capa_score=excluded.capa_score,
                calculated_at=excluded.calculated_at",
            params![
                org,
                period.to_string(),
                breakdown.overall_score,
                breakdown.checkpoint_score,
                breakdown.evidence_score,
                breakdown.policy_score,
                breakdown.capa_score,
                now_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn get_readiness_score(
        &self,
        org: &str,
        period: Period,
    ) -> anyhow::Result<Option<StoredScore>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT period, overall_score, checkpoint_score, evidence_score,
                    policy_score, capa_score, calculated_at
             FROM readiness_scores
             WHERE org_id = ?1 AND period = ?2",
        )?;
        let mut rows = stmt.query(params![org, period.to_string()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(StoredScore {
                period: row.get(0)?,
                overall_score: row.get::<_, i64>(1)? as u8,
                checkpoint_score: row.get::<_, i64>(2)? as u8,
                evidence_score: row.get::<_, i64>(3)? as u8,
                policy_score: row.get::<_, i64>(4)? as u8,
                capa_score: row.get::<_, i64>(5)? as u8,
                calculated_at: row.get(6)?,
            }))
        } else {
            Ok(None)
        }
    }

    // ---- QM meetings ----
    // Explicit find-then-branch: the create and update paths carry
    // different default field sets.

    pub fn find_meeting(&self, org: &str, period: Period) -> anyhow::Result<Option<MeetingRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, status, summary, agenda_json, overall_score
             FROM qm_meetings
             WHERE org_id = ?1 AND period = ?2
             ORDER BY id ASC
             LIMIT 1",
        )?;
        let mut rows = stmt.query(params![org, period.to_string()])?;
        if let Some(row) = rows.next()? {
            let agenda_json: Option<String> = row.get(3)?;
            Ok(Some(MeetingRow {
                id: row.get(0)?,
                status: row.get(1)?,
                summary: row.get(2)?,
                agenda: agenda_json
                    .and_then(|s| serde_json::from_str(&s).ok())
                    .unwrap_or_default(),
                overall_score: row.get::<_, Option<i64>>(4)?.map(|v| v as u8),
            }))
        } else {
            Ok(None)
        }
    }

    pub fn insert_meeting(
        &self,
        org: &str,
        period: Period,
        summary: &str,
        agenda: &[String],
        overall_score: u8,
    ) -> anyhow::Result<i64> {
        let conn = self.conn.lock().unwrap();
        let now = now_rfc3339();
        conn.execute(
            "INSERT INTO qm_meetings(org_id, period, status, summary, agenda_json,
                                     overall_score, created_at, updated_at)
             VALUES (?1, ?2, 'draft', ?3, ?4, ?5, ?6, ?6)",
            params![
                org,
                period.to_string(),
                summary,
                serde_json::to_string(agenda)?,
                overall_score,
                now
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Updates the packet in place; meeting status is owned by the humans
    /// running the meeting and is left untouched.
    pub fn update_meeting(
        &self,
        meeting_id: i64,
        summary: &str,
        overall_score: u8,
    ) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE qm_meetings
             SET summary = ?1, overall_score = ?2, updated_at = ?3
             WHERE id = ?4",
            params![summary, overall_score, now_rfc3339(), meeting_id],
        )?;
        Ok(())
    }
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
