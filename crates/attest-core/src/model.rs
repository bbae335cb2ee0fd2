use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One month of a recurring compliance schedule, rendered "YYYY-MM".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn parse(s: &str) -> Option<Self> {
        let (y, m) = s.split_once('-')?;
        let year: i32 = y.parse().ok()?;
        let month: u32 = m.parse().ok()?;
        if !(1..=12).contains(&month) {
            return None;
        }
        Some(Self { year, month })
    }

    pub fn from_date(d: NaiveDate) -> Self {
        Self {
            year: d.year(),
            month: d.month(),
        }
    }

    /// Last day of the period's month.
    pub fn due_date(&self) -> NaiveDate {
        let (ny, nm) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(ny, nm, 1)
            .and_then(|d| d.pred_opt())
            .unwrap_or(NaiveDate::MIN)
    }

    /// Whether a control with the given recurrence is due in this period.
    /// Intervals are anchored at January: a quarterly control is due in
    /// January, April, July and October.
    pub fn matches(&self, frequency: Frequency) -> bool {
        (self.month - 1) % frequency.interval_months() == 0
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Monthly,
    Quarterly,
    Semiannual,
    Annual,
}

impl Frequency {
    pub fn interval_months(&self) -> u32 {
        match self {
            Frequency::Monthly => 1,
            Frequency::Quarterly => 3,
            Frequency::Semiannual => 6,
            Frequency::Annual => 12,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "quarterly" => Frequency::Quarterly,
            "semiannual" => Frequency::Semiannual,
            "annual" => Frequency::Annual,
            _ => Frequency::Monthly,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Semiannual => "semiannual",
            Frequency::Annual => "annual",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Control {
    pub id: i64,
    pub org_id: String,
    pub code: String,
    pub title: String,
    pub standard: Option<String>,
    pub category: Option<String>,
    pub frequency: Frequency,
    pub required_evidence: Vec<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Manual,
    Scheduled,
    Event,
}

impl Trigger {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(Trigger::Manual),
            "scheduled" => Some(Trigger::Scheduled),
            "event" => Some(Trigger::Event),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Manual => "manual",
            Trigger::Scheduled => "scheduled",
            Trigger::Event => "event",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "completed" => RunStatus::Completed,
            "failed" => RunStatus::Failed,
            _ => RunStatus::Running,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

/// One execution record of an analysis agent.
#[derive(Debug, Clone)]
pub struct AgentRunRow {
    pub id: i64,
    pub org_id: String,
    pub agent: String,
    pub trigger: Trigger,
    pub status: RunStatus,
    pub input_summary: Option<String>,
    pub output_summary: Option<String>,
    pub tokens_used: Option<u32>,
    pub duration_ms: Option<u64>,
    pub error: Option<String>,
    pub started_at: String,
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Edit,
    Create,
    Flag,
    Review,
}

impl Default for SuggestionKind {
    fn default() -> Self {
        SuggestionKind::Flag
    }
}

impl SuggestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionKind::Edit => "edit",
            SuggestionKind::Create => "create",
            SuggestionKind::Flag => "flag",
            SuggestionKind::Review => "review",
        }
    }
}

/// One recommendation as emitted by the model, before persistence.
///
/// `suggested_changes` is an opaque JSON payload; its shape depends on the
/// suggestion kind: `edit` carries the field/value pairs to change on the
/// target entity, `create` the draft fields of a new entity, `flag` and
/// `review` usually omit it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftSuggestion {
    #[serde(default)]
    pub entity_type: String,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub suggestion_type: SuggestionKind,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub suggested_changes: Option<serde_json::Value>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    0.5
}

/// The one JSON object an agent prompt instructs the model to return.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelReply {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub suggestions: Vec<DraftSuggestion>,
}

// ---- aggregate rows produced by the gather queries ----

#[derive(Debug, Clone, Copy, Default)]
pub struct CheckpointTally {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub pending: u32,
    pub overdue: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyCounts {
    pub total: u32,
    pub effective: u32,
    pub draft: u32,
    pub in_review: u32,
    pub overdue_review: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CapaCounts {
    pub total: u32,
    pub closed: u32,
    pub open_active: u32,
    pub overdue_active: u32,
}

#[derive(Debug, Clone)]
pub struct OverdueCheckpoint {
    pub control_title: String,
    pub period: String,
    pub due_date: String,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct RepeatFailure {
    pub code: String,
    pub title: String,
    pub failures: u32,
}

#[derive(Debug, Clone)]
pub struct CategoryCoverage {
    pub category: String,
    pub total: u32,
    pub passed: u32,
}

/// A passed checkpoint with no evidence attached.
#[derive(Debug, Clone)]
pub struct UncoveredCheckpoint {
    pub checkpoint_id: i64,
    pub control_title: String,
}

#[derive(Debug, Clone)]
pub struct PolicyReviewRow {
    pub title: String,
    pub status: String,
    pub next_review_date: String,
}

#[derive(Debug, Clone)]
pub struct OverdueCapa {
    pub title: String,
    pub owner: Option<String>,
    pub due_date: String,
}

#[derive(Debug, Clone)]
pub struct FindingRow {
    pub title: String,
    pub severity: String,
}

#[derive(Debug, Clone)]
pub struct StoredScore {
    pub period: String,
    pub overall_score: u8,
    pub checkpoint_score: u8,
    pub evidence_score: u8,
    pub policy_score: u8,
    pub capa_score: u8,
    pub calculated_at: String,
}

#[derive(Debug, Clone)]
pub struct MeetingRow {
    pub id: i64,
    pub status: String,
    pub summary: Option<String>,
    pub agenda: Vec<String>,
    pub overall_score: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_parse_and_display() {
        let p = Period::parse("2026-03").unwrap();
        assert_eq!(p, Period { year: 2026, month: 3 });
        assert_eq!(p.to_string(), "2026-03");
        assert!(Period::parse("2026-13").is_none());
        assert!(Period::parse("march").is_none());
    }

    #[test]
    fn period_due_date_is_month_end() {
        let p = Period::parse("2026-02").unwrap();
        assert_eq!(p.due_date(), NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
        let dec = Period::parse("2025-12").unwrap();
        assert_eq!(dec.due_date(), NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
    }

    #[test]
    fn frequency_matching_is_january_anchored() {
        let jan = Period::parse("2026-01").unwrap();
        let feb = Period::parse("2026-02").unwrap();
        let apr = Period::parse("2026-04").unwrap();
        let jul = Period::parse("2026-07").unwrap();

        assert!(feb.matches(Frequency::Monthly));
        assert!(jan.matches(Frequency::Quarterly));
        assert!(apr.matches(Frequency::Quarterly));
        assert!(!feb.matches(Frequency::Quarterly));
        assert!(jul.matches(Frequency::Semiannual));
        assert!(jan.matches(Frequency::Annual));
        assert!(!apr.matches(Frequency::Annual));
    }
}
