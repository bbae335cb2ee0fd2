pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS controls (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  org_id TEXT NOT NULL,
  code TEXT NOT NULL,
  title TEXT NOT NULL,
  standard TEXT,
  category TEXT,
  frequency TEXT NOT NULL,
  required_evidence_json TEXT,
  test_procedure TEXT,
  owner_role TEXT,
  active INTEGER NOT NULL DEFAULT 1,
  created_at TEXT NOT NULL,
  UNIQUE (org_id, code)
);

-- No uniqueness on (control_id, period): the generator checks existence
-- explicitly before insert.
CREATE TABLE IF NOT EXISTS checkpoints (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  org_id TEXT NOT NULL,
  control_id INTEGER NOT NULL REFERENCES controls(id),
  period TEXT NOT NULL,
  status TEXT NOT NULL,
  due_date TEXT NOT NULL,
  assignee TEXT,
  attestation TEXT,
  completed_at TEXT,
  completed_by TEXT,
  created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_checkpoints_org_period ON checkpoints(org_id, period);

CREATE TABLE IF NOT EXISTS evidence (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  org_id TEXT NOT NULL,
  checkpoint_id INTEGER NOT NULL REFERENCES checkpoints(id),
  name TEXT NOT NULL,
  kind TEXT,
  size_bytes INTEGER,
  uploaded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_evidence_checkpoint ON evidence(checkpoint_id);

CREATE TABLE IF NOT EXISTS policies (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  org_id TEXT NOT NULL,
  title TEXT NOT NULL,
  status TEXT NOT NULL,
  review_months INTEGER,
  next_review_date TEXT,
  updated_at TEXT
);

CREATE TABLE IF NOT EXISTS capas (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  org_id TEXT NOT NULL,
  title TEXT NOT NULL,
  status TEXT NOT NULL,
  due_date TEXT,
  owner TEXT,
  opened_at TEXT
);

CREATE TABLE IF NOT EXISTS findings (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  org_id TEXT NOT NULL,
  title TEXT NOT NULL,
  severity TEXT NOT NULL,
  status TEXT NOT NULL,
  created_at TEXT
);

CREATE TABLE IF NOT EXISTS agent_runs (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  org_id TEXT NOT NULL,
  agent TEXT NOT NULL,
  trigger_type TEXT NOT NULL,
  status TEXT NOT NULL,
  input_summary TEXT,
  output_summary TEXT,
  tokens_used INTEGER,
  duration_ms INTEGER,
  error TEXT,
  started_at TEXT NOT NULL,
  completed_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_agent_runs_org ON agent_runs(org_id, id);

CREATE TABLE IF NOT EXISTS suggestions (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  run_id INTEGER NOT NULL REFERENCES agent_runs(id),
  org_id TEXT NOT NULL,
  entity_type TEXT NOT NULL,
  entity_id TEXT,
  kind TEXT NOT NULL,
  title TEXT NOT NULL,
  description TEXT,
  suggested_changes_json TEXT,
  confidence REAL NOT NULL,
  review_status TEXT NOT NULL DEFAULT 'pending',
  created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_suggestions_run ON suggestions(run_id);

CREATE TABLE IF NOT EXISTS readiness_scores (
  org_id TEXT NOT NULL,
  period TEXT NOT NULL,
  overall_score INTEGER NOT NULL,
  checkpoint_score INTEGER NOT NULL,
  evidence_score INTEGER NOT NULL,
  policy_score INTEGER NOT NULL,
  capa_score INTEGER NOT NULL,
  calculated_at TEXT NOT NULL,
  PRIMARY KEY (org_id, period)
);

CREATE TABLE IF NOT EXISTS qm_meetings (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  org_id TEXT NOT NULL,
  period TEXT NOT NULL,
  status TEXT NOT NULL,
  summary TEXT,
  agenda_json TEXT,
  overall_score INTEGER,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_qm_meetings_org_period ON qm_meetings(org_id, period);
"#;
