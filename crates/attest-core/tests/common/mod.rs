#![allow(dead_code)]

use attest_core::storage::Store;
use rusqlite::params;

pub fn mem_store() -> Store {
    let store = Store::memory().expect("in-memory store");
    store.init_schema().expect("schema");
    store
}

pub fn insert_control(
    store: &Store,
    org: &str,
    code: &str,
    title: &str,
    frequency: &str,
    category: Option<&str>,
    active: bool,
) -> i64 {
    let conn = store.conn.lock().unwrap();
    conn.execute(
        "INSERT INTO controls(org_id, code, title, category, frequency, active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, '2026-01-01T00:00:00Z')",
        params![org, code, title, category, frequency, active as i64],
    )
    .expect("insert control");
    conn.last_insert_rowid()
}

pub fn insert_checkpoint(
    store: &Store,
    org: &str,
    control_id: i64,
    period: &str,
    status: &str,
    due_date: &str,
) -> i64 {
    let conn = store.conn.lock().unwrap();
    conn.execute(
        "INSERT INTO checkpoints(org_id, control_id, period, status, due_date, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, '2026-01-01T00:00:00Z')",
        params![org, control_id, period, status, due_date],
    )
    .expect("insert checkpoint");
    conn.last_insert_rowid()
}

pub fn insert_evidence(store: &Store, org: &str, checkpoint_id: i64, name: &str) {
    let conn = store.conn.lock().unwrap();
    conn.execute(
        "INSERT INTO evidence(org_id, checkpoint_id, name, uploaded_at)
         VALUES (?1, ?2, ?3, '2026-01-01T00:00:00Z')",
        params![org, checkpoint_id, name],
    )
    .expect("insert evidence");
}

pub fn insert_policy(
    store: &Store,
    org: &str,
    title: &str,
    status: &str,
    next_review_date: Option<&str>,
) {
    let conn = store.conn.lock().unwrap();
    conn.execute(
        "INSERT INTO policies(org_id, title, status, next_review_date)
         VALUES (?1, ?2, ?3, ?4)",
        params![org, title, status, next_review_date],
    )
    .expect("insert policy");
}

pub fn insert_capa(store: &Store, org: &str, title: &str, status: &str, due_date: Option<&str>) {
    let conn = store.conn.lock().unwrap();
    conn.execute(
        "INSERT INTO capas(org_id, title, status, due_date)
         VALUES (?1, ?2, ?3, ?4)",
        params![org, title, status, due_date],
    )
    .expect("insert capa");
}

pub fn count_rows(store: &Store, table: &str, org: &str) -> i64 {
    let conn = store.conn.lock().unwrap();
    let sql = format!("SELECT COUNT(*) FROM {} WHERE org_id = ?1", table);
    conn.query_row(&sql, params![org], |r| r.get(0))
        .expect("count rows")
}
