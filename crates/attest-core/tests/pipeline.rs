mod common;

use attest_core::agents::{run_agent, ComplianceMonitor, QmOrchestrator};
use attest_core::config::EngineConfig;
use attest_core::model::{RunStatus, Trigger};
use attest_core::providers::llm::fake::FakeClient;
use attest_core::providers::llm::{Completion, CompletionError};
use common::*;
use rusqlite::params;

fn test_config() -> EngineConfig {
    EngineConfig {
        retry_attempts: 2,
        retry_base_delay_ms: 1,
        timeout_seconds: 5,
        ..EngineConfig::default()
    }
}

fn today() -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
}

/// 10 checkpoints for 2026-03: 7 passed (5 with evidence), 2 failed,
/// 1 pending past its due date.
fn seed_march_fixtures(store: &attest_core::storage::Store) {
    let control = insert_control(store, "acme", "AC-1", "Access review", "monthly", None, true);
    for i in 0..7 {
        let id = insert_checkpoint(store, "acme", control, "2026-03", "passed", "2026-03-31");
        if i < 5 {
            insert_evidence(store, "acme", id, "review.pdf");
        }
    }
    for _ in 0..2 {
        insert_checkpoint(store, "acme", control, "2026-03", "failed", "2026-03-31");
    }
    insert_checkpoint(store, "acme", control, "2026-03", "pending", "2026-03-05");
}

#[tokio::test]
async fn fenced_json_reply_completes_run() -> anyhow::Result<()> {
    let store = mem_store();
    seed_march_fixtures(&store);
    let client =
        FakeClient::with_text("Here you go:\n```json\n{\"summary\":\"ok\",\"suggestions\":[]}\n```");

    let outcome = run_agent(
        &ComplianceMonitor,
        &store,
        &client,
        &test_config(),
        "acme",
        Trigger::Manual,
        today(),
    )
    .await?;

    assert_eq!(outcome.summary, "ok");
    assert_eq!(outcome.suggestion_count, 0);

    let conn = store.conn.lock().unwrap();
    let (status, tokens): (String, Option<i64>) = conn.query_row(
        "SELECT status, tokens_used FROM agent_runs WHERE id = ?1",
        params![outcome.run_id],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    assert_eq!(status, "completed");
    assert!(tokens.is_some());
    Ok(())
}

#[tokio::test]
async fn model_suggestions_are_persisted_pending() -> anyhow::Result<()> {
    let store = mem_store();
    seed_march_fixtures(&store);
    let client = FakeClient::with_text(
        r#"{"summary":"one overdue checkpoint","suggestions":[
            {"entity_type":"checkpoint","entity_id":"10","suggestion_type":"flag",
             "title":"Chase the overdue access review","description":"Due 2026-03-05","confidence":0.9}
        ]}"#,
    );

    let outcome = run_agent(
        &ComplianceMonitor,
        &store,
        &client,
        &test_config(),
        "acme",
        Trigger::Scheduled,
        today(),
    )
    .await?;

    assert_eq!(outcome.suggestion_count, 1);

    let conn = store.conn.lock().unwrap();
    let (kind, review_status, confidence): (String, String, f64) = conn.query_row(
        "SELECT kind, review_status, confidence FROM suggestions WHERE run_id = ?1",
        params![outcome.run_id],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
    )?;
    assert_eq!(kind, "flag");
    assert_eq!(review_status, "pending");
    assert!((confidence - 0.9).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn prose_reply_degrades_to_deterministic_summary() -> anyhow::Result<()> {
    let store = mem_store();
    seed_march_fixtures(&store);
    let client = FakeClient::with_text("I looked around and everything seems mostly fine.");

    let outcome = run_agent(
        &ComplianceMonitor,
        &store,
        &client,
        &test_config(),
        "acme",
        Trigger::Manual,
        today(),
    )
    .await?;

    // Degraded, not failed: deterministic summary, zero suggestions.
    assert!(outcome.summary.starts_with("Scanned 10 checkpoints"));
    assert_eq!(outcome.suggestion_count, 0);

    let conn = store.conn.lock().unwrap();
    let status: String = conn.query_row(
        "SELECT status FROM agent_runs WHERE id = ?1",
        params![outcome.run_id],
        |r| r.get(0),
    )?;
    assert_eq!(status, "completed");
    Ok(())
}

#[tokio::test]
async fn completion_timeout_fails_run_with_stored_error() -> anyhow::Result<()> {
    let store = mem_store();
    seed_march_fixtures(&store);
    // Both attempts time out; the error is terminal.
    let client = FakeClient::scripted(vec![
        Err(CompletionError::Timeout(5)),
        Err(CompletionError::Timeout(5)),
    ]);

    let result = run_agent(
        &ComplianceMonitor,
        &store,
        &client,
        &test_config(),
        "acme",
        Trigger::Manual,
        today(),
    )
    .await;
    assert!(result.is_err());

    let ledger = attest_core::ledger::RunLedger::new(store.clone());
    let runs = ledger.recent("acme", 1)?;
    assert_eq!(runs[0].status, RunStatus::Failed);
    assert!(runs[0]
        .error
        .as_deref()
        .unwrap_or_default()
        .contains("timed out"));

    assert_eq!(count_rows(&store, "suggestions", "acme"), 0);
    Ok(())
}

#[tokio::test]
async fn transient_transport_error_is_retried() -> anyhow::Result<()> {
    let store = mem_store();
    seed_march_fixtures(&store);
    let client = FakeClient::scripted(vec![
        Err(CompletionError::Transport("connection reset".into())),
        Ok(Completion {
            text: r#"{"summary":"recovered","suggestions":[]}"#.into(),
            tokens_used: 12,
        }),
    ]);

    let outcome = run_agent(
        &ComplianceMonitor,
        &store,
        &client,
        &test_config(),
        "acme",
        Trigger::Event,
        today(),
    )
    .await?;

    assert_eq!(outcome.summary, "recovered");
    assert_eq!(client.calls(), 2);
    Ok(())
}

#[tokio::test]
async fn qm_orchestrator_scores_and_builds_meeting_packet() -> anyhow::Result<()> {
    let store = mem_store();
    seed_march_fixtures(&store);
    insert_policy(&store, "acme", "Data retention", "effective", Some("2027-01-01"));
    insert_policy(&store, "acme", "Access control", "effective", Some("2026-01-01"));
    insert_capa(&store, "acme", "Fix backup gap", "closed", None);
    insert_capa(&store, "acme", "Patch cadence", "open", Some("2026-02-01"));

    let client = FakeClient::with_text(r#"{"summary":"readiness assessed","suggestions":[]}"#);
    let outcome = run_agent(
        &QmOrchestrator,
        &store,
        &client,
        &test_config(),
        "acme",
        Trigger::Scheduled,
        today(),
    )
    .await?;
    assert_eq!(outcome.summary, "readiness assessed");

    let period = attest_core::model::Period::parse("2026-03").unwrap();
    let score = store.get_readiness_score("acme", period)?.expect("score row");
    assert_eq!(score.checkpoint_score, 70);
    assert_eq!(score.evidence_score, 71);
    // 2 policies, 2 effective, 1 overdue for review -> 50.
    assert_eq!(score.policy_score, 50);
    // 1 closed of 2 -> 50.
    assert_eq!(score.capa_score, 50);
    // 70*0.35 + 71*0.25 + 50*0.25 + 50*0.15 = 62.25 -> 62.
    assert_eq!(score.overall_score, 62);

    let meeting = store.find_meeting("acme", period)?.expect("meeting row");
    assert_eq!(meeting.status, "draft");
    assert_eq!(meeting.summary.as_deref(), Some("readiness assessed"));
    assert!(!meeting.agenda.is_empty());
    assert_eq!(meeting.overall_score, Some(62));
    Ok(())
}

#[tokio::test]
async fn second_scoring_pass_updates_in_place() -> anyhow::Result<()> {
    let store = mem_store();
    seed_march_fixtures(&store);

    for summary in ["first pass", "second pass"] {
        let client = FakeClient::with_text(&format!(
            r#"{{"summary":"{}","suggestions":[]}}"#,
            summary
        ));
        run_agent(
            &QmOrchestrator,
            &store,
            &client,
            &test_config(),
            "acme",
            Trigger::Scheduled,
            today(),
        )
        .await?;
    }

    // Upserted, never duplicated.
    let conn = store.conn.lock().unwrap();
    let scores: i64 = conn.query_row(
        "SELECT COUNT(*) FROM readiness_scores WHERE org_id = 'acme'",
        [],
        |r| r.get(0),
    )?;
    let meetings: i64 = conn.query_row(
        "SELECT COUNT(*) FROM qm_meetings WHERE org_id = 'acme'",
        [],
        |r| r.get(0),
    )?;
    let summary: String = conn.query_row(
        "SELECT summary FROM qm_meetings WHERE org_id = 'acme'",
        [],
        |r| r.get(0),
    )?;
    assert_eq!(scores, 1);
    assert_eq!(meetings, 1);
    assert_eq!(summary, "second pass");
    Ok(())
}

#[tokio::test]
async fn gather_failure_fails_run_before_completion_call() -> anyhow::Result<()> {
    let store = mem_store();
    // Break the schema so the gather queries fail.
    {
        let conn = store.conn.lock().unwrap();
        conn.execute_batch("DROP TABLE checkpoints")?;
    }
    let client = FakeClient::with_text("{}");

    let result = run_agent(
        &ComplianceMonitor,
        &store,
        &client,
        &test_config(),
        "acme",
        Trigger::Manual,
        today(),
    )
    .await;
    assert!(result.is_err());

    // The run was opened and then failed; the model was never called.
    let ledger = attest_core::ledger::RunLedger::new(store.clone());
    let runs = ledger.recent("acme", 1)?;
    assert_eq!(runs[0].status, RunStatus::Failed);
    assert_eq!(client.calls(), 0);
    Ok(())
}
