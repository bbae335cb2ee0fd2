mod common;

use attest_core::generator::{
    generate_for_period, seed_schedule, SeedControl, SeedOutcome, SeedRow,
};
use attest_core::model::{Frequency, Period};
use common::*;

fn seed_row(code: &str, title: &str, frequency: Frequency, period: &str) -> SeedRow {
    SeedRow {
        control: SeedControl {
            code: code.into(),
            title: title.into(),
            standard: None,
            category: None,
            frequency,
            required_evidence: vec![],
            test_procedure: None,
            owner_role: None,
        },
        period: period.into(),
        due_date: None,
        assignee: None,
    }
}

#[test]
fn generate_is_idempotent() -> anyhow::Result<()> {
    let store = mem_store();
    insert_control(&store, "acme", "AC-1", "Access review", "monthly", None, true);
    insert_control(&store, "acme", "AC-2", "Backup restore test", "monthly", None, true);
    insert_control(&store, "acme", "AC-3", "Retired control", "monthly", None, false);
    insert_control(&store, "acme", "AC-4", "Pen test", "quarterly", None, true);

    let period = Period::parse("2026-02").unwrap();

    // February: monthly controls only, quarterly is not due.
    let first = generate_for_period(&store, "acme", period)?;
    assert_eq!(first.created, 2);
    assert_eq!(first.skipped, 0);

    let second = generate_for_period(&store, "acme", period)?;
    assert_eq!(second.created, 0);
    assert_eq!(second.skipped, 2);

    assert_eq!(count_rows(&store, "checkpoints", "acme"), 2);
    Ok(())
}

#[test]
fn generate_matches_quarterly_in_april() -> anyhow::Result<()> {
    let store = mem_store();
    insert_control(&store, "acme", "AC-4", "Pen test", "quarterly", None, true);

    let feb = generate_for_period(&store, "acme", Period::parse("2026-02").unwrap())?;
    assert_eq!(feb.created, 0);

    let apr = generate_for_period(&store, "acme", Period::parse("2026-04").unwrap())?;
    assert_eq!(apr.created, 1);
    Ok(())
}

#[test]
fn generated_checkpoints_are_pending_with_month_end_due_date() -> anyhow::Result<()> {
    let store = mem_store();
    insert_control(&store, "acme", "AC-1", "Access review", "monthly", None, true);
    generate_for_period(&store, "acme", Period::parse("2026-02").unwrap())?;

    let conn = store.conn.lock().unwrap();
    let (status, due): (String, String) = conn.query_row(
        "SELECT status, due_date FROM checkpoints WHERE org_id = 'acme'",
        [],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    assert_eq!(status, "pending");
    assert_eq!(due, "2026-02-28");
    Ok(())
}

#[test]
fn seed_creates_controls_and_checkpoints() -> anyhow::Result<()> {
    let store = mem_store();
    let rows = vec![
        seed_row("AC-1", "Access review", Frequency::Monthly, "2026-01"),
        seed_row("AC-1", "Access review", Frequency::Monthly, "2026-02"),
        seed_row("AC-4", "Pen test", Frequency::Quarterly, "2026-01"),
    ];

    let outcome = seed_schedule(&store, "acme", &rows)?;
    assert_eq!(
        outcome,
        SeedOutcome::Seeded {
            controls: 2,
            checkpoints: 3
        }
    );
    assert_eq!(count_rows(&store, "controls", "acme"), 2);
    assert_eq!(count_rows(&store, "checkpoints", "acme"), 3);
    Ok(())
}

#[test]
fn seed_reuses_existing_control_codes() -> anyhow::Result<()> {
    let store = mem_store();
    // Existing control, but no checkpoints yet, so seeding is allowed.
    insert_control(&store, "acme", "AC-1", "Access review", "monthly", None, true);

    let rows = vec![
        seed_row("AC-1", "Access review", Frequency::Monthly, "2026-01"),
        seed_row("AC-2", "Backup restore test", Frequency::Monthly, "2026-01"),
    ];
    let outcome = seed_schedule(&store, "acme", &rows)?;
    assert_eq!(
        outcome,
        SeedOutcome::Seeded {
            controls: 1,
            checkpoints: 2
        }
    );
    assert_eq!(count_rows(&store, "controls", "acme"), 2);
    Ok(())
}

#[test]
fn seed_rejects_outright_when_any_checkpoint_exists() -> anyhow::Result<()> {
    let store = mem_store();
    let control_id =
        insert_control(&store, "acme", "AC-1", "Access review", "monthly", None, true);
    insert_checkpoint(&store, "acme", control_id, "2026-01", "passed", "2026-01-31");

    let rows = vec![seed_row("AC-9", "New control", Frequency::Monthly, "2026-02")];
    let outcome = seed_schedule(&store, "acme", &rows)?;
    assert!(matches!(outcome, SeedOutcome::Rejected { .. }));

    // Zero writes: the new control was not inserted either.
    assert_eq!(count_rows(&store, "controls", "acme"), 1);
    assert_eq!(count_rows(&store, "checkpoints", "acme"), 1);
    Ok(())
}

#[test]
fn second_seed_is_rejected() -> anyhow::Result<()> {
    let store = mem_store();
    let rows = vec![seed_row("AC-1", "Access review", Frequency::Monthly, "2026-01")];

    assert!(matches!(
        seed_schedule(&store, "acme", &rows)?,
        SeedOutcome::Seeded { .. }
    ));
    assert!(matches!(
        seed_schedule(&store, "acme", &rows)?,
        SeedOutcome::Rejected { .. }
    ));
    assert_eq!(count_rows(&store, "checkpoints", "acme"), 1);
    Ok(())
}

#[test]
fn seed_rejection_is_scoped_per_org() -> anyhow::Result<()> {
    let store = mem_store();
    let rows = vec![seed_row("AC-1", "Access review", Frequency::Monthly, "2026-01")];

    assert!(matches!(
        seed_schedule(&store, "acme", &rows)?,
        SeedOutcome::Seeded { .. }
    ));
    // A different organization is unaffected by acme's schedule.
    assert!(matches!(
        seed_schedule(&store, "globex", &rows)?,
        SeedOutcome::Seeded { .. }
    ));
    Ok(())
}
