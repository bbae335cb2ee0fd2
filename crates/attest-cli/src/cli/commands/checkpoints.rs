use super::open_store;
use crate::cli::args::{GenerateArgs, SeedArgs};
use anyhow::Context;
use attest_core::generator::{generate_for_period, seed_schedule, SeedOutcome, SeedRow};
use attest_core::model::Period;

pub fn generate(args: GenerateArgs) -> anyhow::Result<i32> {
    let store = open_store(&args.db)?;
    let period = Period::parse(&args.period)
        .ok_or_else(|| anyhow::anyhow!("invalid period '{}' (expected YYYY-MM)", args.period))?;

    let report = generate_for_period(&store, &args.org, period)?;
    println!(
        "{}: created {} checkpoints, skipped {} already present",
        period, report.created, report.skipped
    );
    Ok(0)
}

pub fn seed(args: SeedArgs) -> anyhow::Result<i32> {
    let store = open_store(&args.db)?;
    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let rows: Vec<SeedRow> = serde_yaml::from_str(&raw).context("failed to parse schedule YAML")?;

    match seed_schedule(&store, &args.org, &rows)? {
        SeedOutcome::Seeded {
            controls,
            checkpoints,
        } => {
            println!("seeded {} controls and {} checkpoints", controls, checkpoints);
            Ok(0)
        }
        SeedOutcome::Rejected { reason } => {
            eprintln!("seed rejected: {}", reason);
            Ok(1)
        }
    }
}
