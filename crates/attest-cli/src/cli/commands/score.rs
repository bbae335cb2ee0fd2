use super::open_store;
use crate::cli::args::ScoreShowArgs;
use attest_core::model::Period;

pub fn show(args: ScoreShowArgs) -> anyhow::Result<i32> {
    let store = open_store(&args.db)?;
    let period = Period::parse(&args.period)
        .ok_or_else(|| anyhow::anyhow!("invalid period '{}' (expected YYYY-MM)", args.period))?;

    match store.get_readiness_score(&args.org, period)? {
        Some(score) => {
            println!("audit readiness for {} in {}", args.org, score.period);
            println!("  overall      {:>3}", score.overall_score);
            println!("  checkpoints  {:>3}", score.checkpoint_score);
            println!("  evidence     {:>3}", score.evidence_score);
            println!("  policies     {:>3}", score.policy_score);
            println!("  capas        {:>3}", score.capa_score);
            println!("  calculated   {}", score.calculated_at);
            Ok(0)
        }
        None => {
            eprintln!(
                "no score recorded for {} in {}; run the qm-orchestrator agent first",
                args.org, period
            );
            Ok(1)
        }
    }
}
