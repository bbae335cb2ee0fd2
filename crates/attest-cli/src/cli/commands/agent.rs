use super::open_store;
use crate::cli::args::AgentRunArgs;
use attest_core::agents::{
    run_agent, AnalysisAgent, ComplianceMonitor, EvidenceLibrarian, PolicyGuardian, QmOrchestrator,
};
use attest_core::config::EngineConfig;
use attest_core::model::Trigger;
use attest_core::providers::llm::openai::OpenAiClient;

pub async fn run(args: AgentRunArgs) -> anyhow::Result<i32> {
    let store = open_store(&args.db)?;

    let cfg = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let trigger = Trigger::parse(&args.trigger).ok_or_else(|| {
        anyhow::anyhow!(
            "unknown trigger '{}' (expected manual|scheduled|event)",
            args.trigger
        )
    })?;

    let agent: Box<dyn AnalysisAgent> = match args.name.as_str() {
        "compliance-monitor" => Box::new(ComplianceMonitor),
        "evidence-librarian" => Box::new(EvidenceLibrarian),
        "policy-guardian" => Box::new(PolicyGuardian),
        "qm-orchestrator" => Box::new(QmOrchestrator),
        other => anyhow::bail!(
            "unknown agent '{}' (expected compliance-monitor|evidence-librarian|policy-guardian|qm-orchestrator)",
            other
        ),
    };

    let client = OpenAiClient::new(cfg.model.clone(), args.api_key.clone());
    let today = chrono::Utc::now().date_naive();

    match run_agent(
        agent.as_ref(),
        &store,
        &client,
        &cfg,
        &args.org,
        trigger,
        today,
    )
    .await
    {
        Ok(outcome) => {
            println!(
                "run {} completed: {} ({} suggestions pending review)",
                outcome.run_id, outcome.summary, outcome.suggestion_count
            );
            Ok(0)
        }
        Err(e) => {
            // The same message is stored on the run row.
            eprintln!("run failed: {:#}", e);
            Ok(1)
        }
    }
}
