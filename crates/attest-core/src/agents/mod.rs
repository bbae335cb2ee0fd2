//! Analysis agents: gather → derive → prompt → complete → extract → persist.
//!
//! The driver in this module owns the run-ledger lifecycle. Every
//! invocation opens a run and closes it exactly once: `complete` on the
//! success path (including the degraded no-suggestions path), `fail` on
//! any error, which is then propagated to the caller.

use crate::config::EngineConfig;
use crate::extract::extract;
use crate::ledger::RunLedger;
use crate::model::{DraftSuggestion, Trigger};
use crate::providers::llm::{complete_with_retry, CompletionClient};
use crate::storage::Store;
use async_trait::async_trait;
use chrono::NaiveDate;

pub mod compliance_monitor;
pub mod evidence_librarian;
pub mod policy_guardian;
pub mod qm_orchestrator;

pub use compliance_monitor::ComplianceMonitor;
pub use evidence_librarian::EvidenceLibrarian;
pub use policy_guardian::PolicyGuardian;
pub use qm_orchestrator::QmOrchestrator;

/// What one agent's gather phase produced: plain-language facts for the
/// prompt and a deterministic summary to fall back on when the model
/// output yields no usable JSON.
#[derive(Debug, Clone, Default)]
pub struct Briefing {
    pub facts: Vec<String>,
    pub fallback_summary: String,
}

#[async_trait]
pub trait AnalysisAgent: Send + Sync {
    fn name(&self) -> &'static str;

    /// One-line role statement embedded in the prompt.
    fn mission(&self) -> &'static str;

    async fn gather(&self, store: &Store, org: &str, today: NaiveDate)
        -> anyhow::Result<Briefing>;

    /// Post-extraction hook, still inside the run: a failure here fails
    /// the run.
    async fn finalize(
        &self,
        _store: &Store,
        _org: &str,
        _today: NaiveDate,
        _summary: &str,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub run_id: i64,
    pub summary: String,
    pub suggestion_count: usize,
}

pub async fn run_agent(
    agent: &dyn AnalysisAgent,
    store: &Store,
    client: &dyn CompletionClient,
    cfg: &EngineConfig,
    org: &str,
    trigger: Trigger,
    today: NaiveDate,
) -> anyhow::Result<PipelineOutcome> {
    let ledger = RunLedger::new(store.clone());
    let input_summary = format!("{} analysis for {}", agent.name(), org);
    let (run_id, started) = ledger.start(org, agent.name(), trigger, &input_summary)?;

    match drive(agent, store, client, cfg, org, today).await {
        Ok(out) => {
            ledger.complete(
                run_id,
                org,
                agent.name(),
                &out.suggestions,
                &out.summary,
                out.tokens_used,
                started,
            )?;
            Ok(PipelineOutcome {
                run_id,
                summary: out.summary,
                suggestion_count: out.suggestions.len(),
            })
        }
        Err(e) => {
            ledger.fail(run_id, &format!("{:#}", e), started)?;
            Err(e)
        }
    }
}

struct DriveOutput {
    summary: String,
    suggestions: Vec<DraftSuggestion>,
    tokens_used: u32,
}

async fn drive(
    agent: &dyn AnalysisAgent,
    store: &Store,
    client: &dyn CompletionClient,
    cfg: &EngineConfig,
    org: &str,
    today: NaiveDate,
) -> anyhow::Result<DriveOutput> {
    let briefing = agent.gather(store, org, today).await?;
    let prompt = render_prompt(agent.name(), agent.mission(), org, &briefing);

    let completion =
        complete_with_retry(client, &prompt, cfg.max_output_tokens, &cfg.retry_policy()).await?;

    let (summary, suggestions) = match extract(&completion.text) {
        Some(reply) => {
            let summary = if reply.summary.trim().is_empty() {
                briefing.fallback_summary.clone()
            } else {
                reply.summary
            };
            (summary, reply.suggestions)
        }
        None => {
            // Not an engine failure: the run completes with a locally
            // computed summary and zero suggestions.
            tracing::warn!(
                event = "attest.extract.miss",
                agent = agent.name(),
                org,
                "model output contained no parsable JSON object",
            );
            (briefing.fallback_summary.clone(), Vec::new())
        }
    };

    agent.finalize(store, org, today, &summary).await?;

    Ok(DriveOutput {
        summary,
        suggestions,
        tokens_used: completion.tokens_used,
    })
}

fn render_prompt(name: &str, mission: &str, org: &str, briefing: &Briefing) -> String {
    let mut facts = String::new();
    for f in &briefing.facts {
        facts.push_str("- ");
        facts.push_str(f);
        facts.push('\n');
    }

    format!(
        "You are {name}, an analysis agent for a compliance-tracking system. {mission}\n\
         \n\
         Organization: {org}\n\
         \n\
         Observations:\n\
         {facts}\
         \n\
         Respond with exactly one JSON object and no other text, shaped as:\n\
         {{\"summary\": \"one-paragraph assessment\", \"suggestions\": [{{\"entity_type\": \"checkpoint|control|policy|capa\", \
         \"entity_id\": \"optional id of the target entity\", \"suggestion_type\": \"edit|create|flag|review\", \
         \"title\": \"short imperative\", \"description\": \"what to do and why\", \
         \"suggested_changes\": {{}}, \"confidence\": 0.0}}]}}\n"
    )
}

/// Runs one blocking read query on the runtime's blocking pool so that
/// independent gather queries can fan out.
pub(crate) async fn spawn_query<T, F>(f: F) -> anyhow::Result<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| anyhow::anyhow!("gather task failed: {e}"))?
}
