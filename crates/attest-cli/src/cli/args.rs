use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "attest",
    version,
    about = "Compliance agent orchestration and audit-readiness scoring"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run an analysis agent
    Agent(AgentArgs),
    /// Generate or seed period checkpoints
    Checkpoints(CheckpointsArgs),
    /// Inspect audit-readiness scores
    Score(ScoreArgs),
    /// Inspect agent run history
    Runs(RunsArgs),
}

#[derive(Parser)]
pub struct AgentArgs {
    #[command(subcommand)]
    pub cmd: AgentSub,
}

#[derive(Subcommand)]
pub enum AgentSub {
    Run(AgentRunArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct AgentRunArgs {
    /// Agent name: compliance-monitor|evidence-librarian|policy-guardian|qm-orchestrator
    pub name: String,

    #[arg(long)]
    pub org: String,

    #[arg(long, default_value = ".attest/attest.db")]
    pub db: PathBuf,

    /// Engine config YAML (defaults apply when omitted)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Trigger recorded on the run: manual|scheduled|event
    #[arg(long, default_value = "manual")]
    pub trigger: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: String,
}

#[derive(Parser)]
pub struct CheckpointsArgs {
    #[command(subcommand)]
    pub cmd: CheckpointsSub,
}

#[derive(Subcommand)]
pub enum CheckpointsSub {
    /// Instantiate checkpoints for every active control due in a period
    Generate(GenerateArgs),
    /// One-time bulk import of a fixed schedule
    Seed(SeedArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(long)]
    pub org: String,

    /// Target period, e.g. 2026-03
    #[arg(long)]
    pub period: String,

    #[arg(long, default_value = ".attest/attest.db")]
    pub db: PathBuf,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SeedArgs {
    #[arg(long)]
    pub org: String,

    /// Schedule YAML file
    #[arg(long)]
    pub file: PathBuf,

    #[arg(long, default_value = ".attest/attest.db")]
    pub db: PathBuf,
}

#[derive(Parser)]
pub struct ScoreArgs {
    #[command(subcommand)]
    pub cmd: ScoreSub,
}

#[derive(Subcommand)]
pub enum ScoreSub {
    Show(ScoreShowArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ScoreShowArgs {
    #[arg(long)]
    pub org: String,

    #[arg(long)]
    pub period: String,

    #[arg(long, default_value = ".attest/attest.db")]
    pub db: PathBuf,
}

#[derive(Parser)]
pub struct RunsArgs {
    #[command(subcommand)]
    pub cmd: RunsSub,
}

#[derive(Subcommand)]
pub enum RunsSub {
    /// Recent runs, newest first
    List(RunsListArgs),
    /// Runs stuck in `running` beyond the staleness bound
    Sweep(RunsSweepArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunsListArgs {
    #[arg(long)]
    pub org: String,

    #[arg(long, default_value_t = 20)]
    pub last: u32,

    #[arg(long, default_value = ".attest/attest.db")]
    pub db: PathBuf,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunsSweepArgs {
    #[arg(long)]
    pub org: String,

    #[arg(long, default_value_t = 120)]
    pub max_age_minutes: u64,

    #[arg(long, default_value = ".attest/attest.db")]
    pub db: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_agent_run() {
        let cli = Cli::try_parse_from([
            "attest",
            "agent",
            "run",
            "qm-orchestrator",
            "--org",
            "acme",
            "--api-key",
            "sk-test",
        ])
        .unwrap();
        match cli.cmd {
            Command::Agent(a) => {
                let AgentSub::Run(args) = a.cmd;
                assert_eq!(args.name, "qm-orchestrator");
                assert_eq!(args.org, "acme");
                assert_eq!(args.trigger, "manual");
            }
            _ => panic!("expected agent subcommand"),
        }
    }

    #[test]
    fn parses_checkpoints_generate() {
        let cli = Cli::try_parse_from([
            "attest",
            "checkpoints",
            "generate",
            "--org",
            "acme",
            "--period",
            "2026-03",
        ])
        .unwrap();
        match cli.cmd {
            Command::Checkpoints(c) => match c.cmd {
                CheckpointsSub::Generate(args) => assert_eq!(args.period, "2026-03"),
                _ => panic!("expected generate"),
            },
            _ => panic!("expected checkpoints subcommand"),
        }
    }
}
