use crate::cli::args::{
    AgentSub, CheckpointsSub, Cli, Command, RunsSub, ScoreSub,
};
use anyhow::Context;
use attest_core::storage::Store;
use std::path::Path;

mod agent;
mod checkpoints;
mod runs;
mod score;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Agent(a) => match a.cmd {
            AgentSub::Run(args) => agent::run(args).await,
        },
        Command::Checkpoints(c) => match c.cmd {
            CheckpointsSub::Generate(args) => checkpoints::generate(args),
            CheckpointsSub::Seed(args) => checkpoints::seed(args),
        },
        Command::Score(s) => match s.cmd {
            ScoreSub::Show(args) => score::show(args),
        },
        Command::Runs(r) => match r.cmd {
            RunsSub::List(args) => runs::list(args),
            RunsSub::Sweep(args) => runs::sweep(args),
        },
    }
}

pub(crate) fn open_store(db: &Path) -> anyhow::Result<Store> {
    if let Some(parent) = db.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let store = Store::open(db)?;
    store.init_schema()?;
    Ok(store)
}
