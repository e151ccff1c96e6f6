mod cli;

use clap::Parser;
use memory_store::config::Config;
use memory_store::host::{FileHost, SimpleRuntime};

use cli::{Cli, Command};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "memory_store=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut cfg = Config::load()?;
    if let Some(data_dir) = cli.data_dir {
        cfg.data_dir = data_dir;
        std::fs::create_dir_all(&cfg.data_dir)?;
    }

    let host = FileHost::open_with_fts5(&cfg.data_dir, cfg.fts5_enabled)?;
    let runtime = SimpleRuntime { user_name: cli.user, chat_id: cli.chat };

    match cli.command {
        Command::Remember { fact, key, tags, importance, no_overwrite } => {
            cli::remember::run(&host, &runtime, fact, key, tags, importance, no_overwrite)
        }
        Command::Recall { query, key, tags, scope, limit } => {
            cli::recall::run(&host, &runtime, query, key, tags, scope, limit)
        }
        Command::Forget { id, key, query, scope, all_matching } => {
            cli::forget::run(&host, &runtime, id, key, query, scope, all_matching)
        }
    }
}
