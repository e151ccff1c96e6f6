pub mod forget;
pub mod recall;
pub mod remember;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "memory-store", about = "Per-user persistent fact store with hybrid lexical/semantic/fuzzy recall.")]
#[command(version, propagate_version = true)]
pub struct Cli {
    /// Override the configured data directory for this invocation.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Identity the harness acts as — stands in for the embedding chat
    /// runtime's `user_name`.
    #[arg(long, global = true, default_value = "cli-user")]
    pub user: String,

    /// Identity the harness acts as — stands in for the embedding chat
    /// runtime's `chat_id`.
    #[arg(long, global = true, default_value = "cli")]
    pub chat: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Store or update a fact
    Remember {
        /// The fact text to remember
        fact: String,

        /// Slot key (phone, email, city, ...); inferred from the fact when omitted
        #[arg(long)]
        key: Option<String>,

        /// Tags to attach (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Importance, 1-5 (default 3)
        #[arg(long)]
        importance: Option<i32>,

        /// Don't overwrite an existing entry with the same key
        #[arg(long)]
        no_overwrite: bool,
    },

    /// Search remembered facts
    Recall {
        /// Free-text query
        query: Option<String>,

        /// Restrict to a specific slot key
        #[arg(long)]
        key: Option<String>,

        /// Restrict to entries carrying all of these tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// "current_user" (default) or "all"
        #[arg(long, default_value = "current_user")]
        scope: String,

        /// Max results, 1-20 (default 5)
        #[arg(long, default_value_t = 5)]
        limit: i32,
    },

    /// Remove one or more facts
    Forget {
        /// Exact memory id
        #[arg(long)]
        id: Option<String>,

        /// Slot key
        #[arg(long)]
        key: Option<String>,

        /// Free-text match against the stored lexical blob
        #[arg(long)]
        query: Option<String>,

        /// "current_user" (default) or "all"
        #[arg(long, default_value = "current_user")]
        scope: String,

        /// Remove every match instead of only the first
        #[arg(long)]
        all_matching: bool,
    },
}
