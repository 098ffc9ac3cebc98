use std::path::PathBuf;

use clap::Subcommand;

use crate::args::*;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Push migrations, set secrets, deploy edge functions.
    Deploy {
        /// Directory the Supabase CLI runs in.
        #[arg(long)]
        project_dir: Option<PathBuf>,
        #[command(flatten)]
        bin: SupabaseBinArgs,
    },
    /// Call audit-logger, then read the entry back over REST.
    VerifySystem {
        /// Wait before the read-back query, in milliseconds.
        #[arg(long, default_value_t = 2000)]
        settle_ms: u64,
    },
    /// Call audit-logger once.
    VerifyAudit,
    /// Insert an audit log row directly over REST.
    VerifyWrite,
    /// Fetch a tender and ask ai-drafter for a section.
    VerifyAiDrafter {
        #[arg(long, default_value_t = 30000)]
        timeout_ms: u64,
    },
    /// List the most recent audit logs.
    Diagnose,
    /// Run a plan file (YAML or JSON).
    Run { path: PathBuf },
    /// Check a plan file without running it.
    Validate { path: PathBuf },
    /// Print a built-in plan.
    Show { name: String },
    /// Check the env file, credentials and Supabase CLI.
    Doctor {
        #[command(flatten)]
        bin: SupabaseBinArgs,
    },
}
