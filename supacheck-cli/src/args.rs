use std::path::PathBuf;

use clap::Args;

use crate::output::OutputFormat;

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    #[arg(long, short, global = true)]
    pub quiet: bool,
    /// Log filter for stderr diagnostics; `RUST_LOG` takes precedence.
    #[arg(long, default_value = "warn", global = true)]
    pub log_level: String,
}

impl OutputArgs {
    pub fn is_text(&self) -> bool {
        self.format == OutputFormat::Text && !self.quiet
    }
}

#[derive(Debug, Args, Clone)]
pub struct EnvArgs {
    /// KEY=VALUE file holding the Supabase URL and keys.
    #[arg(long, default_value = ".env", global = true)]
    pub env_file: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct SupabaseBinArgs {
    /// Supabase CLI executable (may include leading words, e.g. `npx supabase`).
    #[arg(long, default_value = "supabase")]
    pub supabase_bin: String,
}
