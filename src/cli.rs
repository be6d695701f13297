use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use crate::config::{DEFAULT_CONFIG_FILE, ProviderSettings};
use crate::state::DEFAULT_STATE_FILE;

#[derive(Parser)]
#[command(name = "dashform")]
#[command(version)]
#[command(about = "Declarative configuration for Apache Superset", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file
    #[arg(long, env = "DASHFORM_CONFIG", default_value = DEFAULT_CONFIG_FILE, global = true)]
    pub config: String,

    /// State file
    #[arg(long, env = "DASHFORM_STATE", default_value = DEFAULT_STATE_FILE, global = true)]
    pub state: String,

    #[command(flatten)]
    pub provider: ProviderArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Connection fallbacks for values missing from `[provider]`
#[derive(Args, Debug, Default)]
pub struct ProviderArgs {
    /// Superset base URL
    #[arg(long, env = "SUPERSET_SERVER_BASE_URL", global = true)]
    pub server_base_url: Option<String>,

    /// Superset username
    #[arg(long, env = "SUPERSET_USERNAME", global = true)]
    pub username: Option<String>,

    /// Superset password
    #[arg(long, env = "SUPERSET_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// Page size for list requests (0 selects the default)
    #[arg(long, env = "SUPERSET_PAGE_SIZE", global = true, allow_negative_numbers = true)]
    pub page_size: Option<i64>,
}

impl ProviderArgs {
    pub fn settings(&self) -> ProviderSettings {
        ProviderSettings {
            server_base_url: self.server_base_url.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            page_size: self.page_size,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Check the configuration without contacting the server
    Validate,

    /// Show what apply would change
    Plan(PlanArgs),

    /// Make the server match the configuration
    Apply(ApplyArgs),

    /// Delete every resource recorded in state
    Destroy(DestroyArgs),

    /// Adopt an existing object into state
    Import {
        /// Resource address (kind.name)
        address: String,

        /// Remote identifier (numeric ID or name, depending on the kind)
        id: String,
    },

    /// Re-read every recorded resource and save the result
    Refresh,

    /// Inspect or edit the state file
    #[command(subcommand)]
    State(StateCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct PlanArgs {
    /// Only plan resources matching a kind or kind.name
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Only apply resources matching a kind or kind.name
    #[arg(short, long)]
    pub target: Option<String>,

    /// Show what would change without applying
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct DestroyArgs {
    /// Only destroy resources matching a kind or kind.name
    #[arg(short, long)]
    pub target: Option<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Subcommand)]
pub enum StateCommand {
    /// List recorded addresses
    List,

    /// Print the recorded attributes of one resource
    Show {
        /// Resource address (kind.name)
        address: String,
    },

    /// Forget a resource without deleting it remotely
    Rm {
        /// Resource address (kind.name)
        address: String,
    },
}
