use agentgate::rollout::Role;
use clap::{Parser, Subcommand};

/// `agentgate` - role-gated agent task orchestration.
#[derive(Parser, Debug)]
#[command(name = "agentgate")]
#[command(version = "0.1.0")]
#[command(
    about = "Plan, execute and verify agent turns behind per-role rollout flags and approval gates.",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one agent turn against the demo router catalog
    Turn {
        /// Caller role (admin, recruiter, carrier, driver)
        #[arg(short, long)]
        role: Role,

        /// Caller user id
        #[arg(short, long, default_value = "cli")]
        user: String,

        /// Intent class to plan for instead of classifying the task
        #[arg(long)]
        intent: Option<String>,

        /// Approve every gate the turn opens and run the gated calls
        #[arg(long)]
        approve: bool,

        /// Print the run's execution trace after the turn
        #[arg(long)]
        trace: bool,

        /// Task text
        task: String,
    },

    /// Show the execution plan a turn would build, without running it
    Plan {
        #[arg(short, long)]
        role: Role,

        #[arg(long)]
        intent: Option<String>,

        /// Build a planned_sequential plan
        #[arg(long)]
        sequential: bool,

        task: String,
    },

    /// List routers and action tiers visible to a role
    Routers {
        /// Limit to routers this role may call
        #[arg(short, long)]
        role: Option<Role>,
    },

    /// Print the effective configuration
    Config,
}
