use crate::cli::commands::{Cli, Commands};
use agentgate::Config;
use agentgate::agent::{TurnContext, TurnHandler, TurnOutcome, demo_registry};
use agentgate::approval::ApprovalDecision;
use agentgate::ledger::{InMemoryLedger, RunLedger, trace};
use agentgate::observability::create_observer;
use agentgate::planner::{
    ExecutionPlanner, KeywordIntentClassifier, PlanBuilder, PlanningContext, WorkflowCatalog,
};
use agentgate::rollout::Role;
use agentgate::tools::ActionRegistry;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

struct Runtime {
    ledger: Arc<dyn RunLedger>,
    handler: TurnHandler,
}

impl Runtime {
    fn new(config: &Config) -> Self {
        let ledger: Arc<dyn RunLedger> = Arc::new(InMemoryLedger::from_config(&config.ledger));
        let observer = create_observer(&config.observability);
        let registry = Arc::new(demo_registry(Arc::clone(&ledger), Arc::clone(&observer)));
        let handler = TurnHandler::standard(registry, observer, &config.executor);
        Self { ledger, handler }
    }

    fn registry(&self) -> &Arc<ActionRegistry> {
        self.handler.registry()
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to render output")?
    );
    Ok(())
}

async fn run_turn(
    config: &Config,
    role: Role,
    user: &str,
    task: &str,
    intent: Option<String>,
    approve: bool,
    show_trace: bool,
) -> Result<()> {
    let runtime = Runtime::new(config);
    let turn = TurnContext {
        rollout: config.rollout.clone(),
        approved_gate_id: None,
        intent_hint: intent,
    };

    let outcome: TurnOutcome = runtime
        .handler
        .handle_agent_turn(role, user, task, &turn)
        .await?;
    println!("{}", outcome.response);
    if let Some(verification) = &outcome.verification {
        println!("\nverifier: {}", verification.status);
        for issue in &verification.issues {
            println!("  - {issue}");
        }
    }

    for pending in &outcome.pending_approvals {
        println!("\napproval required: {} (gate {})", pending.tool_name, pending.gate_id);
        if !approve {
            continue;
        }
        runtime
            .handler
            .resolve_gate(
                &pending.gate_id,
                ApprovalDecision::Approved,
                user,
                Some("approved from cli".to_string()),
            )
            .await?;
        let resumed = runtime
            .handler
            .resume_tool_call(role, user, &pending.gate_id)
            .await?;
        info!(gate_id = %pending.gate_id, tool = %pending.tool_name, "gated call resumed");
        print_json(&resumed)?;
    }

    if show_trace {
        let trace = trace::execution_trace(runtime.ledger.as_ref(), &outcome.run_id).await?;
        print_json(&trace)?;
    }
    Ok(())
}

async fn show_plan(
    config: &Config,
    role: Role,
    task: &str,
    intent: Option<String>,
    sequential: bool,
) -> Result<()> {
    let runtime = Runtime::new(config);
    let builder = PlanBuilder::new(
        WorkflowCatalog::standard(),
        Arc::new(KeywordIntentClassifier::standard()),
        Arc::clone(runtime.registry()),
    );
    let ctx = PlanningContext {
        parallel_reads: !sequential,
        intent_hint: intent,
    };
    let plan = builder.build_execution_plan(role, task, &ctx).await?;
    print_json(&plan)
}

fn list_routers(config: &Config, role: Option<Role>) -> Result<()> {
    let runtime = Runtime::new(config);
    for spec in runtime.registry().router_specs(role) {
        let roles: Vec<String> = spec.allowed_roles.iter().map(ToString::to_string).collect();
        println!("{} [{}]", spec.name, roles.join(", "));
        for action in &spec.actions {
            println!("  {:<28} {}", action.name, action.tier);
        }
    }
    Ok(())
}

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Turn {
            role,
            user,
            intent,
            approve,
            trace,
            task,
        } => run_turn(&config, role, &user, &task, intent, approve, trace).await,
        Commands::Plan {
            role,
            intent,
            sequential,
            task,
        } => show_plan(&config, role, &task, intent, sequential).await,
        Commands::Routers { role } => list_routers(&config, role),
        Commands::Config => {
            println!(
                "{}",
                toml::to_string_pretty(&config).context("Failed to serialize config")?
            );
            Ok(())
        }
    }
}
