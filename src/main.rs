use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use plan_assign::config::DatabaseConfig;
use plan_assign::domains::assignment::{AssignUsersCommand, AssignedUser};
use plan_assign::error::{PlanAssignError, Result};
use plan_assign::providers::sqlite::SqliteGateway;
use plan_assign::services::assignment::AssignmentService;

#[derive(Parser, Debug)]
#[command(name = "plan-assign")]
#[command(about = "Manage plan procedure assignments in a local database")]
struct Cli {
    #[arg(long, env = "PLAN_ASSIGN_DB", default_value_t = plan_assign::runtime_paths::default_db_path())]
    db: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a plan.
    AddPlan {
        #[arg(long)]
        id: i32,
    },
    /// Create a procedure.
    AddProcedure {
        #[arg(long)]
        id: i32,
        #[arg(long)]
        title: String,
    },
    /// Create a user.
    AddUser {
        #[arg(long)]
        id: i32,
        #[arg(long)]
        name: String,
    },
    /// List every user.
    Users,
    /// Replace the users assigned to a plan procedure.
    Assign {
        #[arg(long)]
        plan: i32,
        #[arg(long)]
        procedure: i32,
        /// Comma separated user ids; pass an empty value to clear.
        #[arg(long, value_delimiter = ',', num_args = 0..)]
        users: Vec<i32>,
    },
    /// Show the users assigned to a plan procedure.
    Assigned {
        #[arg(long)]
        plan: i32,
        #[arg(long)]
        procedure: i32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    plan_assign::logging::init_tracing("plan_assign");
    let cli = Cli::parse();

    let gateway = Arc::new(SqliteGateway::new(&DatabaseConfig::new(cli.db)).await?);
    let service = AssignmentService::new(gateway.clone());

    match cli.command {
        Command::AddPlan { id } => print_json(&gateway.create_plan(id).await?),
        Command::AddProcedure { id, title } => {
            print_json(&gateway.create_procedure(id, &title).await?)
        }
        Command::AddUser { id, name } => print_json(&gateway.create_user(id, &name).await?),
        Command::Users => {
            let users: Vec<AssignedUser> = service
                .list_users()
                .await?
                .into_iter()
                .map(AssignedUser::from)
                .collect();
            print_json(&users)
        }
        Command::Assign {
            plan,
            procedure,
            users,
        } => {
            let cancel = CancellationToken::new();
            let ctrl_c_token = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    ctrl_c_token.cancel();
                }
            });
            service
                .assign_users(AssignUsersCommand::new(plan, procedure, users), &cancel)
                .await?;
            println!("ok");
            Ok(())
        }
        Command::Assigned { plan, procedure } => {
            let users: Vec<AssignedUser> = service
                .assigned_users(plan, procedure)
                .await?
                .into_iter()
                .map(AssignedUser::from)
                .collect();
            print_json(&users)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered =
        serde_json::to_string_pretty(value).map_err(|e| PlanAssignError::Runtime(e.to_string()))?;
    println!("{rendered}");
    Ok(())
}
