use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use planner::api::{
    BudgetPayload, InvestmentPayload, SavingsGoalPayload, budget_response, investment_response,
    run_http_server, savings_goal_response,
};
use planner::log::init_logging;
use serde::Serialize;

#[derive(Parser)]
#[command(
    name = "planner",
    version,
    about = "Budget allocation, savings-goal solving and investment growth projection"
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the calculators as a JSON HTTP API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
        bind: IpAddr,
    },
    /// Split income into needs, wants and savings
    Budget(BudgetPayload),
    /// Solve a savings plan for its missing field
    Goal(SavingsGoalPayload),
    /// Project yearly investment growth
    Invest(InvestmentPayload),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Serve { port, bind }) => run_http_server(SocketAddr::new(bind, port))
            .await
            .map_err(anyhow::Error::from),
        Some(Commands::Budget(payload)) => budget_response(payload)
            .map_err(anyhow::Error::from)
            .and_then(|body| print_json(&body)),
        Some(Commands::Goal(payload)) => savings_goal_response(payload)
            .map_err(anyhow::Error::from)
            .and_then(|body| print_json(&body)),
        Some(Commands::Invest(payload)) => investment_response(payload)
            .map_err(anyhow::Error::from)
            .and_then(|body| print_json(&body)),
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "planner failed");
    }
    result
}

fn print_json<T: Serialize>(body: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(body)?);
    Ok(())
}
