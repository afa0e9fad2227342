use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use weather_agent::a2a;
use weather_agent::cli::{Cli, Commands};
use weather_agent::config::Settings;
use weather_agent::core::{smoke, ChatAgent, Orchestrator};
use weather_agent::mcp::McpRegistry;
use weather_agent::ui::Console;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.is_serve());

    let settings = Settings::load(cli.config.as_deref())?;
    let console = Console::new();

    match cli.command {
        None | Some(Commands::Chat) => {
            let orchestrator = Orchestrator::new(&settings).await?;
            let result = orchestrator.repl().await;
            orchestrator.shutdown().await;
            result?;
        }
        Some(Commands::Ask { message }) => {
            let orchestrator = Orchestrator::new(&settings).await?;
            let result = orchestrator.ask(&message).await;
            orchestrator.shutdown().await;
            result?;
        }
        Some(Commands::Smoke) => {
            let agent = ChatAgent::from_settings(&settings).await?;
            let passed = smoke::run(&agent, &console).await;
            agent.shutdown().await;
            std::process::exit(if passed? { 0 } else { 1 });
        }
        Some(Commands::Serve { host, port }) => {
            let host = host.unwrap_or_else(|| settings.server.host.clone());
            let port = port.unwrap_or(settings.server.port);

            let agent = Arc::new(ChatAgent::from_settings(&settings).await?);
            for (name, reason) in agent.tools().failures() {
                console.warn(&format!("MCP server '{}' unavailable: {}", name, reason));
            }
            console.info(&format!("Serving A2A agent at http://{}:{}/", host, port));

            let result = a2a::serve_agent(agent.clone(), &host, port).await;
            agent.shutdown().await;
            result?;
        }
        Some(Commands::Tools) => {
            let registry = McpRegistry::connect(&settings.mcp_servers).await;
            console.list_tools(&registry);
            registry.shutdown().await;
        }
        Some(Commands::Config) => {
            console.show_config(&settings);
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool, serving: bool) {
    let default_filter = if verbose {
        "weather_agent=debug,tower_http=debug"
    } else if serving {
        "weather_agent=info,tower_http=info"
    } else {
        "weather_agent=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
