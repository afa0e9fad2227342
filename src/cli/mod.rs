use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "weather-agent")]
#[command(version)]
#[command(about = "Time & weather chat agent backed by MCP tool servers", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to a TOML config file
    #[arg(short, long, global = true, env = "WEATHER_AGENT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Interactive conversation (default)
    Chat,

    /// Ask a single question on a fresh conversation
    Ask {
        /// The message to send
        #[arg(required = true)]
        message: String,
    },

    /// Run the five-prompt validation against live servers
    Smoke,

    /// Serve the agent over A2A JSON-RPC
    Serve {
        /// Host to bind (default from config: localhost)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (default from config: 8888)
        #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
        port: Option<u16>,
    },

    /// List tools exposed by the configured MCP servers
    Tools,

    /// Show current configuration
    Config,
}

impl Cli {
    pub fn is_serve(&self) -> bool {
        matches!(self.command, Some(Commands::Serve { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_no_subcommand() {
        let cli = Cli::try_parse_from(["weather-agent"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_serve_flags() {
        let cli =
            Cli::try_parse_from(["weather-agent", "serve", "--host", "0.0.0.0", "-p", "9000"])
                .unwrap();
        assert!(cli.is_serve());
        assert_eq!(
            cli.command,
            Some(Commands::Serve {
                host: Some("0.0.0.0".to_string()),
                port: Some(9000),
            })
        );
    }

    #[test]
    fn test_serve_rejects_port_zero() {
        assert!(Cli::try_parse_from(["weather-agent", "serve", "-p", "0"]).is_err());
        assert!(Cli::try_parse_from(["weather-agent", "serve", "--port", "1"]).is_ok());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "weather-agent",
            "ask",
            "What time is it?",
            "--verbose",
            "--config",
            "/tmp/agent.toml",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/agent.toml")));
        assert_eq!(
            cli.command,
            Some(Commands::Ask {
                message: "What time is it?".to_string()
            })
        );
    }

    #[test]
    fn test_ask_requires_message() {
        assert!(Cli::try_parse_from(["weather-agent", "ask"]).is_err());
    }
}
