use colored::Colorize;

use crate::config::Settings;
use crate::core::{Thread, ToolInvocation};
use crate::llm::Role;
use crate::mcp::McpRegistry;

pub struct Console;

impl Console {
    pub fn new() -> Self {
        Self
    }

    pub fn banner(&self) {
        let rule = "=".repeat(60);
        println!("{}", rule.bright_cyan());
        println!(
            "{} {}",
            "Time & Weather Agent".bright_cyan().bold(),
            format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
        );
        println!("{}", rule.bright_cyan());
        println!("I can help you with time and weather information.");
        println!("Tell me where you are, and ask about the weather or time!");
        println!("Type 'quit' or 'exit' to end the conversation, 'help' for more.");
        println!("{}\n", rule.bright_cyan());
    }

    pub fn section(&self, title: &str) {
        let rule = "=".repeat(60);
        println!("\n{}", rule);
        println!("{}", title.bold());
        println!("{}", rule);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", "[INFO]".blue(), message);
    }

    pub fn warn(&self, message: &str) {
        println!("{} {}", "[WARN]".yellow(), message);
    }

    pub fn error(&self, message: &str) {
        println!("{} {}", "[ERROR]".red(), message);
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", "[OK]".green(), message);
    }

    pub fn agent_message(&self, message: &str) {
        println!("\n{} {}\n", "Agent:".green().bold(), message);
    }

    pub fn tool_invocation(&self, invocation: &ToolInvocation) {
        let label = format!("[TOOL:{}]", invocation.name).magenta();
        let args = invocation.arguments.to_string();
        if invocation.is_error {
            println!("{} {} {}", label, args.dimmed(), invocation.output.red());
        } else {
            println!("{} {}", label, args.dimmed());
        }
    }

    pub fn check(&self, name: &str, passed: bool) {
        let status = if passed {
            "PASS".green().bold()
        } else {
            "FAIL".red().bold()
        };
        println!("  {}: {}", status, name);
    }

    pub fn history(&self, thread: &Thread) {
        println!("\n{}", "Conversation History:".bold().underline());
        for (i, msg) in thread.messages().iter().enumerate() {
            let role = match msg.role {
                Role::User => "USER".blue(),
                Role::Assistant => "AGENT".green(),
                Role::Tool => "TOOL".magenta(),
                Role::System => "SYSTEM".yellow(),
            };
            let preview: String = if msg.content.is_empty() && !msg.tool_calls.is_empty() {
                let names: Vec<&str> = msg.tool_calls.iter().map(|c| c.name.as_str()).collect();
                format!("(calls {})", names.join(", "))
            } else {
                msg.content.chars().take(100).collect()
            };
            println!("  {}. [{}] {}", i + 1, role, preview);
        }
        println!();
    }

    pub fn list_tools(&self, registry: &McpRegistry) {
        println!("\n{}", "AVAILABLE TOOLS".bold().underline());
        println!("{}", "─".repeat(50));

        let mut current_server = "";
        for (server, tool) in registry.list_all_tools() {
            if server != current_server {
                println!("\n  {}", format!("{}:", server).yellow());
                current_server = server;
            }
            println!(
                "    {} {}",
                tool.name.cyan(),
                format!("- {}", tool.description.as_deref().unwrap_or("")).dimmed()
            );
        }

        for (name, reason) in registry.failures() {
            println!(
                "\n  {} {}",
                format!("{}:", name).red(),
                format!("unavailable ({})", reason).dimmed()
            );
        }
        println!();
    }

    pub fn repl_help(&self) {
        println!("\n{}", "COMMANDS".bold().underline());
        println!("{}", "─".repeat(40));
        println!("  {}  - End the conversation", "quit, exit, q".cyan());
        println!("  {}   - Start a new conversation", "clear, reset".cyan());
        println!("  {}        - Show conversation history", "history".cyan());
        println!("  {}          - List MCP tools", "tools".cyan());
        println!("  {}        - Show this help", "help, ?".cyan());
        println!();
    }

    pub fn show_config(&self, settings: &Settings) {
        let unset = || "(unset)".dimmed().to_string();

        println!("\n{}", "CONFIGURATION".bold().underline());
        println!("{}", "─".repeat(50));

        println!("\n  {}", "Model:".yellow());
        println!("    Provider:   {}", settings.provider().to_string().cyan());
        for (label, value) in [
            ("Completion", &settings.model.completion_model),
            ("Medium", &settings.model.medium_model),
            ("Small", &settings.model.small_model),
        ] {
            println!(
                "    {:<11} {}",
                format!("{}:", label),
                value.clone().unwrap_or_else(unset)
            );
        }
        println!(
            "    Endpoint:   {}",
            settings.model.base_url.clone().unwrap_or_else(unset)
        );
        println!(
            "    API key:    {}",
            if settings.api_key().is_some() {
                "set".green()
            } else {
                "missing".red()
            }
        );

        println!("\n  {}", "MCP Servers:".yellow());
        for server in &settings.mcp_servers {
            let state = if server.enabled {
                "enabled".green()
            } else {
                "disabled".dimmed()
            };
            println!("    {} {} [{}]", server.name.cyan().bold(), server.url, state);
        }

        println!("\n  {}", "A2A Server:".yellow());
        println!(
            "    http://{}:{}/",
            settings.server.host, settings.server.port
        );

        if let Ok(path) = Settings::config_path() {
            println!(
                "\n  {} {}",
                "Config file:".yellow(),
                path.display().to_string().dimmed()
            );
        }
        println!();
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}
