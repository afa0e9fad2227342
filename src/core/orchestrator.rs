use anyhow::Result;
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::agent::ChatAgent;
use crate::config::Settings;
use crate::ui::Console;

#[derive(Debug, PartialEq, Eq)]
pub enum ReplCommand<'a> {
    Quit,
    Clear,
    History,
    Tools,
    Help,
    Skip,
    Message(&'a str),
}

/// Classify one line of input. Anything that is not a local command goes to the agent.
pub fn parse_command(input: &str) -> ReplCommand<'_> {
    let input = input.trim();
    if input.is_empty() {
        return ReplCommand::Skip;
    }

    match input.to_lowercase().as_str() {
        "quit" | "exit" | "q" => ReplCommand::Quit,
        "clear" | "reset" => ReplCommand::Clear,
        "history" => ReplCommand::History,
        "tools" => ReplCommand::Tools,
        "help" | "?" => ReplCommand::Help,
        _ => ReplCommand::Message(input),
    }
}

pub struct Orchestrator {
    agent: ChatAgent,
    console: Console,
}

impl Orchestrator {
    pub async fn new(settings: &Settings) -> Result<Self> {
        let agent = ChatAgent::from_settings(settings).await?;
        let console = Console::new();

        for (name, reason) in agent.tools().failures() {
            console.warn(&format!("MCP server '{}' unavailable: {}", name, reason));
        }

        Ok(Self { agent, console })
    }

    /// Single question on a fresh thread.
    pub async fn ask(&self, message: &str) -> Result<()> {
        let mut thread = self.agent.get_new_thread();
        let response = self.agent.run(message, &mut thread).await?;
        self.console.agent_message(&response.text);
        Ok(())
    }

    pub async fn repl(&self) -> Result<()> {
        self.console.banner();
        self.console.info(&format!(
            "Model: {} ({}) | Agent: {} | Tools: {}",
            self.agent.llm().model(),
            self.agent.llm().provider_name(),
            self.agent.name(),
            self.agent.tools().definitions().len()
        ));

        let mut thread = self.agent.get_new_thread();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("You: ");
            io::stdout().flush()?;

            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => {
                    println!("\n\nConversation interrupted. Goodbye!");
                    break;
                }
            };

            // End of input
            let Some(line) = line else {
                println!();
                break;
            };

            let input = match parse_command(&line) {
                ReplCommand::Skip => continue,
                ReplCommand::Quit => {
                    println!("\nGoodbye! Stay weather-aware!");
                    break;
                }
                ReplCommand::Clear => {
                    thread = self.agent.get_new_thread();
                    self.console.info("Conversation cleared.");
                    continue;
                }
                ReplCommand::History => {
                    self.console.history(&thread);
                    continue;
                }
                ReplCommand::Tools => {
                    self.console.list_tools(self.agent.tools());
                    continue;
                }
                ReplCommand::Help => {
                    self.console.repl_help();
                    continue;
                }
                ReplCommand::Message(input) => input,
            };

            let result = tokio::select! {
                result = self.agent.run(input, &mut thread) => result,
                _ = tokio::signal::ctrl_c() => {
                    println!("\n\nConversation interrupted. Goodbye!");
                    break;
                }
            };

            match result {
                Ok(response) => {
                    for invocation in &response.tool_invocations {
                        self.console.tool_invocation(invocation);
                    }
                    self.console.agent_message(&response.text);
                }
                Err(e) => {
                    self.console.error(&format!("{:#}", e));
                    println!("Please try again or check if MCP servers are running.\n");
                }
            }
        }

        Ok(())
    }

    pub async fn shutdown(&self) {
        self.agent.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_words_case_insensitive() {
        assert_eq!(parse_command("quit"), ReplCommand::Quit);
        assert_eq!(parse_command("  EXIT "), ReplCommand::Quit);
        assert_eq!(parse_command("Q"), ReplCommand::Quit);
    }

    #[test]
    fn test_blank_input_skipped() {
        assert_eq!(parse_command(""), ReplCommand::Skip);
        assert_eq!(parse_command("   \t"), ReplCommand::Skip);
    }

    #[test]
    fn test_messages_are_trimmed() {
        assert_eq!(
            parse_command("  I am currently in London \n"),
            ReplCommand::Message("I am currently in London")
        );
        assert_eq!(parse_command("quitting time?"), ReplCommand::Message("quitting time?"));
    }

    #[test]
    fn test_local_commands() {
        assert_eq!(parse_command("reset"), ReplCommand::Clear);
        assert_eq!(parse_command("history"), ReplCommand::History);
        assert_eq!(parse_command("tools"), ReplCommand::Tools);
        assert_eq!(parse_command("?"), ReplCommand::Help);
    }
}
