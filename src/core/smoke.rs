//! Scripted five-turn conversation against a live model and live tool
//! servers, with loose keyword checks on the replies.

use anyhow::Result;

use super::agent::ChatAgent;
use crate::ui::Console;

pub const QUERIES: [&str; 5] = [
    "I am currently in London",
    "What is the weather now here?",
    "What time is it for me right now?",
    "I moved to Berlin, what is the weather like today?",
    "Can you remind me where I said I am based?",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: &'static str,
    pub passed: bool,
}

/// (check name, index of the reply it inspects, any-of keywords)
const CHECKS: [(&str, usize, &[&str]); 5] = [
    ("Location acknowledged", 0, &["london"]),
    (
        "Weather returned",
        1,
        &["weather", "temperature", "clear", "cloud"],
    ),
    ("Time returned", 2, &["time", ":", "am", "pm", "o'clock"]),
    ("Berlin weather", 3, &["berlin"]),
    ("Location recalled", 4, &["berlin"]),
];

/// Case-insensitive keyword checks over the five replies. A missing reply
/// fails its check.
pub fn evaluate(replies: &[String]) -> Vec<CheckResult> {
    CHECKS
        .iter()
        .map(|(name, index, keywords)| {
            let passed = replies
                .get(*index)
                .map(|reply| {
                    let reply = reply.to_lowercase();
                    keywords.iter().any(|k| reply.contains(k))
                })
                .unwrap_or(false);
            CheckResult {
                name: *name,
                passed,
            }
        })
        .collect()
}

/// Play the queries on one thread and report. Returns true when every check passes.
pub async fn run(agent: &ChatAgent, console: &Console) -> Result<bool> {
    console.info(&format!("Using model: {}", agent.llm().model()));

    let mut thread = agent.get_new_thread();
    console.section("TIME & WEATHER AGENT - VALIDATION RUN");

    let mut replies = Vec::with_capacity(QUERIES.len());
    for (i, query) in QUERIES.iter().enumerate() {
        println!("\n--- Query {}/{} ---", i + 1, QUERIES.len());
        println!("User: {}", query);

        let response = agent.run(query, &mut thread).await?;
        console.agent_message(&response.text);
        replies.push(response.text);
    }

    console.section("SUMMARY");
    let results = evaluate(&replies);
    for result in &results {
        console.check(result.name, result.passed);
    }

    let all_passed = results.iter().all(|r| r.passed);
    if all_passed {
        console.success("All checks passed");
    } else {
        console.warn("Some checks failed - review the replies above");
    }

    Ok(all_passed)
}
