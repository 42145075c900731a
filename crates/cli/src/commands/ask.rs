use serde::Serialize;
use tablechat_agent::{AgentRuntime, Answer};
use tablechat_core::config::LoadOptions;
use uuid::Uuid;

use crate::commands::{async_runtime, load_config, serialize_json, CommandResult};

#[derive(Debug, Serialize)]
struct AskOutput<'a> {
    command: &'static str,
    status: &'static str,
    error_class: Option<String>,
    message: &'a str,
    answer: &'a Answer,
}

pub fn run(options: &LoadOptions, question: &str, json: bool) -> CommandResult {
    let config = match load_config("ask", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let agent = match AgentRuntime::from_config(&config) {
        Ok(agent) => agent,
        Err(error) => return CommandResult::from_application_error("ask", error, "startup"),
    };
    let runtime = match async_runtime("ask") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let correlation_id = Uuid::new_v4().to_string();
    match runtime.block_on(agent.ask_with_correlation(question, &correlation_id)) {
        Ok(answer) if json => CommandResult::text(serialize_json(&AskOutput {
            command: "ask",
            status: "ok",
            error_class: None,
            message: answer.message(),
            answer: &answer,
        })),
        Ok(answer) => CommandResult::text(render_answer(&answer)),
        Err(error) => CommandResult::from_application_error("ask", error, &correlation_id),
    }
}

/// Human rendering shared with `chat`.
pub fn render_answer(answer: &Answer) -> String {
    let mut lines = Vec::new();
    match answer {
        Answer::NoData { .. } => lines.push(answer.message().to_string()),
        Answer::NoMatch { description, .. } => {
            push_description(&mut lines, description);
            lines.push(answer.message().to_string());
        }
        Answer::Answered { description, data, text, .. } => {
            push_description(&mut lines, description);
            lines.push(format!("Sheet result:\n{}", data.trim_end()));
            lines.push(String::new());
            lines.push(format!("Answer: {text}"));
        }
    }
    lines.join("\n")
}

fn push_description(lines: &mut Vec<String>, description: &str) {
    if !description.is_empty() {
        lines.push(format!("Query logic: {description}"));
    }
}

#[cfg(test)]
mod tests {
    use tablechat_agent::Answer;
    use tablechat_core::{FilterOutcome, Intent};

    use super::render_answer;

    #[test]
    fn renders_answered_question_with_rows() {
        let answer = Answer::Answered {
            correlation_id: "req-1".to_string(),
            description: "Filter Department for Engineering".to_string(),
            intent: Intent::Department { keyword: "engineering".to_string() },
            outcome: FilterOutcome::Matched(1),
            data: "Id\tName\n1\tAlice Johnson\n".to_string(),
            text: "Alice is the engineer.".to_string(),
        };
        assert_eq!(
            render_answer(&answer),
            "Query logic: Filter Department for Engineering\nSheet result:\nId\tName\n1\tAlice Johnson\n\nAnswer: Alice is the engineer."
        );
    }

    #[test]
    fn renders_no_match_without_empty_description() {
        let answer = Answer::NoMatch {
            correlation_id: "req-2".to_string(),
            description: String::new(),
            intent: Intent::SalaryAbove { threshold: 500_000 },
        };
        assert_eq!(render_answer(&answer), "I couldn't find any data for that query.");
    }
}
