use anyhow::Result;
use tablechat_agent::setup::prepare_sheet;
use tablechat_agent::source::CsvWorkbook;
use tablechat_agent::AgentRuntime;
use tablechat_core::config::LoadOptions;
use tablechat_core::ApplicationError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use uuid::Uuid;

use crate::commands::ask::render_answer;
use crate::commands::{async_runtime, load_config, CommandResult};

pub fn run(options: &LoadOptions, seed: bool) -> CommandResult {
    let mut config = match load_config("chat", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match async_runtime("chat") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    if seed {
        let workbook = CsvWorkbook::new(config.sheet.data_dir.clone());
        match runtime.block_on(prepare_sheet(&workbook, &config.sheet.name)) {
            Ok(sheet) => config.sheet.name = sheet,
            Err(error) => {
                return CommandResult::from_application_error(
                    "chat",
                    ApplicationError::from(error),
                    &Uuid::new_v4().to_string(),
                );
            }
        }
    }

    let agent = match AgentRuntime::from_config(&config) {
        Ok(agent) => agent,
        Err(error) => return CommandResult::from_application_error("chat", error, "startup"),
    };

    let session = runtime.block_on(async {
        let input = BufReader::new(tokio::io::stdin());
        let mut output = tokio::io::stdout();
        tokio::select! {
            result = run_session(&agent, input, &mut output) => result,
            _ = tokio::signal::ctrl_c() => Ok(()),
        }
    });

    match session {
        Ok(()) => CommandResult::text(String::new()),
        Err(error) => {
            CommandResult::failure("chat", "io", format!("chat session failed: {error:#}"), 1)
        }
    }
}

/// Reads one question per line until `exit` or end of input. Failed questions
/// are reported inline and the loop continues.
pub async fn run_session<R, W>(agent: &AgentRuntime, input: R, output: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let banner = match agent.schema().await {
        Ok(schema) => schema,
        Err(error) => format!("Could not read the sheet yet: {error}"),
    };
    output.write_all(format!("{banner}\n\nChat with your sheet! Type 'exit' to quit.\n").as_bytes()).await?;

    let mut lines = input.lines();
    loop {
        output.write_all(b"> ").await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.eq_ignore_ascii_case("exit") {
            break;
        }
        if question.is_empty() {
            continue;
        }

        let correlation_id = Uuid::new_v4().to_string();
        let reply = match agent.ask_with_correlation(question, &correlation_id).await {
            Ok(answer) => render_answer(&answer),
            Err(error) => {
                let interface = error.into_interface(correlation_id);
                format!(
                    "An error occurred: {} (correlation id {})",
                    interface.user_message(),
                    interface.correlation_id()
                )
            }
        };
        output.write_all(format!("\n{reply}\n\n").as_bytes()).await?;
    }

    output.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tablechat_agent::llm::OfflineLlm;
    use tablechat_agent::setup::sample_rows;
    use tablechat_agent::source::InMemorySource;
    use tablechat_agent::AgentRuntime;
    use tablechat_core::{IntentClassifier, RangeSpec};

    use super::run_session;

    fn agent(source: InMemorySource) -> AgentRuntime {
        AgentRuntime::new(
            Arc::new(OfflineLlm),
            Arc::new(source),
            IntentClassifier::default(),
            RangeSpec::columns("Employees", 0, 4),
        )
    }

    #[tokio::test]
    async fn session_answers_until_exit() {
        let agent = agent(InMemorySource::default().with_sheet("Employees", sample_rows()));
        let input: &[u8] = b"Who are the engineers?\n\nEXIT\nWho is never asked?\n";
        let mut output = Vec::new();

        run_session(&agent, input, &mut output).await.expect("session should finish");

        let transcript = String::from_utf8(output).expect("utf8 transcript");
        assert!(transcript.starts_with("Google Sheet Structure:\nSheet Name: Employees"));
        assert!(transcript.contains("Alice Johnson"));
        assert!(transcript.contains("Charlie Brown"));
        assert!(!transcript.contains("Bob Smith\t"));
        assert_eq!(transcript.matches("> ").count(), 3);
    }

    #[tokio::test]
    async fn session_reports_errors_and_keeps_going() {
        let agent = agent(InMemorySource::default());
        let input: &[u8] = b"Who are the engineers?\nWho are the engineers?\n";
        let mut output = Vec::new();

        run_session(&agent, input, &mut output).await.expect("session should finish");

        let transcript = String::from_utf8(output).expect("utf8 transcript");
        assert!(transcript.starts_with("Could not read the sheet yet"));
        assert_eq!(transcript.matches("An error occurred: I could not reach the data source").count(), 2);
    }
}
