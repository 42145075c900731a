use serde::Serialize;
use tablechat_agent::{AgentRuntime, Classification};
use tablechat_core::config::LoadOptions;
use tablechat_core::{render_tsv, FilterOutcome};
use uuid::Uuid;

use crate::commands::{async_runtime, load_config, serialize_json, CommandResult};

#[derive(Debug, Serialize)]
struct ClassifyOutput<'a> {
    command: &'static str,
    status: &'static str,
    error_class: Option<String>,
    rule: &'static str,
    filter: String,
    #[serde(flatten)]
    classification: &'a Classification,
}

pub fn run(options: &LoadOptions, question: &str, description: &str, json: bool) -> CommandResult {
    let config = match load_config("classify", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let agent = match AgentRuntime::from_config(&config) {
        Ok(agent) => agent,
        Err(error) => return CommandResult::from_application_error("classify", error, "startup"),
    };
    let runtime = match async_runtime("classify") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let classification = match runtime.block_on(agent.classify_only(question, description)) {
        Ok(classification) => classification,
        Err(error) => {
            let correlation_id = Uuid::new_v4().to_string();
            return CommandResult::from_application_error("classify", error, &correlation_id);
        }
    };

    if json {
        return CommandResult::text(serialize_json(&ClassifyOutput {
            command: "classify",
            status: "ok",
            error_class: None,
            rule: classification.intent.kind().label(),
            filter: classification.intent.summary(),
            classification: &classification,
        }));
    }

    CommandResult::text(render_human(&classification))
}

fn render_human(classification: &Classification) -> String {
    let intent = &classification.intent;
    let mut output = format!("rule: {} ({})\n", intent.kind().label(), intent.summary());
    match classification.outcome {
        FilterOutcome::NoData => output.push_str("the sheet is empty"),
        FilterOutcome::NoMatch => output.push_str("no rows matched"),
        FilterOutcome::Matched(count) => {
            output.push_str(&format!("{count} matching row(s):\n"));
            output.push_str(render_tsv(&classification.rows).trim_end());
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use tablechat_agent::Classification;
    use tablechat_core::{FilterOutcome, Intent, Row, Table};

    use super::render_human;

    #[test]
    fn human_output_names_rule_and_rows() {
        let classification = Classification {
            intent: Intent::HireDate { year: Some("2023".to_string()) },
            outcome: FilterOutcome::Matched(1),
            rows: Table::new(vec![
                Row::new(["Id", "Name"]),
                Row::new(["5", "Eve Adams"]),
            ]),
        };
        let output = render_human(&classification);
        assert!(output.starts_with("rule: hire_date (hire date contains `2023`)\n"));
        assert!(output.ends_with("1 matching row(s):\nId\tName\n5\tEve Adams"));
    }

    #[test]
    fn human_output_reports_no_match() {
        let classification = Classification {
            intent: Intent::SalaryBelow { threshold: 1 },
            outcome: FilterOutcome::NoMatch,
            rows: Table::new(vec![Row::new(["Id"])]),
        };
        assert!(render_human(&classification).ends_with("no rows matched"));
    }
}
