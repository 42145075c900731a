use serde::Serialize;
use tablechat_agent::llm::LlmClient;
use tablechat_agent::source::TableSource;
use tablechat_agent::AgentRuntime;
use tablechat_core::config::{AppConfig, LlmProvider, LoadOptions};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: &LoadOptions, json_output: bool) -> String {
    let report = build_report(options);

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report(options: &LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options.clone()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            match AgentRuntime::from_config(&config) {
                Ok(agent) => checks.extend(check_collaborators(&config, &agent)),
                Err(error) => {
                    checks.push(DoctorCheck {
                        name: "runtime_wiring",
                        status: CheckStatus::Fail,
                        details: error.to_string(),
                    });
                }
            }
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(skipped("sheet_readability"));
            checks.push(skipped("model_reachability"));
        }
    }

    let all_pass = checks.iter().all(|check| check.status != CheckStatus::Fail);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn skipped(name: &'static str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: "skipped because configuration did not load".to_string(),
    }
}

fn check_collaborators(config: &AppConfig, agent: &AgentRuntime) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![DoctorCheck {
                name: "sheet_readability",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            }];
        }
    };

    runtime.block_on(async {
        vec![check_sheet(agent).await, check_model(config, agent).await]
    })
}

async fn check_sheet(agent: &AgentRuntime) -> DoctorCheck {
    match agent.source().fetch(agent.range()).await {
        Ok(table) if table.is_empty() => DoctorCheck {
            name: "sheet_readability",
            status: CheckStatus::Fail,
            details: format!("`{}` is empty; run `tablechat seed`", agent.range()),
        },
        Ok(table) => DoctorCheck {
            name: "sheet_readability",
            status: CheckStatus::Pass,
            details: format!("read {} data row(s) from `{}`", table.data_row_count(), agent.range()),
        },
        Err(error) => DoctorCheck {
            name: "sheet_readability",
            status: CheckStatus::Fail,
            details: format!("failed to read `{}`: {error}", agent.range()),
        },
    }
}

async fn check_model(config: &AppConfig, agent: &AgentRuntime) -> DoctorCheck {
    if config.llm.provider == LlmProvider::Offline {
        return DoctorCheck {
            name: "model_reachability",
            status: CheckStatus::Skipped,
            details: "offline provider makes no model calls".to_string(),
        };
    }

    match agent.llm().complete("Reply with the single word: ready", 0.0).await {
        Ok(_) => DoctorCheck {
            name: "model_reachability",
            status: CheckStatus::Pass,
            details: format!("{:?} model `{}` responded", config.llm.provider, config.llm.model),
        },
        Err(error) => DoctorCheck {
            name: "model_reachability",
            status: CheckStatus::Fail,
            details: format!("{error:#}"),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
