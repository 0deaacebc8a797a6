use std::time::Instant;

use borealis_client::HttpPricingClient;
use borealis_core::api::SpaceWeatherApi;
use borealis_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

use crate::commands::{block_on, CommandResult, EXIT_BACKEND, EXIT_CONFIG, EXIT_OK};

const COMMAND: &str = "doctor";

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
    elapsed_ms: u64,
    details: String,
}

impl DoctorCheck {
    fn skipped(name: &'static str, reason: &str) -> Self {
        Self {
            name,
            status: CheckStatus::Skipped,
            elapsed_ms: 0,
            details: format!("skipped because {reason}"),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    command: &'static str,
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: &LoadOptions, json_output: bool) -> CommandResult {
    let (report, exit_code) = build_report(options);

    if json_output {
        return CommandResult::report(COMMAND, exit_code, &report);
    }
    CommandResult { exit_code, output: render_human(&report) }
}

fn build_report(options: &LoadOptions) -> (DoctorReport, u8) {
    let mut checks = Vec::new();
    let mut exit_code = EXIT_OK;

    let started = Instant::now();
    match AppConfig::load(options.clone()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                elapsed_ms: started.elapsed().as_millis() as u64,
                details: "configuration loaded and validated".to_string(),
            });
            match HttpPricingClient::from_config(&config.api) {
                Ok(client) => {
                    checks.push(DoctorCheck {
                        name: "http_client",
                        status: CheckStatus::Pass,
                        elapsed_ms: 0,
                        details: format!(
                            "targeting `{}` with a {}s timeout{}",
                            client.base_url(),
                            config.api.timeout_secs,
                            if config.api.has_api_key() { " and bearer auth" } else { "" }
                        ),
                    });
                    let health = check_backend_health(&client);
                    if health.status == CheckStatus::Fail {
                        exit_code = EXIT_BACKEND;
                    }
                    checks.push(health);
                }
                Err(error) => {
                    exit_code = EXIT_CONFIG;
                    checks.push(DoctorCheck {
                        name: "http_client",
                        status: CheckStatus::Fail,
                        elapsed_ms: 0,
                        details: error.to_string(),
                    });
                    checks.push(DoctorCheck::skipped("backend_health", "no http client"));
                }
            }
        }
        Err(error) => {
            exit_code = EXIT_CONFIG;
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                elapsed_ms: started.elapsed().as_millis() as u64,
                details: error.to_string(),
            });
            checks.push(DoctorCheck::skipped("http_client", "configuration did not load"));
            checks.push(DoctorCheck::skipped("backend_health", "configuration did not load"));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    (DoctorReport { command: COMMAND, overall_status, summary, checks }, exit_code)
}

fn check_backend_health(client: &HttpPricingClient) -> DoctorCheck {
    let started = Instant::now();
    let outcome = block_on(client.health());
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(Ok(_)) => DoctorCheck {
            name: "backend_health",
            status: CheckStatus::Pass,
            elapsed_ms,
            details: format!("`{}` answered /api/health", client.base_url()),
        },
        Ok(Err(error)) => DoctorCheck {
            name: "backend_health",
            status: CheckStatus::Fail,
            elapsed_ms,
            details: error.to_string(),
        },
        Err(error) => DoctorCheck {
            name: "backend_health",
            status: CheckStatus::Fail,
            elapsed_ms,
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
