use borealis_core::domain::events::{CatalogSummary, EventRiskLevel, HistoricalCatalog};
use serde::Serialize;

use crate::commands::{CommandResult, EXIT_OK};

const COMMAND: &str = "events";

#[derive(Debug, Serialize)]
struct EventRow {
    date: String,
    name: String,
    actual_kp: f64,
    predicted_kp: f64,
    accuracy: f64,
    risk_level: EventRiskLevel,
    g_scale: &'static str,
    description: String,
    impact_description: String,
}

#[derive(Debug, Serialize)]
struct EventsReport {
    command: &'static str,
    status: &'static str,
    summary: CatalogSummary,
    events: Vec<EventRow>,
}

pub fn run(json_output: bool) -> CommandResult {
    let catalog = HistoricalCatalog::builtin();
    let report = EventsReport {
        command: COMMAND,
        status: "ok",
        summary: catalog.summary(),
        events: catalog
            .events()
            .iter()
            .map(|event| EventRow {
                date: event.date.clone(),
                name: event.name.clone(),
                actual_kp: event.actual_kp,
                predicted_kp: event.predicted_kp,
                accuracy: event.accuracy,
                risk_level: event.risk_level,
                g_scale: event.g_scale().label(),
                description: event.description.clone(),
                impact_description: event.impact_description.clone(),
            })
            .collect(),
    };

    if json_output {
        return CommandResult::report(COMMAND, EXIT_OK, &report);
    }
    CommandResult { exit_code: EXIT_OK, output: render_human(&report) }
}

fn render_human(report: &EventsReport) -> String {
    let accuracy = report
        .summary
        .average_accuracy
        .map(|value| format!("{value:.1}%"))
        .unwrap_or_else(|| "n/a".to_string());
    let mut lines = vec![format!(
        "{} historical events, average model accuracy {accuracy}, {} extreme",
        report.summary.events, report.summary.extreme_events
    )];

    for event in &report.events {
        lines.push(format!(
            "- {} {}: Kp {:.2} observed / {:.2} predicted ({:.1}% accuracy, {:?}, {})",
            event.date,
            event.name,
            event.actual_kp,
            event.predicted_kp,
            event.accuracy,
            event.risk_level,
            event.g_scale
        ));
    }

    lines.join("\n")
}
