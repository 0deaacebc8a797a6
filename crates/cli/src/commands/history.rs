use borealis_core::api::SpaceWeatherApi;
use borealis_core::config::LoadOptions;
use borealis_core::domain::geomag::{HistoryAnalytics, KpIndex};
use serde::Serialize;

use crate::commands::{
    backend_failure, block_on, build_client, load_config, runtime_failure, CommandResult,
    EXIT_INPUT, EXIT_OK,
};

const COMMAND: &str = "history";

#[derive(Debug, Serialize)]
struct DayRow {
    date: String,
    kp_max: Option<f64>,
    kp_avg: Option<f64>,
    g_scale: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct HistoryReport {
    command: &'static str,
    status: &'static str,
    limit: u32,
    analytics: HistoryAnalytics,
    days: Vec<DayRow>,
}

pub fn run(options: &LoadOptions, limit: u32) -> CommandResult {
    if limit == 0 {
        return CommandResult::failure(
            COMMAND,
            "input_validation",
            "--limit must be greater than zero",
            EXIT_INPUT,
        );
    }

    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let client = match build_client(COMMAND, &config) {
        Ok(client) => client,
        Err(failure) => return failure,
    };

    let history = match block_on(client.daily_geomag(limit)) {
        Ok(Ok(history)) => history,
        Ok(Err(error)) => return backend_failure(COMMAND, error),
        Err(error) => return runtime_failure(COMMAND, error),
    };

    let report = HistoryReport {
        command: COMMAND,
        status: "ok",
        limit,
        analytics: HistoryAnalytics::from_days(&history.days),
        days: history
            .days
            .iter()
            .map(|day| DayRow {
                date: day.date.clone(),
                kp_max: day.kp_max.map(|kp| KpIndex(kp).display_value()),
                kp_avg: day.kp_avg.map(|kp| KpIndex(kp).display_value()),
                g_scale: day.kp_max.map(|kp| KpIndex(kp).g_scale().label()),
            })
            .collect(),
    };
    CommandResult::report(COMMAND, EXIT_OK, &report)
}
