use borealis_core::api::SpaceWeatherApi;
use borealis_core::config::LoadOptions;
use borealis_core::domain::geomag::{
    flatten_forecast, KpIndex, KpPoint, RecentActivity, RECENT_ACTIVITY_DAYS,
};
use serde::Serialize;
use tracing::warn;

use crate::commands::{
    backend_failure, block_on, build_client, load_config, runtime_failure, CommandResult, EXIT_OK,
};

const COMMAND: &str = "forecast";

#[derive(Debug, Serialize)]
struct ForecastReport {
    command: &'static str,
    status: &'static str,
    issued: Option<String>,
    observed_max_kp: Option<f64>,
    expected_max_kp: Option<f64>,
    expected_g_scale: Option<&'static str>,
    expected_conditions: Option<&'static str>,
    rationale: String,
    points: Vec<KpPoint>,
    recent_activity: Option<RecentActivity>,
}

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let client = match build_client(COMMAND, &config) {
        Ok(client) => client,
        Err(failure) => return failure,
    };

    let fetched = block_on(async {
        tokio::join!(client.forecast_three_day(), client.daily_geomag(RECENT_ACTIVITY_DAYS))
    });
    let (forecast, history) = match fetched {
        Ok(fetched) => fetched,
        Err(error) => return runtime_failure(COMMAND, error),
    };
    let forecast = match forecast {
        Ok(forecast) => forecast,
        Err(error) => return backend_failure(COMMAND, error),
    };
    // Recent activity is supplementary; the forecast still renders without it.
    let recent_activity = match history {
        Ok(history) => Some(RecentActivity::from_days(&history.days)),
        Err(error) => {
            warn!(
                event_name = "cli.forecast.history_unavailable",
                error = %error,
                "recent activity omitted"
            );
            None
        }
    };

    let expected = forecast.expected_max_kp.map(KpIndex);
    let report = ForecastReport {
        command: COMMAND,
        status: "ok",
        issued: forecast.issued.clone(),
        observed_max_kp: forecast.observed_max_kp.map(|kp| KpIndex(kp).display_value()),
        expected_max_kp: expected.map(|kp| kp.display_value()),
        expected_g_scale: expected.map(|kp| kp.g_scale().label()),
        expected_conditions: forecast.expected_band().map(|band| band.description()),
        rationale: forecast.rationale.clone(),
        points: flatten_forecast(&forecast),
        recent_activity,
    };
    CommandResult::report(COMMAND, EXIT_OK, &report)
}
