use borealis_core::api::SpaceWeatherApi;
use borealis_core::config::LoadOptions;
use serde::Serialize;
use serde_json::Value;

use crate::commands::{
    backend_failure, block_on, build_client, load_config, runtime_failure, CommandResult, EXIT_OK,
};

const COMMAND: &str = "portfolio";

#[derive(Debug, Serialize)]
struct PortfolioReport {
    command: &'static str,
    status: &'static str,
    count: usize,
    items: Vec<Value>,
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

    let portfolio = match block_on(client.portfolio()) {
        Ok(Ok(portfolio)) => portfolio,
        Ok(Err(error)) => return backend_failure(COMMAND, error),
        Err(error) => return runtime_failure(COMMAND, error),
    };

    let report = PortfolioReport {
        command: COMMAND,
        status: "ok",
        count: portfolio.items.len(),
        items: portfolio.items,
    };
    CommandResult::report(COMMAND, EXIT_OK, &report)
}
