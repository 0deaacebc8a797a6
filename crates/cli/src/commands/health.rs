use borealis_core::api::SpaceWeatherApi;
use borealis_core::config::LoadOptions;

use crate::commands::{
    backend_failure, block_on, build_client, load_config, runtime_failure, CommandResult,
};

const COMMAND: &str = "health";

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let client = match build_client(COMMAND, &config) {
        Ok(client) => client,
        Err(failure) => return failure,
    };

    match block_on(client.health()) {
        Ok(Ok(body)) => CommandResult::success(
            COMMAND,
            format!("backend at {} is healthy: {body}", client.base_url()),
        ),
        Ok(Err(error)) => backend_failure(COMMAND, error),
        Err(error) => runtime_failure(COMMAND, error),
    }
}
