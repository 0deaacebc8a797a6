use std::process::ExitCode;

fn main() -> ExitCode {
    borealis_cli::run()
}
