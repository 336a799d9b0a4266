use clap::Parser;
use shapegen::{AppConfig, CliArgs, LoggingConfig, ShapesError, init_logging, run, shutdown_telemetry};
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let _guard = match init_logging(LoggingConfig::from_env()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let cli = CliArgs::parse();
    let result = match AppConfig::from_args(cli) {
        Ok(config) => run(config).await,
        Err(e) => Err(e),
    };

    shutdown_telemetry();

    match result {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "shape generation failed");
            eprintln!("error: {e:#}");
            let code = e
                .downcast_ref::<ShapesError>()
                .map(|err| err.code().code())
                .unwrap_or(1);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}
