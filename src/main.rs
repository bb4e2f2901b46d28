use std::process::ExitCode;

use clap::Parser;
use drugdash::cli::{self, Cli};
use drugdash::error::DrugDashError;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match cli::run(cli).await {
        Ok(output) => {
            println!("{}", output.text);
            if output.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(err) => {
            if let Some(dd_err) = err.downcast_ref::<DrugDashError>() {
                eprintln!("Error: {dd_err}");
            } else {
                eprintln!("Error: {err}");
            }
            ExitCode::from(1)
        }
    }
}
