// src/main.rs

use taskdag::errors::TaskdagError;
use taskdag::{cli, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        match err.downcast_ref::<TaskdagError>() {
            Some(rejected) if rejected.is_validation() => eprintln!("taskdag: {rejected}"),
            _ => eprintln!("taskdag error: {err:#}"),
        }
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
