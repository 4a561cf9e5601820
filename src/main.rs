// src/main.rs

use hpcflow::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("hpcflow error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<bool> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;

    let Some(summary) = run(args).await? else {
        return Ok(true);
    };
    println!("{summary}");
    Ok(summary.succeeded())
}
