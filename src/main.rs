use clap::Parser;
use pan_stepper::runtime::{log_filter, Args};

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    // Logs go to stderr; stdout may be carrying status lines in --simulate-link mode
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(e) = pan_stepper::runtime::run(args).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
