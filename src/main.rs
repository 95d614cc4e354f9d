use clap::Parser;
use gherkin_studio::cli::{self, Cli};

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(cli::log_level(args.verbose)),
    )
    .init();

    if let Err(e) = cli::run(args).await {
        log::error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
