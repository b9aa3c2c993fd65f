use clap::Parser;
use tracing::error;
use veritest::cli;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args = cli::Args::parse();
    match cli::run(&args).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            error!("{:#}", err);
            std::process::exit(2);
        }
    }
}
