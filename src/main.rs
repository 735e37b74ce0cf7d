use clap::Parser;
use mangalp::config::{GeneratorConfig, setup_logging};
use mangalp::web::SessionLimits;
use tracing::error;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = mangalp::cli::CliOptions::parse();

    if setup_logging(cli.debug).is_err() {
        return;
    }

    let config = match GeneratorConfig::from_options(&cli.generator) {
        Ok(config) => config,
        Err(err) => {
            error!("Configuration error: {}", err);
            return;
        }
    };

    let limits = SessionLimits {
        idle_timeout: time::Duration::minutes(i64::from(cli.session_idle_minutes.get())),
        max_sessions: cli.max_sessions.get(),
    };

    if let Err(err) =
        mangalp::web::setup_server(&cli.listen_address, cli.port, &config, limits).await
    {
        error!("Application error: {}", err);
    }
}
