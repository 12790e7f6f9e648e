use std::process::ExitCode;

use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = vigil::telemetry::init() {
        eprintln!("failed to initialise logging: {e}");
    }

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("server error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), vigil::Error> {
    let config = vigil::load_config()?;
    let server = vigil::Server::bind(config.addr()).await?;
    server.serve(vigil::app()).await
}
