use lambda_runtime::{run, service_fn, Error};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    relay_core::utils::logging::init();

    info!("Starting relay backups monitor");

    run(service_fn(relay_worker::handlers::backups::handler)).await
}
