use lambda_runtime::{run, service_fn, Error};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    relay_core::utils::logging::init();

    info!("Starting relay api function");

    run(service_fn(relay_worker::handlers::api::handler)).await
}
