mod check;
mod cli;
mod infra;
mod routes;
mod server;

use location_gate::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
