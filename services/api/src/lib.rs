mod cli;
mod convert;
mod infra;
mod routes;
mod server;

use hpxml_reso::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
