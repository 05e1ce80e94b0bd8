use crate::convert::{run_convert, ConvertArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use hpxml_reso::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "hpxml2reso",
    about = "Translate HPXML home energy audits into RESO listing fields",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert one HPXML file and print or write the RESO JSON
    Convert(ConvertArgs),
    /// Start the HTTP service
    Serve(ServeArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Convert(args) => tokio::task::spawn_blocking(move || run_convert(args))
            .await
            .map_err(|err| AppError::Task(err.to_string()))?,
        Command::Serve(args) => server::run(args).await,
    }
}
