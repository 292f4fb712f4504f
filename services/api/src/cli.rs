use crate::demo::{run_demo, run_moderation, DemoArgs, ModerateArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use listing_desk::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Listing Desk",
    about = "Run the property marketplace back office or exercise it from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score listing drafts from a CSV export against an in-memory store
    Moderate(ModerateArgs),
    /// Walk through submission, review, takeover and recommendations end to end
    Demo(DemoArgs),
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
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Moderate(args) => run_moderation(args),
        Command::Demo(args) => run_demo(args),
    }
}
