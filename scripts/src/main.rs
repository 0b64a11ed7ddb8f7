use clap::Parser;
use eyre::Result;
use scripts::{cli::Cli, utils::setup_logging};

#[tokio::main]
async fn main() -> Result<()> {
    let Cli { network, command } = Cli::parse();

    setup_logging(&network.verbosity)?;

    command.run(&network).await?;
    Ok(())
}
