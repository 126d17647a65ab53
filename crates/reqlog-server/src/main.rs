use clap::Parser;
use reqlog_logging::ReqlogSubscriberBuilder;
use reqlog_server::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve()?;

    let _guard = ReqlogSubscriberBuilder::new()
        .with_config(config.log.clone())
        .try_init()?;

    reqlog_server::serve(config).await?;
    Ok(())
}
