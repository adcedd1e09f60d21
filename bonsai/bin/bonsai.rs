#![deny(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::must_use_candidate)]

use bonsai::{
    Bonsai,
    cli::Cli,
    config::{Config, find_config_file},
};
use bonsai_common::{internal, logging};
use clap::Parser;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init();

    let config = Config::load(&find_config_file()?)?;
    let bonsai = Bonsai::new(config)?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            internal!(level = WARN, "CTRL+C entered, cancelling");
            interrupt.cancel();
        }
    });

    let mut stdout = std::io::stdout().lock();
    bonsai.run(cli.command, &mut stdout, cancel).await
}
