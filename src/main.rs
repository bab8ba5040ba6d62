use clap::Parser;
use log::{error, info};

use moodlog::{initialize_logger, App, Cli, Config, EntryStore, FileKeyValueStore, Result};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    initialize_logger(cli.verbose);

    info!("Application starting up");
    if let Err(e) = run(cli).await {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    info!("Application shutting down");
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    let kv = FileKeyValueStore::new(config.data_dir.clone());
    let store = EntryStore::new(kv, config.storage_key.clone());
    let app = App::new(store, config, cli.config);

    app.run(cli.command).await
}
