mod bluetooth;
mod commands;
mod config;
mod database;
mod error;
mod export;
mod models;
mod utils;

use log::{debug, error, info};
use std::env;

use bluetooth::{BluerTransport, MiFloraPoller};
use commands::{export_zabbix, load_and_store, read_last, read_live, Command};
use config::AppConfig;
use database::PostgresStore;

async fn run(command: Command, config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Load => {
            let store = PostgresStore::connect(&config.database_url).await?;
            let transport = BluerTransport::new().await?;
            let mut poller = MiFloraPoller::new(transport, &config.poller);

            let entry = load_and_store(&mut poller, &store).await?;

            // Answered from the poller's cache
            info!(
                "Summary for {} (firmware {}):",
                poller.name().await?,
                poller.firmware_version().await?
            );
            info!("  Temperature: {}°C", entry.temperature);
            info!("  Moisture: {}%", entry.moisture);
            info!("  Light: {} lx", entry.light);
            info!("  Conductivity: {} µS/cm", entry.conductivity);
            info!("  Battery: {}%", poller.battery_level().await?);
            debug!("Cached reading: {:?}", poller.reading());
        }
        Command::Show(parameter) => {
            let store = PostgresStore::connect(&config.database_url).await?;
            if let Some(value) = read_last(&store, parameter).await? {
                println!("{}", value);
            }
        }
        Command::Read { parameter, fresh } => {
            let transport = BluerTransport::new().await?;
            let mut poller = MiFloraPoller::new(transport, &config.poller);
            println!("{}", read_live(&mut poller, &parameter, fresh).await?);
        }
        Command::Zabbix => {
            let store = PostgresStore::connect(&config.database_url).await?;
            export_zabbix(&store, &config.zabbix_host, &config.zabbix_export_file).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            error!("{}", e);
            return Err(e);
        }
    };

    // Load configuration
    let config = match AppConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    if let Err(e) = run(command, config).await {
        error!("Fatal error: {}", e);
        return Err(e);
    }

    Ok(())
}
