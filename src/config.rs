use log::{debug, warn};
use std::env;
use std::str::FromStr;
use tokio::time::Duration;

const DEFAULT_CACHE_TIMEOUT_SECS: u64 = 600;
const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY_SECS: f64 = 0.5;
const DEFAULT_ADAPTER: &str = "0";
const DEFAULT_ZABBIX_HOST: &str = "miflora";
const DEFAULT_ZABBIX_EXPORT_FILE: &str = "input_file_zabbix.txt";

/// Settings for talking to one sensor
#[derive(Debug, Clone, PartialEq)]
pub struct PollerConfig {
    pub address: String,
    pub cache_timeout: Duration,
    pub retries: u32,
    pub retry_delay: Duration,
    pub adapter: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub poller: PollerConfig,
    pub database_url: String,
    pub zabbix_host: String,
    pub zabbix_export_file: String,
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, Box<dyn std::error::Error>> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("{} has an invalid value: '{}'", key, raw).into()),
        None => Ok(default),
    }
}

impl AppConfig {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        // Load environment variables
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let address = lookup("MIFLORA_MAC")
            .map(|mac| mac.trim().to_uppercase())
            .filter(|mac| !mac.is_empty())
            .ok_or("MIFLORA_MAC environment variable not set")?;

        let database_url =
            lookup("DATABASE_URL").ok_or("DATABASE_URL environment variable not set")?;

        let cache_timeout = parse_or(&lookup, "MIFLORA_CACHE_TIMEOUT", DEFAULT_CACHE_TIMEOUT_SECS)?;

        let retries = parse_or(&lookup, "MIFLORA_RETRIES", DEFAULT_RETRIES)?;
        if retries == 0 {
            warn!("MIFLORA_RETRIES is 0, falling back to a single attempt");
        }

        let retry_delay: f64 = parse_or(&lookup, "MIFLORA_RETRY_DELAY", DEFAULT_RETRY_DELAY_SECS)?;
        let retry_delay = Duration::try_from_secs_f64(retry_delay)
            .map_err(|_| format!("MIFLORA_RETRY_DELAY has an invalid value: '{}'", retry_delay))?;

        let adapter = lookup("MIFLORA_ADAPTER")
            .map(|adapter| adapter.trim().to_string())
            .filter(|adapter| !adapter.is_empty())
            .unwrap_or_else(|| DEFAULT_ADAPTER.to_string());

        let zabbix_host = lookup("ZABBIX_HOST").unwrap_or_else(|| DEFAULT_ZABBIX_HOST.to_string());
        let zabbix_export_file =
            lookup("ZABBIX_EXPORT_FILE").unwrap_or_else(|| DEFAULT_ZABBIX_EXPORT_FILE.to_string());

        let config = AppConfig {
            poller: PollerConfig {
                address,
                cache_timeout: Duration::from_secs(cache_timeout),
                retries: retries.max(1),
                retry_delay,
                adapter,
            },
            database_url,
            zabbix_host,
            zabbix_export_file,
        };
        debug!("Loaded configuration: {:?}", config.poller);

        Ok(config)
    }
}
