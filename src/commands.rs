/// Command handling, wired up with an explicit poller and store
use log::{info, warn};
use std::error::Error;

use crate::bluetooth::{MiFloraPoller, Transport};
use crate::database::ReadingStore;
use crate::export::format_zabbix;
use crate::models::{FlowerEntry, Parameter, ParameterValue};
use crate::utils::{format_unix, unix_now};

pub const USAGE: &str = "usage: rust-miflora-etl <load | show <parameter> | read <parameter> [--fresh] | zabbix>";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Poll the sensor and store one journal entry
    Load,
    /// Print a column of the most recent journal entry
    Show(Parameter),
    /// Print a live value from the sensor; the name is checked by the poller
    Read { parameter: String, fresh: bool },
    /// Write the whole journal as a Zabbix sender input file
    Zabbix,
}

impl Command {
    /// Parse the command line arguments, without the program name
    pub fn parse(args: &[String]) -> Result<Self, Box<dyn Error>> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        match args.as_slice() {
            ["load"] => Ok(Command::Load),
            ["zabbix"] => Ok(Command::Zabbix),
            ["show", parameter] => {
                let parameter: Parameter = parameter.parse()?;
                if !parameter.is_stored() {
                    return Err(format!("{} is not stored in the journal", parameter).into());
                }
                Ok(Command::Show(parameter))
            }
            ["read", parameter] => Ok(Command::Read {
                parameter: parameter.to_string(),
                fresh: false,
            }),
            ["read", parameter, "--fresh"] | ["read", "--fresh", parameter] => {
                Ok(Command::Read {
                    parameter: parameter.to_string(),
                    fresh: true,
                })
            }
            _ => Err(USAGE.into()),
        }
    }
}

fn to_column(parameter: Parameter, value: ParameterValue) -> Result<i32, Box<dyn Error>> {
    match value {
        ParameterValue::Integer(v) => Ok(i32::try_from(v)?),
        // Truncated toward zero, the journal keeps whole numbers only
        ParameterValue::Decimal(v) => Ok(v.trunc() as i32),
        ParameterValue::Text(_) => Err(format!("{} is not a numeric parameter", parameter).into()),
    }
}

async fn column<T: Transport>(
    poller: &mut MiFloraPoller<T>,
    parameter: Parameter,
) -> Result<i32, Box<dyn Error>> {
    let value = poller.get_value(parameter, false).await?;
    to_column(parameter, value)
}

/// Read all stored parameters from the sensor and persist them
///
/// The first value triggers a fetch cycle, the rest are answered from
/// the poller's cache.
pub async fn load_and_store<T: Transport, S: ReadingStore>(
    poller: &mut MiFloraPoller<T>,
    store: &S,
) -> Result<FlowerEntry, Box<dyn Error>> {
    let temperature = column(poller, Parameter::Temperature).await?;
    let moisture = column(poller, Parameter::Moisture).await?;
    let light = column(poller, Parameter::Light).await?;
    let conductivity = column(poller, Parameter::Conductivity).await?;
    let battery = column(poller, Parameter::Battery).await?;

    let entry = FlowerEntry {
        time: unix_now(),
        temperature,
        moisture,
        conductivity,
        light,
        battery,
    };
    store.store(&entry).await?;

    info!(
        "Stored reading for {} at {}",
        poller.address(),
        format_unix(entry.time)
    );
    Ok(entry)
}

/// Value of one stored parameter in the most recent journal entry
pub async fn read_last<S: ReadingStore>(
    store: &S,
    parameter: Parameter,
) -> Result<Option<i32>, Box<dyn Error>> {
    let entries = store.load(Some(1)).await?;
    let entry = match entries.last() {
        Some(entry) => entry,
        None => {
            warn!("No entries stored yet");
            return Ok(None);
        }
    };

    match entry.column(parameter) {
        Some(value) => Ok(Some(value)),
        None => Err(format!("{} is not stored in the journal", parameter).into()),
    }
}

/// Live value of any parameter, given by name
pub async fn read_live<T: Transport>(
    poller: &mut MiFloraPoller<T>,
    parameter: &str,
    fresh: bool,
) -> Result<ParameterValue, Box<dyn Error>> {
    Ok(poller.get_value_by_name(parameter, fresh).await?)
}

/// Export the whole journal for zabbix_sender, returns the number of entries written
pub async fn export_zabbix<S: ReadingStore>(
    store: &S,
    hostname: &str,
    path: &str,
) -> Result<usize, Box<dyn Error>> {
    let entries = store.load(None).await?;
    tokio::fs::write(path, format_zabbix(hostname, &entries)).await?;
    info!("Exported {} entries to {}", entries.len(), path);
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluetooth::decoder::INVALID_DATA;
    use crate::bluetooth::mock::MockTransport;
    use crate::config::PollerConfig;
    use crate::database::store::MemoryStore;
    use tokio::time::Duration;

    fn poller(transport: MockTransport) -> MiFloraPoller<MockTransport> {
        MiFloraPoller::new(
            transport,
            &PollerConfig {
                address: "C4:7C:8D:61:A2:0E".to_string(),
                cache_timeout: Duration::from_secs(600),
                retries: 3,
                retry_delay: Duration::from_millis(500),
                adapter: "0".to_string(),
            },
        )
    }

    fn entry(time: i64, temperature: i32) -> FlowerEntry {
        FlowerEntry {
            time,
            temperature,
            moisture: 30,
            conductivity: 520,
            light: 2000,
            battery: 90,
        }
    }

    fn args(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse(&args(&["load"])).unwrap(), Command::Load);
        assert_eq!(Command::parse(&args(&["zabbix"])).unwrap(), Command::Zabbix);
        assert_eq!(
            Command::parse(&args(&["show", "moisture"])).unwrap(),
            Command::Show(Parameter::Moisture)
        );
        assert_eq!(
            Command::parse(&args(&["read", "firmware", "--fresh"])).unwrap(),
            Command::Read {
                parameter: "firmware".to_string(),
                fresh: true
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(Command::parse(&args(&[])).unwrap_err().to_string(), USAGE);
        assert_eq!(
            Command::parse(&args(&["show", "humidity"]))
                .unwrap_err()
                .to_string(),
            "unknown parameter: humidity"
        );
        assert_eq!(
            Command::parse(&args(&["show", "name"]))
                .unwrap_err()
                .to_string(),
            "name is not stored in the journal"
        );
        assert!(Command::parse(&args(&["show", "firmware"])).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_and_store_uses_one_fetch_cycle() {
        let mut poller = poller(MockTransport::with_sample_data());
        let store = MemoryStore::new();

        let stored = load_and_store(&mut poller, &store).await.unwrap();

        assert_eq!(stored.temperature, 21);
        assert_eq!(stored.light, 2000);
        assert_eq!(stored.battery, 90);
        assert_eq!(store.load(None).await.unwrap(), vec![stored]);
        // connect, 3 reads, activation write, disconnect
        assert_eq!(poller.transport().ops().len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_and_store_stores_nothing_on_failure() {
        let transport = MockTransport::with_sample_data().with_value(0x35, INVALID_DATA.to_vec());
        let mut poller = poller(transport);
        let store = MemoryStore::new();

        let err = load_and_store(&mut poller, &store).await.unwrap_err();

        assert_eq!(err.to_string(), "received invalid data from the sensor");
        assert!(store.load(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_last() {
        let store = MemoryStore::with_entries(vec![entry(10, 19), entry(20, 23)]);

        assert_eq!(
            read_last(&store, Parameter::Temperature).await.unwrap(),
            Some(23)
        );
        assert!(read_last(&store, Parameter::Name).await.is_err());
        assert_eq!(
            read_last(&MemoryStore::new(), Parameter::Battery)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_live_text_parameter() {
        let mut poller = poller(MockTransport::with_sample_data());

        let value = read_live(&mut poller, "firmware", false).await.unwrap();

        assert_eq!(value, ParameterValue::Text("3.1.8".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_live_unknown_parameter() {
        let mut poller = poller(MockTransport::with_sample_data());

        let err = read_live(&mut poller, "humidity", true).await.unwrap_err();

        assert_eq!(err.to_string(), "unknown parameter: humidity");
        assert!(poller.transport().ops().is_empty());
    }

    #[tokio::test]
    async fn test_export_zabbix_writes_file() {
        let store = MemoryStore::with_entries(vec![entry(10, 19), entry(20, 23)]);
        let path = std::env::temp_dir().join(format!("miflora-zabbix-{}.txt", std::process::id()));
        let path = path.to_string_lossy().to_string();

        let written = export_zabbix(&store, "Greenhouse", &path).await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();
        assert_eq!(written, 2);
        assert_eq!(content.lines().count(), 10);
        assert_eq!(
            content.lines().next(),
            Some("\"Greenhouse\" miflora[temperature] 10 19")
        );
    }
}
