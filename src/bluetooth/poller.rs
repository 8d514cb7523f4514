/// Cache-gated Mi Flora poller
use log::{debug, info};
use tokio::time::{Duration, Instant};

use crate::bluetooth::decoder::{
    decode_measurements, decode_name, decode_version_battery, is_invalid_data,
};
use crate::bluetooth::retry::{retry, RetryPolicy};
use crate::bluetooth::transport::Transport;
use crate::config::PollerConfig;
use crate::error::PollerError;
use crate::models::{Parameter, ParameterValue, SensorReading};

// Mi Flora characteristic value handles
const HANDLE_NAME: u16 = 0x03;
const HANDLE_MODE: u16 = 0x33;
const HANDLE_MEASUREMENTS: u16 = 0x35;
const HANDLE_VERSION_BATTERY: u16 = 0x38;

/// Written to the mode characteristic to switch on live measurements
const ACTIVATE_MEASUREMENTS: [u8; 2] = [0xA0, 0x1F];
/// Firmware from this version on only reports measurements after activation
const ACTIVATION_MIN_FIRMWARE: &str = "2.6.6";

/// When the reading was last refreshed and how long it stays usable
#[derive(Debug, Clone)]
pub struct CacheState {
    last_read: Option<Instant>,
    timeout: Duration,
}

impl CacheState {
    pub fn new(timeout: Duration) -> Self {
        CacheState {
            last_read: None,
            timeout,
        }
    }

    pub fn is_fresh(&self) -> bool {
        match self.last_read {
            Some(last_read) => last_read.elapsed() < self.timeout,
            None => false,
        }
    }

    pub fn mark_fetched(&mut self) {
        self.last_read = Some(Instant::now());
    }

    #[cfg(test)]
    pub fn last_read(&self) -> Option<Instant> {
        self.last_read
    }
}

/// Reads one Mi Flora sensor and keeps the last decoded values.
///
/// Every fetch connects, reads the name, version/battery and measurement
/// characteristics, and disconnects again. Values are served from cache
/// until the configured timeout has passed.
pub struct MiFloraPoller<T: Transport> {
    transport: T,
    address: String,
    adapter: String,
    retry_policy: RetryPolicy,
    cache: CacheState,
    reading: SensorReading,
}

impl<T: Transport> MiFloraPoller<T> {
    pub fn new(transport: T, config: &PollerConfig) -> Self {
        MiFloraPoller {
            transport,
            address: config.address.clone(),
            adapter: config.adapter.clone(),
            retry_policy: RetryPolicy::new(config.retries, config.retry_delay),
            cache: CacheState::new(config.cache_timeout),
            reading: SensorReading::default(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Cached state, without touching the device
    pub fn reading(&self) -> &SensorReading {
        &self.reading
    }

    #[cfg(test)]
    pub fn cache(&self) -> &CacheState {
        &self.cache
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Return the value of one parameter.
    ///
    /// Data is taken from the cache and only requested over Bluetooth if
    /// nothing was read yet, the cache is expired or `force_fresh` is set.
    pub async fn get_value(
        &mut self,
        parameter: Parameter,
        force_fresh: bool,
    ) -> Result<ParameterValue, PollerError> {
        self.fill_cache(force_fresh).await?;
        self.reading
            .value(parameter)
            .ok_or(PollerError::MissingValue(parameter))
    }

    /// Same as `get_value`, with the parameter given by name
    pub async fn get_value_by_name(
        &mut self,
        parameter: &str,
        force_fresh: bool,
    ) -> Result<ParameterValue, PollerError> {
        let parameter: Parameter = parameter.parse()?;
        self.get_value(parameter, force_fresh).await
    }

    pub async fn battery_level(&mut self) -> Result<u8, PollerError> {
        self.fill_cache(false).await?;
        self.reading
            .battery
            .ok_or(PollerError::MissingValue(Parameter::Battery))
    }

    pub async fn firmware_version(&mut self) -> Result<String, PollerError> {
        self.fill_cache(false).await?;
        self.reading
            .firmware_version
            .clone()
            .ok_or(PollerError::MissingValue(Parameter::FirmwareVersion))
    }

    pub async fn name(&mut self) -> Result<String, PollerError> {
        self.fill_cache(false).await?;
        self.reading
            .name
            .clone()
            .ok_or(PollerError::MissingValue(Parameter::Name))
    }

    async fn fill_cache(&mut self, force_fresh: bool) -> Result<(), PollerError> {
        if !force_fresh && self.cache.is_fresh() {
            debug!("Serving cached data for {}", self.address);
            return Ok(());
        }

        self.fetch().await?;
        self.cache.mark_fetched();
        Ok(())
    }

    /// One connect -> read x3 -> disconnect cycle
    async fn fetch(&mut self) -> Result<(), PollerError> {
        let transport = &self.transport;
        let address = self.address.as_str();
        let adapter = self.adapter.as_str();
        let session = retry(&self.retry_policy, "connect", move || {
            transport.connect(address, adapter)
        })
        .await?;
        debug!("Connected to device {}", self.address);

        let result = self.fetch_characteristics(&session).await;

        // Always release the connection, even when a step failed
        self.transport.disconnect(session).await;
        debug!("Disconnected from device {}", self.address);

        if result.is_ok() {
            info!(
                "Read {} ({}): {:?}",
                self.address,
                self.reading.name.as_deref().unwrap_or("unnamed"),
                self.reading
            );
        }
        result
    }

    async fn fetch_characteristics(&mut self, session: &T::Session) -> Result<(), PollerError> {
        self.fetch_name(session).await?;
        self.fetch_version_battery(session).await?;
        self.fetch_measurements(session).await
    }

    async fn fetch_name(&mut self, session: &T::Session) -> Result<(), PollerError> {
        let transport = &self.transport;
        let data = retry(&self.retry_policy, "read name", move || {
            transport.read_characteristic(session, HANDLE_NAME)
        })
        .await?;
        self.reading.name = Some(decode_name(&data)?);
        Ok(())
    }

    async fn fetch_version_battery(&mut self, session: &T::Session) -> Result<(), PollerError> {
        let transport = &self.transport;
        let data = retry(&self.retry_policy, "read version/battery", move || {
            transport.read_characteristic(session, HANDLE_VERSION_BATTERY)
        })
        .await?;
        let decoded = decode_version_battery(&data)?;
        self.reading.battery = Some(decoded.battery);
        self.reading.firmware_version = Some(decoded.firmware_version);
        Ok(())
    }

    async fn fetch_measurements(&mut self, session: &T::Session) -> Result<(), PollerError> {
        let transport = &self.transport;

        // Lexical comparison, as the firmware reports fixed-width "x.y.z"
        let needs_activation = self
            .reading
            .firmware_version
            .as_deref()
            .is_some_and(|version| version >= ACTIVATION_MIN_FIRMWARE);
        if needs_activation {
            retry(&self.retry_policy, "activate measurements", move || {
                transport.write_characteristic(session, HANDLE_MODE, &ACTIVATE_MEASUREMENTS, true)
            })
            .await?;
        }

        let data = retry(&self.retry_policy, "read measurements", move || {
            transport.read_characteristic(session, HANDLE_MEASUREMENTS)
        })
        .await?;
        if is_invalid_data(&data) {
            return Err(PollerError::InvalidSensorData);
        }

        let measurements = decode_measurements(&data)?;
        self.reading.temperature = Some(measurements.temperature);
        self.reading.light = Some(measurements.light);
        self.reading.moisture = Some(measurements.moisture);
        self.reading.conductivity = Some(measurements.conductivity);
        Ok(())
    }
}
