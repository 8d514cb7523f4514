use std::fmt;
use std::str::FromStr;

use crate::error::PollerError;

/// Decoded state of one Mi Flora sensor, as last read over the air
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorReading {
    pub battery: Option<u8>,
    pub firmware_version: Option<String>,
    pub name: Option<String>,
    pub temperature: Option<f64>,
    pub light: Option<u16>,
    pub moisture: Option<u8>,
    pub conductivity: Option<u16>,
}

impl SensorReading {
    /// Look up the cached value for a single parameter
    pub fn value(&self, parameter: Parameter) -> Option<ParameterValue> {
        match parameter {
            Parameter::Battery => self.battery.map(|v| ParameterValue::Integer(v.into())),
            Parameter::Temperature => self.temperature.map(ParameterValue::Decimal),
            Parameter::Moisture => self.moisture.map(|v| ParameterValue::Integer(v.into())),
            Parameter::Light => self.light.map(|v| ParameterValue::Integer(v.into())),
            Parameter::Conductivity => self
                .conductivity
                .map(|v| ParameterValue::Integer(v.into())),
            Parameter::FirmwareVersion => self.firmware_version.clone().map(ParameterValue::Text),
            Parameter::Name => self.name.clone().map(ParameterValue::Text),
        }
    }
}

/// Values the poller can be asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    Battery,
    Temperature,
    Moisture,
    Light,
    Conductivity,
    FirmwareVersion,
    Name,
}

impl Parameter {
    pub const ALL: [Parameter; 7] = [
        Parameter::Temperature,
        Parameter::Moisture,
        Parameter::Light,
        Parameter::Conductivity,
        Parameter::Battery,
        Parameter::FirmwareVersion,
        Parameter::Name,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Parameter::Battery => "battery",
            Parameter::Temperature => "temperature",
            Parameter::Moisture => "moisture",
            Parameter::Light => "light",
            Parameter::Conductivity => "conductivity",
            Parameter::FirmwareVersion => "firmware_version",
            Parameter::Name => "name",
        }
    }

    /// Whether the flower journal has a column for this parameter
    pub fn is_stored(&self) -> bool {
        !matches!(self, Parameter::FirmwareVersion | Parameter::Name)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Parameter {
    type Err = PollerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "battery" => Ok(Parameter::Battery),
            "temperature" => Ok(Parameter::Temperature),
            "moisture" => Ok(Parameter::Moisture),
            "light" => Ok(Parameter::Light),
            "conductivity" => Ok(Parameter::Conductivity),
            "firmware_version" | "firmware" => Ok(Parameter::FirmwareVersion),
            "name" => Ok(Parameter::Name),
            other => Err(PollerError::UnknownParameter(other.to_string())),
        }
    }
}

/// A single scalar answered by the poller
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Integer(u32),
    Decimal(f64),
    Text(String),
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Integer(v) => write!(f, "{}", v),
            ParameterValue::Decimal(v) => write!(f, "{:.1}", v),
            ParameterValue::Text(v) => f.write_str(v),
        }
    }
}

/// One row of the flower journal, keyed by unix timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowerEntry {
    pub time: i64,
    pub temperature: i32,
    pub moisture: i32,
    pub conductivity: i32,
    pub light: i32,
    pub battery: i32,
}

impl FlowerEntry {
    /// Stored column for a parameter, `None` for parameters the journal does not keep
    pub fn column(&self, parameter: Parameter) -> Option<i32> {
        match parameter {
            Parameter::Temperature => Some(self.temperature),
            Parameter::Moisture => Some(self.moisture),
            Parameter::Conductivity => Some(self.conductivity),
            Parameter::Light => Some(self.light),
            Parameter::Battery => Some(self.battery),
            Parameter::FirmwareVersion | Parameter::Name => None,
        }
    }
}
