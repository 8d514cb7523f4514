/// Mi Flora characteristic payload decoding
use log::debug;

use crate::error::PollerError;
use crate::utils::format_bytes;

// Payload lengths as sent by the device
pub const VERSION_BATTERY_LEN: usize = 7;
pub const MEASUREMENT_LEN: usize = 16;

/// Returned on the measurement characteristic until the sensor has a valid sample
pub const INVALID_DATA: [u8; MEASUREMENT_LEN] = [
    0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, 0x99, 0x88, 0x77, 0x66, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Battery level and firmware version from handle 0x38
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionBattery {
    pub battery: u8,
    pub firmware_version: String,
}

/// Measurements from handle 0x35
#[derive(Debug, Clone, PartialEq)]
pub struct Measurements {
    pub temperature: f64,
    pub light: u16,
    pub moisture: u8,
    pub conductivity: u16,
}

fn ensure_len(payload: &'static str, data: &[u8], expected: usize) -> Result<(), PollerError> {
    if data.len() < expected {
        return Err(PollerError::MalformedPayload {
            payload,
            reason: format!("expected {} bytes, got {}", expected, data.len()),
        });
    }
    Ok(())
}

fn decode_ascii(payload: &'static str, data: &[u8]) -> Result<String, PollerError> {
    if !data.is_ascii() {
        return Err(PollerError::MalformedPayload {
            payload,
            reason: format!("non-ASCII text: {}", format_bytes(data)),
        });
    }
    // ASCII is always valid UTF-8
    Ok(data.iter().map(|&b| b as char).collect())
}

/// Decode the device name read from handle 0x03
pub fn decode_name(data: &[u8]) -> Result<String, PollerError> {
    decode_ascii("name", data)
}

/// Decode battery level and firmware version
///
/// Layout (7 bytes):
/// - Byte 0: Battery level in percent
/// - Byte 1: unused
/// - Bytes 2-6: Firmware version as ASCII, e.g. "3.1.8"
pub fn decode_version_battery(data: &[u8]) -> Result<VersionBattery, PollerError> {
    ensure_len("version/battery", data, VERSION_BATTERY_LEN)?;

    let battery = data[0];
    let firmware_version = decode_ascii("version/battery", &data[2..7])?;

    debug!("Raw data for char 0x38: {}", format_bytes(data));
    debug!("battery: {}", battery);
    debug!("version: {}", firmware_version);

    Ok(VersionBattery {
        battery,
        firmware_version,
    })
}

/// Decode the two temperature bytes into degrees Celsius
///
/// Values with bit 15 set are stored in one's complement. Both bytes are
/// flipped and the result is used as the magnitude; the sign is not put
/// back, so a device reporting -0.9 °C decodes as 0.9.
pub fn decode_temperature(bytes: [u8; 2]) -> f64 {
    let bytes = if bytes[1] & 0x80 > 0 {
        [bytes[0] ^ 0xFF, bytes[1] ^ 0xFF]
    } else {
        bytes
    };
    // Scaled by a factor of 0.1
    f64::from(u16::from_le_bytes(bytes)) / 10.0
}

/// Decode the measurement characteristic
///
/// Layout (16 bytes, little-endian):
/// - Bytes 0-1: Temperature, 0.1 °C
/// - Byte 2: unused
/// - Bytes 3-4: Illuminance in lux
/// - Bytes 5-6: unused
/// - Byte 7: Moisture in percent
/// - Bytes 8-9: Conductivity in µS/cm
/// - Bytes 10-15: unused
pub fn decode_measurements(data: &[u8]) -> Result<Measurements, PollerError> {
    ensure_len("measurement", data, MEASUREMENT_LEN)?;

    let measurements = Measurements {
        temperature: decode_temperature([data[0], data[1]]),
        light: u16::from_le_bytes([data[3], data[4]]),
        moisture: data[7],
        conductivity: u16::from_le_bytes([data[8], data[9]]),
    };

    debug!("Raw data for char 0x35: {}", format_bytes(data));
    debug!("temp: {:.1}", measurements.temperature);
    debug!("brightness: {}", measurements.light);
    debug!("conductivity: {}", measurements.conductivity);
    debug!("moisture: {}", measurements.moisture);

    Ok(measurements)
}

/// Whether a measurement payload is the "no data yet" sentinel
pub fn is_invalid_data(data: &[u8]) -> bool {
    data == &INVALID_DATA[..]
}
