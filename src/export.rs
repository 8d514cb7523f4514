/// Zabbix sender input file export
use std::fmt::Write;

use crate::models::{FlowerEntry, Parameter};

/// Render entries as `zabbix_sender -i` lines:
/// `"<host>" miflora[<parameter>] <timestamp> <value>`
pub fn format_zabbix(hostname: &str, entries: &[FlowerEntry]) -> String {
    let mut output = String::new();
    for entry in entries {
        // Parameters without a journal column are skipped
        for parameter in Parameter::ALL {
            if let Some(value) = entry.column(parameter) {
                // Writing into a String cannot fail
                let _ = writeln!(
                    output,
                    "\"{}\" miflora[{}] {} {}",
                    hostname, parameter, entry.time, value
                );
            }
        }
    }
    output
}
