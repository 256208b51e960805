// ── Field catalog ──
//
// Firmware releases disagree on field names for the same attribute
// (`mac` vs `mac-address`, `uptime` vs `up-time`, ...). Each logical
// attribute is declared once as an ordered list of candidate names;
// the first candidate holding a non-empty scalar wins.

use unleashed_api::{Node, Record};

/// Ordered candidate field names for one logical attribute.
#[derive(Debug, Clone, Copy)]
pub struct Field(pub &'static [&'static str]);

impl Field {
    /// First candidate present as a non-empty scalar.
    pub fn text<'a>(&self, record: &'a Record) -> Option<&'a str> {
        self.0
            .iter()
            .filter_map(|name| record.get(*name).and_then(Node::as_str))
            .find(|value| !value.is_empty())
    }

    /// Tolerant numeric value; missing or non-numeric yields `0`.
    pub fn number(&self, record: &Record) -> f64 {
        self.text(record).map_or(0.0, clean_number)
    }

    /// Whether any candidate key exists at all, even with an empty value.
    pub fn is_present(&self, record: &Record) -> bool {
        self.0.iter().any(|name| record.contains_key(*name))
    }
}

/// Strip everything but digits, `.` and `-`, then parse the longest
/// numeric prefix. Empty or entirely non-numeric input yields `0`.
///
/// `"1,024 KB"` → `1024`, `"-92dBm"` → `-92`, `"n/a"` → `0`.
pub fn clean_number(raw: &str) -> f64 {
    let stripped: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    let bytes = stripped.as_bytes();
    let mut end = 0;
    if bytes.first() == Some(&b'-') {
        end = 1;
    }
    let mut seen_dot = false;
    while let Some(&b) = bytes.get(end) {
        match b {
            b'0'..=b'9' => end += 1,
            b'.' if !seen_dot => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }

    stripped
        .get(..end)
        .and_then(|prefix| prefix.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Normalize a MAC for lookups and labels: lowercase, colon-separated.
pub fn normalize_mac(raw: &str) -> String {
    raw.trim().to_lowercase().replace('-', ":")
}

// ── Inventory (`apmgr` ap-list) ──────────────────────────────────────

pub mod inventory {
    use super::Field;

    pub const MAC: Field = Field(&["mac", "mac-address"]);
    pub const NAME: Field = Field(&["ap-name", "devname", "device-name"]);
    pub const MODEL: Field = Field(&["model", "display-model"]);
}

// ── AP status (`stamgr` ap) ──────────────────────────────────────────

pub mod status {
    use super::Field;

    pub const MAC: Field = Field(&["mac", "mac-address"]);
    pub const NAME: Field = Field(&["ap-name"]);
    pub const MODEL: Field = Field(&["model"]);
    pub const UPTIME: Field = Field(&["uptime", "up-time"]);
    pub const CLIENTS: Field = Field(&["num-sta"]);
    pub const RX_BYTES: Field = Field(&["lan_stats_rx_byte", "rx-byte"]);
    pub const TX_BYTES: Field = Field(&["lan_stats_tx_byte", "tx-byte"]);
    pub const MEM_FREE: Field = Field(&["mem_avail"]);
    pub const MEM_TOTAL: Field = Field(&["mem_total"]);
    pub const CPU: Field = Field(&["cpu_util"]);
    pub const ROLE: Field = Field(&["role"]);
    pub const IP: Field = Field(&["ip"]);
    pub const FIRMWARE: Field = Field(&["firmware-version"]);
    pub const STATE: Field = Field(&["state"]);
    pub const STATUS: Field = Field(&["status"]);

    /// Key holding the radio sub-records of a status record.
    pub const RADIO: &str = "radio";

    /// `state` value marking an online AP.
    pub const ONLINE_STATE: &str = "1";
    /// `status` value marking an online AP.
    pub const ONLINE_STATUS: &str = "up";
}

// ── Radio sub-records ────────────────────────────────────────────────

pub mod radio {
    use super::Field;

    pub const BAND: Field = Field(&["radio-band"]);
    pub const INDEX: Field = Field(&["radio-id"]);
    pub const NOISE_FLOOR: Field = Field(&["noisefloor"]);
    pub const AIRTIME_TICKS: Field = Field(&["airtime-total"]);
}

// ── Clients (`stamgr` client) ────────────────────────────────────────

pub mod client {
    use super::Field;

    pub const AP_MAC: Field = Field(&["ap"]);
    pub const AP_NAME: Field = Field(&["ap-name"]);
    pub const RSSI: Field = Field(&["rssi"]);
    pub const BAND: Field = Field(&["radio-band"]);
}
