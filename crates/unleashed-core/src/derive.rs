// ── Metric derivation ──
//
// Turns the three extracted record sets of one scrape into plain metric
// values. Inventory supplies display names and models keyed by MAC;
// status records carry the counters; client records feed the signal
// breakdown. Nothing here touches the registry, which keeps the rules
// testable without parsing exposition text.

use std::collections::HashMap;

use unleashed_api::Record;

use crate::airtime::{AirtimeSample, AirtimeStore, EntityKey};
use crate::fields::{self, client, inventory, normalize_mac, radio, status};
use crate::signal::{SignalCounts, SignalKey, classify};

const MASTER_ROLE: &str = "master";
const MEMBER_ROLE: &str = "member";
const BAND_2G: &str = "2.4g";
const BAND_5G: &str = "5g";
const UNKNOWN_MODEL: &str = "unknown";
const UNKNOWN_AP: &str = "Unknown-AP";

/// Display metadata resolved for one AP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApIdentity {
    pub name: String,
    pub mac: String,
    pub model: String,
}

/// Cluster role reported by an AP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Master,
    Member,
}

impl Role {
    /// Anything other than `master` (case-insensitive) is a member.
    fn from_label(label: &str) -> Self {
        if label.eq_ignore_ascii_case(MASTER_ROLE) {
            Self::Master
        } else {
            Self::Member
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Master => MASTER_ROLE,
            Self::Member => MEMBER_ROLE,
        }
    }
}

/// Per-AP values from one status record.
#[derive(Debug, Clone, PartialEq)]
pub struct ApMetrics {
    pub identity: ApIdentity,
    pub ip: String,
    pub firmware: String,
    /// Raw lower-cased role string, kept for the status label.
    pub role_label: String,
    pub role: Role,
    pub online: bool,
    pub uptime_secs: f64,
    pub clients: f64,
    pub rx_bytes: f64,
    pub tx_bytes: f64,
    pub cpu_percent: f64,
    /// Only present when the reported total memory is positive.
    pub memory_percent: Option<f64>,
}

/// Per-radio values; either field may be absent for a given cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct RadioMetrics {
    pub identity: ApIdentity,
    pub band: String,
    pub noise_floor_dbm: Option<f64>,
    pub airtime_percent: Option<f64>,
}

/// Controller-level values taken from the AP reporting role `master`.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerMetrics {
    pub cpu_percent: f64,
    pub uptime_secs: f64,
    pub memory_percent: Option<f64>,
}

/// Sums over every counted status record of one scrape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkTotals {
    pub clients: f64,
    pub aps: u64,
    pub rx_bytes: f64,
    pub tx_bytes: f64,
    pub masters: u64,
    pub members: u64,
}

/// Everything derived from one scrape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedMetrics {
    pub aps: Vec<ApMetrics>,
    pub radios: Vec<RadioMetrics>,
    /// Last master wins when several records claim the role.
    pub controller: Option<ControllerMetrics>,
    pub totals: NetworkTotals,
    pub signal: SignalCounts,
}

/// The three extracted record sets of one scrape.
#[derive(Debug, Clone, Copy)]
pub struct ScrapeRecords<'a> {
    pub inventory: &'a [&'a Record],
    pub status: &'a [&'a Record],
    pub clients: &'a [&'a Record],
}

/// Derive all metrics for one scrape, updating airtime state as a side effect.
pub fn derive(records: ScrapeRecords<'_>, airtime: &dyn AirtimeStore) -> DerivedMetrics {
    let catalog = inventory_map(records.inventory);
    let mut out = DerivedMetrics {
        signal: signal_counts(records.clients, &catalog),
        ..DerivedMetrics::default()
    };

    for record in records.status {
        let Some(ap) = ap_metrics(record, &catalog) else {
            continue;
        };

        let totals = &mut out.totals;
        totals.aps += 1;
        totals.clients += ap.clients;
        totals.rx_bytes += ap.rx_bytes;
        totals.tx_bytes += ap.tx_bytes;
        match ap.role {
            Role::Master => {
                totals.masters += 1;
                out.controller = Some(ControllerMetrics {
                    cpu_percent: ap.cpu_percent,
                    uptime_secs: ap.uptime_secs,
                    memory_percent: ap.memory_percent,
                });
            }
            Role::Member => totals.members += 1,
        }

        out.radios
            .extend(radio_metrics(record, &ap.identity, ap.uptime_secs, airtime));
        out.aps.push(ap);
    }

    out
}

/// Inventory keyed by lower-cased MAC.
fn inventory_map(records: &[&Record]) -> HashMap<String, (String, String)> {
    records
        .iter()
        .filter_map(|record| {
            let mac = normalize_mac(inventory::MAC.text(record)?);
            let name = inventory::NAME
                .text(record)
                .map_or_else(|| mac.clone(), str::to_owned);
            let model = inventory::MODEL.text(record).unwrap_or(UNKNOWN_MODEL).to_owned();
            Some((mac, (name, model)))
        })
        .collect()
}

fn ap_metrics(
    record: &Record,
    catalog: &HashMap<String, (String, String)>,
) -> Option<ApMetrics> {
    let mac = normalize_mac(status::MAC.text(record)?);
    if mac.is_empty() {
        return None;
    }

    let (name, model) = catalog.get(&mac).cloned().unwrap_or_else(|| {
        let name = status::NAME.text(record).map_or_else(|| mac.clone(), str::to_owned);
        let model = status::MODEL.text(record).unwrap_or(UNKNOWN_MODEL).to_uppercase();
        (name, model)
    });

    let role_label = status::ROLE
        .text(record)
        .map_or_else(|| MEMBER_ROLE.to_owned(), str::to_lowercase);

    Some(ApMetrics {
        identity: ApIdentity { name, mac, model },
        ip: status::IP.text(record).unwrap_or_default().to_owned(),
        firmware: status::FIRMWARE.text(record).unwrap_or_default().to_owned(),
        role: Role::from_label(&role_label),
        role_label,
        online: status::STATE.text(record) == Some(status::ONLINE_STATE)
            || status::STATUS.text(record) == Some(status::ONLINE_STATUS),
        uptime_secs: status::UPTIME.number(record),
        clients: status::CLIENTS.number(record),
        rx_bytes: status::RX_BYTES.number(record),
        tx_bytes: status::TX_BYTES.number(record),
        cpu_percent: status::CPU.number(record),
        memory_percent: memory_percent(
            status::MEM_TOTAL.number(record),
            status::MEM_FREE.number(record),
        ),
    })
}

/// `(total - free) / total * 100`, omitted unless `total > 0`.
pub fn memory_percent(total: f64, free: f64) -> Option<f64> {
    (total > 0.0).then(|| (total - free) / total * 100.0)
}

/// Band label: explicit `radio-band`, else `radio-id` 0 → 2.4g, otherwise 5g.
fn band_of(record: &Record) -> String {
    if let Some(band) = radio::BAND.text(record) {
        return band.to_owned();
    }
    match radio::INDEX.text(record) {
        Some("0") => BAND_2G.to_owned(),
        _ => BAND_5G.to_owned(),
    }
}

fn radio_metrics(
    record: &Record,
    identity: &ApIdentity,
    uptime_secs: f64,
    airtime: &dyn AirtimeStore,
) -> Vec<RadioMetrics> {
    let Some(radios) = record.get(status::RADIO) else {
        return Vec::new();
    };

    radios
        .records()
        .into_iter()
        .map(|radio_record| {
            let band = band_of(radio_record);
            let noise_floor_dbm = radio::NOISE_FLOOR
                .text(radio_record)
                .map(fields::clean_number);

            let airtime_percent = if radio::AIRTIME_TICKS.is_present(radio_record) {
                let key = EntityKey::new(identity.mac.clone(), band.clone());
                let sample = AirtimeSample {
                    ticks: radio::AIRTIME_TICKS.number(radio_record),
                    uptime_secs,
                };
                airtime.observe(&key, sample)
            } else {
                None
            };

            RadioMetrics {
                identity: identity.clone(),
                band,
                noise_floor_dbm,
                airtime_percent,
            }
        })
        .collect()
}

fn signal_counts(clients: &[&Record], catalog: &HashMap<String, (String, String)>) -> SignalCounts {
    let mut counts = SignalCounts::new();
    for record in clients {
        let Some(quality) = classify(client::RSSI.number(record)) else {
            continue;
        };

        let ap_mac = client::AP_MAC.text(record).map(normalize_mac).unwrap_or_default();
        let ap_name = catalog.get(&ap_mac).map_or_else(
            || client::AP_NAME.text(record).unwrap_or(UNKNOWN_AP).to_owned(),
            |(name, _)| name.clone(),
        );
        let band = if client::BAND.text(record).is_some_and(|b| b.contains('5')) {
            BAND_5G
        } else {
            BAND_2G
        };

        *counts
            .entry(SignalKey {
                ap_name,
                ap_mac,
                band: band.to_owned(),
                quality,
            })
            .or_insert(0) += 1;
    }
    counts
}
