// ── Client signal-quality classification ──

use std::collections::BTreeMap;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Coarse RSSI bucket for one associated client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SignalQuality {
    Good,
    Moderate,
    Poor,
}

/// Classify an RSSI reading; `0` means "not reported" and yields `None`.
///
/// Negative values are dBm (`≥ -67` good, `≥ -75` moderate). Positive
/// values are a quality index (`≥ 30` good, `≥ 20` moderate).
pub fn classify(rssi: f64) -> Option<SignalQuality> {
    if rssi.abs() < f64::EPSILON {
        return None;
    }
    let (good, moderate) = if rssi < 0.0 { (-67.0, -75.0) } else { (30.0, 20.0) };
    Some(if rssi >= good {
        SignalQuality::Good
    } else if rssi >= moderate {
        SignalQuality::Moderate
    } else {
        SignalQuality::Poor
    })
}

/// How the per-bucket client counts are exposed.
///
/// `Snapshot` publishes a gauge holding this scrape's count. `Cumulative`
/// publishes a counter that keeps growing across scrapes of the same
/// target, so it reads as "client-scrapes observed in this bucket".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SignalQualityMode {
    #[default]
    Snapshot,
    Cumulative,
}

/// Label set of one signal-quality series.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SignalKey {
    pub ap_name: String,
    pub ap_mac: String,
    pub band: String,
    pub quality: SignalQuality,
}

/// Per-scrape client counts by bucket.
pub type SignalCounts = BTreeMap<SignalKey, u64>;

/// Running totals for [`SignalQualityMode::Cumulative`], per target.
#[derive(Debug, Default)]
pub struct SignalTally {
    totals: DashMap<String, SignalCounts>,
}

impl SignalTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one scrape's counts for `target` and return every running
    /// total for that target, including buckets absent this time.
    pub fn accumulate(&self, target: &str, counts: &SignalCounts) -> SignalCounts {
        let mut running = self.totals.entry(target.to_owned()).or_default();
        for (key, count) in counts {
            *running.entry(key.clone()).or_insert(0) += count;
        }
        running.value().clone()
    }
}
