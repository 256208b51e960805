// ── Cross-scrape airtime smoothing ──
//
// Devices report airtime as a cumulative busy-tick counter. Turning that
// into a utilization percentage needs the previous (ticks, uptime) pair
// for the same radio, plus a short window of recent rates for smoothing,
// so this is the one piece of derivation state that outlives a probe.

use std::collections::VecDeque;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Number of instantaneous samples averaged into the emitted value.
pub const HISTORY_CAPACITY: usize = 3;

/// Identifies one radio interface across scrapes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub mac: String,
    pub band: String,
}

impl EntityKey {
    pub fn new(mac: impl Into<String>, band: impl Into<String>) -> Self {
        Self {
            mac: mac.into(),
            band: band.into(),
        }
    }
}

/// Cumulative counters observed for a radio in one scrape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AirtimeSample {
    pub ticks: f64,
    pub uptime_secs: f64,
}

/// Process-lifetime store of airtime baselines and smoothing windows.
///
/// `observe` is a single read-modify-write per key; implementations must
/// make it atomic with respect to concurrent probes touching the same key.
pub trait AirtimeStore: Send + Sync {
    /// Record `sample` for `key` and return the smoothed utilization
    /// percentage, or `None` when no valid delta exists this cycle.
    fn observe(&self, key: &EntityKey, sample: AirtimeSample) -> Option<f64>;
}

#[derive(Debug)]
struct AirtimeEntry {
    last: AirtimeSample,
    history: VecDeque<f64>,
}

/// `DashMap`-backed [`AirtimeStore`].
///
/// The entry API holds the shard write lock for the whole update, which
/// serializes concurrent observations of one key. Keys are never removed.
#[derive(Debug, Default)]
pub struct AirtimeTracker {
    entries: DashMap<EntityKey, AirtimeEntry>,
}

impl AirtimeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of radios ever observed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AirtimeStore for AirtimeTracker {
    fn observe(&self, key: &EntityKey, sample: AirtimeSample) -> Option<f64> {
        match self.entries.entry(key.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(AirtimeEntry {
                    last: sample,
                    history: VecDeque::with_capacity(HISTORY_CAPACITY),
                });
                None
            }
            Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                let prev = std::mem::replace(&mut entry.last, sample);

                // Uptime going backwards or ticks shrinking means a reboot or
                // counter reset: rebase silently.
                if sample.uptime_secs <= prev.uptime_secs || sample.ticks < prev.ticks {
                    return None;
                }

                let delta_ticks = sample.ticks - prev.ticks;
                let delta_secs = sample.uptime_secs - prev.uptime_secs;
                let instant = delta_ticks / (delta_secs * 100.0) * 100.0;

                if entry.history.len() == HISTORY_CAPACITY {
                    entry.history.pop_front();
                }
                entry.history.push_back(instant);

                Some(smoothed(&entry.history))
            }
        }
    }
}

/// Mean of the retained window, clamped to `[0, 100]`.
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn smoothed(history: &VecDeque<f64>) -> f64 {
    let mean = history.iter().sum::<f64>() / history.len() as f64;
    mean.clamp(0.0, 100.0)
}
