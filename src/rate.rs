// Per-second rates from monotonic kernel counters

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Floor for elapsed time so back-to-back polls never divide by zero.
pub const MIN_ELAPSED: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy)]
struct Baseline {
    value: u64,
    at: Instant,
}

/// Previous-sample table shared by every metric family.
///
/// Keys are family-qualified (`iface_rx:eth0`, `disk_sectors:sda`, `block::sda`) so
/// families never collide. The whole read-compute-write for one key happens under the
/// lock, so concurrent pollers cannot interleave and corrupt a baseline.
#[derive(Debug, Default)]
pub struct RateTracker {
    baselines: Mutex<HashMap<String, Baseline>>,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rate of `key` since its previous observation, using the current time.
    pub fn rate(&self, key: &str, value: u64) -> f64 {
        self.rate_at(key, value, Instant::now())
    }

    /// Rate of `key` between the stored baseline and `(value, at)`; stores the new baseline.
    ///
    /// First observation and counter resets (value went down) both yield 0.
    pub fn rate_at(&self, key: &str, value: u64, at: Instant) -> f64 {
        let mut table = self
            .baselines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let prev = table.insert(key.to_string(), Baseline { value, at });
        match prev {
            None => 0.0,
            Some(prev) => {
                let elapsed = at.saturating_duration_since(prev.at).max(MIN_ELAPSED);
                let delta = value.saturating_sub(prev.value);
                delta as f64 / elapsed.as_secs_f64()
            }
        }
    }

    /// Runs [`rate_at`](Self::rate_at) for every counter in the snapshot.
    pub fn observe(&self, snapshot: &CounterSnapshot) -> Vec<RateSample> {
        snapshot
            .values
            .iter()
            .map(|(key, &value)| RateSample {
                key: key.clone(),
                rate: self.rate_at(key, value, snapshot.taken_at),
            })
            .collect()
    }

    pub fn forget(&self, key: &str) {
        self.baselines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(key);
    }

    pub fn len(&self) -> usize {
        self.baselines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Counter values read together at one instant.
#[derive(Debug, Clone)]
pub struct CounterSnapshot {
    pub taken_at: Instant,
    pub values: BTreeMap<String, u64>,
}

impl CounterSnapshot {
    pub fn new(taken_at: Instant) -> Self {
        Self {
            taken_at,
            values: BTreeMap::new(),
        }
    }

    pub fn now() -> Self {
        Self::new(Instant::now())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: u64) -> &mut Self {
        self.values.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateSample {
    pub key: String,
    pub rate: f64,
}

/// Rate for `key`, or 0 when the snapshot did not carry it.
pub fn rate_of(samples: &[RateSample], key: &str) -> f64 {
    samples
        .iter()
        .find(|s| s.key == key)
        .map(|s| s.rate)
        .unwrap_or(0.0)
}
