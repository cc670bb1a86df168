use core::sync::atomic::{AtomicUsize, Ordering};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How an API key is chosen for each outbound call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum KeyRotation {
    #[default]
    RoundRobin,
    Random,
}

/// Picks one key out of a fixed pool.
pub trait KeySelector: core::fmt::Debug + Send + Sync {
    /// Returns `None` when the pool is empty.
    fn select(&self) -> Option<&str>;
}

#[derive(Debug)]
pub struct RoundRobin {
    keys: Vec<String>,
    next: AtomicUsize,
}

impl RoundRobin {
    #[must_use]
    pub const fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            next: AtomicUsize::new(0),
        }
    }
}

impl KeySelector for RoundRobin {
    fn select(&self) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }

        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.keys.len();
        self.keys.get(index).map(String::as_str)
    }
}

#[derive(Debug)]
pub struct Random {
    keys: Vec<String>,
}

impl Random {
    #[must_use]
    pub const fn new(keys: Vec<String>) -> Self {
        Self { keys }
    }
}

impl KeySelector for Random {
    fn select(&self) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }

        let index = rand::random_range(0..self.keys.len());
        self.keys.get(index).map(String::as_str)
    }
}

/// Build the selector for a rotation strategy, dropping blank keys.
#[must_use]
pub fn key_selector(rotation: KeyRotation, keys: impl IntoIterator<Item = String>) -> Arc<dyn KeySelector> {
    let keys: Vec<String> = keys
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();

    match rotation {
        KeyRotation::RoundRobin => Arc::new(RoundRobin::new(keys)),
        KeyRotation::Random => Arc::new(Random::new(keys)),
    }
}
