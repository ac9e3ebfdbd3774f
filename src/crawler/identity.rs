//! Outgoing client identity rotation
//!
//! Each request carries a `User-Agent` picked by an [`IdentityRotation`]. The
//! strategy is chosen in configuration; the scheduler only asks for the next one.

use crate::config::{RotationStrategy, UserAgentConfig};
use rand::seq::IndexedRandom;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Browser identities used when the configuration does not supply any
pub const DEFAULT_IDENTITIES: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.2478.67",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
];

/// Supplies the identity for the next outgoing request
pub trait IdentityRotation: Send + Sync {
    fn next_identity(&self) -> String;
}

/// Always the same identity
#[derive(Debug, Clone)]
pub struct FixedIdentity(String);

impl FixedIdentity {
    pub fn new(identity: impl Into<String>) -> Self {
        Self(identity.into())
    }
}

impl IdentityRotation for FixedIdentity {
    fn next_identity(&self) -> String {
        self.0.clone()
    }
}

/// Cycles through the pool in order
#[derive(Debug)]
pub struct RoundRobinIdentity {
    pool: Vec<String>,
    cursor: AtomicUsize,
}

impl RoundRobinIdentity {
    pub fn new(pool: Vec<String>) -> Self {
        Self {
            pool,
            cursor: AtomicUsize::new(0),
        }
    }
}

impl IdentityRotation for RoundRobinIdentity {
    fn next_identity(&self) -> String {
        if self.pool.is_empty() {
            return String::new();
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.pool.len();
        self.pool[index].clone()
    }
}

/// Picks a uniformly random identity per request
#[derive(Debug, Clone)]
pub struct RandomIdentity {
    pool: Vec<String>,
}

impl RandomIdentity {
    pub fn new(pool: Vec<String>) -> Self {
        Self { pool }
    }
}

impl IdentityRotation for RandomIdentity {
    fn next_identity(&self) -> String {
        self.pool
            .choose(&mut rand::rng())
            .cloned()
            .unwrap_or_default()
    }
}

/// Builds the rotation strategy described by the configuration
pub fn build_rotation(config: &UserAgentConfig) -> Arc<dyn IdentityRotation> {
    let pool: Vec<String> = if config.identities.is_empty() {
        DEFAULT_IDENTITIES.iter().map(|s| s.to_string()).collect()
    } else {
        config.identities.clone()
    };

    match config.rotation {
        RotationStrategy::Random => Arc::new(RandomIdentity::new(pool)),
        RotationStrategy::RoundRobin => Arc::new(RoundRobinIdentity::new(pool)),
        RotationStrategy::Fixed => Arc::new(FixedIdentity::new(
            pool.into_iter().next().unwrap_or_default(),
        )),
    }
}
