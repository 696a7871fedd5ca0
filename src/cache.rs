//! Shared cache of provider legs.
//!
//! Legs are kept per provider for a fixed time-to-live and matched by
//! coordinates snapped to a small grid, so a re-geocoded address a few metres
//! away still hits. Unreachable pairs are never cached.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

use crate::error::ProviderError;
use crate::matrix::Leg;
use crate::model::Coordinate;
use crate::traits::DistanceMatrixProvider;

/// Lifetime of a cached leg.
pub const CACHE_TTL_HOURS: i64 = 48;

/// Grid size in degrees (about 55 m of latitude).
pub const CACHE_TOLERANCE_DEG: f64 = 0.0005;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PairKey {
    provider: String,
    origin: (i64, i64),
    destination: (i64, i64),
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    leg: Leg,
    expires_at: DateTime<Utc>,
}

/// Leg store shared by every run of a service.
#[derive(Debug)]
pub struct LegCache {
    ttl: Duration,
    tolerance: f64,
    entries: RwLock<HashMap<PairKey, Entry>>,
}

impl Default for LegCache {
    fn default() -> Self {
        Self::new(Duration::hours(CACHE_TTL_HOURS), CACHE_TOLERANCE_DEG)
    }
}

impl LegCache {
    pub fn new(ttl: Duration, tolerance: f64) -> Self {
        Self {
            ttl,
            tolerance,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn snap(&self, c: Coordinate) -> (i64, i64) {
        (
            (c.lat / self.tolerance).round() as i64,
            (c.lng / self.tolerance).round() as i64,
        )
    }

    fn key(&self, provider: &str, origin: Coordinate, destination: Coordinate) -> PairKey {
        PairKey {
            provider: provider.to_string(),
            origin: self.snap(origin),
            destination: self.snap(destination),
        }
    }

    /// Unexpired leg for the pair, if any.
    pub fn get(
        &self,
        provider: &str,
        origin: Coordinate,
        destination: Coordinate,
        now: DateTime<Utc>,
    ) -> Option<Leg> {
        let key = self.key(provider, origin, destination);
        self.entries
            .read()
            .get(&key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.leg)
    }

    /// Stores a leg that expires `ttl` after `now`.
    pub fn insert(
        &self,
        provider: &str,
        origin: Coordinate,
        destination: Coordinate,
        leg: Leg,
        now: DateTime<Utc>,
    ) {
        let key = self.key(provider, origin, destination);
        let entry = Entry {
            leg,
            expires_at: now + self.ttl,
        };
        self.entries.write().insert(key, entry);
    }

    /// Drops expired entries; returns how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Provider wrapper that answers from a [`LegCache`] and forwards only the
/// misses, in one call, to the inner provider.
pub struct CachedProvider<'a, P: ?Sized> {
    inner: &'a P,
    cache: &'a LegCache,
}

impl<'a, P: DistanceMatrixProvider + ?Sized> CachedProvider<'a, P> {
    pub fn new(inner: &'a P, cache: &'a LegCache) -> Self {
        Self { inner, cache }
    }
}

impl<P: DistanceMatrixProvider + ?Sized> DistanceMatrixProvider for CachedProvider<'_, P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn legs_from(
        &self,
        origin: Coordinate,
        destinations: &[Coordinate],
    ) -> Result<Vec<Option<Leg>>, ProviderError> {
        let provider = self.inner.name();
        let now = Utc::now();

        let mut legs: Vec<Option<Leg>> = destinations
            .iter()
            .map(|d| self.cache.get(provider, origin, *d, now))
            .collect();
        let missing: Vec<usize> = legs
            .iter()
            .enumerate()
            .filter(|(_, leg)| leg.is_none())
            .map(|(i, _)| i)
            .collect();

        tracing::trace!(
            provider,
            hits = destinations.len() - missing.len(),
            misses = missing.len(),
            "leg cache lookup"
        );
        if missing.is_empty() {
            return Ok(legs);
        }

        let targets: Vec<Coordinate> = missing.iter().map(|&i| destinations[i]).collect();
        let fetched = self.inner.legs_from(origin, &targets)?;
        for (&i, leg) in missing.iter().zip(fetched) {
            if let Some(leg) = leg {
                self.cache.insert(provider, origin, destinations[i], leg, now);
            }
            legs[i] = leg;
        }
        Ok(legs)
    }
}
