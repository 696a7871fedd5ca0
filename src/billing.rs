//! Usage and cost accounting for paid external calls.
//!
//! Every billable call made during a run lands here as one [`UsageRecord`].
//! Records are append-only; summaries are computed on demand over any subset.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::matrix::{Leg, TravelMatrix};
use crate::model::Coordinate;
use crate::traits::DistanceMatrixProvider;

pub const SKU_DISTANCE_MATRIX: &str = "distance_matrix";
pub const SKU_GEOCODE: &str = "geocode";

/// Estimated USD cost per unit, keyed by `(service, sku)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    rates: HashMap<String, f64>,
}

impl Default for RateTable {
    fn default() -> Self {
        Self::empty()
            .with_rate("google", SKU_GEOCODE, 0.005)
            .with_rate("google", SKU_DISTANCE_MATRIX, 0.005)
            .with_rate("ors", SKU_GEOCODE, 0.0)
            .with_rate("ors", SKU_DISTANCE_MATRIX, 0.0)
            .with_rate("mapbox", SKU_GEOCODE, 0.00075)
            .with_rate("mapbox", SKU_DISTANCE_MATRIX, 0.00075)
            // per token
            .with_rate("openai", "classify", 0.00015 / 1000.0)
            .with_rate("openai", "normalize", 0.00015 / 1000.0)
    }
}

impl RateTable {
    pub fn empty() -> Self {
        Self {
            rates: HashMap::new(),
        }
    }

    pub fn with_rate(mut self, service: &str, sku: &str, per_unit: f64) -> Self {
        self.rates.insert(key(service, sku), per_unit);
        self
    }

    /// Unknown pairs cost nothing.
    pub fn rate(&self, service: &str, sku: &str) -> f64 {
        self.rates.get(&key(service, sku)).copied().unwrap_or(0.0)
    }
}

fn key(service: &str, sku: &str) -> String {
    format!("{service}_{sku}")
}

/// One billable call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub trace_id: String,
    pub stage: String,
    pub service: String,
    pub sku: Option<String>,
    pub units: u64,
    pub latency_ms: u64,
    pub estimated_cost: f64,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate over a set of usage records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    pub total_cost: f64,
    pub total_units: u64,
    pub calls: usize,
    pub by_service: BTreeMap<String, f64>,
    /// Keyed by `service/sku`.
    pub by_sku: BTreeMap<String, f64>,
}

impl CostSummary {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a UsageRecord>) -> Self {
        let mut summary = Self::default();
        for record in records {
            summary.calls += 1;
            summary.total_cost += record.estimated_cost;
            summary.total_units += record.units;
            *summary.by_service.entry(record.service.clone()).or_default() += record.estimated_cost;
            let sku = record.sku.as_deref().unwrap_or("-");
            *summary
                .by_sku
                .entry(format!("{}/{}", record.service, sku))
                .or_default() += record.estimated_cost;
        }
        summary
    }
}

/// Shared, append-only usage ledger.
#[derive(Debug, Default)]
pub struct CostAccountant {
    rates: RateTable,
    records: RwLock<Vec<UsageRecord>>,
}

impl CostAccountant {
    pub fn new(rates: RateTable) -> Self {
        Self {
            rates,
            records: RwLock::new(Vec::new()),
        }
    }

    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    /// Prices and appends one call; returns the stored record.
    pub fn record(
        &self,
        trace_id: &str,
        stage: &str,
        service: &str,
        sku: Option<&str>,
        units: u64,
        latency_ms: u64,
    ) -> UsageRecord {
        let per_unit = sku.map_or(0.0, |sku| self.rates.rate(service, sku));
        let record = UsageRecord {
            trace_id: trace_id.to_string(),
            stage: stage.to_string(),
            service: service.to_string(),
            sku: sku.map(str::to_string),
            units,
            latency_ms,
            estimated_cost: per_unit * units as f64,
            timestamp: Utc::now(),
        };
        tracing::debug!(
            trace_id,
            stage,
            service,
            units,
            cost = record.estimated_cost,
            "usage recorded"
        );
        self.records.write().push(record.clone());
        record
    }

    pub fn records(&self) -> Vec<UsageRecord> {
        self.records.read().clone()
    }

    pub fn records_for(&self, trace_id: &str) -> Vec<UsageRecord> {
        self.records
            .read()
            .iter()
            .filter(|r| r.trace_id == trace_id)
            .cloned()
            .collect()
    }

    /// Summary over every record whose trace is in `trace_ids`.
    pub fn summary_for(&self, trace_ids: &[&str]) -> CostSummary {
        let records = self.records.read();
        CostSummary::from_records(
            records
                .iter()
                .filter(|r| trace_ids.contains(&r.trace_id.as_str())),
        )
    }

    pub fn summary(&self) -> CostSummary {
        CostSummary::from_records(self.records.read().iter())
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

/// Provider wrapper that books every successful lookup against a trace.
///
/// Units are pairs queried. Failed and empty lookups are not billed.
pub struct MeteredProvider<'a, P: ?Sized> {
    inner: &'a P,
    accountant: Arc<CostAccountant>,
    trace_id: String,
    stage: &'static str,
}

impl<'a, P: DistanceMatrixProvider + ?Sized> MeteredProvider<'a, P> {
    pub fn new(
        inner: &'a P,
        accountant: Arc<CostAccountant>,
        trace_id: impl Into<String>,
        stage: &'static str,
    ) -> Self {
        Self {
            inner,
            accountant,
            trace_id: trace_id.into(),
            stage,
        }
    }

    fn book(&self, units: usize, started: Instant) {
        self.accountant.record(
            &self.trace_id,
            self.stage,
            self.inner.name(),
            Some(SKU_DISTANCE_MATRIX),
            units as u64,
            started.elapsed().as_millis() as u64,
        );
    }
}

impl<P: DistanceMatrixProvider + ?Sized> DistanceMatrixProvider for MeteredProvider<'_, P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn legs_from(
        &self,
        origin: Coordinate,
        destinations: &[Coordinate],
    ) -> Result<Vec<Option<Leg>>, ProviderError> {
        if destinations.is_empty() {
            return Ok(Vec::new());
        }
        let started = Instant::now();
        let legs = self.inner.legs_from(origin, destinations)?;
        self.book(destinations.len(), started);
        Ok(legs)
    }

    fn matrix_for(&self, locations: &[Coordinate]) -> Result<TravelMatrix, ProviderError> {
        let started = Instant::now();
        let matrix = self.inner.matrix_for(locations)?;
        if !locations.is_empty() {
            self.book(locations.len() * locations.len(), started);
        }
        Ok(matrix)
    }
}
