//! In-memory store of generated runs.
//!
//! Only successful runs are ever stored. Ids are assigned on insert and never
//! reused.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::error::RouteError;
use crate::model::{RouteRun, RouteStatus, RouteSummary, StopStatus};

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    runs: BTreeMap<u64, RouteRun>,
}

#[derive(Debug, Default)]
pub struct RouteArchive {
    inner: RwLock<Inner>,
}

impl RouteArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a run and returns it with its assigned id.
    pub fn store(&self, mut run: RouteRun) -> RouteRun {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        let id = inner.next_id;
        run.id = Some(id);
        inner.runs.insert(id, run.clone());
        tracing::info!(route_id = id, paradas = run.total_paradas, "route archived");
        run
    }

    pub fn get(&self, id: u64) -> Result<RouteRun, RouteError> {
        self.inner
            .read()
            .runs
            .get(&id)
            .cloned()
            .ok_or(RouteError::RouteNotFound(id))
    }

    /// Summaries, newest first.
    pub fn list(&self) -> Vec<RouteSummary> {
        let inner = self.inner.read();
        let mut summaries: Vec<RouteSummary> = inner.runs.values().map(RouteRun::summary).collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        summaries
    }

    /// Marks the given stop orders as delivered.
    ///
    /// All orders are checked before any stop changes. Cancelled and
    /// completed runs reject the update.
    pub fn mark_delivered(&self, id: u64, orders: &[usize]) -> Result<RouteRun, RouteError> {
        let mut inner = self.inner.write();
        let run = inner.runs.get_mut(&id).ok_or(RouteError::RouteNotFound(id))?;

        if run.estado.is_terminal() {
            return Err(RouteError::InvalidTransition {
                from: run.estado.as_str().to_string(),
                to: "entregado".to_string(),
            });
        }
        if let Some(&missing) = orders
            .iter()
            .find(|&&order| !run.paradas.iter().any(|s| s.orden == order))
        {
            return Err(RouteError::StopNotFound {
                route_id: id,
                order: missing,
            });
        }

        for stop in run.paradas.iter_mut().filter(|s| orders.contains(&s.orden)) {
            stop.estado = StopStatus::Entregado;
        }
        tracing::debug!(route_id = id, delivered = orders.len(), "stops marked delivered");
        Ok(run.clone())
    }

    pub fn transition(&self, id: u64, next: RouteStatus) -> Result<RouteRun, RouteError> {
        let mut inner = self.inner.write();
        let run = inner.runs.get_mut(&id).ok_or(RouteError::RouteNotFound(id))?;
        run.transition(next)?;
        Ok(run.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.read().runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().runs.is_empty()
    }
}
