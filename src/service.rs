//! Route generation orchestration.
//!
//! A run reads one snapshot of candidates, filters it, sequences the eligible
//! ones, and derives links, geometry and cost from the final stop order. Only
//! a run that completes is archived; on failure or cancellation every stop and
//! exclusion computed so far is dropped with the run's builder.

use std::sync::Arc;

use chrono::{Local, Utc};
use uuid::Uuid;

use crate::archive::RouteArchive;
use crate::billing::{CostAccountant, MeteredProvider};
use crate::cache::{CachedProvider, LegCache};
use crate::config::{GenerationConfig, ProviderSettings};
use crate::eligibility::{candidate_set, filter_eligible};
use crate::error::{RouteError, Stage};
use crate::exclusions::ExclusionRecorder;
use crate::links::{MAX_LINK_WAYPOINTS, overview_links, segment_links};
use crate::matrix::build_provider;
use crate::model::{DeliveryCandidate, RouteRun, RouteStatus};
use crate::polyline::Polyline;
use crate::solver::{CancelFlag, sequence};
use crate::traits::{CandidateSource, DistanceMatrixProvider};

const SEQUENCER_STAGE: &str = "sequencer";

/// Generates one run from a candidate snapshot without archiving it.
///
/// Provider usage is booked against `trace_id` even when the run fails.
/// Legs found in `cache` are neither requested nor billed.
pub fn generate_route<P>(
    snapshot: Vec<DeliveryCandidate>,
    config: &GenerationConfig,
    provider: &P,
    cache: &LegCache,
    accountant: &Arc<CostAccountant>,
    trace_id: &str,
    cancel: &CancelFlag,
) -> Result<RouteRun, RouteError>
where
    P: DistanceMatrixProvider + ?Sized,
{
    config.validate()?;
    let depot = config.depot();

    tracing::info!(
        trace_id,
        provider = provider.name(),
        snapshot = snapshot.len(),
        "route generation started"
    );

    let candidates = candidate_set(snapshot, config);
    let mut recorder = ExclusionRecorder::new(depot);
    let eligible = filter_eligible(candidates, config, &mut recorder)?;

    let metered = MeteredProvider::new(provider, accountant.clone(), trace_id, SEQUENCER_STAGE);
    let cached = CachedProvider::new(&metered, cache);
    let route = sequence(eligible, config, &cached, &mut recorder, cancel)?;

    let gmaps_links = segment_links(depot, &route.stops);
    let gmaps_overview_links = overview_links(depot, &route.stops, MAX_LINK_WAYPOINTS);
    let geometria = Polyline::for_route(depot, &route.stops);
    let api_cost_estimate = accountant.summary_for(&[trace_id]).total_cost;
    let excluidos = recorder.into_entries();
    let created_at = Utc::now();

    tracing::info!(
        trace_id,
        paradas = route.stops.len(),
        excluidos = excluidos.len(),
        duracion_min = route.total_duration_min,
        distancia_km = route.total_distance_km,
        cost = api_cost_estimate,
        "route generated"
    );

    Ok(RouteRun {
        id: None,
        trace_id: trace_id.to_string(),
        fecha: created_at.with_timezone(&Local).date_naive(),
        estado: RouteStatus::Borrador,
        total_paradas: route.stops.len(),
        total_excluidos: excluidos.len(),
        duracion_estimada_min: route.total_duration_min,
        distancia_total_km: route.total_distance_km,
        gmaps_links,
        gmaps_overview_links,
        paradas: route.stops,
        excluidos,
        config: config.clone(),
        geometria,
        api_cost_estimate,
        created_at,
    })
}

/// Entry point used by callers: builds the configured provider, runs the
/// generation, and archives the result.
pub struct RouteService {
    settings: ProviderSettings,
    accountant: Arc<CostAccountant>,
    archive: Arc<RouteArchive>,
    cache: Arc<LegCache>,
}

impl RouteService {
    pub fn new(settings: ProviderSettings) -> Self {
        Self::with_parts(
            settings,
            Arc::new(CostAccountant::default()),
            Arc::new(RouteArchive::new()),
        )
    }

    pub fn with_parts(
        settings: ProviderSettings,
        accountant: Arc<CostAccountant>,
        archive: Arc<RouteArchive>,
    ) -> Self {
        Self {
            settings,
            accountant,
            archive,
            cache: Arc::new(LegCache::default()),
        }
    }

    /// Replaces the leg cache, e.g. to share one across services.
    pub fn with_cache(mut self, cache: Arc<LegCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn accountant(&self) -> &Arc<CostAccountant> {
        &self.accountant
    }

    pub fn archive(&self) -> &Arc<RouteArchive> {
        &self.archive
    }

    pub fn cache(&self) -> &Arc<LegCache> {
        &self.cache
    }

    /// Generates with the provider named by `config.proveedor_matrix`.
    pub fn generate<S>(
        &self,
        config: &GenerationConfig,
        source: &S,
        cancel: &CancelFlag,
    ) -> Result<RouteRun, RouteError>
    where
        S: CandidateSource + ?Sized,
    {
        config.validate()?;
        let provider = build_provider(config.proveedor_matrix, &self.settings).map_err(|cause| {
            tracing::warn!(provider = config.proveedor_matrix.as_str(), error = %cause, "provider setup failed");
            RouteError::RouteGenerationFailed {
                stage: Stage::ProviderSetup,
                cause,
            }
        })?;
        self.generate_with(config, source, provider.as_ref(), cancel)
    }

    /// Generates with an explicit provider.
    pub fn generate_with<S, P>(
        &self,
        config: &GenerationConfig,
        source: &S,
        provider: &P,
        cancel: &CancelFlag,
    ) -> Result<RouteRun, RouteError>
    where
        S: CandidateSource + ?Sized,
        P: DistanceMatrixProvider + ?Sized,
    {
        let trace_id = Uuid::new_v4().to_string();
        let snapshot = source.snapshot();

        match generate_route(
            snapshot,
            config,
            provider,
            &self.cache,
            &self.accountant,
            &trace_id,
            cancel,
        ) {
            Ok(run) => Ok(self.archive.store(run)),
            Err(err) => {
                tracing::warn!(trace_id = %trace_id, error = %err, "route generation failed");
                Err(err)
            }
        }
    }
}
