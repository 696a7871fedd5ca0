//! ruteo: delivery route generation
//!
//! Turns a day's pending delivery records into one ordered depot-to-depot
//! route, using a pluggable distance-matrix provider, and keeps track of what
//! was excluded and what the provider calls cost.

pub mod archive;
pub mod billing;
pub mod cache;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod exclusions;
pub mod google;
pub mod haversine;
pub mod links;
pub mod mapbox;
pub mod matrix;
pub mod model;
pub mod ors;
pub mod polyline;
pub mod service;
pub mod solver;
pub mod traits;
pub mod window;

pub use archive::RouteArchive;
pub use billing::{CostAccountant, CostSummary, MeteredProvider, RateTable, UsageRecord};
pub use cache::{CachedProvider, LegCache};
pub use config::{GenerationConfig, ProviderSettings};
pub use error::{ProviderError, RouteError, Stage};
pub use exclusions::ExclusionRecorder;
pub use matrix::{Leg, ProviderKind, TravelMatrix, build_provider};
pub use model::{
    Classification, Coordinate, DeliveryCandidate, Exclusion, ExclusionReason, RouteRun,
    RouteStatus, RouteSummary, Stop, StopStatus,
};
pub use polyline::Polyline;
pub use service::{RouteService, generate_route};
pub use solver::{CancelFlag, SequencedRoute, sequence};
pub use traits::{CandidateSource, DistanceMatrixProvider};
pub use window::{Franja, TimeWindow, WindowKind};
