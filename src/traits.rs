//! Seams between the route engine and its collaborators.
//!
//! The engine only ever talks to a distance provider and a candidate source
//! through these traits, so adding a provider or a store never touches the
//! sequencer.

use crate::error::ProviderError;
use crate::matrix::{Leg, TravelMatrix};
use crate::model::{Coordinate, DeliveryCandidate};

/// Provides travel durations and distances between coordinates.
///
/// A `None` leg means the provider answered but has no route between the pair.
pub trait DistanceMatrixProvider: Send + Sync {
    /// Provider name used in logs and usage records.
    fn name(&self) -> &str;

    /// One origin to many destinations, in destination order.
    fn legs_from(
        &self,
        origin: Coordinate,
        destinations: &[Coordinate],
    ) -> Result<Vec<Option<Leg>>, ProviderError>;

    /// Full matrix indexed by the provided location order.
    fn matrix_for(&self, locations: &[Coordinate]) -> Result<TravelMatrix, ProviderError> {
        let rows = locations
            .iter()
            .map(|origin| self.legs_from(*origin, locations))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TravelMatrix::new(rows))
    }

    /// Pairwise query.
    fn pair(&self, from: Coordinate, to: Coordinate) -> Result<Option<Leg>, ProviderError> {
        let mut legs = self.legs_from(from, &[to])?;
        Ok(legs.pop().flatten())
    }
}

impl<P: DistanceMatrixProvider + ?Sized> DistanceMatrixProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn legs_from(
        &self,
        origin: Coordinate,
        destinations: &[Coordinate],
    ) -> Result<Vec<Option<Leg>>, ProviderError> {
        (**self).legs_from(origin, destinations)
    }

    fn matrix_for(&self, locations: &[Coordinate]) -> Result<TravelMatrix, ProviderError> {
        (**self).matrix_for(locations)
    }
}

/// Supplies the delivery records awaiting routing.
///
/// Implementations must hand out a consistent snapshot: records are not
/// mutated underneath a run once it has read them.
pub trait CandidateSource {
    fn snapshot(&self) -> Vec<DeliveryCandidate>;
}

impl CandidateSource for [DeliveryCandidate] {
    fn snapshot(&self) -> Vec<DeliveryCandidate> {
        self.to_vec()
    }
}

impl CandidateSource for Vec<DeliveryCandidate> {
    fn snapshot(&self) -> Vec<DeliveryCandidate> {
        self.clone()
    }
}
