//! Proximity lookup primitives for food-seeking queries.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors emitted by proximity index implementations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Indicates configuration values that cannot be used (e.g., a non-finite point).
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Common behaviour exposed by proximity indices.
///
/// Implementations answer "which indexed point is closest to this origin,
/// within this radius?" where the caller may veto candidates (already
/// consumed, excluded id, tighter per-item radius) through the `accept`
/// visitor.
pub trait ProximityIndex {
    /// Rebuild internal structures from a fresh point set.
    fn rebuild(&mut self, points: &[(f32, f32)]) -> Result<(), IndexError>;

    /// Return the nearest accepted point within the squared radius.
    ///
    /// `accept` is invoked with the candidate's index and squared distance;
    /// returning `false` skips the candidate without ending the query.
    fn nearest_within(
        &self,
        origin: (f32, f32),
        radius_sq: f32,
        accept: &mut dyn FnMut(usize, OrderedFloat<f32>) -> bool,
    ) -> Option<(usize, OrderedFloat<f32>)>;
}

/// Exhaustive-scan index.
///
/// Food populations stay small (tens of items), so a cache-friendly linear
/// pass beats bucketing; the trait seam leaves room for a grid once
/// populations warrant one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearScanIndex {
    #[serde(skip)]
    points: Vec<(f32, f32)>,
}

impl LinearScanIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true when no points are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl ProximityIndex for LinearScanIndex {
    fn rebuild(&mut self, points: &[(f32, f32)]) -> Result<(), IndexError> {
        if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(IndexError::InvalidConfig("points must be finite"));
        }
        self.points.clear();
        self.points.extend_from_slice(points);
        Ok(())
    }

    fn nearest_within(
        &self,
        origin: (f32, f32),
        radius_sq: f32,
        accept: &mut dyn FnMut(usize, OrderedFloat<f32>) -> bool,
    ) -> Option<(usize, OrderedFloat<f32>)> {
        let mut best: Option<(usize, OrderedFloat<f32>)> = None;
        for (idx, &(x, y)) in self.points.iter().enumerate() {
            let dx = x - origin.0;
            let dy = y - origin.1;
            let dist_sq = OrderedFloat(dx * dx + dy * dy);
            if dist_sq.into_inner() > radius_sq {
                continue;
            }
            if let Some((_, best_sq)) = best
                && dist_sq >= best_sq
            {
                continue;
            }
            if accept(idx, dist_sq) {
                best = Some((idx, dist_sq));
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rebuilt(points: &[(f32, f32)]) -> LinearScanIndex {
        let mut index = LinearScanIndex::new();
        index.rebuild(points).expect("rebuild");
        index
    }

    #[test]
    fn nearest_prefers_closer_points() {
        let index = rebuilt(&[(10.0, 0.0), (3.0, 0.0), (50.0, 50.0)]);
        let hit = index
            .nearest_within((0.0, 0.0), 40.0 * 40.0, &mut |_, _| true)
            .expect("hit");
        assert_eq!(hit.0, 1);
        assert!((hit.1.into_inner() - 9.0).abs() < f32::EPSILON);
    }

    #[test]
    fn radius_excludes_distant_points() {
        let index = rebuilt(&[(100.0, 100.0)]);
        assert!(
            index
                .nearest_within((0.0, 0.0), 25.0, &mut |_, _| true)
                .is_none()
        );
    }

    #[test]
    fn veto_skips_candidates_without_ending_query() {
        let index = rebuilt(&[(1.0, 0.0), (2.0, 0.0)]);
        let hit = index
            .nearest_within((0.0, 0.0), 100.0, &mut |idx, _| idx != 0)
            .expect("fallback hit");
        assert_eq!(hit.0, 1);
    }

    #[test]
    fn rejects_non_finite_points() {
        let mut index = LinearScanIndex::new();
        assert!(index.rebuild(&[(f32::NAN, 0.0)]).is_err());
    }
}
