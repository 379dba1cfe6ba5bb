use crate::utils::geo::Coordinate;

/// Routes shorter than this are stored at full resolution.
pub const SEGMENT_LENGTH_M: f64 = 5_000.0;
pub const MAX_POINTS_PER_SEGMENT: usize = 10;

/// Distance-proportional stride sampling of a route polyline.
///
/// A route of `d` meters is split into `ceil(d / segment_length_m)` segments and
/// keeps at most `max_points_per_segment` points per segment. Points are taken at a
/// uniform stride from the full-resolution list, so the output is always an
/// order-preserving subsequence of the input. The true last point is only kept
/// when its index falls on the stride.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaypointSimplifier {
    pub segment_length_m: f64,
    pub max_points_per_segment: usize,
}

impl Default for WaypointSimplifier {
    fn default() -> Self {
        Self {
            segment_length_m: SEGMENT_LENGTH_M,
            max_points_per_segment: MAX_POINTS_PER_SEGMENT,
        }
    }
}

impl WaypointSimplifier {
    /// Maximum number of points kept for a route, `None` when the route is short
    /// enough to keep everything or the segment length is unusable.
    pub fn point_budget(&self, distance_m: f64) -> Option<usize> {
        if !(self.segment_length_m.is_finite() && self.segment_length_m > 0.0) {
            return None;
        }

        // NaN compares false, so it is treated as a short route
        if !(distance_m >= self.segment_length_m) {
            return None;
        }

        let segments = (distance_m / self.segment_length_m).ceil() as usize;
        Some(segments.saturating_mul(self.max_points_per_segment.max(1)))
    }

    pub fn simplify(&self, points: &[Coordinate], distance_m: f64) -> Vec<Coordinate> {
        let Some(budget) = self.point_budget(distance_m) else {
            return points.to_vec();
        };

        if points.len() <= 1 {
            return points.to_vec();
        }

        let step = points.len().div_ceil(budget);
        points.iter().step_by(step).copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> Vec<Coordinate> {
        (0..n)
            .map(|i| Coordinate::new(45.0 + i as f64 * 0.001, 4.0 + i as f64 * 0.001))
            .collect()
    }

    #[test]
    fn test_short_route_is_unchanged() {
        let simplifier = WaypointSimplifier::default();
        let points = line(500);

        assert_eq!(simplifier.simplify(&points, 4_999.9), points);
        assert_eq!(simplifier.simplify(&points, 0.0), points);
    }

    #[test]
    fn test_twelve_km_route_with_240_points() {
        let simplifier = WaypointSimplifier::default();
        let points = line(240);

        assert_eq!(simplifier.point_budget(12_000.0), Some(30));

        let simplified = simplifier.simplify(&points, 12_000.0);
        assert_eq!(simplified.len(), 30);
        for (k, point) in simplified.iter().enumerate() {
            assert_eq!(*point, points[k * 8]);
        }
        // Index 239 is not a multiple of the stride
        assert_ne!(simplified.last(), points.last());
    }

    #[test]
    fn test_exactly_one_segment_is_simplified() {
        let simplifier = WaypointSimplifier::default();
        let points = line(100);

        let simplified = simplifier.simplify(&points, 5_000.0);
        assert_eq!(simplified.len(), 10);
        assert_eq!(simplified[1], points[10]);
    }

    #[test]
    fn test_output_bounded_and_ordered() {
        let simplifier = WaypointSimplifier::default();

        for (count, distance) in [(37, 5_001.0), (1_000, 48_250.0), (4_321, 250_000.0), (9, 90_000.0)] {
            let points = line(count);
            let simplified = simplifier.simplify(&points, distance);
            let budget = (distance / SEGMENT_LENGTH_M).ceil() as usize * MAX_POINTS_PER_SEGMENT;

            assert!(simplified.len() <= budget, "{} points for budget {}", simplified.len(), budget);
            assert!(!simplified.is_empty());
            assert_eq!(simplified[0], points[0]);

            // Strictly increasing latitudes means order is preserved with no repeats
            assert!(simplified.windows(2).all(|w| w[0].lat < w[1].lat));
        }
    }

    #[test]
    fn test_sparse_route_keeps_every_point() {
        let simplifier = WaypointSimplifier::default();
        let points = line(9);

        assert_eq!(simplifier.simplify(&points, 90_000.0), points);
    }

    #[test]
    fn test_degenerate_inputs() {
        let simplifier = WaypointSimplifier::default();

        assert!(simplifier.simplify(&[], 12_000.0).is_empty());
        assert!(simplifier.simplify(&[], 0.0).is_empty());

        let single = line(1);
        assert_eq!(simplifier.simplify(&single, 12_000.0), single);
        assert_eq!(simplifier.simplify(&single, f64::NAN), single);
    }

    #[test]
    fn test_unusable_segment_length_keeps_route() {
        let points = line(20);

        for segment_length_m in [0.0, -5_000.0, f64::NAN, f64::INFINITY] {
            let simplifier = WaypointSimplifier {
                segment_length_m,
                max_points_per_segment: 10,
            };
            assert_eq!(simplifier.point_budget(0.0), None);
            assert_eq!(simplifier.simplify(&points, 0.0), points);
            assert_eq!(simplifier.simplify(&points, 12_000.0), points);
        }
    }
}
