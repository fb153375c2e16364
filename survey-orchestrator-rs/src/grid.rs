// survey-orchestrator-rs/src/grid.rs
// Square sampling grid around a center coordinate

use std::fmt;

use geo::{GeodesicDestination, Point};
use serde::{Deserialize, Serialize};

use crate::error::{SurveyError, SurveyResult};

/// Smallest side length the imagery provider meaningfully supports, in meters
pub const MIN_DISTANCE_M: f64 = 100.0;

/// Smallest step between sample points, in meters
pub const MIN_STEP_M: f64 = 10.0;

/// Largest grid a single run accepts
pub const MAX_POINTS: usize = 250_000;

/// One point of the sampling lattice
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl SampleCoordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    fn to_point(self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }

    fn from_point(point: Point<f64>) -> Self {
        Self::new(point.y(), point.x())
    }

    /// Project this coordinate `meters` along `bearing` (degrees clockwise from north)
    ///
    /// Negative distances move along the opposite bearing.
    pub fn offset(self, bearing: f64, meters: f64) -> Self {
        if meters == 0.0 {
            return self;
        }

        let (bearing, meters) = if meters < 0.0 {
            ((bearing + 180.0) % 360.0, -meters)
        } else {
            (bearing, meters)
        };

        Self::from_point(self.to_point().geodesic_destination(bearing, meters))
    }

    /// Stable key at the six-decimal precision used for requests and file names
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SampleCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// Parameters of a square survey grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Center of the square
    pub center: SampleCoordinate,

    /// Side length in meters
    pub distance_m: f64,

    /// Spacing between neighbouring points in meters
    pub step_m: f64,
}

impl GridSpec {
    pub fn new(center: SampleCoordinate, distance_m: f64, step_m: f64) -> Self {
        Self {
            center,
            distance_m,
            step_m,
        }
    }

    /// Reject parameters that cannot produce a meaningful grid
    pub fn validate(&self) -> SurveyResult<()> {
        let SampleCoordinate { latitude, longitude } = self.center;

        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(SurveyError::InvalidParameters(format!(
                "latitude must be within [-90, 90], got {}",
                latitude
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(SurveyError::InvalidParameters(format!(
                "longitude must be within [-180, 180], got {}",
                longitude
            )));
        }
        if !self.distance_m.is_finite() || self.distance_m < MIN_DISTANCE_M {
            return Err(SurveyError::InvalidParameters(format!(
                "distance must be at least {} m, got {}",
                MIN_DISTANCE_M, self.distance_m
            )));
        }
        if !self.step_m.is_finite() || self.step_m < MIN_STEP_M {
            return Err(SurveyError::InvalidParameters(format!(
                "step must be at least {} m, got {}",
                MIN_STEP_M, self.step_m
            )));
        }
        if self.step_m > self.distance_m {
            return Err(SurveyError::InvalidParameters(format!(
                "step ({} m) must not exceed distance ({} m)",
                self.step_m, self.distance_m
            )));
        }
        if self.point_count() > MAX_POINTS {
            return Err(SurveyError::InvalidParameters(format!(
                "grid of {} m with {} m steps exceeds {} points",
                self.distance_m, self.step_m, MAX_POINTS
            )));
        }

        Ok(())
    }

    /// Points along each axis
    ///
    /// When the distance is not a multiple of the step the far edge of the
    /// square is left uncovered.
    pub fn points_per_axis(&self) -> usize {
        ((self.distance_m / self.step_m) + 1e-9).floor() as usize
    }

    /// Total number of points the grid yields, saturating at `usize::MAX`
    pub fn point_count(&self) -> usize {
        self.points_per_axis().checked_pow(2).unwrap_or(usize::MAX)
    }

    /// Offsets from the center, in meters, along one axis
    fn axis_offsets(&self) -> impl Iterator<Item = f64> + '_ {
        let origin = -self.distance_m / 2.0;
        (0..self.points_per_axis()).map(move |i| origin + i as f64 * self.step_m)
    }

    /// Generate the grid: north offset first, then east offset, both geodesic
    pub fn generate(&self) -> SurveyResult<Vec<SampleCoordinate>> {
        self.validate()?;

        let mut points = Vec::with_capacity(self.point_count());
        for north in self.axis_offsets() {
            let row_origin = self.center.offset(0.0, north);
            for east in self.axis_offsets() {
                points.push(row_origin.offset(90.0, east));
            }
        }

        Ok(points)
    }
}
