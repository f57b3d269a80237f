#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod global;
mod projection;
mod track;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub use self::global::GlobalFrame;
pub use self::projection::{project, unproject, FALSE_EASTING, FALSE_NORTHING};
pub use self::track::{FlatIndex, PointField, ProjectedPoint, Track};

/// Timestamps arrive as `2010-02-09T17:31:25Z` strings.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// One recorded sample. Immutable once parsed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    /// Meters above the ellipsoid
    #[serde(default)]
    pub elevation: f64,
    /// Kept as the raw string; parsing failures are a display concern
    pub timestamp: String,
    /// Recorded speed in km/h. When absent, it's derived from neighboring
    /// samples during projection.
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub location: String,
}

impl TrackPoint {
    pub fn datetime(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.timestamp, TIMESTAMP_FORMAT).ok()
    }
}

/// An ordered run of samples between signal gaps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// A label from the source data; segments may be filtered on load, so
    /// this isn't necessarily the segment's position in the track.
    pub number: usize,
    pub points: Vec<TrackPoint>,
}

impl Segment {
    pub fn new(number: usize, points: Vec<TrackPoint>) -> Self {
        Self { number, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
