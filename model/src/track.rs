use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::global::GlobalFrame;
use crate::{projection, Segment, TrackPoint};

/// Position of one point inside the segment structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatIndex {
    pub segment: usize,
    pub point: usize,
}

/// A projected sample: planar meters (or a normalized frame of them), plus
/// the speed at this sample in km/h.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
    pub speed: f64,
}

/// Scalar field selector for per-point accessors. Pick one once, dispatch
/// every tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointField {
    Latitude,
    Longitude,
    Elevation,
    X,
    Y,
}

/// All recordings of one user: the segment/point structure, projected
/// coordinates in three frames (raw meters, normalized against this track's
/// own extents, normalized against shared extents), and a flat index for
/// O(1) access to "the Nth point overall".
#[derive(Clone, Debug)]
pub struct Track {
    user: String,
    segments: Vec<Segment>,

    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,

    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
    lon0: f64,

    projected: Vec<Vec<ProjectedPoint>>,
    normalized: Vec<Vec<ProjectedPoint>>,
    normalized_global: Vec<Vec<ProjectedPoint>>,

    flat_index: Vec<FlatIndex>,
    segment_offsets: Vec<usize>,
}

impl Track {
    pub fn new() -> Self {
        Self {
            user: String::new(),
            segments: Vec::new(),

            min_lat: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
            min_lon: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,

            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
            lon0: 0.0,

            projected: Vec::new(),
            normalized: Vec::new(),
            normalized_global: Vec::new(),

            flat_index: Vec::new(),
            segment_offsets: Vec::new(),
        }
    }

    /// Replaces all data. Doesn't project; the reference meridian may depend
    /// on tracks not loaded yet, so callers invoke `project` separately.
    pub fn load(&mut self, segments: Vec<Segment>, user: &str) -> Result<()> {
        let dropped = segments.iter().filter(|s| s.is_empty()).count();
        if dropped > 0 {
            info!("Dropping {} empty segments for {}", dropped, user);
        }
        let segments: Vec<Segment> = segments.into_iter().filter(|s| !s.is_empty()).collect();

        // Points within a segment must be chronologically ordered. Samples
        // whose timestamp doesn't parse are skipped here; formatting is a
        // display concern.
        for segment in &segments {
            let mut last = None;
            for point in &segment.points {
                if let Some(time) = point.datetime() {
                    if let Some(prev) = last {
                        if time < prev {
                            bail!(
                                "Segment {} input out-of-order: {} then {}",
                                segment.number,
                                prev,
                                time
                            );
                        }
                    }
                    last = Some(time);
                }
            }
        }

        *self = Track::new();
        self.user = user.to_string();

        for (i, segment) in segments.iter().enumerate() {
            self.segment_offsets.push(self.flat_index.len());
            for (j, point) in segment.points.iter().enumerate() {
                self.flat_index.push(FlatIndex {
                    segment: i,
                    point: j,
                });
                self.min_lat = self.min_lat.min(point.lat);
                self.max_lat = self.max_lat.max(point.lat);
                self.min_lon = self.min_lon.min(point.lon);
                self.max_lon = self.max_lon.max(point.lon);
            }
        }
        self.segments = segments;

        info!(
            "Loaded {} segments, {} points for {}",
            self.segments.len(),
            self.flat_index.len(),
            self.user
        );
        Ok(())
    }

    pub fn clear(&mut self) {
        *self = Track::new();
    }

    /// Projects every point against the given central meridian, deriving
    /// speeds where the recording has none, and recomputes projected
    /// extents. Idempotent: a different `lon0` fully overwrites the previous
    /// result. Both normalized frames become stale and are cleared.
    pub fn project(&mut self, lon0: f64) {
        self.lon0 = lon0;
        self.min_x = f64::INFINITY;
        self.max_x = f64::NEG_INFINITY;
        self.min_y = f64::INFINITY;
        self.max_y = f64::NEG_INFINITY;

        self.projected.clear();
        self.normalized.clear();
        self.normalized_global.clear();

        for segment in &self.segments {
            let mut coords = Vec::with_capacity(segment.len());
            for point in &segment.points {
                let (x, y) = projection::project(point.lat, point.lon, lon0);
                self.min_x = self.min_x.min(x);
                self.max_x = self.max_x.max(x);
                self.min_y = self.min_y.min(y);
                self.max_y = self.max_y.max(y);
                coords.push(ProjectedPoint {
                    x,
                    y,
                    speed: point.speed.unwrap_or(0.0),
                });
            }
            self.projected.push(coords);
        }

        self.derive_speeds();
    }

    fn derive_speeds(&mut self) {
        for (segment, coords) in self.segments.iter().zip(self.projected.iter_mut()) {
            for j in 1..coords.len() {
                if segment.points[j].speed.is_some() {
                    continue;
                }
                let elapsed = match (
                    segment.points[j - 1].datetime(),
                    segment.points[j].datetime(),
                ) {
                    (Some(t1), Some(t2)) => t2.signed_duration_since(t1).num_seconds(),
                    _ => continue,
                };
                if elapsed <= 0 {
                    continue;
                }
                let dx = coords[j].x - coords[j - 1].x;
                let dy = coords[j].y - coords[j - 1].y;
                let meters = (dx * dx + dy * dy).sqrt();
                coords[j].speed = meters / elapsed as f64 * 3.6;
            }
        }
    }

    /// Maps projected coordinates into the unit square against this track's
    /// own extents, padding the narrower axis so the aspect is 1:1 and
    /// clamping both axes.
    pub fn normalize_local(&mut self) {
        let frame = match square_frame(self.min_x, self.max_x, self.min_y, self.max_y) {
            Some(f) => f,
            None => return,
        };
        self.normalized = normalize_into(&self.projected, frame);
    }

    /// Same mapping against process-wide shared extents. Leaves the global
    /// frame empty when extents were never registered; that's a caller
    /// ordering bug, not a runtime condition to recover from.
    pub fn normalize_global(&mut self, frame: &GlobalFrame) {
        if !frame.is_registered() {
            warn!(
                "Global extents not registered yet; skipping global normalization for {}",
                self.user
            );
            self.normalized_global.clear();
            return;
        }
        self.normalized_global = normalize_into(&self.projected, frame.square_frame());
    }

    /// O(1) lookup of the Nth point overall. Out-of-range input is a
    /// programming error and panics; callers bound-check against
    /// `total_points` first.
    pub fn point_at(&self, overall: usize) -> FlatIndex {
        self.flat_index[overall]
    }

    /// Inverse of `point_at`, also O(1).
    pub fn ordinal_of(&self, segment: usize, point: usize) -> usize {
        self.segment_offsets[segment] + point
    }

    pub fn total_points(&self) -> usize {
        self.flat_index.len()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn lon0(&self) -> f64 {
        self.lon0
    }

    /// The per-track meridian choice: the signed average of this track's
    /// longitude extremes.
    pub fn central_meridian(&self) -> f64 {
        if self.min_lon > self.max_lon {
            return 0.0;
        }
        (self.min_lon + self.max_lon) / 2.0
    }

    pub fn point(&self, segment: usize, point: usize) -> Option<&TrackPoint> {
        self.segments.get(segment)?.points.get(point)
    }

    /// Scalar access with the field chosen up-front. Out-of-range positions
    /// yield 0, matching the other per-point getters.
    pub fn point_value(&self, segment: usize, point: usize, field: PointField) -> f64 {
        match field {
            PointField::Latitude => self.point(segment, point).map_or(0.0, |p| p.lat),
            PointField::Longitude => self.point(segment, point).map_or(0.0, |p| p.lon),
            PointField::Elevation => self.point(segment, point).map_or(0.0, |p| p.elevation),
            PointField::X => self.projected_point(segment, point).map_or(0.0, |p| p.x),
            PointField::Y => self.projected_point(segment, point).map_or(0.0, |p| p.y),
        }
    }

    pub fn location(&self, segment: usize, point: usize) -> &str {
        self.point(segment, point).map_or("", |p| p.location.as_str())
    }

    pub fn timestamp(&self, segment: usize, point: usize) -> &str {
        self.point(segment, point).map_or("", |p| p.timestamp.as_str())
    }

    pub fn projected_point(&self, segment: usize, point: usize) -> Option<ProjectedPoint> {
        self.projected.get(segment)?.get(point).copied()
    }

    pub fn normalized_point(&self, segment: usize, point: usize) -> Option<ProjectedPoint> {
        self.normalized.get(segment)?.get(point).copied()
    }

    pub fn normalized_global_point(&self, segment: usize, point: usize) -> Option<ProjectedPoint> {
        self.normalized_global.get(segment)?.get(point).copied()
    }

    pub fn projected(&self) -> &[Vec<ProjectedPoint>] {
        &self.projected
    }

    pub fn normalized(&self) -> &[Vec<ProjectedPoint>] {
        &self.normalized
    }

    pub fn normalized_global(&self) -> &[Vec<ProjectedPoint>] {
        &self.normalized_global
    }

    pub fn min_lat(&self) -> f64 {
        self.min_lat
    }
    pub fn max_lat(&self) -> f64 {
        self.max_lat
    }
    pub fn min_lon(&self) -> f64 {
        self.min_lon
    }
    pub fn max_lon(&self) -> f64 {
        self.max_lon
    }
    pub fn min_x(&self) -> f64 {
        self.min_x
    }
    pub fn max_x(&self) -> f64 {
        self.max_x
    }
    pub fn min_y(&self) -> f64 {
        self.min_y
    }
    pub fn max_y(&self) -> f64 {
        self.max_y
    }

    /// One LineString feature per segment, in geodetic coordinates.
    pub fn export_to_geojson(&self) -> Result<String> {
        use geojson::{Feature, FeatureCollection, GeoJson};

        let mut features = Vec::new();
        for segment in &self.segments {
            let line: Vec<Vec<f64>> = segment.points.iter().map(|p| vec![p.lon, p.lat]).collect();
            let mut feature = Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::LineString(line))),
                id: None,
                properties: None,
                foreign_members: None,
            };
            feature.set_property("user", self.user.clone());
            feature.set_property("segment", segment.number);
            feature.set_property("points", segment.len());
            features.push(feature);
        }

        let gj = GeoJson::FeatureCollection(FeatureCollection {
            features,
            bbox: None,
            foreign_members: None,
        });
        Ok(serde_json::to_string_pretty(&gj)?)
    }

    /// One row per point, including the derived speed when projection has
    /// run.
    pub fn export_to_csv(&self) -> Result<String> {
        let mut out = Vec::new();
        {
            let mut writer = csv::Writer::from_writer(&mut out);
            for (i, segment) in self.segments.iter().enumerate() {
                for (j, point) in segment.points.iter().enumerate() {
                    writer.serialize(ExportPointRow {
                        segment: segment.number,
                        point: j,
                        lat: point.lat,
                        lon: point.lon,
                        elevation: point.elevation,
                        timestamp: point.timestamp.clone(),
                        speed: self.projected_point(i, j).map(|p| p.speed),
                        location: point.location.clone(),
                    })?;
                }
            }
            writer.flush()?;
        }
        Ok(String::from_utf8(out)?)
    }
}

impl Default for Track {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct ExportPointRow {
    segment: usize,
    point: usize,
    lat: f64,
    lon: f64,
    elevation: f64,
    timestamp: String,
    speed: Option<f64>,
    location: String,
}

/// The square frame enclosing the given extents: `(origin_x, origin_y,
/// side)`, with the shorter axis centered. None when the extents are still
/// at their unset sentinels.
pub(crate) fn square_frame(
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
) -> Option<(f64, f64, f64)> {
    if !(min_x <= max_x && min_y <= max_y) {
        return None;
    }
    let dx = max_x - min_x;
    let dy = max_y - min_y;
    let side = dx.max(dy);
    Some((min_x - (side - dx) / 2.0, min_y - (side - dy) / 2.0, side))
}

fn normalize_into(
    projected: &[Vec<ProjectedPoint>],
    (origin_x, origin_y, side): (f64, f64, f64),
) -> Vec<Vec<ProjectedPoint>> {
    projected
        .iter()
        .map(|coords| {
            coords
                .iter()
                .map(|p| ProjectedPoint {
                    x: normalize_value(p.x, origin_x, side),
                    y: normalize_value(p.y, origin_y, side),
                    speed: p.speed,
                })
                .collect()
        })
        .collect()
}

// A frame with no spread at all maps everything to the center of the unit
// square; otherwise clamp, so degenerate extents can't push box coordinates
// out of bounds.
fn normalize_value(v: f64, origin: f64, side: f64) -> f64 {
    if side <= 0.0 {
        return 0.5;
    }
    ((v - origin) / side).clamp(0.0, 1.0)
}
