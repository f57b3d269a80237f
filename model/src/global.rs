use crate::track::{square_frame, Track};

/// Extents and reference meridian shared by every track in a session, so
/// different users' recordings land in one comparable frame. Passed
/// explicitly wherever it's needed; registered once, after all tracks of
/// interest have been loaded and projected.
///
/// Re-registering is a hard reset: global-frame coordinates computed before
/// it are stale, and every dependent `normalize_global` must run again
/// before further reads.
#[derive(Clone, Debug)]
pub struct GlobalFrame {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
    lon0: f64,
    registered: bool,
}

impl GlobalFrame {
    pub fn new() -> Self {
        Self {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
            lon0: 0.0,
            registered: false,
        }
    }

    /// The shared meridian choice: the signed average of the longitude
    /// extremes across all given tracks.
    pub fn global_meridian(tracks: &[Track]) -> f64 {
        let mut min_lon = f64::INFINITY;
        let mut max_lon = f64::NEG_INFINITY;
        for track in tracks {
            min_lon = min_lon.min(track.min_lon());
            max_lon = max_lon.max(track.max_lon());
        }
        if min_lon > max_lon {
            return 0.0;
        }
        (min_lon + max_lon) / 2.0
    }

    pub fn register(&mut self, min_x: f64, max_x: f64, min_y: f64, max_y: f64, lon0: f64) {
        if self.registered {
            warn!("Re-registering global extents; previously normalized coordinates are stale");
        }
        self.min_x = min_x;
        self.max_x = max_x;
        self.min_y = min_y;
        self.max_y = max_y;
        self.lon0 = lon0;
        self.registered = true;
    }

    /// Registers the union of the tracks' projected extents. All tracks are
    /// expected to have been projected with the same meridian already.
    pub fn register_from_tracks(&mut self, tracks: &[Track]) {
        let populated: Vec<&Track> = tracks.iter().filter(|t| t.total_points() > 0).collect();
        if populated.is_empty() {
            return;
        }
        let lon0 = populated[0].lon0();
        let mut min_x = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for track in &populated {
            if track.lon0() != lon0 {
                warn!(
                    "{} was projected against meridian {}, not the shared {}",
                    track.user(),
                    track.lon0(),
                    lon0
                );
            }
            min_x = min_x.min(track.min_x());
            max_x = max_x.max(track.max_x());
            min_y = min_y.min(track.min_y());
            max_y = max_y.max(track.max_y());
        }
        self.register(min_x, max_x, min_y, max_y, lon0);
    }

    pub fn reset(&mut self) {
        *self = GlobalFrame::new();
    }

    pub fn is_registered(&self) -> bool {
        self.registered
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
    pub fn lon0(&self) -> f64 {
        self.lon0
    }

    // Same square-aspect frame as local normalization, against the shared
    // extents. Only meaningful once registered.
    pub(crate) fn square_frame(&self) -> (f64, f64, f64) {
        square_frame(self.min_x, self.max_x, self.min_y, self.max_y)
            .unwrap_or((0.0, 0.0, 0.0))
    }
}

impl Default for GlobalFrame {
    fn default() -> Self {
        Self::new()
    }
}
