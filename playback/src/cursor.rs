use std::cell::RefCell;
use std::rc::{Rc, Weak};

use model::{FlatIndex, PointField, ProjectedPoint, Track};

use crate::focus::FocusBox;
use crate::settings::PlaybackSettings;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JumpDirection {
    Forward,
    Backward,
}

/// Walks a track one point per tick, crossing segment boundaries and looping
/// back to the start after the final point. Holds only weak references: the
/// track may be reloaded or dropped independently, and a cursor finding its
/// track gone resets instead of reading stale indices.
pub struct PlaybackCursor {
    track: Weak<Track>,
    focus: Weak<RefCell<FocusBox>>,

    segment: usize,
    point: usize,
    /// Points visited since the last (re)start; resets at wraparound
    overall: usize,
    first_point: bool,
}

impl PlaybackCursor {
    pub fn new(track: &Rc<Track>) -> Self {
        Self {
            track: Rc::downgrade(track),
            focus: Weak::new(),
            segment: 0,
            point: 0,
            overall: 0,
            first_point: true,
        }
    }

    pub fn reset(&mut self) {
        self.segment = 0;
        self.point = 0;
        self.overall = 0;
        self.first_point = true;
    }

    /// Attaches a focus box and centers it on the track's starting point.
    /// The track must already be normalized.
    pub fn set_focus(&mut self, focus: &Rc<RefCell<FocusBox>>) {
        self.focus = Rc::downgrade(focus);
        self.reset();
        if let Some(track) = self.track.upgrade() {
            if let Some(start) = track.normalized_point(0, 0) {
                focus.borrow_mut().setup(&start);
            }
        }
    }

    /// Attaches a focus box pinned to a fixed position in normalized track
    /// space, for views that shouldn't follow.
    pub fn set_focus_static(&mut self, focus: &Rc<RefCell<FocusBox>>, x: f64, y: f64) {
        self.focus = Rc::downgrade(focus);
        self.reset();
        focus.borrow_mut().setup(&ProjectedPoint { x, y, speed: 0.0 });
    }

    /// One tick forward. The first tick arrives at point 0 instead of
    /// advancing past it; the tick after the final point wraps back to the
    /// dormant starting state, so playback loops. The trail collapsing for
    /// one tick at the wrap is intentional.
    pub fn step(&mut self) {
        let track = match self.live_track() {
            Some(t) => t,
            None => return,
        };
        if track.total_points() == 0 {
            return;
        }

        if self.first_point {
            self.first_point = false;
            self.overall = 1;
            return;
        }

        let last_segment = track.segments().len() - 1;
        let segment_len = track.segments()[self.segment].len();
        if self.segment == last_segment && self.point == segment_len - 1 {
            debug!("Last point of {} reached, looping", track.user());
            self.reset();
            return;
        }

        if self.point < segment_len - 1 {
            self.point += 1;
        } else {
            self.segment += 1;
            self.point = 0;
        }
        self.overall += 1;
    }

    /// Interactive segment stepping: forward lands on the start of the next
    /// segment (a full wrap from the last one, mirroring `step`), backward
    /// on the end of the previous, cyclically. The visited count is set from
    /// the landing position, keeping the look-back window consistent with a
    /// direct jump.
    pub fn jump_segment(&mut self, direction: JumpDirection) {
        let track = match self.live_track() {
            Some(t) => t,
            None => return,
        };
        if track.total_points() == 0 {
            return;
        }

        self.first_point = false;
        let last_segment = track.segments().len() - 1;
        match direction {
            JumpDirection::Forward => {
                if self.segment == last_segment {
                    self.reset();
                    return;
                }
                self.segment += 1;
                self.point = 0;
            }
            JumpDirection::Backward => {
                self.segment = if self.segment == 0 {
                    last_segment
                } else {
                    self.segment - 1
                };
                self.point = track.segments()[self.segment].len() - 1;
            }
        }
        self.overall = track.ordinal_of(self.segment, self.point) + 1;
    }

    /// Where the rendered trail starts: at most `max_window` points behind
    /// the newest visited one, or the very beginning when fewer have been
    /// visited (or the window is unbounded).
    pub fn lookback_start(&self, max_window: usize) -> FlatIndex {
        let track = match self.track.upgrade() {
            Some(t) => t,
            None => return FlatIndex { segment: 0, point: 0 },
        };
        if max_window == 0 || self.overall < max_window || track.total_points() == 0 {
            return FlatIndex { segment: 0, point: 0 };
        }
        track.point_at(self.overall - max_window)
    }

    /// Follow tick for the attached box; a no-op in the modes where boxes
    /// are shared, user-driven, or pinned.
    pub fn update_focus(&mut self, settings: &PlaybackSettings) {
        if settings.interactive_mode || settings.multi_mode || settings.fixed_box {
            return;
        }
        let track = match self.live_track() {
            Some(t) => t,
            None => return,
        };
        let current = match track.normalized_point(self.segment, self.point) {
            Some(p) => p,
            None => return,
        };
        if let Some(focus) = self.focus.upgrade() {
            focus.borrow_mut().update_if_needed(&current);
        }
    }

    pub fn position(&self) -> FlatIndex {
        FlatIndex {
            segment: self.segment,
            point: self.point,
        }
    }

    /// The authoritative count of points visited since the last (re)start.
    pub fn overall(&self) -> usize {
        self.overall
    }

    pub fn is_first_point(&self) -> bool {
        self.first_point
    }

    pub fn track(&self) -> Option<Rc<Track>> {
        self.track.upgrade()
    }

    pub fn focus(&self) -> Option<Rc<RefCell<FocusBox>>> {
        self.focus.upgrade()
    }

    /// Scalar current-point access with a field selected up-front; 0 when
    /// the track is gone.
    pub fn current_value(&self, field: PointField) -> f64 {
        self.track
            .upgrade()
            .map_or(0.0, |t| t.point_value(self.segment, self.point, field))
    }

    pub fn current_projected(&self) -> Option<ProjectedPoint> {
        self.track.upgrade()?.projected_point(self.segment, self.point)
    }

    pub fn current_normalized(&self) -> Option<ProjectedPoint> {
        self.track.upgrade()?.normalized_point(self.segment, self.point)
    }

    pub fn current_timestamp(&self) -> String {
        self.track
            .upgrade()
            .map_or_else(String::new, |t| t.timestamp(self.segment, self.point).to_string())
    }

    pub fn current_location(&self) -> String {
        self.track
            .upgrade()
            .map_or_else(String::new, |t| t.location(self.segment, self.point).to_string())
    }

    /// The label of the segment under the cursor, not its position.
    pub fn current_segment_number(&self) -> usize {
        self.track.upgrade().map_or(0, |t| {
            t.segments().get(self.segment).map_or(0, |s| s.number)
        })
    }

    // Upgrades the track reference, resetting the cursor when the track is
    // gone or was swapped for a shorter one.
    fn live_track(&mut self) -> Option<Rc<Track>> {
        match self.track.upgrade() {
            Some(track) => {
                if self.segment >= track.segments().len() && track.total_points() > 0 {
                    self.reset();
                }
                Some(track)
            }
            None => {
                self.reset();
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::Segment;

    fn sample_point(lat: f64, lon: f64, timestamp: &str) -> model::TrackPoint {
        model::TrackPoint {
            lat,
            lon,
            elevation: 0.0,
            timestamp: timestamp.to_string(),
            speed: None,
            location: String::new(),
        }
    }

    /// 2 segments of 3 points each.
    fn sample_track() -> Rc<Track> {
        let mut track = Track::new();
        track
            .load(
                vec![
                    Segment::new(
                        1,
                        vec![
                            sample_point(52.500, 13.400, "2010-02-09T08:00:00Z"),
                            sample_point(52.501, 13.402, "2010-02-09T08:00:10Z"),
                            sample_point(52.502, 13.404, "2010-02-09T08:00:20Z"),
                        ],
                    ),
                    Segment::new(
                        2,
                        vec![
                            sample_point(52.503, 13.406, "2010-02-09T09:00:00Z"),
                            sample_point(52.504, 13.408, "2010-02-09T09:00:10Z"),
                            sample_point(52.505, 13.410, "2010-02-09T09:00:20Z"),
                        ],
                    ),
                ],
                "test",
            )
            .unwrap();
        track.project(track.central_meridian());
        track.normalize_local();
        Rc::new(track)
    }

    fn pos(segment: usize, point: usize) -> FlatIndex {
        FlatIndex { segment, point }
    }

    #[test]
    fn first_step_arrives_at_the_start() {
        let track = sample_track();
        let mut cursor = PlaybackCursor::new(&track);
        assert!(cursor.is_first_point());
        assert_eq!(cursor.overall(), 0);

        cursor.step();
        assert!(!cursor.is_first_point());
        assert_eq!(cursor.position(), pos(0, 0));
        assert_eq!(cursor.overall(), 1);
    }

    #[test]
    fn stepping_crosses_segment_boundaries() {
        let track = sample_track();
        let mut cursor = PlaybackCursor::new(&track);
        let expected = [
            pos(0, 0),
            pos(0, 1),
            pos(0, 2),
            pos(1, 0),
            pos(1, 1),
            pos(1, 2),
        ];
        for (k, want) in expected.iter().enumerate() {
            cursor.step();
            assert_eq!(cursor.position(), *want);
            assert_eq!(cursor.overall(), k + 1);
        }
    }

    #[test]
    fn playback_loops_with_a_reset_tick() {
        let track = sample_track();
        let n = track.total_points();
        let mut cursor = PlaybackCursor::new(&track);

        // N ticks visit every point, the next one resets to the dormant
        // starting state
        for _ in 0..n {
            cursor.step();
        }
        assert_eq!(cursor.position(), pos(1, 2));
        assert_eq!(cursor.overall(), n);

        cursor.step();
        assert_eq!(cursor.position(), pos(0, 0));
        assert_eq!(cursor.overall(), 0);
        assert!(cursor.is_first_point());

        // And the tick after that repeats the very first one
        cursor.step();
        assert_eq!(cursor.position(), pos(0, 0));
        assert_eq!(cursor.overall(), 1);
        assert!(!cursor.is_first_point());
    }

    #[test]
    fn lookback_window_trails_the_cursor() {
        let track = sample_track();
        let mut cursor = PlaybackCursor::new(&track);

        for _ in 0..5 {
            cursor.step();
        }
        assert_eq!(cursor.overall(), 5);
        assert_eq!(cursor.lookback_start(4), pos(0, 1));

        // Unbounded, or not enough points visited yet: draw from the start
        assert_eq!(cursor.lookback_start(0), pos(0, 0));
        assert_eq!(cursor.lookback_start(5), pos(0, 0));
        assert_eq!(cursor.lookback_start(100), pos(0, 0));
    }

    #[test]
    fn jump_forward_lands_on_next_segment_start() {
        let track = sample_track();
        let mut cursor = PlaybackCursor::new(&track);
        cursor.step();
        cursor.step();

        cursor.jump_segment(JumpDirection::Forward);
        assert_eq!(cursor.position(), pos(1, 0));
        // Consistent with having visited everything up to the landing point
        assert_eq!(cursor.overall(), 4);
        assert_eq!(cursor.lookback_start(2), pos(0, 2));
    }

    #[test]
    fn jump_forward_off_the_end_resets() {
        let track = sample_track();
        let mut cursor = PlaybackCursor::new(&track);
        cursor.jump_segment(JumpDirection::Forward);
        assert_eq!(cursor.position(), pos(1, 0));
        cursor.jump_segment(JumpDirection::Forward);
        assert_eq!(cursor.position(), pos(0, 0));
        assert_eq!(cursor.overall(), 0);
        assert!(cursor.is_first_point());
    }

    #[test]
    fn jump_backward_wraps_cyclically() {
        let track = sample_track();
        let mut cursor = PlaybackCursor::new(&track);
        cursor.step();

        cursor.jump_segment(JumpDirection::Backward);
        assert_eq!(cursor.position(), pos(1, 2));
        assert_eq!(cursor.overall(), 6);

        cursor.jump_segment(JumpDirection::Backward);
        assert_eq!(cursor.position(), pos(0, 2));
        assert_eq!(cursor.overall(), 3);
    }

    #[test]
    fn empty_track_is_inert() {
        let mut track = Track::new();
        track.load(Vec::new(), "nobody").unwrap();
        let track = Rc::new(track);
        let mut cursor = PlaybackCursor::new(&track);
        cursor.step();
        cursor.jump_segment(JumpDirection::Forward);
        assert!(cursor.is_first_point());
        assert_eq!(cursor.overall(), 0);
        assert_eq!(cursor.lookback_start(10), pos(0, 0));
    }

    #[test]
    fn dropped_track_resets_the_cursor() {
        let track = sample_track();
        let mut cursor = PlaybackCursor::new(&track);
        for _ in 0..4 {
            cursor.step();
        }
        assert_eq!(cursor.overall(), 4);

        drop(track);
        cursor.step();
        assert!(cursor.is_first_point());
        assert_eq!(cursor.overall(), 0);
        assert_eq!(cursor.position(), pos(0, 0));
        assert_eq!(cursor.current_value(PointField::Latitude), 0.0);
        assert_eq!(cursor.current_timestamp(), "");
    }

    #[test]
    fn current_point_getters_report_the_cursor_position() {
        let track = sample_track();
        let mut cursor = PlaybackCursor::new(&track);
        for _ in 0..4 {
            cursor.step();
        }
        assert_eq!(cursor.position(), pos(1, 0));
        assert_eq!(cursor.current_value(PointField::Latitude), 52.503);
        assert_eq!(cursor.current_value(PointField::Longitude), 13.406);
        assert_eq!(cursor.current_timestamp(), "2010-02-09T09:00:00Z");
        assert_eq!(cursor.current_segment_number(), 2);
        assert!(cursor.current_projected().is_some());
        assert!(cursor.current_normalized().is_some());
    }

    #[test]
    fn focus_follows_the_cursor() {
        let track = sample_track();
        let mut cursor = PlaybackCursor::new(&track);
        let focus = Rc::new(RefCell::new(FocusBox::new(0.05, 0.5)));
        cursor.set_focus(&focus);

        let start = track.normalized_point(0, 0).unwrap();
        assert_eq!(focus.borrow().center(), (start.x, start.y));

        let settings = PlaybackSettings::default();
        for _ in 0..6 {
            cursor.step();
            cursor.update_focus(&settings);
        }
        let current = track.normalized_point(1, 2).unwrap();
        assert!(focus.borrow().is_in_box(&current));
    }

    #[test]
    fn fixed_box_never_follows() {
        let track = sample_track();
        let mut cursor = PlaybackCursor::new(&track);
        let focus = Rc::new(RefCell::new(FocusBox::new(0.05, 0.5)));
        cursor.set_focus_static(&focus, 0.3, 0.7);
        assert_eq!(focus.borrow().center(), (0.3, 0.7));

        let settings = PlaybackSettings {
            fixed_box: true,
            ..PlaybackSettings::default()
        };
        for _ in 0..6 {
            cursor.step();
            cursor.update_focus(&settings);
        }
        assert_eq!(focus.borrow().center(), (0.3, 0.7));
    }
}
