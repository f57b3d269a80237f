use chrono::NaiveDateTime;
use model::{PointField, ProjectedPoint, Track};

use crate::cursor::PlaybackCursor;
use crate::focus::{FocusBox, Rect};
use crate::settings::{PlaybackSettings, Rgba};

/// Screen-space scaling: the drawing area is the largest padded square that
/// fits the window, centered, with Y growing downward on screen.
#[derive(Clone, Copy, Debug)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64, padding: f64) -> Self {
        Self {
            width,
            height,
            padding,
        }
    }

    fn span(&self) -> f64 {
        self.width.min(self.height) - 2.0 * self.padding
    }

    pub fn scaled_x(&self, v: f64) -> f64 {
        v * self.span() + (self.width - self.span()) / 2.0
    }

    pub fn scaled_y(&self, v: f64) -> f64 {
        self.height - (v * self.span() + (self.height - self.span()) / 2.0)
    }

    pub fn scaled(&self, (x, y): (f64, f64)) -> (f64, f64) {
        (self.scaled_x(x), self.scaled_y(y))
    }

    /// A normalized rectangle as screen-space `(x, y, width, height)`, with
    /// the origin at the top-left.
    pub fn scaled_rect(&self, rect: Rect) -> (f64, f64, f64, f64) {
        let x = self.scaled_x(rect.min_x);
        let y = self.scaled_y(rect.max_y);
        (
            x,
            y,
            self.scaled_x(rect.max_x) - x,
            self.scaled_y(rect.min_y) - y,
        )
    }
}

/// One polyline to draw without lifting the pen.
#[derive(Clone, Debug, PartialEq)]
pub struct Strip {
    pub color: Rgba,
    pub points: Vec<(f64, f64)>,
}

/// Everything a renderer needs for one tick: the windowed trail as screen
/// strips, the current-point marker, optional box outlines and the overlay
/// text.
#[derive(Clone, Debug)]
pub struct Frame {
    pub strips: Vec<Strip>,
    pub marker: Option<(f64, f64)>,
    /// Inner and padded box outlines, when enabled
    pub boxes: Option<((f64, f64, f64, f64), (f64, f64, f64, f64))>,
    pub info: String,
}

impl Frame {
    fn empty() -> Self {
        Self {
            strips: Vec::new(),
            marker: None,
            boxes: None,
            info: String::new(),
        }
    }
}

/// Builds the visible trail for the cursor's current tick: segments from the
/// look-back start up to the cursor, cropped to the focus box and split into
/// speed bands as configured, all in screen coordinates. Also advances the
/// box-follow logic, since visibility is decided against the updated box.
pub fn build_frame(
    cursor: &mut PlaybackCursor,
    settings: &PlaybackSettings,
    viewport: &Viewport,
    color: Rgba,
) -> Frame {
    let track = match cursor.track() {
        Some(t) => t,
        None => return Frame::empty(),
    };
    let focus = match cursor.focus() {
        Some(f) => f,
        None => return Frame::empty(),
    };

    let position = cursor.position();
    let current = match track.normalized_point(position.segment, position.point) {
        Some(p) => p,
        None => return Frame::empty(),
    };

    cursor.update_focus(settings);
    let focus = focus.borrow();

    let start = cursor.lookback_start(settings.max_points_to_draw);
    let (start_segment, mut start_point) = (start.segment, start.point);
    let first_segment = if settings.interactive_mode && !settings.draw_traced {
        start_point = 0;
        position.segment
    } else {
        start_segment
    };

    let mut strips = Vec::new();
    for i in first_segment..=position.segment {
        let coords = &track.normalized()[i];
        let point_end = if i == position.segment {
            position.point
        } else {
            coords.len() - 1
        };
        let segment_color = if settings.interactive_mode && settings.draw_traced && i == position.segment
        {
            settings.interactive_segment_color
        } else {
            color
        };

        build_strips(
            &coords[start_point..=point_end],
            &focus,
            settings,
            viewport,
            segment_color,
            &mut strips,
        );
        start_point = 0;
    }

    let marker = if current_point_hidden(&current, settings) {
        None
    } else {
        Some(viewport.scaled(focus.drawable_point(&current)))
    };

    let boxes = if settings.show_box {
        Some((
            viewport.scaled_rect(focus.bounds()),
            viewport.scaled_rect(focus.padded_bounds()),
        ))
    } else {
        None
    };

    Frame {
        strips,
        marker,
        boxes,
        info: info_text(cursor),
    }
}

/// The whole track as screen strips, ignoring the cursor; the overview and
/// multi-track modes draw this.
pub fn full_track_strips(
    track: &Track,
    focus: &FocusBox,
    settings: &PlaybackSettings,
    viewport: &Viewport,
    color: Rgba,
) -> Vec<Strip> {
    let mut strips = Vec::new();
    for coords in track.normalized() {
        build_strips(coords, focus, settings, viewport, color, &mut strips);
    }
    strips
}

// Appends the strips for one run of points, restarting a strip wherever a
// point is cropped away or an invisible speed band starts, and splitting
// whenever the speed band's color changes.
fn build_strips(
    coords: &[ProjectedPoint],
    focus: &FocusBox,
    settings: &PlaybackSettings,
    viewport: &Viewport,
    color: Rgba,
    strips: &mut Vec<Strip>,
) {
    let mut strip = Strip {
        color,
        points: Vec::new(),
    };
    for p in coords {
        if settings.crop_to_box && !settings.multi_mode && !focus.is_in_box(p) {
            if !strip.points.is_empty() {
                let color = strip.color;
                strips.push(std::mem::replace(
                    &mut strip,
                    Strip {
                        color,
                        points: Vec::new(),
                    },
                ));
            }
            continue;
        }

        if settings.use_speed {
            let band = speed_color(p.speed, settings);
            if band.is_invisible() {
                if !strip.points.is_empty() {
                    let color = strip.color;
                    strips.push(std::mem::replace(
                        &mut strip,
                        Strip {
                            color,
                            points: Vec::new(),
                        },
                    ));
                }
                continue;
            }
            if band != strip.color {
                if strip.points.is_empty() {
                    strip.color = band;
                } else {
                    strips.push(std::mem::replace(
                        &mut strip,
                        Strip {
                            color: band,
                            points: Vec::new(),
                        },
                    ));
                }
            }
        }

        strip.points.push(viewport.scaled(focus.drawable_point(p)));
    }
    if !strip.points.is_empty() {
        strips.push(strip);
    }
}

fn speed_color(speed: f64, settings: &PlaybackSettings) -> Rgba {
    if speed > settings.speed_threshold {
        settings.speed_color_above
    } else {
        settings.speed_color_under
    }
}

fn current_point_hidden(current: &ProjectedPoint, settings: &PlaybackSettings) -> bool {
    settings.use_speed && speed_color(current.speed, settings).is_invisible()
}

/// The on-screen overlay for the current point.
pub fn info_text(cursor: &PlaybackCursor) -> String {
    format!(
        "Longitude: {:.6}\nLatitude: {:.6}\nElevation: {:.1}\nTime: {}\nPoint: {}\nSegment: {}",
        cursor.current_value(PointField::Longitude),
        cursor.current_value(PointField::Latitude),
        cursor.current_value(PointField::Elevation),
        format_timestamp(&cursor.current_timestamp()),
        cursor.overall(),
        cursor.current_segment_number(),
    )
}

/// Pretty-prints a recording timestamp, falling back to the raw string when
/// it doesn't parse.
pub fn format_timestamp(raw: &str) -> String {
    match NaiveDateTime::parse_from_str(raw, model::TIMESTAMP_FORMAT) {
        Ok(time) => time.format("%d.%m.%Y %H:%M:%S").to_string(),
        Err(_) => raw.to_string(),
    }
}
