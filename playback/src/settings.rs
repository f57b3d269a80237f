use serde::{Deserialize, Serialize};

/// 8-bit RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Fully transparent bands aren't drawn at all; strips break around
    /// them instead.
    pub fn is_invisible(&self) -> bool {
        self.a == 0
    }
}

/// Read-only inputs from the configuration layer, steering the playback and
/// windowing policy branches. Deserializes from partial input; anything
/// omitted keeps its default.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Trailing points drawn behind the cursor. 0 draws the full history.
    pub max_points_to_draw: usize,
    /// Skip points outside the focus box, restarting line strips at the gaps
    pub crop_to_box: bool,
    /// Several tracks share the view; boxes stop following individual tracks
    pub multi_mode: bool,
    /// Segment stepping under user control instead of free-running playback
    pub interactive_mode: bool,
    /// In interactive mode, keep previously visited segments on screen
    pub draw_traced: bool,
    /// Never recenter the focus box
    pub fixed_box: bool,
    /// Emit the box and padded-box outlines with each frame
    pub show_box: bool,

    pub use_speed: bool,
    /// km/h
    pub speed_threshold: f64,
    pub speed_color_above: Rgba,
    pub speed_color_under: Rgba,
    /// Highlight for the segment under the cursor in interactive mode
    pub interactive_segment_color: Rgba,

    /// Full side length of the focus box, in normalized track space
    pub focus_box_size: f64,
    /// Fraction of the half-extent added around the box as the follow
    /// trigger zone
    pub focus_box_padding: f64,
    /// Pixels kept free on each side of the drawing area
    pub screen_padding: f64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            max_points_to_draw: 0,
            crop_to_box: false,
            multi_mode: false,
            interactive_mode: false,
            draw_traced: true,
            fixed_box: false,
            show_box: false,

            use_speed: false,
            speed_threshold: 10.0,
            speed_color_above: Rgba::rgb(255, 255, 255),
            speed_color_under: Rgba::rgb(255, 255, 255),
            interactive_segment_color: Rgba::rgb(0, 255, 255),

            focus_box_size: 0.2,
            focus_box_padding: 0.5,
            screen_padding: 15.0,
        }
    }
}
