#[macro_use]
extern crate log;

mod cursor;
mod focus;
mod frame;
mod settings;

pub use self::cursor::{JumpDirection, PlaybackCursor};
pub use self::focus::{FocusBox, Rect};
pub use self::frame::{build_frame, format_timestamp, full_track_strips, Frame, Strip, Viewport};
pub use self::settings::{PlaybackSettings, Rgba};
