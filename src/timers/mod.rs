pub mod clock;
pub mod duration;

pub use clock::{format_countdown, now_epoch_seconds, progress, remaining};
pub use duration::{
    parse_respawn_duration, ParsedDuration, MARKER_FALLBACK_MINUTES, PROGRESS_FALLBACK_MINUTES,
};
