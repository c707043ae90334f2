use chrono::{Local, TimeZone, Utc};

const EXPIRED_COUNTDOWN_TEXT: &str = "Expired";

pub fn now_epoch_seconds() -> i64 {
    Utc::now().timestamp()
}

/// Fraction of the `start_time..target_time` window that has elapsed at `now`.
///
/// A zero-length window counts as already complete. A window that ends
/// before it starts is a caller bug: it asserts in debug builds and resolves
/// to complete otherwise.
pub fn progress(start_time: i64, target_time: i64, now: i64) -> f64 {
    debug_assert!(
        target_time >= start_time,
        "timer target {target_time} precedes its start {start_time}"
    );

    if target_time <= start_time {
        return 1.0;
    }

    if now <= start_time {
        return 0.0;
    }

    if now >= target_time {
        return 1.0;
    }

    (now - start_time) as f64 / (target_time - start_time) as f64
}

pub fn remaining(target_time: i64, now: i64) -> i64 {
    target_time.saturating_sub(now)
}

/// Popup countdown text, e.g. `1h4m9s`, or `Expired` once the target passed.
pub fn format_countdown(remaining_seconds: i64) -> String {
    if remaining_seconds <= 0 {
        return EXPIRED_COUNTDOWN_TEXT.to_string();
    }

    let hours = remaining_seconds / 3600;
    let minutes = (remaining_seconds % 3600) / 60;
    let seconds = remaining_seconds % 60;
    format!("{hours}h{minutes}m{seconds}s")
}

pub fn format_clock(total_seconds: i64) -> String {
    let clamped = total_seconds.max(0);
    let hours = clamped / 3600;
    let minutes = (clamped % 3600) / 60;
    let seconds = clamped % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

pub fn format_timestamp(epoch_seconds: i64) -> String {
    match Local.timestamp_opt(epoch_seconds, 0).single() {
        Some(local_time) => local_time.format("%d/%m/%Y %H:%M:%S").to_string(),
        None => epoch_seconds.to_string(),
    }
}
