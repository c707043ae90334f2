use serde::Serialize;

pub const SOON_THRESHOLD_SECONDS: i64 = 300;
const PROGRESS_SHADOW_WINDOW_SECONDS: i64 = 3_600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RespawnState {
    Waiting,
    Soon,
    Ready,
}

impl RespawnState {
    pub fn label(self) -> &'static str {
        match self {
            RespawnState::Waiting => "WAITING",
            RespawnState::Soon => "SOON",
            RespawnState::Ready => "READY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RespawnStatus {
    pub state: RespawnState,
    /// `None` when no kill was ever recorded.
    pub remaining_seconds: Option<i64>,
}

impl RespawnStatus {
    pub fn display_text(&self) -> String {
        let Some(remaining_seconds) = self.remaining_seconds else {
            return "never recorded".to_string();
        };

        if self.state == RespawnState::Ready || remaining_seconds <= 0 {
            return "READY TO SPAWN".to_string();
        }

        let total_minutes = (remaining_seconds + 59) / 60;
        let hours = total_minutes / 60;
        let minutes = total_minutes % 60;

        if hours > 0 {
            format!("{hours}h {minutes}m")
        } else {
            format!("{minutes}m")
        }
    }
}

pub fn status(last_killed_at: Option<i64>, respawn_minutes: u32, now: i64) -> RespawnStatus {
    status_with_soon_threshold(last_killed_at, respawn_minutes, now, SOON_THRESHOLD_SECONDS)
}

pub fn status_with_soon_threshold(
    last_killed_at: Option<i64>,
    respawn_minutes: u32,
    now: i64,
    soon_threshold_seconds: i64,
) -> RespawnStatus {
    let Some(last_killed_at) = last_killed_at else {
        return RespawnStatus {
            state: RespawnState::Waiting,
            remaining_seconds: None,
        };
    };

    let respawn_at = last_killed_at.saturating_add(i64::from(respawn_minutes) * 60);
    let remaining_seconds = respawn_at.saturating_sub(now).max(0);

    let state = if remaining_seconds == 0 {
        RespawnState::Ready
    } else if remaining_seconds <= soon_threshold_seconds {
        RespawnState::Soon
    } else {
        RespawnState::Waiting
    };

    RespawnStatus {
        state,
        remaining_seconds: Some(remaining_seconds),
    }
}

/// Fill ratio of the "respawning" shadow drawn over a named marker.
///
/// The shadow spans at most the last hour before respawn. For longer timers it
/// stays hidden until that final hour starts.
pub fn progress_shadow(last_killed_at: Option<i64>, respawn_minutes: u32, now: i64) -> Option<f64> {
    let last_killed_at = last_killed_at?;
    let duration_seconds = i64::from(respawn_minutes) * 60;
    if duration_seconds <= 0 {
        return Some(1.0);
    }

    let respawn_at = last_killed_at.saturating_add(duration_seconds);
    let effective_seconds = duration_seconds.min(PROGRESS_SHADOW_WINDOW_SECONDS);
    let shadow_start = respawn_at - effective_seconds;

    if duration_seconds > PROGRESS_SHADOW_WINDOW_SECONDS && now < shadow_start {
        return None;
    }

    let elapsed_seconds = now.saturating_sub(shadow_start).max(0);
    Some((elapsed_seconds as f64 / effective_seconds as f64).min(1.0))
}
