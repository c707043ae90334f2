pub const OFFLINE_NOTICE_MESSAGE: &str =
    "Marker server unreachable. Showing the last known markers until it comes back.";

/// Edge-triggered offline flag for the marker feed.
#[derive(Debug, Default)]
pub struct ConnectivityNotice {
    offline_notified: bool,
}

impl ConnectivityNotice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true only for the first failure of an outage.
    pub fn mark_failure(&mut self) -> bool {
        !std::mem::replace(&mut self.offline_notified, true)
    }

    /// Returns true when this success ends an outage.
    pub fn mark_success(&mut self) -> bool {
        std::mem::replace(&mut self.offline_notified, false)
    }

    pub fn is_offline(&self) -> bool {
        self.offline_notified
    }
}

#[cfg(test)]
mod tests {
    use super::ConnectivityNotice;

    #[test]
    fn notice_fires_once_per_outage() {
        let mut notice = ConnectivityNotice::new();

        assert!(notice.mark_failure());
        assert!(!notice.mark_failure());
        assert!(notice.is_offline());
        assert!(notice.mark_success());
        assert!(!notice.mark_success());
        assert!(notice.mark_failure());
    }
}
