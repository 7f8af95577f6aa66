//! Transient, non-blocking notifications (the "saved" indicator and
//! persistence failures).

use std::time::{Duration, Instant};

pub const SAVED_MESSAGE: &str = "All changes saved";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    Saved,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub expires_at: Instant,
}

impl Notification {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Holds at most one notification; a newer one replaces the current.
#[derive(Debug)]
pub struct Notifier {
    duration: Duration,
    current: Option<Notification>,
}

impl Notifier {
    pub fn new(duration: Duration) -> Self {
        Notifier {
            duration,
            current: None,
        }
    }

    pub fn push(&mut self, kind: NotificationKind, message: impl Into<String>, now: Instant) {
        self.current = Some(Notification {
            kind,
            message: message.into(),
            expires_at: now + self.duration,
        });
    }

    pub fn saved(&mut self, now: Instant) {
        self.push(NotificationKind::Saved, SAVED_MESSAGE, now);
    }

    pub fn error(&mut self, message: impl Into<String>, now: Instant) {
        self.push(NotificationKind::Error, message, now);
    }

    /// The live notification, if it has not expired by `now`.
    pub fn current(&self, now: Instant) -> Option<&Notification> {
        self.current.as_ref().filter(|n| !n.is_expired(now))
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_expires() {
        let t0 = Instant::now();
        let mut n = Notifier::new(Duration::from_secs(2));
        n.saved(t0);
        let current = n.current(t0 + Duration::from_secs(1)).expect("live");
        assert_eq!(current.kind, NotificationKind::Saved);
        assert_eq!(current.message, SAVED_MESSAGE);
        assert!(n.current(t0 + Duration::from_secs(2)).is_none());
    }

    #[test]
    fn newer_notification_replaces_older() {
        let t0 = Instant::now();
        let mut n = Notifier::new(Duration::from_secs(2));
        n.saved(t0);
        n.error("offline", t0 + Duration::from_secs(1));
        let current = n.current(t0 + Duration::from_millis(2500)).expect("live");
        assert_eq!(current.kind, NotificationKind::Error);
        n.dismiss();
        assert!(n.current(t0).is_none());
    }
}
