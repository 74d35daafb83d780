use chrono::{DateTime, Duration, Utc};
use std::process::Command;
use std::sync::Mutex;

/// How long an in-app notice stays visible.
pub const NOTICE_TTL_SECS: i64 = 3;

pub const REMINDER_NOTIFICATION_TITLE: &str = "Sticky Board Reminder";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

/// Transient in-app message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>, now: DateTime<Utc>) -> Self {
        Notice {
            kind,
            message: message.into(),
            expires_at: now + Duration::seconds(NOTICE_TTL_SECS),
        }
    }

    pub fn is_visible(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Delivery of OS-level notifications. Best effort: implementations that
/// cannot reach the OS simply do nothing.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str);
}

/// Sends desktop notifications through `notify-send` when it is on `PATH`.
///
/// The command runs on tokio's blocking pool when called inside a runtime,
/// so a notification daemon that never answers does not hold up the board.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    program: String,
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        DesktopNotifier::with_program("notify-send")
    }
}

impl DesktopNotifier {
    pub fn with_program(program: impl Into<String>) -> Self {
        DesktopNotifier {
            program: program.into(),
        }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str) {
        let (program, title, body) = (self.program.clone(), title.to_string(), body.to_string());
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || send_desktop(&program, &title, &body));
            }
            Err(_) => send_desktop(&program, &title, &body),
        }
    }
}

fn send_desktop(program: &str, title: &str, body: &str) {
    if which::which(program).is_err() {
        tracing::debug!(program, title, "notifier not available, skipping OS notification");
        return;
    }
    if let Err(err) = Command::new(program).arg(title).arg(body).status() {
        tracing::debug!(error = %err, "OS notification failed");
    }
}

/// Keeps every notification it is asked to deliver.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, body: &str) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((title.to_string(), body.to_string()));
        }
    }
}
