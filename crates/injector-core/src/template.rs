use chrono::{DateTime, Utc};

/// UTC with millisecond precision, e.g. `2026-08-07T09:15:02.417Z`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Renders messages from a template and a per-message counter.
///
/// Recognized placeholders: `{counter}`, `{timestamp}`, `{hostname}` and
/// `{pid}`. Every occurrence of a recognized placeholder is substituted;
/// unrecognized placeholders are left verbatim. Hostname and pid are
/// resolved once at construction, the timestamp is taken per render.
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    template: String,
    hostname: String,
    pid: u32,
}

impl MessageFormatter {
    pub fn new(template: impl Into<String>) -> Self {
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".to_string());

        Self {
            template: template.into(),
            hostname,
            pid: std::process::id(),
        }
    }

    pub fn render(&self, counter: u64) -> String {
        self.render_at(counter, Utc::now())
    }

    fn render_at(&self, counter: u64, now: DateTime<Utc>) -> String {
        let mut message = self.template.replace("{counter}", &counter.to_string());
        if message.contains("{timestamp}") {
            let timestamp = now.format(TIMESTAMP_FORMAT).to_string();
            message = message.replace("{timestamp}", &timestamp);
        }
        message = message.replace("{hostname}", &self.hostname);
        message = message.replace("{pid}", &self.pid.to_string());
        message
    }
}
