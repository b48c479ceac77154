//! Terminal output for session events and transfer progress.

use std::time::Duration;

use roomshare_connection::SessionEvent;
use roomshare_transfer::{SpeedCalculator, format_megabytes};

/// Renders a session event as a line for stdout.
///
/// Returns `None` for events that are shown elsewhere (progress) or
/// need more work first (received files).
pub fn event_line(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::PeerCount(1) => Some("* you are alone in the room".into()),
        SessionEvent::PeerCount(n) => Some(format!("* {n} peers in the room")),
        SessionEvent::Chat { message, .. } => Some(format!("peer: {message}")),
        SessionEvent::Text(raw) => Some(format!("peer (raw): {raw}")),
        SessionEvent::ReceiveStarted { filename, size } => Some(format!(
            "* receiving {filename} ({})",
            format_megabytes(*size)
        )),
        SessionEvent::Disconnected => Some("* disconnected".into()),
        SessionEvent::ReceiveProgress { .. } | SessionEvent::FileReceived(_) => None,
    }
}

/// Throttles progress output to one line per 10% step, with speed.
pub struct ProgressLine {
    label: String,
    last_step: Option<u8>,
    last_bytes: u64,
    speed: SpeedCalculator,
}

impl ProgressLine {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            last_step: None,
            last_bytes: 0,
            speed: SpeedCalculator::new(Some(Duration::from_secs(5)), None),
        }
    }

    /// Records progress and returns a line when a new 10% step is reached.
    pub fn update(&mut self, done: u64, total: u64, percent: u8) -> Option<String> {
        self.speed.add_sample(done.saturating_sub(self.last_bytes));
        self.last_bytes = done;

        let step = percent / 10;
        if self.last_step.is_some_and(|last| step <= last) {
            return None;
        }
        self.last_step = Some(step);

        let mut line = format!(
            "* {} {percent:>3}% ({} / {})",
            self.label,
            format_megabytes(done),
            format_megabytes(total)
        );
        let rate = self.speed.bytes_per_second();
        if rate > 0.0 {
            line.push_str(&format!(", {}/s", format_megabytes(rate as u64)));
        }
        let eta = self.speed.eta(total.saturating_sub(done)).filter(|_| done < total);
        if let Some(eta) = eta {
            line.push_str(&format!(", {} left", format_eta(eta)));
        }
        Some(line)
    }
}

/// `"42s"` under a minute, `"3m 05s"` above.
fn format_eta(eta: Duration) -> String {
    let secs = eta.as_secs_f64().ceil() as u64;
    if secs < 60 {
        format!("{secs}s")
    } else {
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}
