//! Human-readable progress lines for a presentation layer.

use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

/// Optional sink for progress lines.
///
/// Every line is logged; when a sender is attached it is also forwarded.
/// A closed receiver is ignored.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    sender: Option<UnboundedSender<String>>,
}

impl Progress {
    pub fn new(sender: UnboundedSender<String>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// A sink that only logs.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn emit(&self, line: impl Into<String>) {
        let line = line.into();
        info!(progress = %line);
        if let Some(sender) = &self.sender {
            let _ = sender.send(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_forwarded() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let progress = Progress::new(tx);
        progress.emit("· Keywords: a, b");
        assert_eq!(rx.try_recv().unwrap(), "· Keywords: a, b");
    }

    #[test]
    fn test_closed_receiver_ignored() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<String>();
        drop(rx);
        Progress::new(tx).emit("still fine");
        Progress::silent().emit("nobody listening");
    }
}
