use tokio::sync::mpsc;

/// Transfer progress of a single download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Bytes of body received so far; never decreases.
    pub received: u64,
    /// Declared `Content-Length`, if the server sent one.
    pub total: Option<u64>,
}

/// Sending half handed to a download.
pub type ProgressSender = mpsc::UnboundedSender<Progress>;
/// Receiving half kept by the observer.
pub type ProgressReceiver = mpsc::UnboundedReceiver<Progress>;

/// Create a channel for observing download progress.
///
/// Progress is purely informational: dropping the receiver never affects
/// the download.
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

pub(super) fn report(sender: Option<&ProgressSender>, received: u64, total: Option<u64>) {
    if let Some(sender) = sender {
        let _ = sender.send(Progress { received, total });
    }
}
