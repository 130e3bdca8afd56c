use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

use crate::CancelToken;

const ACQUIRE_POLL: Duration = Duration::from_millis(50);

/// Counting permit gate over the export stage, built from a bounded channel
/// pre-filled with one token per permit. Dropping a [`Permit`] returns its
/// token, so a panicking worker cannot leak capacity.
pub(crate) struct ExportGate {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl ExportGate {
    pub(crate) fn new(permits: usize) -> Self {
        let permits = permits.max(1);
        let (tx, rx) = bounded(permits);
        for _ in 0..permits {
            // Cannot fail: the channel holds exactly `permits` slots.
            let _ = tx.send(());
        }
        Self { tx, rx }
    }

    /// Blocks until a permit is free, re-checking the token between waits.
    /// Returns `None` on cancellation.
    pub(crate) fn acquire(&self, cancel: &CancelToken) -> Option<Permit<'_>> {
        loop {
            if cancel.is_cancelled() {
                return None;
            }
            match self.rx.recv_timeout(ACQUIRE_POLL) {
                Ok(()) => return Some(Permit { tx: &self.tx }),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}

pub(crate) struct Permit<'a> {
    tx: &'a Sender<()>,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        let _ = self.tx.send(());
    }
}
