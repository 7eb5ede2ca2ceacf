// Stop request from a WatchDogHandle to its polling task
use tokio::sync::watch;

/// Held by the handle; flips the flag the polling task waits on
pub(super) struct StopRequest {
    tx: watch::Sender<bool>,
}

impl StopRequest {
    /// Ask the polling task to stop
    ///
    /// Returns false if the task is already gone.
    pub(super) fn send(&self) -> bool {
        self.tx.send(true).is_ok()
    }
}

/// Owned by the polling task
pub(super) struct StopListener {
    rx: watch::Receiver<bool>,
}

impl StopListener {
    /// Resolves once a stop was requested or the handle was dropped
    pub(super) async fn requested(&mut self) {
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}

pub(super) fn stop_channel() -> (StopRequest, StopListener) {
    let (tx, rx) = watch::channel(false);
    (StopRequest { tx }, StopListener { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_listener_waits_for_request() {
        let (request, mut listener) = stop_channel();

        let early = tokio::time::timeout(Duration::from_millis(20), listener.requested()).await;
        assert!(early.is_err());

        assert!(request.send());
        tokio::time::timeout(Duration::from_secs(1), listener.requested())
            .await
            .expect("listener should wake after a stop request");
    }

    #[tokio::test]
    async fn test_dropped_request_wakes_listener() {
        let (request, mut listener) = stop_channel();
        drop(request);

        tokio::time::timeout(Duration::from_secs(1), listener.requested())
            .await
            .expect("listener should wake once the handle is gone");
    }

    #[test]
    fn test_send_reports_missing_listener() {
        let (request, listener) = stop_channel();
        drop(listener);

        assert!(!request.send());
    }
}
