use tokio::sync::watch;

/// Creates a trigger and the first listener side of a shutdown signal.
pub(crate) fn channel() -> (Trigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (Trigger { tx }, Shutdown { rx })
}

/// Fires the shutdown of every transport.
pub(crate) struct Trigger {
    tx: watch::Sender<bool>,
}

impl Trigger {
    /// Signals every `Shutdown` and waits until all of them are dropped.
    pub(crate) async fn shutdown(self) {
        self.tx.send_replace(true);
        self.tx.closed().await;
    }
}

/// Held by every listener and connection that must finish before the process exits.
#[derive(Clone)]
pub(crate) struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub(crate) fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes once shutdown is signaled or the trigger is gone.
    pub(crate) async fn recv(&mut self) {
        let _ = self.rx.wait_for(|down| *down).await;
    }

    /// Owns the receiver so it can be handed to servers expecting a plain future.
    pub(crate) async fn signaled(mut self) {
        self.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn trigger_waits_for_holders() {
        let (trigger, shutdown) = channel();
        let mut holder = shutdown.clone();
        drop(shutdown);
        assert!(!holder.is_shutdown());

        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        let task = tokio::spawn(async move {
            holder.recv().await;
            assert!(holder.is_shutdown());
            // Still held while the connection drains.
            let _ = done_rx.await;
        });

        let mut fired = Box::pin(trigger.shutdown());
        assert!(tokio::time::timeout(Duration::from_millis(50), &mut fired)
            .await
            .is_err());

        done_tx.send(()).unwrap();
        fired.await;
        task.await.unwrap();
    }

    #[tokio::test]
    async fn dropped_trigger_counts_as_shutdown() {
        let (trigger, shutdown) = channel();
        drop(trigger);
        shutdown.signaled().await;
    }
}
