//! Cooperative cancellation over a `tokio::sync::watch` channel.

use tokio::sync::watch;

/// Resolves once `rx` observes `true`.
///
/// If the sender is dropped without ever firing, the future pends forever so
/// that `select!` callers simply fall through to their other branches instead
/// of spinning on a closed channel.
pub async fn fired(mut rx: watch::Receiver<bool>) {
    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
        std::future::pending::<()>().await;
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn resolves_when_signal_fires() {
        let (tx, rx) = watch::channel(false);
        let wait = tokio::spawn(fired(rx));
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), wait)
            .await
            .expect("fired() should resolve")
            .unwrap();
    }

    #[tokio::test]
    async fn resolves_immediately_when_already_fired() {
        let (tx, rx) = watch::channel(true);
        drop(tx);
        // Sender gone, but the value was already true when it fired.
        tokio::time::timeout(Duration::from_millis(50), fired(rx))
            .await
            .expect("pre-fired signal should resolve");
    }

    #[tokio::test]
    async fn pends_forever_when_sender_dropped_unfired() {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        let timed_out = tokio::time::timeout(Duration::from_millis(50), fired(rx))
            .await
            .is_err();
        assert!(timed_out, "dropped-unfired sender must not resolve");
    }
}
