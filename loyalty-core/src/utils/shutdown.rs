use tokio::sync::watch;

/// Resolves once the run signal is set, or once its sender is gone.
///
/// Unlike `changed()`, this also returns immediately when shutdown was
/// requested before the call.
pub async fn shutdown_requested(shutdown_rx: &mut watch::Receiver<bool>) {
    let _ = shutdown_rx.wait_for(|stop| *stop).await;
}
