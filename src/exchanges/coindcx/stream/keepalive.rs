use super::supervisor::Command;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Periodic application-level ping, alive for exactly one connection.
///
/// The task never touches the socket itself: it asks the stream actor to
/// emit the ping, so the actor stays the only writer.
pub(crate) struct Keepalive {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Keepalive {
    /// First ping fires one full `period` after the call.
    pub(crate) fn spawn(
        period: Duration,
        commands: mpsc::Sender<Command>,
        cancel: CancellationToken,
    ) -> Self {
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        match commands.try_send(Command::Ping) {
                            Ok(()) => trace!("keepalive ping queued"),
                            Err(TrySendError::Full(_)) => {
                                warn!("command queue full, skipping keepalive ping");
                            }
                            Err(TrySendError::Closed(_)) => break,
                        }
                    }
                }
            }
            debug!("keepalive stopped");
        });

        Self { cancel, handle }
    }

    /// Cancel the timer and wait until the task is gone.
    pub(crate) async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "keepalive task ended abnormally");
        }
    }
}
