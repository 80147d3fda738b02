//! Periodic background sweeping of the session table.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::table::SessionTable;

/// Background worker that sweeps expired sessions on a fixed period.
pub struct SessionSweeper;

impl SessionSweeper {
    /// Spawns the sweeper onto the current runtime.
    ///
    /// The first sweep happens one `period` after spawning. A sweep that has
    /// started always runs to completion; shutdown takes effect between
    /// sweeps.
    pub fn spawn(table: SessionTable, period: Duration) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // interval fires immediately on the first tick
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        tracing::info!("session sweeper stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        table.sweep_now().await;
                    }
                }
            }
        });

        SweeperHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

/// Handle to a running [`SessionSweeper`].
pub struct SweeperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stops the sweeper and waits for it to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            tracing::error!(error = %e, "session sweeper task failed");
        }
    }

    /// Returns true if the sweeper task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
