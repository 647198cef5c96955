//! Periodic poll driver
//!
//! [`PollScheduler`] ticks a [`ChargerCoordinator`] at the scan interval until
//! told to stop. A tick that arrives while a poll or command still holds the
//! transport is skipped, and missed ticks are not replayed. A shutdown signal
//! abandons a poll that is still waiting on the station.

use crate::coordinator::ChargerCoordinator;
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Counters reported when the scheduler stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
}

pub struct PollScheduler {
    coordinator: Arc<ChargerCoordinator>,
    period: Duration,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl PollScheduler {
    pub fn new(coordinator: Arc<ChargerCoordinator>, period: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        PollScheduler {
            coordinator,
            period,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Handle that stops the loop when sent `true`
    pub fn shutdown_handle(&self) -> watch::Sender<bool> {
        self.shutdown_tx.clone()
    }

    /// Polls until shutdown is signalled, then shuts the coordinator down.
    ///
    /// The first poll runs immediately.
    pub async fn run(mut self) -> SchedulerStats {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut stats = SchedulerStats::default();

        info!("Polling every {:?}", self.period);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    stats.ticks += 1;
                    let outcome = tokio::select! {
                        outcome = self.coordinator.try_poll() => outcome,
                        _ = stop_requested(&mut self.shutdown_rx) => {
                            debug!("Shutdown during poll, abandoning it");
                            break;
                        }
                    };
                    match outcome {
                        Some(Ok(_)) => stats.succeeded += 1,
                        Some(Err(_)) => stats.failed += 1,
                        None => stats.skipped += 1,
                    }
                }
                _ = stop_requested(&mut self.shutdown_rx) => break,
            }
        }

        debug!("Scheduler stopped: {stats:?}");
        self.coordinator.shutdown().await;
        stats
    }

    /// Runs the loop on its own task
    pub fn spawn(self) -> (watch::Sender<bool>, JoinHandle<SchedulerStats>) {
        let handle = self.shutdown_handle();
        (handle, tokio::spawn(self.run()))
    }
}

/// Resolves once `true` is sent or every sender is gone
async fn stop_requested(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::BULK_READ_BASE;
    use crate::coordinator::ConnectionState;
    use crate::modbus::mock::{MockFailure, MockTransport};
    use crate::payload::snapshot::tests::sample_block;

    #[tokio::test(start_paused = true)]
    async fn test_polls_at_interval() {
        let mock = MockTransport::with_block(BULK_READ_BASE, sample_block());
        let coordinator = ChargerCoordinator::new(mock.clone());
        let (stop, task) = PollScheduler::new(coordinator.clone(), Duration::from_secs(15)).spawn();

        // Ticks at 0, 15, 30 and 45 s
        tokio::time::sleep(Duration::from_secs(50)).await;
        stop.send(true).unwrap();
        let stats = task.await.unwrap();

        assert_eq!(stats.ticks, 4);
        assert_eq!(stats.succeeded, 4);
        assert_eq!(mock.read_requests().len(), 4);
        assert_eq!(coordinator.state(), ConnectionState::Disconnected);
        assert_eq!(mock.disconnects(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_do_not_stop_loop() {
        let mock = MockTransport::with_block(BULK_READ_BASE, sample_block());
        mock.push_failure(MockFailure::Timeout);
        mock.push_failure(MockFailure::Io(std::io::ErrorKind::ConnectionRefused));
        let coordinator = ChargerCoordinator::new(mock.clone());
        let (stop, task) = PollScheduler::new(coordinator.clone(), Duration::from_secs(10)).spawn();

        tokio::time::sleep(Duration::from_secs(25)).await;
        stop.send(true).unwrap();
        let stats = task.await.unwrap();

        assert_eq!(stats.failed, 2);
        assert_eq!(stats.succeeded, 1);
        assert!(coordinator.snapshot().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_abandons_slow_poll() {
        let mock = MockTransport::with_block(BULK_READ_BASE, sample_block());
        mock.set_op_delay(Duration::from_secs(30));
        let coordinator = ChargerCoordinator::new(mock.clone());
        let started = tokio::time::Instant::now();
        let (stop, task) = PollScheduler::new(coordinator.clone(), Duration::from_secs(15)).spawn();

        tokio::time::sleep(Duration::from_secs(1)).await;
        stop.send(true).unwrap();
        let stats = task.await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(30));
        assert_eq!(stats.ticks, 1);
        assert_eq!(stats.succeeded + stats.failed + stats.skipped, 0);
        assert!(coordinator.snapshot().is_none());
        assert_eq!(coordinator.state(), ConnectionState::Disconnected);
        assert_eq!(mock.disconnects(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skips_tick_while_busy() {
        let mock = MockTransport::with_block(BULK_READ_BASE, sample_block());
        mock.set_op_delay(Duration::from_secs(25));
        let coordinator = ChargerCoordinator::new(mock.clone());

        let busy = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.write_registers(16645, &[1]).await })
        };
        tokio::task::yield_now().await;

        let (stop, task) = PollScheduler::new(coordinator.clone(), Duration::from_secs(10)).spawn();
        tokio::time::sleep(Duration::from_secs(5)).await;
        stop.send(true).unwrap();
        let stats = task.await.unwrap();
        busy.await.unwrap().unwrap();

        assert_eq!(stats.skipped, 1);
        assert!(mock.read_requests().is_empty());
    }
}
