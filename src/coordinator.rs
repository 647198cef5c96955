//! # Polling Coordinator
//!
//! [`ChargerCoordinator`] is the single owner of the Modbus connection. It
//! runs poll cycles (connect if needed, one bulk read of the status block,
//! decode, fallback-limit correction, publish), serializes every register
//! transaction including command writes, and keeps the last good
//! [`DeviceSnapshot`] for consumers.
//!
//! ## Fallback limit correction
//!
//! Some firmware revisions report a fallback limit above 32 A. When a poll
//! sees such a value the coordinator writes 6 A to the fallback register once
//! per bad streak. Once that write succeeds, every snapshot in the streak
//! reports 6 A even while the station still reads back the bad value. The
//! streak ends when a poll reads a value in range again, after which a new
//! excursion is corrected again.
//!
//! ## Example
//!
//! ```rust,no_run
//! use terra_ac::config::ChargerConfig;
//! use terra_ac::coordinator::ChargerCoordinator;
//!
//! # async fn run() -> Result<(), terra_ac::error::PollError> {
//! let coordinator = ChargerCoordinator::from_config(&ChargerConfig::default());
//! let snapshot = coordinator.poll().await?;
//! println!("{}", snapshot.summary());
//! # Ok(())
//! # }
//! ```

use crate::config::ChargerConfig;
use crate::constants::{
    BULK_READ_BASE, BULK_READ_COUNT, FALLBACK_LIMIT_CORRECTION, FALLBACK_LIMIT_MAX_AMPS,
    REG_FALLBACK_LIMIT,
};
use crate::error::{PollError, TransportError};
use crate::modbus::tcp::TcpTransport;
use crate::modbus::transport::RegisterTransport;
use crate::payload::data_encoding::is_placeholder;
use crate::payload::snapshot::DeviceSnapshot;
use crate::util::logging::{log_poll_failure, log_registers_hex, LogThrottle};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Connection lifecycle as seen by consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    /// Bulk read and decode in progress
    Polling,
    /// Idle between polls with an open connection
    Connected,
}

/// Everything that must only be touched while holding the transport lock.
struct Session {
    transport: Box<dyn RegisterTransport>,
    /// Decoded once, never re-decoded while cached
    serial_number: Option<String>,
    /// Set before the corrective write, cleared by the first in-range read
    correction_attempted: bool,
    /// Set when the corrective write succeeded, cleared like `correction_attempted`
    fallback_corrected: bool,
}

pub struct ChargerCoordinator {
    session: tokio::sync::Mutex<Session>,
    snapshot_tx: watch::Sender<Option<Arc<DeviceSnapshot>>>,
    state_tx: watch::Sender<ConnectionState>,
    last_error: Mutex<Option<PollError>>,
    failure_log: Mutex<LogThrottle>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
    refresh_generation: AtomicU64,
    closed: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ChargerCoordinator {
    pub fn new<T>(transport: T) -> Arc<Self>
    where
        T: RegisterTransport + 'static,
    {
        Self::with_boxed_transport(Box::new(transport))
    }

    pub fn with_boxed_transport(transport: Box<dyn RegisterTransport>) -> Arc<Self> {
        let (snapshot_tx, _) = watch::channel(None);
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Arc::new(ChargerCoordinator {
            session: tokio::sync::Mutex::new(Session {
                transport,
                serial_number: None,
                correction_attempted: false,
                fallback_corrected: false,
            }),
            snapshot_tx,
            state_tx,
            last_error: Mutex::new(None),
            failure_log: Mutex::new(LogThrottle::new(300_000, 3)),
            refresh_task: Mutex::new(None),
            refresh_generation: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        })
    }

    /// Coordinator talking Modbus/TCP to the configured station
    pub fn from_config(config: &ChargerConfig) -> Arc<Self> {
        Self::new(TcpTransport::from_config(config))
    }

    /// Last successfully decoded snapshot, if any poll has succeeded yet
    pub fn snapshot(&self) -> Option<Arc<DeviceSnapshot>> {
        self.snapshot_tx.borrow().clone()
    }

    /// Receiver notified every time a new snapshot is published
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<DeviceSnapshot>>> {
        self.snapshot_tx.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Error of the most recent poll, cleared by the next successful one
    pub fn last_error(&self) -> Option<PollError> {
        lock(&self.last_error).clone()
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!("Connection state {previous:?} -> {state:?}");
        }
    }

    fn settle_state(&self, session: &Session) {
        if session.transport.is_connected() {
            self.set_state(ConnectionState::Connected);
        } else {
            self.set_state(ConnectionState::Disconnected);
        }
    }

    /// Runs one poll cycle, waiting for any in-flight poll or command first.
    ///
    /// On failure the cached snapshot is left untouched.
    pub async fn poll(&self) -> Result<Arc<DeviceSnapshot>, PollError> {
        let mut session = self.session.lock().await;
        self.poll_locked(&mut session).await
    }

    /// Like [`poll`](Self::poll) but returns `None` immediately when the
    /// transport is busy, so a timer tick never queues behind a slow read.
    pub async fn try_poll(&self) -> Option<Result<Arc<DeviceSnapshot>, PollError>> {
        let Ok(mut session) = self.session.try_lock() else {
            debug!("Poll already in flight, skipping");
            return None;
        };
        Some(self.poll_locked(&mut session).await)
    }

    async fn poll_locked(&self, session: &mut Session) -> Result<Arc<DeviceSnapshot>, PollError> {
        match self.run_cycle(session).await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.snapshot_tx.send_replace(Some(snapshot.clone()));
                let recovered = lock(&self.last_error).take();
                if let Some(previous) = recovered {
                    info!("Polling recovered after: {previous}");
                    lock(&self.failure_log).reset();
                }
                Ok(snapshot)
            }
            Err(err) => {
                self.settle_state(session);
                log_poll_failure(&mut lock(&self.failure_log), &err);
                *lock(&self.last_error) = Some(err.clone());
                Err(err)
            }
        }
    }

    async fn run_cycle(&self, session: &mut Session) -> Result<DeviceSnapshot, PollError> {
        if !session.transport.is_connected() {
            self.set_state(ConnectionState::Connecting);
            session.transport.connect().await?;
        }

        self.set_state(ConnectionState::Polling);
        let registers = session
            .transport
            .read_holding_registers(BULK_READ_BASE, BULK_READ_COUNT)
            .await?;
        log_registers_hex("Status block", &registers);

        let mut snapshot = DeviceSnapshot::decode(&registers, session.serial_number.as_deref())
            .map_err(|e| PollError::Protocol(e.to_string()))?;

        if session.serial_number.is_none() {
            if is_placeholder(&snapshot.serial_number) {
                warn!("Serial number not decodable yet: {}", snapshot.serial_number);
            } else {
                info!("Charger serial number {}", snapshot.serial_number);
                session.serial_number = Some(snapshot.serial_number.clone());
            }
        }

        self.correct_fallback_limit(session, &mut snapshot).await;
        self.settle_state(session);
        debug!("Polled {}", snapshot.summary());
        Ok(snapshot)
    }

    /// Best effort: a failed write is logged and never fails the poll.
    async fn correct_fallback_limit(&self, session: &mut Session, snapshot: &mut DeviceSnapshot) {
        if !snapshot.fallback_limit_out_of_range() {
            if session.correction_attempted {
                info!("Fallback limit back in range at {} A", snapshot.fallback_limit);
            }
            session.correction_attempted = false;
            session.fallback_corrected = false;
            return;
        }

        if session.fallback_corrected {
            warn!(
                "Fallback limit still reads {} A after correction, reporting {} A",
                snapshot.fallback_limit, FALLBACK_LIMIT_CORRECTION
            );
            snapshot.fallback_limit = FALLBACK_LIMIT_CORRECTION;
            return;
        }

        if session.correction_attempted {
            debug!(
                "Fallback limit still {} A, correction already attempted",
                snapshot.fallback_limit
            );
            return;
        }

        session.correction_attempted = true;
        warn!(
            "Fallback limit reads {} A (max {} A), writing {} A",
            snapshot.fallback_limit, FALLBACK_LIMIT_MAX_AMPS, FALLBACK_LIMIT_CORRECTION
        );

        match session
            .transport
            .write_register(REG_FALLBACK_LIMIT, FALLBACK_LIMIT_CORRECTION)
            .await
        {
            Ok(()) => {
                info!("Fallback limit corrected to {FALLBACK_LIMIT_CORRECTION} A");
                session.fallback_corrected = true;
                snapshot.fallback_limit = FALLBACK_LIMIT_CORRECTION;
            }
            Err(e) => warn!("Fallback limit correction failed: {e}"),
        }
    }

    /// Writes `values` starting at `address` on the shared connection.
    ///
    /// Waits for any in-flight poll. A single value uses a single-register
    /// write, more than one a multiple-register write.
    pub async fn write_registers(&self, address: u16, values: &[u16]) -> Result<(), TransportError> {
        let mut session = self.session.lock().await;

        if !session.transport.is_connected() {
            self.set_state(ConnectionState::Connecting);
            if let Err(e) = session.transport.connect().await {
                self.set_state(ConnectionState::Disconnected);
                return Err(e);
            }
        }

        let result = match values {
            [value] => session.transport.write_register(address, *value).await,
            _ => session.transport.write_registers(address, values).await,
        };
        self.settle_state(&session);
        result
    }

    /// Schedules one extra poll after `delay` on the tokio runtime.
    ///
    /// A newer request supersedes one that has not fired yet. Returns
    /// immediately; the poll outcome is published like any other.
    pub fn request_refresh(self: &Arc<Self>, delay: Duration) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }

        let generation = self.refresh_generation.fetch_add(1, Ordering::AcqRel) + 1;
        let coordinator = Arc::downgrade(self);
        debug!("Refresh requested in {delay:?}");

        let task = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let Some(coordinator) = coordinator.upgrade() else {
                return;
            };
            if coordinator.closed.load(Ordering::Acquire)
                || coordinator.refresh_generation.load(Ordering::Acquire) != generation
            {
                return;
            }
            // Failures are already logged and recorded by the poll itself
            let _ = coordinator.poll().await;
        });

        *lock(&self.refresh_task) = Some(task);
    }

    /// Waits for the most recently requested refresh to finish.
    pub async fn wait_for_refresh(&self) {
        let task = lock(&self.refresh_task).take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!("Refresh task failed: {e}");
                }
            }
        }
    }

    /// Cancels any pending refresh and closes the connection. Later refresh
    /// requests are ignored.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        let pending = lock(&self.refresh_task).take();
        if let Some(task) = pending {
            task.abort();
        }

        let mut session = self.session.lock().await;
        session.transport.disconnect().await;
        self.set_state(ConnectionState::Disconnected);
        info!("Coordinator for {} shut down", session.transport.target());
    }
}
