//! Expiration sweeper: reclaims reservations past their time-to-live.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::error::EngineResult;
use crate::manager::InventoryEngine;
use crate::store::RecordStore;

impl<S: RecordStore> InventoryEngine<S> {
    /// Reclaim every active reservation whose time-to-live has elapsed.
    ///
    /// Goes through the normal release path per `(product, order)` pair, so
    /// the same per-record serialization applies and unrelated products are
    /// never blocked. A hold settled by a racing confirm/release shows up as
    /// `ReservationNotFound`, which is benign here. Failure on one record is
    /// logged and does not abort the sweep of the rest.
    ///
    /// Returns the number of reservations reclaimed; a second sweep with no
    /// newly-expired reservations returns zero.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> EngineResult<usize> {
        let mut cleaned = 0usize;

        for versioned in self.store().scan()? {
            let product_id = versioned.record.product_id();
            for order_id in versioned.record.expired_orders(now) {
                match self.release(product_id, order_id, "Reservation expired") {
                    Ok(outcome) => {
                        cleaned += 1;
                        debug!(
                            product_id = %product_id,
                            order_id = %order_id,
                            quantity = outcome.quantity,
                            "expired reservation reclaimed"
                        );
                    }
                    Err(err) if err.is_reservation_not_found() => {
                        debug!(
                            product_id = %product_id,
                            order_id = %order_id,
                            "reservation already settled by a concurrent caller"
                        );
                    }
                    Err(err) => {
                        warn!(
                            product_id = %product_id,
                            order_id = %order_id,
                            error = %err,
                            "failed to reclaim expired reservation"
                        );
                    }
                }
            }
        }

        if cleaned > 0 {
            info!(cleaned, "expiration sweep reclaimed reservations");
        }
        Ok(cleaned)
    }
}

/// Sweeper configuration.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// How often to sweep
    pub interval: Duration,
    /// Name for logging and the thread
    pub name: String,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            name: "expiration-sweeper".to_string(),
        }
    }
}

impl SweeperConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Sweeper runtime statistics.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SweeperStats {
    pub sweeps_run: u64,
    pub reservations_reclaimed: u64,
    pub sweep_errors: u64,
    pub uptime_secs: u64,
}

/// Handle to control a running sweeper.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
    stats: Arc<Mutex<SweeperStats>>,
}

impl SweeperHandle {
    /// Request graceful shutdown and wait for the thread to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }

    /// Get current sweeper statistics.
    pub fn stats(&self) -> SweeperStats {
        self.stats.lock().unwrap().clone()
    }
}

/// Timer-driven background sweeper.
pub struct Sweeper;

impl Sweeper {
    /// Spawn the sweeper in a background thread.
    ///
    /// The thread wakes every `config.interval`, sweeps once, and exits on
    /// `SweeperHandle::shutdown`.
    pub fn spawn<S>(engine: Arc<InventoryEngine<S>>, config: SweeperConfig) -> SweeperHandle
    where
        S: RecordStore + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let stats = Arc::new(Mutex::new(SweeperStats::default()));
        let stats_clone = stats.clone();

        let name = config.name.clone();
        let join = thread::Builder::new()
            .name(name)
            .spawn(move || {
                sweeper_loop(engine, config, shutdown_rx, stats_clone);
            })
            .expect("failed to spawn sweeper thread");

        SweeperHandle {
            shutdown: shutdown_tx,
            join: Some(join),
            stats,
        }
    }
}

fn sweeper_loop<S: RecordStore>(
    engine: Arc<InventoryEngine<S>>,
    config: SweeperConfig,
    shutdown_rx: mpsc::Receiver<()>,
    stats: Arc<Mutex<SweeperStats>>,
) {
    info!(
        sweeper = %config.name,
        interval_ms = config.interval.as_millis() as u64,
        "expiration sweeper started"
    );
    let start_time = Instant::now();

    loop {
        // Wake on the tick, exit promptly on shutdown.
        match shutdown_rx.recv_timeout(config.interval) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {}
        }

        match engine.sweep_expired(Utc::now()) {
            Ok(cleaned) => {
                let mut s = stats.lock().unwrap();
                s.sweeps_run += 1;
                s.reservations_reclaimed += cleaned as u64;
                s.uptime_secs = start_time.elapsed().as_secs();
            }
            Err(e) => {
                error!(sweeper = %config.name, error = %e, "expiration sweep failed");
                let mut s = stats.lock().unwrap();
                s.sweeps_run += 1;
                s.sweep_errors += 1;
                s.uptime_secs = start_time.elapsed().as_secs();
            }
        }
    }

    info!(sweeper = %config.name, "expiration sweeper stopped");
}
