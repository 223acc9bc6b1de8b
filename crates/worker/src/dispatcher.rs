//! Outbox dispatcher: polling loop, per-event processing, retry/backoff.
//!
//! Event state machine: `pending -> processing -> {done | failed}`, with
//! transient failures retried under exponential backoff and permanent
//! validation failures parked as `dead`. Failures are isolated per event;
//! one bad event never blocks the batch.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use saldo_core::ledger::{PostOutcome, PostingError};
use saldo_db::entities::outbox_events;
use saldo_db::entities::sea_orm_active_enums::OutboxStatus;
use saldo_db::repositories::OutboxRepository;
use saldo_shared::config::WorkerConfig;
use saldo_shared::types::OutboxEventId;

use crate::engine::PostingEngine;

/// Live dispatcher state exposed through the control surface.
#[derive(Debug)]
pub struct WorkerStatus {
    /// Whether the polling loop is active.
    pub is_running: AtomicBool,
    /// When the dispatcher was constructed.
    pub started_at: DateTime<Utc>,
    /// Last poll tick, if any.
    pub last_poll_at: RwLock<Option<DateTime<Utc>>>,
    /// Events claimed over the process lifetime.
    pub claimed_total: AtomicU64,
    /// Events posted (or idempotently skipped).
    pub processed_total: AtomicU64,
    /// Transient failures (will retry or exhausted the budget).
    pub failed_total: AtomicU64,
    /// Permanent validation failures.
    pub dead_total: AtomicU64,
}

impl WorkerStatus {
    fn new() -> Self {
        Self {
            is_running: AtomicBool::new(false),
            started_at: Utc::now(),
            last_poll_at: RwLock::new(None),
            claimed_total: AtomicU64::new(0),
            processed_total: AtomicU64::new(0),
            failed_total: AtomicU64::new(0),
            dead_total: AtomicU64::new(0),
        }
    }

    /// Snapshots the counters for serialization.
    #[must_use]
    pub fn metrics(&self) -> WorkerMetrics {
        WorkerMetrics {
            claimed_total: self.claimed_total.load(Ordering::Relaxed),
            processed_total: self.processed_total.load(Ordering::Relaxed),
            failed_total: self.failed_total.load(Ordering::Relaxed),
            dead_total: self.dead_total.load(Ordering::Relaxed),
        }
    }

    /// Returns the last poll time, if the loop has ticked yet.
    #[must_use]
    pub fn last_poll_at(&self) -> Option<DateTime<Utc>> {
        *self.last_poll_at.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Counter snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerMetrics {
    /// Events claimed over the process lifetime.
    pub claimed_total: u64,
    /// Events posted (or idempotently skipped).
    pub processed_total: u64,
    /// Transient failures.
    pub failed_total: u64,
    /// Permanent validation failures.
    pub dead_total: u64,
}

/// Result of one processing batch.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BatchOutcome {
    /// Events marked done in this batch.
    pub processed_count: u64,
    /// Events that failed (transiently or permanently) in this batch.
    pub failed_count: u64,
}

/// The outbox polling dispatcher.
pub struct Dispatcher {
    config: WorkerConfig,
    engine: PostingEngine,
    outbox: OutboxRepository,
    status: Arc<WorkerStatus>,
}

impl Dispatcher {
    /// Creates a new dispatcher.
    #[must_use]
    pub fn new(config: WorkerConfig, engine: PostingEngine, outbox: OutboxRepository) -> Self {
        Self {
            config,
            engine,
            outbox,
            status: Arc::new(WorkerStatus::new()),
        }
    }

    /// Returns a handle to the live status.
    #[must_use]
    pub fn status(&self) -> Arc<WorkerStatus> {
        Arc::clone(&self.status)
    }

    /// The configured poll interval in seconds.
    #[must_use]
    pub const fn poll_interval_secs(&self) -> u64 {
        self.config.poll_interval_secs
    }

    /// The configured default batch size.
    #[must_use]
    pub const fn batch_size(&self) -> u64 {
        self.config.batch_size
    }

    /// Runs the polling loop until the shutdown signal fires.
    ///
    /// On shutdown the in-flight batch finishes (each posting operation is
    /// transactional and safe to let complete); no new batch starts.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        self.status.is_running.store(true, Ordering::Relaxed);
        info!(
            poll_interval_secs = self.config.poll_interval_secs,
            batch_size = self.config.batch_size,
            max_retries = self.config.max_retries,
            "Outbox dispatcher started"
        );

        let mut ticker =
            tokio::time::interval(Duration::from_secs(self.config.poll_interval_secs.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.process_batch(self.config.batch_size, false).await {
                        Ok(outcome) if outcome.processed_count + outcome.failed_count > 0 => {
                            debug!(
                                processed = outcome.processed_count,
                                failed = outcome.failed_count,
                                "Batch complete"
                            );
                        }
                        Ok(_) => {}
                        Err(err) => error!(error = %err, "Batch poll failed"),
                    }
                }
                _ = shutdown.changed() => {
                    info!("Outbox dispatcher shutting down");
                    break;
                }
            }
        }

        self.status.is_running.store(false, Ordering::Relaxed);
    }

    /// Claims and processes one batch. Also serves the manual trigger.
    ///
    /// # Errors
    ///
    /// Returns an error only when the claim itself fails; individual event
    /// failures are absorbed into the outcome counts.
    pub async fn process_batch(
        &self,
        batch_size: u64,
        force_retry: bool,
    ) -> Result<BatchOutcome, DbErr> {
        {
            let mut last_poll = self
                .status
                .last_poll_at
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *last_poll = Some(Utc::now());
        }

        if force_retry {
            let requeued = self.outbox.requeue_failed().await?;
            if requeued > 0 {
                info!(requeued, "Re-queued failed and dead events");
            }
        }

        let events = self.outbox.claim_batch(batch_size).await?;
        let claimed = u64::try_from(events.len()).unwrap_or(u64::MAX);
        self.status.claimed_total.fetch_add(claimed, Ordering::Relaxed);

        let mut outcome = BatchOutcome::default();
        for event in &events {
            if self.process_one(event).await {
                outcome.processed_count += 1;
            } else {
                outcome.failed_count += 1;
            }
        }
        Ok(outcome)
    }

    /// Processes a single claimed event; returns true on success.
    ///
    /// A per-event timeout bounds worst-case batch duration, so one hung
    /// item cannot stall the polling loop.
    async fn process_one(&self, event: &outbox_events::Model) -> bool {
        let item_timeout = Duration::from_secs(self.config.item_timeout_secs.max(1));
        let result = match tokio::time::timeout(item_timeout, self.engine.post_event(event)).await
        {
            Ok(result) => result,
            Err(_) => Err(PostingError::Timeout),
        };

        match result {
            Ok(outcome) => {
                let journal = outcome.journal();
                match &outcome {
                    PostOutcome::Posted(_) => info!(
                        event_id = %event.id,
                        tenant_id = %event.tenant_id,
                        event_type = %event.event_type,
                        journal_number = %journal.journal_number,
                        "Posted journal entry"
                    ),
                    PostOutcome::AlreadyPosted(_) => debug!(
                        event_id = %event.id,
                        journal_number = %journal.journal_number,
                        "Duplicate event skipped"
                    ),
                }
                if let Err(err) = self
                    .outbox
                    .mark_done(OutboxEventId::from_uuid(event.id))
                    .await
                {
                    error!(event_id = %event.id, error = %err, "Failed to mark event done");
                    self.status.failed_total.fetch_add(1, Ordering::Relaxed);
                    return false;
                }
                self.status.processed_total.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(err) if err.is_retryable() => {
                match self
                    .outbox
                    .mark_retry(
                        event,
                        &err.to_string(),
                        self.config.max_retries,
                        self.config.backoff_base_secs,
                    )
                    .await
                {
                    Ok(status) => warn!(
                        event_id = %event.id,
                        tenant_id = %event.tenant_id,
                        attempt = event.attempt_count + 1,
                        max_retries = self.config.max_retries,
                        exhausted = status == OutboxStatus::Failed,
                        error = %err,
                        "Transient posting failure"
                    ),
                    Err(mark_err) => error!(
                        event_id = %event.id,
                        error = %mark_err,
                        "Failed to schedule retry"
                    ),
                }
                self.status.failed_total.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(err) => {
                error!(
                    event_id = %event.id,
                    tenant_id = %event.tenant_id,
                    event_type = %event.event_type,
                    error_code = err.error_code(),
                    error = %err,
                    payload = %event.payload,
                    "Permanent validation failure, parking event"
                );
                if let Err(mark_err) = self.outbox.mark_dead(event, &err.to_string()).await {
                    error!(event_id = %event.id, error = %mark_err, "Failed to park event");
                }
                self.status.dead_total.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }
}
