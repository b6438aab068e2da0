//! Long-lived background loops: SQS poll (spec.md §4.1 step 1) and the
//! reconciliation sweep (step 4). Both take a shutdown signal and select
//! against it on every iteration, matching the teacher's scheduler shutdown
//! idiom.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{interval, Duration};

use crate::ingest::{IngestWorker, ProcessOutcome};
use crate::queue::UploadQueue;
use crate::reconciliation::Reconciler;

pub struct PollLoopConfig {
    pub max_messages: i32,
    pub wait_seconds: i32,
    pub visibility_timeout_seconds: i32,
}

pub async fn run_poll_loop(
    queue: Arc<dyn UploadQueue>,
    ingest: Arc<IngestWorker>,
    config: PollLoopConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            return;
        }

        tokio::select! {
            received = queue.receive(config.max_messages, config.wait_seconds, config.visibility_timeout_seconds) => {
                match received {
                    Ok(messages) => {
                        for msg in messages {
                            let queue = queue.clone();
                            let ingest = ingest.clone();
                            tokio::spawn(async move {
                                process_one(queue, ingest, msg).await;
                            });
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "queue receive failed");
                    }
                }
            }
            _ = shutdown.changed() => {
                return;
            }
        }
    }
}

async fn process_one(queue: Arc<dyn UploadQueue>, ingest: Arc<IngestWorker>, msg: crate::queue::ReceivedMessage) {
    let Some(notification) = msg.notification else {
        // Malformed envelope — acknowledge without processing (spec.md §7,
        // "Input-shape errors").
        let _ = queue.delete(&msg.receipt_handle).await;
        return;
    };

    if !notification.is_object_created {
        let _ = queue.delete(&msg.receipt_handle).await;
        return;
    }

    let outcome = ingest
        .process_notification(&notification.bucket, &notification.key, notification.size, notification.event_time)
        .await;

    match outcome {
        Ok(ProcessOutcome::Committed) | Ok(ProcessOutcome::Discarded) => {
            if let Err(e) = queue.delete(&msg.receipt_handle).await {
                tracing::error!(error = %e, "failed to delete acknowledged message");
            }
        }
        Err(e) => {
            // Do not delete: the message reappears after the visibility
            // timeout and is retried (spec.md §4.1 step 1 / §7).
            tracing::error!(error = %e, key = %notification.key, "ingest processing failed, leaving message for retry");
        }
    }
}

pub async fn run_reconciliation_loop(reconciler: Arc<Reconciler>, interval_seconds: u64, mut shutdown: watch::Receiver<bool>) {
    let mut tick = interval(Duration::from_secs(interval_seconds));
    loop {
        tokio::select! {
            _ = tick.tick() => {
                let started = Utc::now();
                match reconciler.sweep_once().await {
                    Ok(n) => tracing::info!(count = n, elapsed_ms = (Utc::now() - started).num_milliseconds(), "reconciliation sweep complete"),
                    Err(e) => tracing::error!(error = %e, "reconciliation sweep failed"),
                }
            }
            _ = shutdown.changed() => {
                return;
            }
        }
        if *shutdown.borrow() {
            return;
        }
    }
}
