use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc::Receiver;
use tokio::sync::oneshot;
use tokio::task::JoinSet;

use crate::archiver::{error::ArchiverError, Archiver};
use crate::types::Update;

mod classifier;
mod event_handlers;

use classifier::{classify, Classification};

/// Rows written for one stored update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub update_id: i64,
    pub category: &'static str,
    pub message_ids: Vec<i64>,
    pub event_ids: Vec<i64>,
}

/// Identifying context of an update that could not be stored.
#[derive(Debug)]
pub struct IngestFailure {
    pub update_id: i64,
    pub category: &'static str,
    pub chat_id: Option<i64>,
    pub message_id: Option<i64>,
    pub error: ArchiverError,
}

impl std::fmt::Display for IngestFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "update {} ({}) chat {:?} message {:?}: {}",
            self.update_id, self.category, self.chat_id, self.message_id, self.error
        )
    }
}

/// Per-update result handed back to the driver. Never an `Err`.
#[derive(Debug)]
pub enum IngestOutcome {
    Stored(IngestReport),
    Skipped { update_id: i64, category: String },
    Failed(IngestFailure),
}

impl IngestOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, IngestOutcome::Stored(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, IngestOutcome::Failed(_))
    }
}

/// Tally of one [`Archiver::run`] session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub stored: usize,
    pub skipped: usize,
    pub failed: usize,
    pub panicked: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &IngestOutcome) {
        match outcome {
            IngestOutcome::Stored(_) => self.stored += 1,
            IngestOutcome::Skipped { .. } => self.skipped += 1,
            IngestOutcome::Failed(_) => self.failed += 1,
        }
    }
}

impl Archiver {
    /// Classifies one update and writes its rows.
    ///
    /// This is the isolation boundary: any error raised while extracting or persisting
    /// is logged with the update's identifying context and returned as
    /// [`IngestOutcome::Failed`], so callers can always move on to the next update.
    pub async fn process_update(&self, update: Update) -> IngestOutcome {
        let classification = classify(&update);
        let category = classification.label();

        let result = match &classification {
            Classification::Ignored { category } => {
                return IngestOutcome::Skipped {
                    update_id: update.update_id,
                    category: category.to_string(),
                };
            }
            Classification::Text {
                message,
                text,
                is_edit,
            } => self
                .handle_text(message, text, *is_edit)
                .await
                .map(|id| (vec![id], Vec::new())),
            Classification::Media {
                message,
                media,
                is_edit,
            } => self
                .handle_media(message, media.clone(), *is_edit)
                .await
                .map(|id| (vec![id], Vec::new())),
            Classification::Service { message, marker } => self
                .handle_service(message, *marker)
                .await
                .map(|ids| (Vec::new(), ids)),
            Classification::Other {
                message,
                kind,
                is_edit,
            } => self
                .handle_other(message, kind, *is_edit)
                .await
                .map(|id| (vec![id], Vec::new())),
        };

        match result {
            Ok((message_ids, event_ids)) => IngestOutcome::Stored(IngestReport {
                update_id: update.update_id,
                category,
                message_ids,
                event_ids,
            }),
            Err(error) => {
                let message = classification.message();
                let failure = IngestFailure {
                    update_id: update.update_id,
                    category,
                    chat_id: message.map(|m| m.chat.id),
                    message_id: message.map(|m| m.message_id),
                    error,
                };
                tracing::error!(
                    target: "chat_archiver::event_processor::process_update",
                    "Failed to archive {}",
                    failure
                );
                IngestOutcome::Failed(failure)
            }
        }
    }

    /// Processes updates one after another; a failed update never stops the batch.
    pub async fn process_batch<I>(&self, updates: I) -> Vec<IngestOutcome>
    where
        I: IntoIterator<Item = Update>,
    {
        let mut outcomes = Vec::new();
        for update in updates {
            outcomes.push(self.process_update(update).await);
        }
        outcomes
    }

    /// Drives ingestion from a transport channel, one task per update.
    ///
    /// Updates of different chats are processed concurrently. Updates of the same chat
    /// are written in arrival order, so an edit never overtakes its original message.
    ///
    /// Returns once the transport channel is closed. On a shutdown signal the channel is
    /// closed from this side; already queued updates are still processed and in-flight
    /// tasks run to completion. A panicking task is logged and counted; it never takes
    /// the loop down.
    pub async fn run(
        self: Arc<Self>,
        mut receiver: Receiver<Update>,
        mut shutdown: Receiver<()>,
    ) -> RunSummary {
        tracing::debug!(
            target: "chat_archiver::event_processor::run",
            "Starting update processing loop"
        );

        let mut tasks: JoinSet<Option<IngestOutcome>> = JoinSet::new();
        let mut summary = RunSummary::default();
        let mut shutting_down = false;
        // Completion signal of the most recently spawned task per chat
        let mut chat_tails: HashMap<i64, oneshot::Receiver<()>> = HashMap::new();

        loop {
            tokio::select! {
                maybe_update = receiver.recv() => {
                    let Some(update) = maybe_update else {
                        if shutting_down {
                            tracing::debug!(
                                target: "chat_archiver::event_processor::run",
                                "Queue flushed, shutting down update processor"
                            );
                        } else {
                            tracing::debug!(
                                target: "chat_archiver::event_processor::run",
                                "Update channel closed, exiting update processing loop"
                            );
                        }
                        break;
                    };
                    let archiver = Arc::clone(&self);
                    let update_id = update.update_id;
                    let (done, tail) = oneshot::channel();
                    let previous = match update.kind.message().map(|m| m.chat.id) {
                        Some(chat_id) => chat_tails.insert(chat_id, tail),
                        None => None,
                    };
                    tasks.spawn(async move {
                        if let Some(previous) = previous {
                            // A dropped sender also releases the wait
                            let _ = previous.await;
                        }
                        let outcome = AssertUnwindSafe(archiver.process_update(update))
                            .catch_unwind()
                            .await;
                        let _ = done.send(());
                        match outcome {
                            Ok(outcome) => Some(outcome),
                            Err(panic) => {
                                tracing::error!(
                                    target: "chat_archiver::event_processor::run",
                                    "Processing of update {} panicked: {}",
                                    update_id,
                                    panic_message(panic.as_ref())
                                );
                                None
                            }
                        }
                    });
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    record_joined(&mut summary, joined);
                    if tasks.is_empty() {
                        chat_tails.clear();
                    }
                }
                Some(_) = shutdown.recv(), if !shutting_down => {
                    tracing::info!(
                        target: "chat_archiver::event_processor::run",
                        "Received shutdown signal, finishing current queue..."
                    );
                    shutting_down = true;
                    // Queued updates are still delivered after close
                    receiver.close();
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            record_joined(&mut summary, joined);
        }

        tracing::info!(
            target: "chat_archiver::event_processor::run",
            "Update processing finished: {:?}",
            summary
        );
        summary
    }
}

fn record_joined(
    summary: &mut RunSummary,
    joined: Result<Option<IngestOutcome>, tokio::task::JoinError>,
) {
    match joined {
        Ok(Some(outcome)) => summary.record(&outcome),
        Ok(None) => summary.panicked += 1,
        Err(e) => {
            tracing::error!(
                target: "chat_archiver::event_processor::run",
                "Update task did not complete: {}",
                e
            );
            summary.panicked += 1;
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
