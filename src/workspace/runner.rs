//! Pipeline runner: drains the submission queue against a remote operation.
//!
//! Each drained item produces exactly one `Echo` and exactly one `Outcome` or
//! `OutcomeError` in the result log. Remote failures never escape a run; they
//! are folded into the log and the runner moves on to the next item.

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio_util::sync::CancellationToken;

use super::Workspace;
use crate::error::RemoteError;
use crate::remote::{OperationOutput, ProgressSink, RemoteOp};
use crate::types::{EntryKind, Event, ItemId, ItemKind, ItemStatus, RunSummary, WorkItem};

/// When the item's echo entry is written
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum EchoTiming {
    /// Before the call starts (sequential runs)
    Immediate,
    /// Together with the outcome (concurrent runs, completion order)
    WithOutcome,
}

impl Workspace {
    /// Process every queued item with `operation`
    ///
    /// Runs until the queue is empty, including items submitted while the run is
    /// in progress. Never fails: per-item errors become `OutcomeError` entries.
    /// A second concurrent call waits for the first to finish.
    ///
    /// With `pipeline.max_concurrent_calls = 1` (default) items are processed one
    /// at a time and each echo is logged as soon as its call starts. With a
    /// higher limit, calls overlap and each item's echo and outcome are logged
    /// together when the call completes.
    pub async fn run(&self, operation: &dyn RemoteOp) -> RunSummary {
        let _run_guard = self.pipeline.run_lock.lock().await;
        let limit = self.config.pipeline.max_concurrent_calls.max(1);
        let queued = self.queue_len().await;

        tracing::info!(
            operation = %operation.kind(),
            queued,
            max_concurrent_calls = limit,
            "pipeline run started"
        );

        let summary = if limit == 1 {
            self.run_sequential(operation).await
        } else {
            self.run_concurrent(operation, limit).await
        };

        tracing::info!(
            operation = %operation.kind(),
            processed = summary.processed,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "pipeline run finished"
        );
        self.emit_event(Event::RunFinished { summary });
        summary
    }

    /// Cancel every call currently in flight
    ///
    /// Cancelled items are logged as `OutcomeError("Request cancelled")`; the
    /// runner continues with the next queued item. Returns the number of calls
    /// cancelled.
    pub async fn cancel_in_flight(&self) -> usize {
        let active = self.pipeline.active_calls.lock().await;
        for (id, token) in active.iter() {
            tracing::debug!(item_id = id.0, "cancelling in-flight call");
            token.cancel();
        }
        active.len()
    }

    async fn run_sequential(&self, operation: &dyn RemoteOp) -> RunSummary {
        let mut summary = RunSummary::default();
        loop {
            let next = self.pipeline.queue.lock().await.drain_next();
            let Some(item) = next else {
                break;
            };
            let succeeded = self
                .process_item(operation, item, EchoTiming::Immediate)
                .await;
            summary.record(succeeded);
        }
        summary
    }

    async fn run_concurrent(&self, operation: &dyn RemoteOp, limit: usize) -> RunSummary {
        let mut summary = RunSummary::default();
        let mut in_flight = FuturesUnordered::new();

        loop {
            while in_flight.len() < limit {
                let next = self.pipeline.queue.lock().await.drain_next();
                let Some(item) = next else {
                    break;
                };
                in_flight.push(self.process_item(operation, item, EchoTiming::WithOutcome));
            }

            match in_flight.next().await {
                Some(succeeded) => summary.record(succeeded),
                None => break,
            }
        }
        summary
    }

    /// Run one drained item to completion; returns whether it succeeded
    pub(super) async fn process_item(
        &self,
        operation: &dyn RemoteOp,
        item: WorkItem,
        echo: EchoTiming,
    ) -> bool {
        let id = item.id;
        let cancel_token = CancellationToken::new();
        self.pipeline
            .active_calls
            .lock()
            .await
            .insert(id, cancel_token.clone());

        if echo == EchoTiming::Immediate {
            self.log
                .append(
                    id,
                    EntryKind::Echo {
                        label: item.label.clone(),
                    },
                )
                .await;
        }

        tracing::debug!(item_id = id.0, operation = %operation.kind(), label = %item.label, "item started");
        self.emit_event(Event::ItemStarted {
            id,
            operation: operation.kind(),
        });

        let sink = match item.kind() {
            ItemKind::File => self.progress_sink(id),
            ItemKind::Text => ProgressSink::noop(),
        };

        let result = tokio::select! {
            _ = cancel_token.cancelled() => Err(RemoteError::Cancelled),
            result = operation.call(&item.payload, sink) => result,
        };

        self.pipeline.active_calls.lock().await.remove(&id);
        self.clear_progress(id);

        let succeeded = result.is_ok();
        let outcome = self.outcome_entry(&item, result);
        match echo {
            EchoTiming::Immediate => {
                self.log.append(id, outcome).await;
            }
            EchoTiming::WithOutcome => {
                let echo_entry = EntryKind::Echo {
                    label: item.label.clone(),
                };
                self.log.append_all(id, [echo_entry, outcome]).await;
            }
        }

        let status = if succeeded {
            ItemStatus::Done
        } else {
            ItemStatus::Failed
        };
        self.pipeline.queue.lock().await.finish(id, status);

        if succeeded {
            self.emit_event(Event::ItemCompleted { id });
        }
        succeeded
    }

    /// Build the log entry for a finished call and emit `ItemFailed` on error
    fn outcome_entry(
        &self,
        item: &WorkItem,
        result: Result<OperationOutput, RemoteError>,
    ) -> EntryKind {
        match result {
            Ok(output) => EntryKind::Outcome {
                text: output.text,
                source_label: item.label.clone(),
                cases: output.cases,
            },
            Err(e) => {
                let message = e.user_message();
                match &e {
                    RemoteError::Cancelled => {
                        tracing::info!(item_id = item.id.0, "call cancelled");
                    }
                    _ => {
                        tracing::warn!(item_id = item.id.0, error = %e, "remote call failed");
                    }
                }
                self.emit_event(Event::ItemFailed {
                    id: item.id,
                    error: message.clone(),
                });
                EntryKind::OutcomeError {
                    message,
                    source_label: item.label.clone(),
                }
            }
        }
    }

    /// Progress sink that overwrites the item's entry in the progress map
    fn progress_sink(&self, id: ItemId) -> ProgressSink {
        let progress = self.pipeline.progress.clone();
        let event_tx = self.event_tx.clone();
        ProgressSink::new(move |percent| {
            if let Ok(mut map) = progress.write() {
                // Stale updates from a slow body stream must not move the bar backwards
                let entry = map.entry(id).or_insert(0);
                if percent < *entry {
                    return;
                }
                *entry = percent;
            }
            tracing::debug!(item_id = id.0, percent, "upload progress");
            event_tx.send(Event::Progress { id, percent }).ok();
        })
    }

    fn clear_progress(&self, id: ItemId) {
        if let Ok(mut map) = self.pipeline.progress.write() {
            map.remove(&id);
        }
    }
}

impl RunSummary {
    fn record(&mut self, succeeded: bool) {
        self.processed += 1;
        if succeeded {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}
