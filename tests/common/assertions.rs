//! Event and log assertion helpers

use legalytics_client::{EntryKind, Event, Workspace};
use std::time::Duration;
use tokio::sync::broadcast;

/// Wait for an event matching `predicate`, skipping everything else
///
/// # Panics
/// Panics if no matching event arrives within `timeout`
pub async fn wait_for_event<F>(
    events: &mut broadcast::Receiver<Event>,
    timeout: Duration,
    mut predicate: F,
) -> Event
where
    F: FnMut(&Event) -> bool,
{
    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(event) if predicate(&event) => return event,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    panic!("event channel closed before a matching event")
                }
            }
        }
    })
    .await;

    match result {
        Ok(event) => event,
        Err(_) => panic!("timed out after {:?} waiting for event", timeout),
    }
}

/// Collect every event up to and including the first one matching `stop`
pub async fn collect_events_until<F>(
    events: &mut broadcast::Receiver<Event>,
    timeout: Duration,
    mut stop: F,
) -> Vec<Event>
where
    F: FnMut(&Event) -> bool,
{
    let mut collected = Vec::new();
    let _ = tokio::time::timeout(timeout, async {
        while let Ok(event) = events.recv().await {
            let done = stop(&event);
            collected.push(event);
            if done {
                break;
            }
        }
    })
    .await;
    collected
}

/// One line per log entry, for compact ordering assertions
pub async fn log_lines(workspace: &Workspace) -> Vec<String> {
    workspace
        .log()
        .entries()
        .await
        .into_iter()
        .map(|entry| match entry.kind {
            EntryKind::Echo { label } => format!("echo: {}", label),
            EntryKind::Outcome { text, .. } => format!("outcome: {}", text),
            EntryKind::OutcomeError { message, .. } => format!("error: {}", message),
        })
        .collect()
}
