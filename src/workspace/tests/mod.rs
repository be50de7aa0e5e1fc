use super::test_helpers::*;
use super::*;
use crate::error::{AuthError, Error, ExportError, QueueError, RemoteError, ValidationError};
use crate::remote::OperationOutput;
use crate::types::{EntryId, EntryKind, FileUpload, ItemStatus, LogEntry, RetrievedCase};
use std::time::Duration;


/// Kinds of all log entries, for order assertions
async fn entry_kinds(workspace: &Workspace) -> Vec<EntryKind> {
    workspace
        .log()
        .entries()
        .await
        .into_iter()
        .map(|entry: LogEntry| entry.kind)
        .collect()
}

fn echo(label: &str) -> EntryKind {
    EntryKind::Echo {
        label: label.to_string(),
    }
}

fn outcome(text: &str, label: &str) -> EntryKind {
    EntryKind::Outcome {
        text: text.to_string(),
        source_label: label.to_string(),
        cases: Vec::new(),
    }
}

fn outcome_error(message: &str, label: &str) -> EntryKind {
    EntryKind::OutcomeError {
        message: message.to_string(),
        source_label: label.to_string(),
    }
}
