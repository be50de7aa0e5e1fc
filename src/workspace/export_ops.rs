//! Exporting logged outcomes as downloadable artifacts.

use super::Workspace;
use crate::error::{ExportError, Result};
use crate::export::Artifact;
use crate::types::{EntryId, EntryKind};

impl Workspace {
    /// Export an outcome entry's text using the default file stem
    ///
    /// Echo and error entries are not exportable.
    pub async fn export_entry(&self, entry_id: EntryId, tag: &str) -> Result<Artifact> {
        let text = self.outcome_text(entry_id).await?;
        self.export.export(&text, tag).await
    }

    /// Export an outcome entry's text as a summary (`summary_stem`)
    pub async fn export_summary(&self, entry_id: EntryId, tag: &str) -> Result<Artifact> {
        let text = self.outcome_text(entry_id).await?;
        self.export
            .export_named(&text, tag, &self.config.export.summary_stem)
            .await
    }

    /// Export the full text of one retrieved case from a search outcome
    pub async fn export_case(
        &self,
        entry_id: EntryId,
        case_index: usize,
        tag: &str,
    ) -> Result<Artifact> {
        let entry = self.log.entry_at(entry_id).await?;
        let not_exportable = ExportError::NotExportable {
            entry_id: entry_id.0,
        };
        let EntryKind::Outcome { cases, .. } = entry.kind else {
            return Err(not_exportable.into());
        };
        let case = cases.get(case_index).ok_or(not_exportable)?;

        tracing::debug!(entry_id = entry_id.0, case_id = %case.case_id, tag, "exporting case");
        self.export.export(&case.full_text, tag).await
    }

    async fn outcome_text(&self, entry_id: EntryId) -> Result<String> {
        let entry = self.log.entry_at(entry_id).await?;
        entry
            .outcome_text()
            .map(str::to_string)
            .ok_or_else(|| {
                ExportError::NotExportable {
                    entry_id: entry_id.0,
                }
                .into()
            })
    }
}
