// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Quote persistence strategies over a [`SpreadsheetApi`].
//!
//! Every save authenticates, writes once, and is never retried. Saves are
//! not idempotent: saving the same project twice yields two rows (append)
//! or two tabs (new tab).

use crate::config::{SheetsConfig, SheetsWriteMode};
use crate::services::sheets::{SheetsError, SpreadsheetApi};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cotizador_core::QuoteRecord;
use std::sync::Arc;

/// Cells covered by the header plus one data row.
const NEW_TAB_CELLS: &str = "A1:H2";

/// Where a quote was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    /// Tab created for the quote (new-tab mode only).
    pub sheet: Option<String>,
    /// Range reported by the spreadsheet service.
    pub range: String,
}

/// Durable sink for finalized quotes.
#[async_trait]
pub trait QuoteStore: Send + Sync {
    async fn save(&self, record: &QuoteRecord) -> Result<SaveReceipt, SheetsError>;
}

/// Appends one row to a fixed range.
pub struct AppendRowStore {
    api: Arc<dyn SpreadsheetApi>,
    range: String,
}

impl AppendRowStore {
    pub fn new(api: Arc<dyn SpreadsheetApi>, range: impl Into<String>) -> Self {
        Self {
            api,
            range: range.into(),
        }
    }
}

#[async_trait]
impl QuoteStore for AppendRowStore {
    async fn save(&self, record: &QuoteRecord) -> Result<SaveReceipt, SheetsError> {
        let token = self.api.authenticate().await?;
        let range = self
            .api
            .append_values(&token, &self.range, vec![record.to_row()])
            .await?;

        tracing::info!(project_id = %record.project_id, range = %range, "Appended quote row");
        Ok(SaveReceipt { sheet: None, range })
    }
}

/// Creates a timestamped tab per quote holding a header and one row.
pub struct NewTabStore {
    api: Arc<dyn SpreadsheetApi>,
}

impl NewTabStore {
    pub fn new(api: Arc<dyn SpreadsheetApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl QuoteStore for NewTabStore {
    async fn save(&self, record: &QuoteRecord) -> Result<SaveReceipt, SheetsError> {
        let token = self.api.authenticate().await?;
        let metadata = self.api.metadata(&token).await?;
        tracing::debug!(
            spreadsheet = %metadata.title,
            tabs = metadata.sheet_titles.len(),
            "Fetched spreadsheet metadata"
        );
        let title = unique_title(tab_title(Utc::now()), &metadata.sheet_titles);

        let sheet = self.api.add_sheet(&token, &title).await?;
        let range = a1_range(&sheet.title, NEW_TAB_CELLS);

        // No rollback: a failed write leaves the new tab empty.
        let updated = self
            .api
            .update_values(&token, &range, vec![QuoteRecord::header_row(), record.to_row()])
            .await
            .inspect_err(|e| {
                tracing::warn!(sheet = %sheet.title, error = %e, "Quote tab created but not written");
            })?;

        tracing::info!(
            project_id = %record.project_id,
            sheet = %sheet.title,
            sheet_id = sheet.sheet_id,
            "Saved quote tab"
        );
        Ok(SaveReceipt {
            sheet: Some(sheet.title),
            range: if updated.is_empty() { range } else { updated },
        })
    }
}

/// Picks the strategy configured by `SHEETS_WRITE_MODE`.
pub fn quote_store(config: &SheetsConfig, api: Arc<dyn SpreadsheetApi>) -> Arc<dyn QuoteStore> {
    match config.write_mode {
        SheetsWriteMode::Append => Arc::new(AppendRowStore::new(api, config.append_range.clone())),
        SheetsWriteMode::NewTab => Arc::new(NewTabStore::new(api)),
    }
}

/// `Presupuesto YYYY-MM-DD HH:MM:SS`.
pub fn tab_title(now: DateTime<Utc>) -> String {
    format!("Presupuesto {}", now.format("%Y-%m-%d %H:%M:%S"))
}

/// Adds a ` (n)` suffix when a tab with `base` already exists.
fn unique_title(base: String, existing: &[String]) -> String {
    if !existing.contains(&base) {
        return base;
    }
    (2..)
        .map(|n| format!("{base} ({n})"))
        .find(|candidate| !existing.contains(candidate))
        .unwrap_or(base)
}

/// A1 range on a tab whose title may contain spaces or quotes.
pub fn a1_range(sheet_title: &str, cells: &str) -> String {
    format!("'{}'!{}", sheet_title.replace('\'', "''"), cells)
}
