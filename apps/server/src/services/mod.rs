// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Service modules: model calls, analysis, staging and persistence.

pub mod analyzer;
pub mod quotes;
pub mod sheets;
pub mod upload;
pub mod vision;

pub use analyzer::Analyzer;
pub use quotes::{quote_store, QuoteStore};
pub use sheets::GoogleSheetsClient;
pub use upload::StagedImage;
pub use vision::OpenAiVisionClient;
