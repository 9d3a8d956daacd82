// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Cotizador Core
//!
//! Domain model for furniture cut lists ("despiece") produced by a
//! vision-capable language model.
//!
//! ## Overview
//!
//! - **Measurements**: width/height/depth/material/description as entered
//!   by the user, kept as text end to end
//! - **Prompt building**: a single instruction embedding the measurements
//!   and the exact JSON-array contract the model must answer with
//! - **Extraction**: locating and validating the JSON array inside raw
//!   model text, with a deterministic fallback piece when that fails
//! - **Quotes**: the flat record written to the spreadsheet
//!
//! ## Quick Start
//!
//! ```rust
//! use cotizador_core::{build_prompt, Despiece, Measurements};
//!
//! let measurements = Measurements {
//!     width: "600".into(),
//!     height: "720".into(),
//!     depth: "350".into(),
//!     material: "MDF".into(),
//!     description: "estante simple".into(),
//! };
//! let _prompt = build_prompt(&measurements);
//!
//! let raw = r#"Aquí está: [{"pieza":"Lateral","cantidad":2,"dimensiones":"720x350x18","espesor":"18","corte":"sierra"}]"#;
//! let despiece = Despiece::from_model_output(raw, &measurements);
//! assert!(!despiece.is_fallback());
//! assert_eq!(despiece.pieces[0].quantity, 2);
//! ```

pub mod error;
pub mod extract;
pub mod measurements;
pub mod piece;
pub mod prompt;
pub mod quote;

mod text;

pub use error::ExtractError;
pub use extract::{extract_pieces, Despiece, PieceSource};
pub use measurements::Measurements;
pub use piece::{CutMethod, Piece, FALLBACK_THICKNESS_MM};
pub use prompt::{build_prompt, SYSTEM_PROMPT};
pub use quote::{AnalysisResult, Project, QuoteRecord, PENDING_STATUS, QUOTE_HEADER};
