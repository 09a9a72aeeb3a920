//! DocReader server library
//!
//! In-memory conversion of word-processing documents (DOCX, DOC, RTF) to PDF
//! for the document viewer. The binary in `main.rs` only wires configuration,
//! logging and the listener around [`routes::router`].
//!
//! # Modules
//!
//! - `resolver`: content-root path validation
//! - `fonts`: Unicode font discovery and the fallback chain
//! - `formats`: format dispatch and the DOCX/DOC/RTF parsers
//! - `document`: format-neutral document model
//! - `render`: layout and PDF writing
//! - `envelope`: JSON transport envelope
//! - `service`: per-request orchestration

pub mod config;
pub mod convert;
pub mod document;
pub mod envelope;
pub mod error;
pub mod fonts;
pub mod formats;
pub mod render;
pub mod resolver;
pub mod routes;
pub mod service;
pub mod state;
