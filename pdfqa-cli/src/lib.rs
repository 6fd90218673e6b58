//! # pdfqa-cli
//!
//! Command-line front end for [`pdfqa_rag`]: ingest PDFs, ask questions,
//! chat interactively, and manage the persisted index.

pub mod app;
pub mod commands;
pub mod settings;

pub use app::App;
pub use commands::{Cli, Command, run};
pub use settings::Settings;
