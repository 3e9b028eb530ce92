#![forbid(unsafe_code)]
// SPDX-License-Identifier: Apache-2.0 OR MIT
//! HTTP endpoint for line templates.
//!
//! Reads `<name>.tpl` files from a templates directory, parses them with
//! `[`/`]` delimiters and serves the exported tree as `{"data": tree}`. The
//! same tree is also rendered as an inline editor page.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod routes;
pub mod server;

use std::path::PathBuf;
use std::sync::Arc;

pub use config::{Config, DEFAULT_PORT};
pub use server::ApiServer;

/// Application state shared across handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub templates_dir: Arc<PathBuf>,
    /// Fields offered by editor pages.
    pub fields: Arc<Vec<String>>,
}

impl AppState {
    pub fn new(templates_dir: impl Into<PathBuf>, fields: Vec<String>) -> Self {
        Self {
            templates_dir: Arc::new(templates_dir.into()),
            fields: Arc::new(fields),
        }
    }
}
