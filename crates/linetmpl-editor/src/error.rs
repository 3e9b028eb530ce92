// SPDX-License-Identifier: Apache-2.0 OR MIT
use thiserror::Error;

/// Errors raised while loading a tree into the editor.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("endpoint returned status {status} for {url}")]
    Status { status: u16, url: String },
    #[error("invalid tree payload: {0}")]
    Decode(#[from] serde_json::Error),
}
