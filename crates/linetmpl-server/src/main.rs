// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Line template server.
//!
//! # Environment Variables
//!
//! - `LINETMPL_HOST`: Host to bind to (default: 0.0.0.0)
//! - `LINETMPL_PORT`: Port to listen on (default: 8070)
//! - `LINETMPL_TEMPLATES`: Templates directory (default: templates)
//! - `RUST_LOG`: Log level (default: info)

use std::env;

use clap::Parser;
use linetmpl_server::{ApiServer, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let config = Config::parse();
    tracing::info!(
        templates = %config.templates.display(),
        fields = config.fields().len(),
        "starting line template server"
    );

    ApiServer::new(config).serve().await
}
