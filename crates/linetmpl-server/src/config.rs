// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Command line and environment configuration.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;
use linetmpl_editor::DEFAULT_FIELDS;

/// Default port the tree endpoint listens on.
pub const DEFAULT_PORT: u16 = 8070;

/// Serve parsed line templates and the inline editor.
#[derive(Debug, Clone, Parser)]
#[command(name = "linetmpl-server", version, about)]
pub struct Config {
    /// Host to bind to.
    #[arg(long, env = "LINETMPL_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on.
    #[arg(long, env = "LINETMPL_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Directory holding `<name>.tpl` files.
    #[arg(long, env = "LINETMPL_TEMPLATES", default_value = "templates")]
    pub templates: PathBuf,

    /// Field offered by the editor selectors. Repeat for more fields.
    #[arg(long = "field", value_name = "NAME")]
    pub fields: Vec<String>,
}

impl Config {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Configured fields, or the demo set when none were given.
    pub fn fields(&self) -> Vec<String> {
        if self.fields.is_empty() {
            DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect()
        } else {
            self.fields.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_demo_server() {
        let config = Config::try_parse_from(["linetmpl-server"]).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.addr().to_string(), "0.0.0.0:8070");
        assert_eq!(config.templates, PathBuf::from("templates"));
        assert_eq!(config.fields().len(), DEFAULT_FIELDS.len());
    }

    #[test]
    fn repeated_fields_override_defaults() {
        let config = Config::try_parse_from([
            "linetmpl-server",
            "--port",
            "9000",
            "--field",
            "plate",
            "--field",
            "date",
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.fields(), vec!["plate".to_string(), "date".to_string()]);
    }
}
