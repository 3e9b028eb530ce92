// SPDX-License-Identifier: Apache-2.0 OR MIT
//! HTTP handlers.

use std::io::ErrorKind;

use axum::{
    extract::{Path, Query, State},
    response::Html,
    Json,
};
use linetmpl_editor::{render_page, EditorProps, Envelope, InlineEditor};
use linetmpl_engine::{Template, Tree};
use serde::{Deserialize, Serialize};

use crate::errors::ApiError;
use crate::AppState;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Liveness probe.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /:name`: the parsed tree of `<templates>/<name>.tpl`.
pub async fn get_tree(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Envelope<Tree>>, ApiError> {
    let template = load_template(&state, &name).await?;
    let tree = template.tree();
    tracing::debug!(template = %name, nodes = tree.nodes.len(), "serving tree");
    Ok(Json(Envelope { data: tree }))
}

#[derive(Debug, Default, Deserialize)]
pub struct EditorQuery {
    #[serde(default)]
    pub preview: bool,
}

/// `GET /:name/editor`: the inline editor page for a template.
pub async fn get_editor(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<EditorQuery>,
) -> Result<Html<String>, ApiError> {
    let template = load_template(&state, &name).await?;
    let editor = InlineEditor::new(EditorProps {
        text: template.source().to_string(),
        preview: query.preview,
        tree: Some(template.tree()),
        fields: state.fields.as_ref().clone(),
    });
    Ok(Html(render_page(&name, &editor)))
}

async fn load_template(state: &AppState, name: &str) -> Result<Template, ApiError> {
    validate_name(name)?;
    let path = state.templates_dir.join(format!("{name}.tpl"));
    let source = match tokio::fs::read_to_string(&path).await {
        Ok(source) => source,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(ApiError::NotFound(name.to_string()));
        }
        Err(source) => {
            return Err(ApiError::Read {
                name: name.to_string(),
                source,
            });
        }
    };
    Ok(Template::parse_str(name, &source)?)
}

/// Template names map straight onto file names, so anything that could leave
/// the templates directory is rejected.
fn validate_name(name: &str) -> Result<(), ApiError> {
    let invalid = name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(ApiError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
