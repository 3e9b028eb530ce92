// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Host component: fetches a tree once and feeds it to an [`InlineEditor`].

use async_trait::async_trait;
use linetmpl_engine::Tree;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::EditorError;
use crate::inline::{EditorEvent, EditorProps, InlineEditor};

/// Field names offered by the demo editor.
pub const DEFAULT_FIELDS: &[&str] = &[
    "日期",
    "车牌",
    "年",
    "月",
    "日",
    "违法代码",
    "序号",
    "设备编号",
    "违法行为",
];

/// Pattern shown by the demo editor.
pub const DEFAULT_PATTERN: &str = "/[.日期]/[.车牌]/[.年]/[.月]/[.日]/[.违法代码]_[.序号].jpg";

/// Template fetched by the demo editor.
pub const DEFAULT_TEMPLATE: &str = "1";

/// Response body of the tree endpoint: `{"data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Where the editor gets its tree from.
#[async_trait]
pub trait TreeSource: Send + Sync {
    async fn fetch(&self, name: &str) -> Result<Tree, EditorError>;
}

/// Fetches `GET {base}/{name}` and unwraps the envelope.
#[derive(Debug, Clone)]
pub struct HttpTreeSource {
    client: reqwest::Client,
    base: Url,
}

impl HttpTreeSource {
    pub fn new(base: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base)
    }

    pub fn with_client(client: reqwest::Client, base: Url) -> Self {
        Self { client, base }
    }

    fn url_for(&self, name: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(name);
        }
        url
    }
}

#[async_trait]
impl TreeSource for HttpTreeSource {
    async fn fetch(&self, name: &str) -> Result<Tree, EditorError> {
        let url = self.url_for(name);
        tracing::debug!(%url, "fetching template tree");
        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(EditorError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        let envelope: Envelope<Tree> = response.json().await?;
        Ok(envelope.data)
    }
}

/// Editor host. Starts with an empty tree and fills it on [`App::mount`].
pub struct App<S> {
    source: S,
    template: String,
    editor: InlineEditor,
}

impl<S: TreeSource> App<S> {
    pub fn new(source: S, template: impl Into<String>, fields: Vec<String>, text: impl Into<String>) -> Self {
        let editor = InlineEditor::new(EditorProps {
            text: text.into(),
            preview: false,
            tree: Some(Tree::default()),
            fields,
        });
        Self {
            source,
            template: template.into(),
            editor,
        }
    }

    /// The demo configuration: template `1`, the default fields and pattern.
    pub fn demo(source: S) -> Self {
        Self::new(
            source,
            DEFAULT_TEMPLATE,
            DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect(),
            DEFAULT_PATTERN,
        )
    }

    /// Fetches the tree and hands it to the editor.
    pub async fn mount(&mut self) -> Result<(), EditorError> {
        let tree = self.source.fetch(&self.template).await?;
        tracing::debug!(template = %self.template, nodes = tree.nodes.len(), "tree loaded");
        self.editor.set_tree(tree);
        Ok(())
    }

    /// Replaces the tree with the one carried by an endpoint response body.
    pub fn load(&mut self, body: &[u8]) -> Result<(), EditorError> {
        let tree = decode_envelope(body)?;
        self.editor.set_tree(tree);
        Ok(())
    }

    pub fn editor(&self) -> &InlineEditor {
        &self.editor
    }

    pub fn dispatch(&mut self, event: EditorEvent) -> bool {
        self.editor.dispatch(event)
    }
}

/// Decodes an endpoint response body into the tree it carries.
pub fn decode_envelope(body: &[u8]) -> Result<Tree, EditorError> {
    let envelope: Envelope<Tree> = serde_json::from_slice(body)?;
    Ok(envelope.data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_for_appends_template_name() {
        let source = HttpTreeSource::new(Url::parse("http://localhost:8070/").unwrap());
        assert_eq!(source.url_for("1").as_str(), "http://localhost:8070/1");

        let nested = HttpTreeSource::new(Url::parse("http://localhost:8070/trees").unwrap());
        assert_eq!(nested.url_for("日期").path(), "/trees/%E6%97%A5%E6%9C%9F");
    }

    #[test]
    fn decode_envelope_reads_data() {
        let tree = decode_envelope(br#"{"data":{"name":"1","nodes":[{"nodeType":"TEXT","pos":0,"text":"/"}]}}"#)
            .unwrap();
        assert_eq!(tree.name, "1");
        assert_eq!(tree.nodes.len(), 1);
    }

    struct NoSource;

    #[async_trait]
    impl TreeSource for NoSource {
        async fn fetch(&self, name: &str) -> Result<Tree, EditorError> {
            Err(EditorError::Status {
                status: 404,
                url: name.to_string(),
            })
        }
    }

    #[test]
    fn load_replaces_tree_and_keeps_it_on_error() {
        let mut app = App::demo(NoSource);
        assert!(app.editor().controls().is_empty());

        app.load(br#"{"data":{"nodes":[{"nodeType":"TEXT","pos":0,"text":"/"}]}}"#)
            .unwrap();
        assert_eq!(app.editor().controls().len(), 1);

        assert!(app.load(b"not json").is_err());
        assert_eq!(app.editor().controls().len(), 1);
    }

    #[test]
    fn decode_envelope_rejects_unknown_kinds() {
        let err = decode_envelope(br#"{"data":{"nodes":[{"nodeType":"IF","pos":0}]}}"#).unwrap_err();
        assert!(matches!(err, EditorError::Decode(_)));
    }
}
