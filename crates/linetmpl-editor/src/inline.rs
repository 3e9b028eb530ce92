// SPDX-License-Identifier: Apache-2.0 OR MIT
//! The inline editor component.
//!
//! An [`InlineEditor`] owns a fetched [`Tree`] and turns its top-level nodes
//! into a row of [`Control`]s: literal text becomes a text box and every
//! field command inside an action becomes a field selector. Events mutate the
//! tree in place and bump [`InlineEditor::revision`], which hosts treat as a
//! re-render signal.

use linetmpl_engine::{NodeType, Tree};
use linetmpl_engine::tree::Node;
use serde::{Deserialize, Serialize};

/// Inputs of the editor component.
#[derive(Debug, Clone, Default)]
pub struct EditorProps {
    /// Pattern shown under the controls.
    pub text: String,
    /// Show the pattern regenerated from the edited tree instead of `text`.
    pub preview: bool,
    pub tree: Option<Tree>,
    /// Names offered by every field selector.
    pub fields: Vec<String>,
}

/// One rendered control.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Control {
    #[serde(rename_all = "camelCase")]
    TextBox {
        key: String,
        index: usize,
        value: String,
        /// Visible width: the UTF-16 length of `value`.
        size: usize,
    },
    #[serde(rename_all = "camelCase")]
    FieldSelect {
        key: String,
        index: usize,
        command: usize,
        options: Vec<FieldOption>,
    },
}

impl Control {
    pub fn key(&self) -> &str {
        match self {
            Control::TextBox { key, .. } | Control::FieldSelect { key, .. } => key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldOption {
    pub value: String,
    pub selected: bool,
}

/// User interactions the editor reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EditorEvent {
    /// A text box changed.
    #[serde(rename_all = "camelCase")]
    TextChanged { index: usize, value: String },
    /// A field selector picked another field.
    #[serde(rename_all = "camelCase")]
    FieldSelected {
        index: usize,
        command: usize,
        field: String,
    },
    /// The close button of a field box was clicked.
    #[serde(rename_all = "camelCase")]
    NodeRemoved { index: usize },
}

#[derive(Debug, Clone, Default)]
pub struct InlineEditor {
    props: EditorProps,
    revision: u64,
}

impl InlineEditor {
    pub fn new(props: EditorProps) -> Self {
        Self { props, revision: 0 }
    }

    pub fn props(&self) -> &EditorProps {
        &self.props
    }

    pub fn tree(&self) -> Option<&Tree> {
        self.props.tree.as_ref()
    }

    /// Replaces the tree, e.g. once a fetch completes.
    pub fn set_tree(&mut self, tree: Tree) {
        self.props.tree = Some(tree);
        self.touch();
    }

    /// Number of state changes applied so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Builds the controls for every top-level node.
    pub fn controls(&self) -> Vec<Control> {
        let Some(tree) = &self.props.tree else {
            return Vec::new();
        };
        tree.nodes
            .iter()
            .enumerate()
            .flat_map(|(index, node)| self.build_node(node, index))
            .collect()
    }

    /// Dispatches on node kind. Anything other than text and actions renders
    /// nothing.
    pub fn build_node(&self, node: &Node, index: usize) -> Vec<Control> {
        match node.node_type {
            NodeType::Text => vec![self.text_node(node, index)],
            NodeType::Action => self.action_node(node, index),
            _ => Vec::new(),
        }
    }

    fn text_node(&self, node: &Node, index: usize) -> Control {
        let value = node.text.clone().unwrap_or_default();
        Control::TextBox {
            key: node_key(index, 0),
            index,
            size: value.encode_utf16().count(),
            value,
        }
    }

    fn action_node(&self, node: &Node, index: usize) -> Vec<Control> {
        let Some(pipe) = &node.pipe else {
            return Vec::new();
        };
        pipe.cmds
            .iter()
            .enumerate()
            .filter(|(_, cmd)| cmd.node_type == NodeType::Command)
            .filter_map(|(command, cmd)| self.command_node(cmd, index, command))
            .collect()
    }

    fn command_node(&self, cmd: &Node, index: usize, command: usize) -> Option<Control> {
        let first = cmd.args.first()?;
        tracing::trace!(index, command, kind = first.node_type.as_str(), "command operand");
        match first.node_type {
            NodeType::Field => Some(self.field_node(first, index, command)),
            _ => None,
        }
    }

    fn field_node(&self, node: &Node, index: usize, command: usize) -> Control {
        let ident = node.ident.first();
        let options = self
            .props
            .fields
            .iter()
            .map(|field| FieldOption {
                value: field.clone(),
                selected: Some(field) == ident,
            })
            .collect();
        Control::FieldSelect {
            key: node_key(index, command),
            index,
            command,
            options,
        }
    }

    /// Applies one event. Returns whether the tree changed.
    pub fn dispatch(&mut self, event: EditorEvent) -> bool {
        match event {
            EditorEvent::TextChanged { index, value } => self.change_text(index, value),
            EditorEvent::FieldSelected {
                index,
                command,
                field,
            } => self.select_field(index, command, field),
            EditorEvent::NodeRemoved { index } => self.remove_node(index).is_some(),
        }
    }

    /// Sets the text of the text node at `index`.
    pub fn change_text(&mut self, index: usize, value: impl Into<String>) -> bool {
        let Some(node) = self.node_mut(index) else {
            return false;
        };
        if node.node_type != NodeType::Text {
            tracing::warn!(index, kind = node.node_type.as_str(), "text change on non-text node ignored");
            return false;
        }
        node.text = Some(value.into());
        self.touch();
        true
    }

    /// Points the field operand of command `command` in the action at `index`
    /// to `field`.
    pub fn select_field(&mut self, index: usize, command: usize, field: impl Into<String>) -> bool {
        let field = field.into();
        let target = self
            .node_mut(index)
            .filter(|node| node.node_type == NodeType::Action)
            .and_then(|node| node.pipe.as_deref_mut())
            .and_then(|pipe| pipe.cmds.get_mut(command))
            .and_then(|cmd| cmd.args.first_mut())
            .filter(|operand| operand.node_type == NodeType::Field);
        let Some(operand) = target else {
            tracing::warn!(index, command, %field, "field selection on non-field node ignored");
            return false;
        };
        operand.ident = vec![field];
        self.touch();
        true
    }

    /// Removes the top-level node at `index`.
    pub fn remove_node(&mut self, index: usize) -> Option<Node> {
        let tree = self.props.tree.as_mut()?;
        if index >= tree.nodes.len() {
            tracing::warn!(index, len = tree.nodes.len(), "remove of missing node ignored");
            return None;
        }
        let removed = tree.nodes.remove(index);
        self.touch();
        Some(removed)
    }

    /// Text displayed under the controls.
    pub fn pattern(&self) -> String {
        match (&self.props.tree, self.props.preview) {
            (Some(tree), true) => tree.to_template_string(),
            _ => self.props.text.clone(),
        }
    }

    fn node_mut(&mut self, index: usize) -> Option<&mut Node> {
        let node = self
            .props
            .tree
            .as_mut()
            .and_then(|tree| tree.nodes.get_mut(index));
        if node.is_none() {
            tracing::warn!(index, "event for missing node ignored");
        }
        node
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

fn node_key(index: usize, command: usize) -> String {
    if command == 0 {
        format!("node{index}")
    } else {
        format!("node{index}-{command}")
    }
}
