#![forbid(unsafe_code)]
// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Inline visual editor for line templates.
//!
//! The editor works on the tree exported by `linetmpl-engine`: literal text
//! is edited in place and field references are picked from a fixed list.
//! Rendering is headless ([`InlineEditor::controls`]) or static HTML
//! ([`render_html`]).

mod app;
mod error;
mod html;
mod inline;

pub use app::{
    decode_envelope, App, Envelope, HttpTreeSource, TreeSource, DEFAULT_FIELDS, DEFAULT_PATTERN,
    DEFAULT_TEMPLATE,
};
pub use error::EditorError;
pub use html::{escape_html, render_html, render_page, STYLESHEET};
pub use inline::{Control, EditorEvent, EditorProps, FieldOption, InlineEditor};
