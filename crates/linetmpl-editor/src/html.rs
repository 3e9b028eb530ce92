// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Static HTML rendering of the editor.

use std::fmt::Write;

use crate::inline::{Control, InlineEditor};

/// Stylesheet matching the class names emitted by [`render_html`].
pub const STYLESHEET: &str = r#".flex-inline { display: flex; flex-wrap: wrap; align-items: center; }
.flex-text input { border: none; border-bottom: 1px dashed #888; background: transparent; font: inherit; }
.flex-node { display: inline-flex; margin: 0 2px; }
.node-box { position: relative; display: inline-flex; align-items: center; border: 1px solid #61dafb; border-radius: 4px; padding: 0 4px; }
.node-close { cursor: pointer; margin-right: 4px; }
.btn-arrow-right { border: none; background: transparent; font: inherit; }
"#;

/// Renders the editor markup: the control row followed by the pattern text.
pub fn render_html(editor: &InlineEditor) -> String {
    let mut out = String::from("<div><div class=\"inline-editor flex-inline\">");
    for control in editor.controls() {
        write_control(&mut out, &control);
    }
    out.push_str("</div>");
    out.push_str(&escape_html(&editor.pattern()));
    out.push_str("</div>");
    out
}

/// Wraps [`render_html`] in a standalone page.
pub fn render_page(title: &str, editor: &InlineEditor) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>\n{}</style>\n</head>\n<body>\n<div class=\"App\">\n<header class=\"App-header\">\n{}\n</header>\n</div>\n</body>\n</html>\n",
        escape_html(title),
        STYLESHEET,
        render_html(editor)
    )
}

fn write_control(out: &mut String, control: &Control) {
    // Writing into a String cannot fail.
    match control {
        Control::TextBox {
            key,
            index,
            value,
            size,
        } => {
            let _ = write!(
                out,
                "<div class=\"flex-text\" data-key=\"{}\"><input type=\"text\" data-index=\"{}\"",
                escape_html(key),
                index
            );
            if *size > 0 {
                let _ = write!(out, " size=\"{}\"", size);
            }
            let _ = write!(out, " value=\"{}\"></div>", escape_html(value));
        }
        Control::FieldSelect {
            key,
            index,
            command,
            options,
        } => {
            let _ = write!(
                out,
                "<div class=\"flex-node\" data-key=\"{}\"><div class=\"node-box\"><a class=\"node-close\" data-index=\"{}\">\u{00d7}</a><select class=\"btn-arrow-right\" data-index=\"{}\" data-command=\"{}\">",
                escape_html(key),
                index,
                index,
                command
            );
            for option in options {
                let value = escape_html(&option.value);
                let _ = write!(out, "<option title=\"{value}\" value=\"{value}\"");
                if option.selected {
                    out.push_str(" selected");
                }
                let _ = write!(out, ">{value}</option>");
            }
            out.push_str("</select></div></div>");
        }
    }
}

/// Escapes text for HTML content and attribute values.
pub fn escape_html(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&#34;"),
            '\'' => output.push_str("&#39;"),
            _ => output.push(ch),
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inline::EditorProps;
    use linetmpl_engine::Template;

    fn editor(source: &str, fields: &[&str]) -> InlineEditor {
        InlineEditor::new(EditorProps {
            text: source.to_string(),
            preview: false,
            tree: Some(Template::parse_str("t", source).unwrap().tree()),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        })
    }

    #[test]
    fn renders_text_and_field_markup() {
        let html = render_html(&editor("/[.年]", &["年", "月"]));
        assert_eq!(
            html,
            "<div><div class=\"inline-editor flex-inline\">\
             <div class=\"flex-text\" data-key=\"node0\"><input type=\"text\" data-index=\"0\" size=\"1\" value=\"/\"></div>\
             <div class=\"flex-node\" data-key=\"node1\"><div class=\"node-box\"><a class=\"node-close\" data-index=\"1\">\u{00d7}</a>\
             <select class=\"btn-arrow-right\" data-index=\"1\" data-command=\"0\">\
             <option title=\"年\" value=\"年\" selected>年</option>\
             <option title=\"月\" value=\"月\">月</option>\
             </select></div></div>\
             </div>/[.年]</div>"
        );
    }

    #[test]
    fn escapes_user_text() {
        let html = render_html(&editor("<b>\"x\"</b>", &[]));
        assert!(html.contains("value=\"&lt;b&gt;&#34;x&#34;&lt;/b&gt;\""));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn empty_text_box_omits_size() {
        let mut ed = editor("a[.b]", &["b"]);
        ed.change_text(0, "");
        let html = render_html(&ed);
        assert!(html.contains("<input type=\"text\" data-index=\"0\" value=\"\">"));
    }

    #[test]
    fn page_wraps_editor() {
        let page = render_page("1 <edit>", &editor("x", &[]));
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<title>1 &lt;edit&gt;</title>"));
        assert!(page.contains(".node-close"));
    }
}
