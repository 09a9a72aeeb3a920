//! HTML fragments for each viewer state
//!
//! Every piece of text that came from the document path or the server is
//! escaped before it is placed in markup.

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::envelope::ConversionFailure;

pub fn loading_html(path: &str) -> String {
    format!(
        r#"<div class="docreader-loading"><div class="docreader-spinner"></div><p>Converting {}&hellip;</p></div>"#,
        encode_text(path)
    )
}

pub fn document_html(url: &str, filename: &str) -> String {
    format!(
        r#"<iframe class="docreader-frame" src="{}" title="{}" style="width:100%;height:100%;border:none"></iframe>"#,
        encode_double_quoted_attribute(url),
        encode_double_quoted_attribute(filename)
    )
}

pub fn failure_html(failure: &ConversionFailure) -> String {
    let mut html = String::from(r#"<div class="docreader-error">"#);
    html.push_str(&format!(
        r#"<h3>Failed to display document</h3><p class="docreader-error-type">{}</p><p class="docreader-error-message">{}</p>"#,
        encode_text(&failure.error_type),
        encode_text(&failure.error)
    ));

    if failure.file_path.is_some() || failure.full_path.is_some() {
        html.push_str(r#"<div class="docreader-error-paths">"#);
        if let Some(path) = &failure.file_path {
            html.push_str(&format!(
                "<p><strong>File:</strong> <code>{}</code></p>",
                encode_text(path)
            ));
        }
        if let Some(path) = &failure.full_path {
            html.push_str(&format!(
                "<p><strong>Resolved path:</strong> <code>{}</code></p>",
                encode_text(path)
            ));
        }
        html.push_str("</div>");
    }

    if let Some(trace) = &failure.traceback {
        html.push_str(&format!(
            "<details><summary>Technical details</summary><pre>{}</pre></details>",
            encode_text(trace)
        ));
    }

    html.push_str("</div>");
    html
}
