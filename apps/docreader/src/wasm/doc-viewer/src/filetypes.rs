//! File types the viewer registers with the host

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileType {
    pub name: &'static str,
    pub display_name: &'static str,
    pub extensions: Vec<&'static str>,
    pub mime_types: Vec<&'static str>,
    /// Documents are opened as binary content
    pub file_format: &'static str,
    pub read_only: bool,
}

pub fn file_types() -> Vec<FileType> {
    vec![
        FileType {
            name: "docx",
            display_name: "Word Document",
            extensions: vec![".docx"],
            mime_types: vec![
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            ],
            file_format: "base64",
            read_only: true,
        },
        FileType {
            name: "doc",
            display_name: "Word 97-2003 Document",
            extensions: vec![".doc"],
            mime_types: vec!["application/msword"],
            file_format: "base64",
            read_only: true,
        },
        FileType {
            name: "rtf",
            display_name: "Rich Text Document",
            extensions: vec![".rtf"],
            mime_types: vec!["application/rtf", "text/rtf"],
            file_format: "base64",
            read_only: true,
        },
    ]
}

/// Whether the viewer can open `path`, judged by extension
pub fn is_supported(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    file_types()
        .iter()
        .flat_map(|t| t.extensions.iter())
        .any(|ext| lower.ends_with(ext))
}
