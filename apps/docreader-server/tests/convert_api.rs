//! End-to-end tests for the HTTP surface, driven through the router with
//! `tower::ServiceExt::oneshot`.

use std::io::{Cursor, Write};
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use docreader_server::config::Config;
use docreader_server::envelope::ResponseEncoder;
use docreader_server::fonts::FontResolver;
use docreader_server::routes;
use docreader_server::state::AppState;

fn build_docx(body: &str) -> Vec<u8> {
    use zip::{write::SimpleFileOptions, ZipWriter};

    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
        zip.start_file("word/document.xml", SimpleFileOptions::default())
            .unwrap();
        write!(
            zip,
            r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        )
        .unwrap();
        zip.finish().unwrap();
    }
    buffer
}

/// Router over a fresh content root; fonts come from `font_dirs` only
fn app(root: &TempDir, base_url: &str, fonts: FontResolver) -> Router {
    let mut config = Config::default();
    config.server.base_url = base_url.to_string();
    config.conversion.root_dir = root.path().to_path_buf();
    let state = AppState::with_fonts(config, Arc::new(fonts)).unwrap();
    routes::router(state)
}

fn builtin_fonts() -> FontResolver {
    FontResolver::with_search_paths(Vec::new())
}

const FIXTURE_FONT: &[u8] = include_bytes!("fixtures/fonts/FixtureSans.ttf");

/// Resolver over a directory holding a complete Liberation Sans look-alike
fn fixture_fonts(dir: &TempDir) -> FontResolver {
    for name in ["LiberationSans-Regular.ttf", "LiberationSans-Bold.ttf"] {
        std::fs::write(dir.path().join(name), FIXTURE_FONT).unwrap();
    }
    FontResolver::with_search_paths(vec![dir.path().to_path_buf()])
}

async fn post_convert(app: Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_docx_renders() {
    let root = TempDir::new().unwrap();
    std::fs::write(
        root.path().join("notes.docx"),
        build_docx(r#"<w:p><w:r><w:t>Meeting notes</w:t></w:r></w:p>"#),
    )
    .unwrap();

    let (status, json) = post_convert(
        app(&root, "", builtin_fonts()),
        "/convert",
        r#"{"path": "notes.docx"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["filename"], "notes.pdf");
    let pdf = ResponseEncoder::decode_pdf_data(json["pdf_data"].as_str().unwrap()).unwrap();
    assert!(pdf.starts_with(b"%PDF-"));
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let root = TempDir::new().unwrap();
    let (status, json) = post_convert(
        app(&root, "", builtin_fonts()),
        "/convert",
        r#"{"path": "missing.docx"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert_eq!(json["error_type"], "PathNotFound");
    assert_eq!(json["file_path"], "missing.docx");
    assert!(json["full_path"].is_string());
}

#[tokio::test]
async fn test_spreadsheet_is_unsupported() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("report.xlsx"), b"PK").unwrap();

    let (status, json) = post_convert(
        app(&root, "", builtin_fonts()),
        "/convert",
        r#"{"path": "report.xlsx"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_type"], "UnsupportedFormat");
    assert!(json["error"].as_str().unwrap().contains(".xlsx"));
}

#[tokio::test]
async fn test_format_aliases_are_unsupported() {
    let root = TempDir::new().unwrap();
    for name in ["template.dot", "x.wiz"] {
        std::fs::write(root.path().join(name), b"\xD0\xCF\x11\xE0").unwrap();

        let (status, json) = post_convert(
            app(&root, "", builtin_fonts()),
            "/convert",
            &format!(r#"{{"path": "{}"}}"#, name),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", name);
        assert_eq!(json["error_type"], "UnsupportedFormat");
        assert_eq!(json["file_path"], name);
    }
}

#[tokio::test]
async fn test_declared_media_type_without_extension() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("memo"), r"{\rtf1\ansi Hello\par}").unwrap();

    let (status, json) = post_convert(
        app(&root, "", builtin_fonts()),
        "/convert",
        r#"{"path": "memo", "media_type": "text/rtf"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["filename"], "memo.pdf");

    let (status, json) = post_convert(
        app(&root, "", builtin_fonts()),
        "/convert",
        r#"{"path": "memo"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_type"], "UnsupportedFormat");
}

#[tokio::test]
async fn test_traversal_is_rejected() {
    let outer = TempDir::new().unwrap();
    let root = outer.path().join("root");
    std::fs::create_dir(&root).unwrap();
    std::fs::write(outer.path().join("secret.docx"), build_docx("")).unwrap();

    let mut config = Config::default();
    config.conversion.root_dir = root;
    let state = AppState::with_fonts(config, Arc::new(builtin_fonts())).unwrap();

    let (status, json) = post_convert(
        routes::router(state),
        "/convert",
        r#"{"path": "../secret.docx"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error_type"], "PathNotFound");
}

#[tokio::test]
async fn test_malformed_and_empty_requests() {
    let root = TempDir::new().unwrap();

    let (status, json) =
        post_convert(app(&root, "", builtin_fonts()), "/convert", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_type"], "InvalidRequest");

    let (status, json) =
        post_convert(app(&root, "", builtin_fonts()), "/convert", r#"{"path": "  "}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No file path provided");
}

#[tokio::test]
async fn test_diacritics_with_and_without_unicode_fonts() {
    let root = TempDir::new().unwrap();
    std::fs::write(
        root.path().join("accents.docx"),
        build_docx(r#"<w:p><w:r><w:t>Crème brûlée, Ærøskøbing, Łódź, Ελληνικά</w:t></w:r></w:p>"#),
    )
    .unwrap();

    for fonts in [builtin_fonts(), FontResolver::new(Vec::new())] {
        let (status, json) = post_convert(
            app(&root, "", fonts),
            "/convert",
            r#"{"path": "accents.docx"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
    }
}

#[tokio::test]
async fn test_diacritics_embed_unicode_font() {
    let root = TempDir::new().unwrap();
    let fonts = TempDir::new().unwrap();
    std::fs::write(
        root.path().join("polish.docx"),
        build_docx(r#"<w:p><w:r><w:t>Zażółć gęślą jaźń, Łódź</w:t></w:r></w:p>"#),
    )
    .unwrap();

    let (status, json) = post_convert(
        app(&root, "", fixture_fonts(&fonts)),
        "/convert",
        r#"{"path": "polish.docx"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let pdf = ResponseEncoder::decode_pdf_data(json["pdf_data"].as_str().unwrap()).unwrap();
    let contains = |needle: &[u8]| pdf.windows(needle.len()).any(|w| w == needle);
    assert!(contains(b"/FontFile2"));
    assert!(contains(b"/Identity-H"));
    assert!(contains(b"/LiberationSans"));
    // ż, ź and ł map back to text through the ToUnicode CMap
    assert!(contains(b"<017C>"));
    assert!(contains(b"<017A>"));
    assert!(contains(b"<0142>"));
}

#[tokio::test]
async fn test_base_url_prefix() {
    let root = TempDir::new().unwrap();
    std::fs::write(
        root.path().join("memo.rtf"),
        r"{\rtf1\ansi Hello\par}",
    )
    .unwrap();

    let (status, json) = post_convert(
        app(&root, "/docreader", builtin_fonts()),
        "/docreader/convert",
        r#"{"path": "memo.rtf"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["filename"], "memo.pdf");

    let response = app(&root, "/docreader", builtin_fonts())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/convert")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"path": "memo.rtf"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_reports_fonts() {
    let root = TempDir::new().unwrap();
    let response = app(&root, "", builtin_fonts())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["unicode_fonts"], false);
    assert_eq!(json["font_family"], "Helvetica");
}

#[tokio::test]
async fn test_health_reports_resolved_family() {
    let root = TempDir::new().unwrap();
    let fonts = TempDir::new().unwrap();
    let response = app(&root, "", fixture_fonts(&fonts))
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["unicode_fonts"], true);
    assert_eq!(json["font_family"], "Liberation Sans");
}
