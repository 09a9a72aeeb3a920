//! Conversion orchestration
//!
//! One request runs resolve -> dispatch -> read -> convert -> encode. The
//! converter is synchronous and CPU bound, so it runs on the blocking pool;
//! the async side only waits for it, optionally with a timeout.

use std::sync::Arc;
use std::time::Duration;

use crate::convert::PageGeometry;
use crate::envelope::{ConversionSuccess, ResponseEncoder};
use crate::error::{ConversionError, Result};
use crate::fonts::FontResolver;
use crate::formats::FormatDispatcher;
use crate::resolver::PathResolver;

pub struct ConversionService {
    resolver: PathResolver,
    fonts: Arc<FontResolver>,
    geometry: PageGeometry,
    timeout: Option<Duration>,
}

impl ConversionService {
    pub fn new(resolver: PathResolver, fonts: Arc<FontResolver>, timeout: Option<Duration>) -> Self {
        Self {
            resolver,
            fonts,
            geometry: PageGeometry::letter(),
            timeout,
        }
    }

    pub fn fonts(&self) -> &Arc<FontResolver> {
        &self.fonts
    }

    /// Convert the document at `requested` (relative to the content root)
    pub async fn convert(&self, requested: &str, media_type: Option<&str>) -> Result<ConversionSuccess> {
        let resolved = self.resolver.resolve(requested)?;
        let format = FormatDispatcher::dispatch(&resolved, media_type)?;
        tracing::info!("Converting {} as {}", resolved.requested, format);

        let fonts = Arc::clone(&self.fonts);
        let geometry = self.geometry;
        let job_path = resolved.clone();
        let job = tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
            let bytes = std::fs::read(&job_path.full_path).map_err(|e| {
                ConversionError::PathNotFound {
                    requested: job_path.requested.clone(),
                    full_path: job_path.full_path.clone(),
                    reason: format!("Failed to read file: {}", e),
                }
            })?;
            tracing::debug!("Read {} bytes from {}", bytes.len(), job_path.full_path.display());

            let chain = fonts.resolve();
            format
                .converter()
                .convert(&bytes, &geometry, &chain)
                .map_err(|e| ConversionError::failure(e).located(&job_path))
        });

        let joined = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, job).await.map_err(|_| {
                ConversionError::Timeout {
                    seconds: limit.as_secs(),
                    location: None,
                }
                .located(&resolved)
            })?,
            None => job.await,
        };

        let pdf = joined
            .map_err(|e| ConversionError::Internal(format!("Conversion task failed: {}", e)))??;

        let success = ResponseEncoder::encode_success(&pdf, &resolved.requested)
            .map_err(|e| e.located(&resolved))?;
        tracing::info!(
            "Converted {} to {} ({} bytes)",
            resolved.requested,
            success.filename,
            pdf.len()
        );
        Ok(success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::docx::tests::build_docx;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> ConversionService {
        ConversionService::new(
            PathResolver::new(dir.path()).unwrap(),
            Arc::new(FontResolver::with_search_paths(Vec::new())),
            Some(Duration::from_secs(60)),
        )
    }

    #[tokio::test]
    async fn test_convert_docx() {
        let dir = TempDir::new().unwrap();
        let body = r#"<w:p><w:r><w:t>Hello from a test</w:t></w:r></w:p>"#;
        std::fs::write(dir.path().join("notes.docx"), build_docx(body, None, &[])).unwrap();

        let success = service(&dir).convert("notes.docx", None).await.unwrap();
        assert!(success.success);
        assert_eq!(success.filename, "notes.pdf");
        let pdf = ResponseEncoder::decode_pdf_data(&success.pdf_data).unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
    }

    #[tokio::test]
    async fn test_convert_rtf_in_subdirectory() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("memos")).unwrap();
        std::fs::write(
            dir.path().join("memos/memo.rtf"),
            r"{\rtf1\ansi {\b Memo}\par Body text\par}",
        )
        .unwrap();

        let success = service(&dir).convert("/memos/memo.rtf", None).await.unwrap();
        assert_eq!(success.filename, "memo.pdf");
    }

    #[tokio::test]
    async fn test_unsupported_is_rejected_before_reading() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("report.xlsx"), b"not really a workbook").unwrap();

        let err = service(&dir).convert("report.xlsx", None).await.unwrap_err();
        assert_eq!(err.error_type(), "UnsupportedFormat");
        assert_eq!(err.requested_path(), Some("report.xlsx"));
    }

    #[tokio::test]
    async fn test_corrupt_document_is_located_failure() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("broken.docx"), b"PK but not really").unwrap();

        let err = service(&dir).convert("broken.docx", None).await.unwrap_err();
        assert_eq!(err.error_type(), "ConversionFailure");
        assert_eq!(err.requested_path(), Some("broken.docx"));
        assert!(err.full_path().is_some());
        assert!(err.trace().is_some());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = service(&dir).convert("missing.docx", None).await.unwrap_err();
        assert_eq!(err.error_type(), "PathNotFound");
        assert_eq!(err.requested_path(), Some("missing.docx"));
    }
}
