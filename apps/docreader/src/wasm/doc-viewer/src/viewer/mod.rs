//! Viewer lifecycle
//!
//! `Idle -> Loading -> Rendered | Failed`, and `Disposed` from anywhere.
//! A path the viewer does not handle goes straight from `Idle` to `Failed`.
//! There is no way back to `Loading`; a viewer shows one document once.
//! The machine is independent of the DOM: drawing goes through [`Surface`]
//! and object URLs through [`ResourceAllocator`], which the browser glue in
//! `dom` implements.

pub mod panel;

#[cfg(target_arch = "wasm32")]
pub mod dom;

use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;

use crate::envelope::{
    ConversionFailure, ConvertedDocument, DECODE_FAILURE, RENDER_FAILURE, UNSUPPORTED_FORMAT,
};
use crate::filetypes::is_supported;

/// Where the viewer draws
pub trait Surface {
    fn set_html(&mut self, html: &str);
    fn clear(&mut self);
}

#[derive(Debug, Error)]
#[error("Failed to allocate document resource: {0}")]
pub struct AllocationError(pub String);

/// A transient URL for decoded document bytes
#[derive(Debug, PartialEq, Eq)]
pub struct ResourceHandle {
    url: String,
}

impl ResourceHandle {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Creates and releases transient resource handles
pub trait ResourceAllocator {
    fn allocate(&mut self, bytes: &[u8], mime_type: &str) -> Result<ResourceHandle, AllocationError>;

    /// Release a handle; it is consumed so it cannot be released twice
    fn release(&mut self, handle: ResourceHandle);
}

#[derive(Debug, PartialEq)]
pub enum ViewerState {
    Idle,
    Loading,
    Rendered {
        handle: ResourceHandle,
        filename: String,
    },
    Failed(ConversionFailure),
    Disposed,
}

impl ViewerState {
    pub fn name(&self) -> &'static str {
        match self {
            ViewerState::Idle => "idle",
            ViewerState::Loading => "loading",
            ViewerState::Rendered { .. } => "rendered",
            ViewerState::Failed(_) => "failed",
            ViewerState::Disposed => "disposed",
        }
    }
}

pub struct ViewerStateMachine<S: Surface, A: ResourceAllocator> {
    path: String,
    state: ViewerState,
    surface: S,
    allocator: A,
}

impl<S: Surface, A: ResourceAllocator> ViewerStateMachine<S, A> {
    pub fn new(path: impl Into<String>, surface: S, allocator: A) -> Self {
        Self {
            path: path.into(),
            state: ViewerState::Idle,
            surface,
            allocator,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// `Idle -> Loading`; returns whether the caller should send the request
    pub fn open(&mut self) -> bool {
        if self.state != ViewerState::Idle {
            return false;
        }
        if !is_supported(&self.path) {
            self.fail(
                ConversionFailure::new(
                    UNSUPPORTED_FORMAT,
                    format!("Unsupported file type: {}", self.path),
                )
                .with_path(&self.path),
            );
            return false;
        }
        self.surface.set_html(&panel::loading_html(&self.path));
        self.state = ViewerState::Loading;
        log!("Loading {}", self.path);
        true
    }

    /// Apply the conversion outcome; ignored unless loading
    pub fn complete(&mut self, result: Result<ConvertedDocument, ConversionFailure>) {
        if self.state != ViewerState::Loading {
            log!("Ignoring result for {} in state {}", self.path, self.state.name());
            return;
        }

        match result {
            Ok(document) => self.render(document),
            Err(failure) => self.fail(failure),
        }
    }

    fn render(&mut self, document: ConvertedDocument) {
        let bytes = match STANDARD.decode(document.pdf_data.trim()) {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => {
                return self.fail(
                    ConversionFailure::new(DECODE_FAILURE, "Converted document is empty")
                        .with_path(&self.path),
                )
            }
            Err(e) => {
                return self.fail(
                    ConversionFailure::new(
                        DECODE_FAILURE,
                        format!("Failed to decode PDF data: {}", e),
                    )
                    .with_path(&self.path),
                )
            }
        };

        let handle = match self.allocator.allocate(&bytes, "application/pdf") {
            Ok(handle) => handle,
            Err(e) => {
                return self.fail(
                    ConversionFailure::new(RENDER_FAILURE, e.to_string()).with_path(&self.path),
                )
            }
        };

        self.surface
            .set_html(&panel::document_html(handle.url(), &document.filename));
        log!("Rendered {} ({} bytes)", document.filename, bytes.len());
        self.state = ViewerState::Rendered {
            handle,
            filename: document.filename,
        };
    }

    fn fail(&mut self, failure: ConversionFailure) {
        log!("Failed to display {}: [{}] {}", self.path, failure.error_type, failure.error);
        self.surface.set_html(&panel::failure_html(&failure));
        self.state = ViewerState::Failed(failure);
    }

    /// Move to `Disposed`, releasing the resource handle if one is held
    pub fn dispose(&mut self) {
        match std::mem::replace(&mut self.state, ViewerState::Disposed) {
            ViewerState::Disposed => {}
            ViewerState::Rendered { handle, .. } => {
                self.allocator.release(handle);
                self.surface.clear();
            }
            _ => self.surface.clear(),
        }
    }
}
