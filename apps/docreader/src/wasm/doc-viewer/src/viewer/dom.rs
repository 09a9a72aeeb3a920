//! Browser glue: DOM surface, Blob object URLs and the `DocViewer` widget

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use js_sys::{Array, Function, Reflect, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Blob, BlobPropertyBag, Element, Url};

use super::{AllocationError, ResourceAllocator, ResourceHandle, Surface, ViewerStateMachine};
use crate::transport::{resolve_endpoint, HttpTransport, TransportClient};

/// Draws into a host-provided container element
pub struct ElementSurface {
    element: Element,
}

impl ElementSurface {
    pub fn new(element: Element) -> Self {
        Self { element }
    }
}

impl Surface for ElementSurface {
    fn set_html(&mut self, html: &str) {
        self.element.set_inner_html(html);
    }

    fn clear(&mut self) {
        self.element.set_inner_html("");
    }
}

/// `Blob` + `URL.createObjectURL`
#[derive(Default)]
pub struct BlobUrlAllocator;

impl ResourceAllocator for BlobUrlAllocator {
    fn allocate(&mut self, bytes: &[u8], mime_type: &str) -> Result<ResourceHandle, AllocationError> {
        let parts = Array::new();
        parts.push(&Uint8Array::from(bytes));

        let options = BlobPropertyBag::new();
        options.set_type(mime_type);

        let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options)
            .map_err(|e| AllocationError(js_error(&e)))?;
        let url = Url::create_object_url_with_blob(&blob).map_err(|e| AllocationError(js_error(&e)))?;
        Ok(ResourceHandle::new(url))
    }

    fn release(&mut self, handle: ResourceHandle) {
        if let Err(e) = Url::revoke_object_url(handle.url()) {
            log!("Failed to revoke {}: {}", handle.url(), js_error(&e));
        }
    }
}

fn js_error(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{:?}", value))
}

type Machine = ViewerStateMachine<ElementSurface, BlobUrlAllocator>;

/// Viewer widget for one document
///
/// ```js
/// const viewer = new DocViewer(container, { path: "notes.docx", onDispose }, "/convert");
/// ```
///
/// Freeing the viewer disposes it as well.
#[wasm_bindgen]
pub struct DocViewer {
    machine: Rc<RefCell<Machine>>,
}

#[wasm_bindgen]
impl DocViewer {
    /// Open `context.path` in `container`, converting it through `endpoint`
    ///
    /// When the context has an `onDispose(callback)` function the viewer
    /// subscribes to it and disposes itself when the host closes the document.
    #[wasm_bindgen(constructor)]
    pub fn new(container: Element, context: JsValue, endpoint: String) -> Result<DocViewer, JsValue> {
        let path = Reflect::get(&context, &JsValue::from_str("path"))?
            .as_string()
            .ok_or_else(|| JsValue::from_str("Document context has no path"))?;

        let machine = Rc::new(RefCell::new(ViewerStateMachine::new(
            path.clone(),
            ElementSurface::new(container),
            BlobUrlAllocator,
        )));

        let subscribe = Reflect::get(&context, &JsValue::from_str("onDispose"))?;
        if let Some(subscribe) = subscribe.dyn_ref::<Function>() {
            // the host may fire the callback after the viewer was freed
            let target: Weak<RefCell<Machine>> = Rc::downgrade(&machine);
            let callback = Closure::wrap(Box::new(move || {
                if let Some(machine) = target.upgrade() {
                    machine.borrow_mut().dispose();
                }
            }) as Box<dyn FnMut()>);
            subscribe.call1(&context, &callback.into_js_value())?;
        }

        let origin = web_sys::window()
            .and_then(|w| w.location().origin().ok())
            .unwrap_or_default();
        let client = TransportClient::new(HttpTransport::new(), resolve_endpoint(&endpoint, &origin));

        if machine.borrow_mut().open() {
            let target = Rc::clone(&machine);
            wasm_bindgen_futures::spawn_local(async move {
                let result = client.convert(&path).await;
                target.borrow_mut().complete(result);
            });
        }

        Ok(DocViewer { machine })
    }

    /// Current state name: idle, loading, rendered, failed or disposed
    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        self.machine.borrow().state().name().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn path(&self) -> String {
        self.machine.borrow().path().to_string()
    }

    /// Release the document; safe to call more than once
    pub fn dispose(&self) {
        self.machine.borrow_mut().dispose();
    }
}

impl Drop for DocViewer {
    fn drop(&mut self) {
        if let Ok(mut machine) = self.machine.try_borrow_mut() {
            machine.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use js_sys::Object;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    /// Nothing listens here; requests fail after the assertions ran
    const ENDPOINT: &str = "http://127.0.0.1:9/convert";

    fn container() -> Element {
        web_sys::window()
            .and_then(|w| w.document())
            .unwrap()
            .create_element("div")
            .unwrap()
    }

    /// `{ path, onDispose }` whose `onDispose` keeps the callback as `captured`
    fn context(path: &str) -> JsValue {
        let context = Object::new();
        Reflect::set(&context, &"path".into(), &path.into()).unwrap();
        let subscribe = Function::new_with_args("callback", "this.captured = callback;");
        Reflect::set(&context, &"onDispose".into(), &subscribe).unwrap();
        context.into()
    }

    fn fire_dispose(context: &JsValue) {
        let callback: Function = Reflect::get(context, &"captured".into())
            .unwrap()
            .dyn_into()
            .unwrap();
        callback.call0(&JsValue::NULL).unwrap();
    }

    #[wasm_bindgen_test]
    fn test_blob_url_allocate_and_release() {
        let mut allocator = BlobUrlAllocator;
        let handle = allocator
            .allocate(b"%PDF-1.7 test", "application/pdf")
            .unwrap();
        assert!(handle.url().starts_with("blob:"));
        allocator.release(handle);
    }

    #[wasm_bindgen_test]
    fn test_host_dispose_callback() {
        let element = container();
        let context = context("notes.docx");
        let viewer = DocViewer::new(element.clone(), context.clone(), ENDPOINT.into()).unwrap();
        assert_eq!(viewer.state(), "loading");
        assert_eq!(viewer.path(), "notes.docx");
        assert!(element.inner_html().contains("notes.docx"));

        fire_dispose(&context);
        assert_eq!(viewer.state(), "disposed");
        assert_eq!(element.inner_html(), "");
    }

    #[wasm_bindgen_test]
    fn test_dispose_callback_after_free_is_harmless() {
        let element = container();
        let context = context("notes.docx");
        let viewer = DocViewer::new(element.clone(), context.clone(), ENDPOINT.into()).unwrap();

        drop(viewer);
        assert_eq!(element.inner_html(), "");
        fire_dispose(&context);
    }

    #[wasm_bindgen_test]
    fn test_context_without_path_is_rejected() {
        let context: JsValue = Object::new().into();
        assert!(DocViewer::new(container(), context, ENDPOINT.into()).is_err());
    }

    #[wasm_bindgen_test]
    fn test_unsupported_path_fails_immediately() {
        let element = container();
        let viewer = DocViewer::new(element.clone(), context("sheet.xlsx"), ENDPOINT.into()).unwrap();
        assert_eq!(viewer.state(), "failed");
        assert!(element.inner_html().contains("UnsupportedFormat"));
    }
}
