//! JS -> Rust surface for the DOM frontend.
//!
//! JS side:
//!   import init, { WasmComparison, WasmPrinter } from "./partsx.js";
//!   const list = new WasmComparison();
//!   list.on_change(() => render(JSON.parse(list.snapshot_json())));
//!   list.handle_action_json(JSON.stringify({ type: "Add", item: { id: 12, title: "Brake pads" } }));
//!
//!   const printer = new WasmPrinter();
//!   await printer.print(document.getElementById("quote"), JSON.stringify({ filename: "quote" }));

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Function, Promise, Uint8Array};
use serde::Deserialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::HtmlElement;

use crate::compare_store::{ComparisonStore, ScopedSubscription, StoreOptions};
use crate::config::Config;
use crate::device::{classify_device, DeviceProfile};
use crate::platform::{self, BrowserEnv, DomTarget, Html2PdfBridge, LocalStorage};
use crate::print::{PrintCallbacks, PrintError, PrintHost, PrintOutcome, PrintPipeline};
use crate::types::{CompareItem, Orientation, PageSize, PrintRequest};
use crate::watch::{apply_action, CollectionWatch, ComparisonAction, ComparisonSnapshot};
use crate::{debug, CollectionStore};

#[wasm_bindgen(start)]
pub fn wasm_start() {
    platform::install_panic_hook();
    platform::init_logging(log::Level::Info);
    debug::init_once();
}

// ---------------------------------------------------------------------------
// Comparison list
// ---------------------------------------------------------------------------

#[wasm_bindgen]
pub struct WasmComparison {
    store: Rc<ComparisonStore<CompareItem, LocalStorage>>,
    watch: CollectionWatch<CompareItem>,
    js_listeners: RefCell<Vec<ScopedSubscription>>,
}

#[wasm_bindgen]
impl WasmComparison {
    /// `favorites = true` opens the saved-for-later list instead.
    #[wasm_bindgen(constructor)]
    pub fn new(favorites: Option<bool>) -> WasmComparison {
        let options = if favorites.unwrap_or(false) {
            StoreOptions::favorites()
        } else {
            Config::default().store_options()
        };
        let store = Rc::new(ComparisonStore::with_options(LocalStorage, options));
        let watch = CollectionWatch::new(store.clone() as Rc<dyn CollectionStore<CompareItem>>);
        WasmComparison {
            store,
            watch,
            js_listeners: RefCell::new(Vec::new()),
        }
    }

    #[wasm_bindgen]
    pub fn snapshot_json(&self) -> String {
        let snap = ComparisonSnapshot::from_watch(&self.watch);
        serde_json::to_string(&snap).unwrap_or_else(|e| {
            log::error!("Failed to serialize ComparisonSnapshot: {e}");
            "{}".to_string()
        })
    }

    /// Apply a JSON-encoded `ComparisonAction` and return the new snapshot.
    #[wasm_bindgen]
    pub fn handle_action_json(&self, action_json: String) -> String {
        match serde_json::from_str::<ComparisonAction>(&action_json) {
            Ok(action) => {
                if !apply_action(self.store.as_ref(), action) {
                    log::info!("comparison list rejected add (full or duplicate)");
                }
            }
            Err(e) => log::warn!("Failed to deserialize ComparisonAction ({e}): {action_json:?}"),
        }
        self.snapshot_json()
    }

    #[wasm_bindgen]
    pub fn is_in_comparison(&self, id: String) -> bool {
        self.store.is_in_comparison(&id.into())
    }

    /// Call `callback()` after every change. Listeners live until
    /// `clear_listeners` or until this object is freed.
    #[wasm_bindgen]
    pub fn on_change(&self, callback: Function) {
        let sub = self
            .store
            .subscribe_scoped(Rc::new(move || {
                if let Err(e) = callback.call0(&JsValue::NULL) {
                    log::warn!("comparison listener threw: {e:?}");
                }
            }));
        self.js_listeners.borrow_mut().push(sub);
    }

    #[wasm_bindgen]
    pub fn clear_listeners(&self) {
        self.js_listeners.borrow_mut().clear();
    }

    /// Re-read localStorage, e.g. after a `storage` event from another tab.
    #[wasm_bindgen]
    pub fn reload(&self) {
        self.store.reload();
    }
}

// ---------------------------------------------------------------------------
// Printing
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsPrintRequest {
    #[serde(default)]
    filename: String,
    page_size: Option<PageSize>,
    orientation: Option<Orientation>,
}

impl JsPrintRequest {
    fn parse(json: Option<String>) -> PrintRequest {
        let req = json
            .filter(|s| !s.trim().is_empty())
            .and_then(|s| match serde_json::from_str::<JsPrintRequest>(&s) {
                Ok(r) => Some(r),
                Err(e) => {
                    log::warn!("Failed to deserialize print request ({e}): {s:?}");
                    None
                }
            })
            .unwrap_or_default();
        PrintRequest::new(req.filename)
            .page_size(req.page_size.unwrap_or_default())
            .orientation(req.orientation.unwrap_or_default())
    }
}

fn js_callbacks(on_complete: Option<Function>, on_error: Option<Function>) -> PrintCallbacks {
    let mut callbacks = PrintCallbacks::new();
    if let Some(f) = on_complete {
        callbacks = callbacks.on_complete(move || {
            let _ = f.call0(&JsValue::NULL);
        });
    }
    if let Some(f) = on_error {
        callbacks = callbacks.on_error(move |err: &PrintError| {
            let _ = f.call1(&JsValue::NULL, &JsValue::from_str(&err.to_string()));
        });
    }
    callbacks
}

fn outcome_name(outcome: &PrintOutcome) -> &'static str {
    match outcome {
        PrintOutcome::Native => "native",
        PrintOutcome::Rasterized => "rasterized",
        PrintOutcome::NativeFallback => "native-fallback",
        PrintOutcome::Failed(_) => "failed",
    }
}

#[wasm_bindgen]
pub struct WasmPrinter {
    pipeline: Rc<PrintPipeline<BrowserEnv, Html2PdfBridge>>,
}

#[wasm_bindgen]
impl WasmPrinter {
    #[wasm_bindgen(constructor)]
    #[allow(clippy::new_without_default)]
    pub fn new() -> WasmPrinter {
        let cfg = Config::default();
        let host = Rc::new(BrowserEnv::new());
        let profile = DeviceProfile::new(classify_device(), PrintHost::has_print(host.as_ref()));
        log::info!(
            "print path: {} (device {})",
            if profile.is_pdf_mode { "pdf" } else { "native" },
            profile.device_type
        );
        let pipeline = PrintPipeline::new(host, Html2PdfBridge, profile)
            .with_timing(cfg.pipeline_timing())
            .with_margin_mm(cfg.margin_mm);
        WasmPrinter {
            pipeline: Rc::new(pipeline),
        }
    }

    /// `{ deviceType, isPDFMode, nativePrint }`
    #[wasm_bindgen]
    pub fn device_json(&self) -> String {
        serde_json::to_string(&self.pipeline.profile()).unwrap_or_else(|_| "{}".to_string())
    }

    #[wasm_bindgen]
    pub fn progress(&self) -> u8 {
        self.pipeline.progress()
    }

    #[wasm_bindgen]
    pub fn is_generating(&self) -> bool {
        self.pipeline.is_generating()
    }

    /// Call `callback(progress)` on every progress change.
    #[wasm_bindgen]
    pub fn on_progress(&self, callback: Function) {
        self.pipeline.observe_progress(move |p| {
            let _ = callback.call1(&JsValue::NULL, &JsValue::from(p));
        });
    }

    /// Resolves to "native", "rasterized", "native-fallback" or "failed".
    #[wasm_bindgen]
    pub fn print(
        &self,
        element: HtmlElement,
        request_json: Option<String>,
        on_complete: Option<Function>,
        on_error: Option<Function>,
    ) -> Promise {
        let pipeline = self.pipeline.clone();
        let request = JsPrintRequest::parse(request_json);
        let callbacks = js_callbacks(on_complete, on_error);
        future_to_promise(async move {
            let target = DomTarget::new(element);
            let outcome = pipeline.print(&target, &request, &callbacks).await;
            Ok(JsValue::from_str(outcome_name(&outcome)))
        })
    }

    /// Resolves to "shared" or "downloaded"; rejects with the error message.
    #[wasm_bindgen]
    pub fn share(
        &self,
        element: HtmlElement,
        request_json: Option<String>,
        on_complete: Option<Function>,
        on_error: Option<Function>,
    ) -> Promise {
        let pipeline = self.pipeline.clone();
        let request = JsPrintRequest::parse(request_json);
        let callbacks = js_callbacks(on_complete, on_error);
        future_to_promise(async move {
            let target = DomTarget::new(element);
            match pipeline.share(&target, &request, &callbacks).await {
                Ok(crate::print::ShareOutcome::Shared) => Ok(JsValue::from_str("shared")),
                Ok(crate::print::ShareOutcome::Downloaded) => Ok(JsValue::from_str("downloaded")),
                Err(e) => Err(JsValue::from_str(&e.to_string())),
            }
        })
    }

    /// Resolves to a `Uint8Array` holding the PDF bytes.
    #[wasm_bindgen]
    pub fn get_blob(&self, element: HtmlElement, request_json: Option<String>) -> Promise {
        let pipeline = self.pipeline.clone();
        let request = JsPrintRequest::parse(request_json);
        future_to_promise(async move {
            let target = DomTarget::new(element);
            match pipeline.get_blob(&target, &request).await {
                Ok(blob) => Ok(Uint8Array::from(blob.bytes.as_slice()).into()),
                Err(e) => Err(JsValue::from_str(&e.to_string())),
            }
        })
    }

    /// Drop the pending `afterprint` listener, e.g. when the view unmounts.
    #[wasm_bindgen]
    pub fn teardown(&self) {
        self.pipeline.teardown();
    }
}
