//! Browser host (web-sys). Everything degrades to "absent" rather than
//! throwing when an API is missing.

use crate::device::EnvProbe;
use crate::media::{MediaHandle, MediaOutcome, PrintTarget};
use crate::pdf::{PdfBlob, PdfOptions, Rasterizer};
use crate::print::{ListenerId, PrintHost};
use crate::storage::DurableStorage;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::future::LocalBoxFuture;
use js_sys::{Array, Function, Object, Promise, Reflect, Uint8Array};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{window, HtmlAnchorElement, HtmlElement, HtmlImageElement};

fn js_err(e: JsValue) -> anyhow::Error {
    let msg = e
        .as_string()
        .or_else(|| {
            Reflect::get(&e, &JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| format!("{e:?}"));
    anyhow!(msg)
}

fn get_fn(obj: &JsValue, name: &str) -> Option<Function> {
    Reflect::get(obj, &JsValue::from_str(name))
        .ok()
        .and_then(|f| f.dyn_into::<Function>().ok())
}

// ----------------------------- localStorage ---------------------------------

#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStorage;

impl LocalStorage {
    fn storage() -> Option<web_sys::Storage> {
        window()?.local_storage().ok().flatten()
    }
}

impl DurableStorage for LocalStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok().flatten()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let storage = Self::storage().ok_or_else(|| anyhow!("localStorage unavailable"))?;
        storage.set_item(key, value).map_err(js_err)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let storage = Self::storage().ok_or_else(|| anyhow!("localStorage unavailable"))?;
        storage.remove_item(key).map_err(js_err)
    }
}

// ------------------------------ window host ---------------------------------

/// `window`/`navigator` signals plus print, share and download.
#[derive(Default)]
pub struct BrowserEnv {
    next_id: Cell<ListenerId>,
    after_print: RefCell<HashMap<ListenerId, Closure<dyn FnMut()>>>,
}

impl BrowserEnv {
    pub fn new() -> Self {
        Self::default()
    }

    fn navigator() -> Option<web_sys::Navigator> {
        window().map(|w| w.navigator())
    }

    fn pdf_file(blob: &PdfBlob) -> Result<web_sys::File> {
        let parts = Array::of1(&Uint8Array::from(blob.bytes.as_slice()));
        let bag = web_sys::FilePropertyBag::new();
        bag.set_type(PdfBlob::MIME);
        web_sys::File::new_with_u8_array_sequence_and_options(&parts, &blob.filename, &bag)
            .map_err(js_err)
    }

    fn object_url(blob: &PdfBlob) -> Result<String> {
        let parts = Array::of1(&Uint8Array::from(blob.bytes.as_slice()));
        let bag = web_sys::BlobPropertyBag::new();
        bag.set_type(PdfBlob::MIME);
        let js_blob =
            web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &bag).map_err(js_err)?;
        web_sys::Url::create_object_url_with_blob(&js_blob).map_err(js_err)
    }

    fn share_data(blob: &PdfBlob) -> Result<Object> {
        let file = Self::pdf_file(blob)?;
        let data = Object::new();
        Reflect::set(&data, &JsValue::from_str("files"), &Array::of1(&file)).map_err(js_err)?;
        Reflect::set(&data, &JsValue::from_str("title"), &JsValue::from_str(&blob.filename))
            .map_err(js_err)?;
        Ok(data)
    }
}

impl EnvProbe for BrowserEnv {
    fn user_agent(&self) -> Option<String> {
        Self::navigator()?.user_agent().ok()
    }

    fn platform(&self) -> Option<String> {
        Self::navigator()?.platform().ok()
    }

    fn max_touch_points(&self) -> Option<u32> {
        let nav = Self::navigator()?;
        Reflect::get(&nav, &JsValue::from_str("maxTouchPoints"))
            .ok()
            .and_then(|v| v.as_f64())
            .map(|n| n.max(0.0) as u32)
    }

    fn has_print(&self) -> bool {
        window().is_some_and(|w| get_fn(&w, "print").is_some())
    }

    fn has_share(&self) -> bool {
        Self::navigator().is_some_and(|n| get_fn(&n, "share").is_some())
    }
}

#[async_trait(?Send)]
impl PrintHost for BrowserEnv {
    fn has_print(&self) -> bool {
        EnvProbe::has_print(self)
    }

    fn scroll_window_to_origin(&self) {
        if let Some(w) = window() {
            w.scroll_to_with_x_and_y(0.0, 0.0);
        }
    }

    fn print(&self) -> Result<()> {
        let w = window().ok_or_else(|| anyhow!("no window"))?;
        w.print().map_err(js_err)
    }

    fn on_after_print(&self, callback: Box<dyn FnOnce()>) -> ListenerId {
        let id = self.next_id.get().wrapping_add(1);
        self.next_id.set(id);
        let closure = Closure::once(move || callback());
        if let Some(w) = window() {
            if let Err(e) =
                w.add_event_listener_with_callback("afterprint", closure.as_ref().unchecked_ref())
            {
                log::warn!("could not listen for afterprint: {:#}", js_err(e));
            }
        }
        self.after_print.borrow_mut().insert(id, closure);
        id
    }

    fn remove_after_print(&self, id: ListenerId) {
        let Some(closure) = self.after_print.borrow_mut().remove(&id) else {
            return;
        };
        if let Some(w) = window() {
            let _ = w.remove_event_listener_with_callback(
                "afterprint",
                closure.as_ref().unchecked_ref(),
            );
        }
        // May be running right now (the listener removes itself); drop it on a later tick.
        wasm_bindgen_futures::spawn_local(async move { drop(closure) });
    }

    fn has_share_api(&self) -> bool {
        EnvProbe::has_share(self)
    }

    fn can_share(&self, blob: &PdfBlob) -> bool {
        let Some(nav) = Self::navigator() else {
            return false;
        };
        let Some(can_share) = get_fn(&nav, "canShare") else {
            return false;
        };
        let Ok(data) = Self::share_data(blob) else {
            return false;
        };
        can_share
            .call1(&nav, &data)
            .ok()
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    async fn share(&self, blob: &PdfBlob) -> Result<()> {
        let nav = Self::navigator().ok_or_else(|| anyhow!("no navigator"))?;
        let share = get_fn(&nav, "share").ok_or_else(|| anyhow!("navigator.share missing"))?;
        let data = Self::share_data(blob)?;
        let promise: Promise = share.call1(&nav, &data).map_err(js_err)?.dyn_into().map_err(js_err)?;
        JsFuture::from(promise).await.map_err(js_err)?;
        Ok(())
    }

    fn can_download(&self) -> bool {
        window().and_then(|w| w.document()).is_some()
    }

    fn download(&self, blob: &PdfBlob) -> Result<()> {
        let document = window()
            .and_then(|w| w.document())
            .ok_or_else(|| anyhow!("no document"))?;
        let (href, object_url) = match Self::object_url(blob) {
            Ok(url) => (url, true),
            Err(e) => {
                log::debug!("object URL unavailable ({e:#}), using a data URL");
                (blob.to_data_url(), false)
            }
        };

        let anchor: HtmlAnchorElement = document
            .create_element("a")
            .map_err(js_err)?
            .dyn_into()
            .map_err(|_| anyhow!("<a> is not an anchor element"))?;
        anchor.set_href(&href);
        anchor.set_download(&blob.filename);
        if let Some(body) = document.body() {
            let _ = body.append_child(&anchor);
            anchor.click();
            let _ = body.remove_child(&anchor);
        } else {
            anchor.click();
        }
        if object_url {
            let _ = web_sys::Url::revoke_object_url(&href);
        }
        Ok(())
    }
}

// ------------------------------- DOM target ---------------------------------

/// The element being printed.
pub struct DomTarget {
    element: HtmlElement,
}

impl DomTarget {
    pub fn new(element: HtmlElement) -> Self {
        DomTarget { element }
    }

    pub fn element(&self) -> &HtmlElement {
        &self.element
    }
}

impl PrintTarget for DomTarget {
    fn scroll_to_origin(&self) {
        self.element.set_scroll_top(0);
        self.element.set_scroll_left(0);
    }

    fn images(&self) -> Vec<Box<dyn MediaHandle>> {
        let Ok(list) = self.element.query_selector_all("img") else {
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|i| list.get(i))
            .filter_map(|node| node.dyn_into::<HtmlImageElement>().ok())
            .map(|img| Box::new(DomImage { img }) as Box<dyn MediaHandle>)
            .collect()
    }

    fn as_any(&self) -> Option<&dyn std::any::Any> {
        Some(self)
    }
}

struct DomImage {
    img: HtmlImageElement,
}

/// `load`/`error` listeners on one image, removed on drop.
struct ImageListeners {
    img: HtmlImageElement,
    handlers: Vec<(&'static str, Closure<dyn FnMut()>)>,
}

impl Drop for ImageListeners {
    fn drop(&mut self) {
        for (event, cb) in &self.handlers {
            let _ = self
                .img
                .remove_event_listener_with_callback(event, cb.as_ref().unchecked_ref());
        }
    }
}

impl MediaHandle for DomImage {
    fn state(&self) -> Option<MediaOutcome> {
        if !self.img.complete() {
            return None;
        }
        // A complete image with no intrinsic size failed to decode.
        Some(if self.img.natural_width() > 0 {
            MediaOutcome::Loaded
        } else {
            MediaOutcome::Failed
        })
    }

    fn settled(&self) -> LocalBoxFuture<'static, MediaOutcome> {
        let img = self.img.clone();
        Box::pin(async move {
            let mut handlers = Vec::with_capacity(2);
            let promise = Promise::new(&mut |resolve, _| {
                for event in ["load", "error"] {
                    let resolve = resolve.clone();
                    let cb = Closure::<dyn FnMut()>::new(move || {
                        let _ = resolve.call1(&JsValue::UNDEFINED, &JsValue::from_str(event));
                    });
                    let _ = img.add_event_listener_with_callback(event, cb.as_ref().unchecked_ref());
                    handlers.push((event, cb));
                }
            });
            // Detached when this future completes or is dropped on timeout.
            let _listeners = ImageListeners { img, handlers };
            match JsFuture::from(promise).await {
                Ok(v) if v.as_string().as_deref() == Some("load") => MediaOutcome::Loaded,
                _ => MediaOutcome::Failed,
            }
        })
    }

    fn describe(&self) -> String {
        format!("img[src={}]", self.img.src())
    }
}

// ------------------------------ html2pdf bridge ------------------------------

/// Drives `window.html2pdf` (html2canvas + jsPDF).
#[derive(Clone, Copy, Debug, Default)]
pub struct Html2PdfBridge;

impl Html2PdfBridge {
    /// `html2pdf().set(opts).from(element)`
    fn worker(target: &dyn PrintTarget, opts: &PdfOptions) -> Result<JsValue> {
        let element = target
            .as_any()
            .and_then(|a| a.downcast_ref::<DomTarget>())
            .map(|t| t.element().clone())
            .ok_or_else(|| anyhow!("print target is not a DOM element"))?;
        let win = window().ok_or_else(|| anyhow!("no window"))?;
        let html2pdf = get_fn(&win, "html2pdf").ok_or_else(|| anyhow!("html2pdf is not loaded"))?;

        let opts_js = js_sys::JSON::parse(&opts.to_json().to_string()).map_err(js_err)?;
        let worker = html2pdf.call0(&win).map_err(js_err)?;
        let set = get_fn(&worker, "set").ok_or_else(|| anyhow!("html2pdf worker has no set()"))?;
        let worker = set.call1(&worker, &opts_js).map_err(js_err)?;
        let from = get_fn(&worker, "from").ok_or_else(|| anyhow!("html2pdf worker has no from()"))?;
        from.call1(&worker, &element).map_err(js_err)
    }

    async fn await_thenable(v: JsValue) -> Result<JsValue> {
        JsFuture::from(Promise::resolve(&v)).await.map_err(js_err)
    }
}

#[async_trait(?Send)]
impl Rasterizer for Html2PdfBridge {
    async fn save(&self, target: &dyn PrintTarget, opts: &PdfOptions) -> Result<()> {
        let worker = Self::worker(target, opts)?;
        let save = get_fn(&worker, "save").ok_or_else(|| anyhow!("html2pdf worker has no save()"))?;
        Self::await_thenable(save.call0(&worker).map_err(js_err)?).await?;
        Ok(())
    }

    async fn render_blob(&self, target: &dyn PrintTarget, opts: &PdfOptions) -> Result<PdfBlob> {
        let worker = Self::worker(target, opts)?;
        let output = get_fn(&worker, "outputPdf")
            .ok_or_else(|| anyhow!("html2pdf worker has no outputPdf()"))?;
        let buf = Self::await_thenable(
            output
                .call1(&worker, &JsValue::from_str("arraybuffer"))
                .map_err(js_err)?,
        )
        .await?;
        let bytes = Uint8Array::new(&buf).to_vec();
        if bytes.is_empty() {
            return Err(anyhow!("html2pdf produced an empty document"));
        }
        Ok(PdfBlob::new(opts.filename.clone(), bytes))
    }
}
