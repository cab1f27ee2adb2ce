//! Test doubles for the print pipeline: a scriptable host, rasterizer and
//! print target with fake images.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::future::{self, LocalBoxFuture};
use partsx::media::{MediaHandle, MediaOutcome, PrintTarget};
use partsx::pdf::{PdfBlob, PdfOptions, Rasterizer};
use partsx::print::{ListenerId, PrintHost};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

// ------------------------------- host ---------------------------------------

#[derive(Default)]
pub struct FakeHost {
    pub has_print: Cell<bool>,
    pub print_fails: Cell<bool>,
    /// Fire `afterprint` from inside `print()`, as a browser does once the dialog closes.
    pub auto_after_print: Cell<bool>,
    pub share_api: Cell<bool>,
    pub share_files: Cell<bool>,
    pub share_fails: Cell<bool>,
    pub downloads_allowed: Cell<bool>,

    pub print_calls: Cell<usize>,
    pub window_scrolls: Cell<usize>,
    pub removed: RefCell<Vec<ListenerId>>,
    pub shared: RefCell<Vec<String>>,
    pub downloaded: RefCell<Vec<String>>,

    next_id: Cell<ListenerId>,
    listeners: RefCell<Vec<(ListenerId, Box<dyn FnOnce()>)>>,
}

impl FakeHost {
    /// A desktop browser: print works, no share sheet, downloads allowed.
    pub fn desktop() -> Rc<Self> {
        let host = FakeHost::default();
        host.has_print.set(true);
        host.auto_after_print.set(true);
        host.downloads_allowed.set(true);
        Rc::new(host)
    }

    /// A phone browser with a file-capable share sheet.
    pub fn mobile() -> Rc<Self> {
        let host = FakeHost::default();
        host.has_print.set(true);
        host.auto_after_print.set(true);
        host.share_api.set(true);
        host.share_files.set(true);
        host.downloads_allowed.set(true);
        Rc::new(host)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Dispatch `afterprint` to every registered listener.
    pub fn fire_after_print(&self) {
        let pending = std::mem::take(&mut *self.listeners.borrow_mut());
        for (_, cb) in pending {
            cb();
        }
    }
}

#[async_trait(?Send)]
impl PrintHost for FakeHost {
    fn has_print(&self) -> bool {
        self.has_print.get()
    }

    fn scroll_window_to_origin(&self) {
        self.window_scrolls.set(self.window_scrolls.get() + 1);
    }

    fn print(&self) -> Result<()> {
        self.print_calls.set(self.print_calls.get() + 1);
        if self.print_fails.get() {
            return Err(anyhow!("print() threw"));
        }
        if self.auto_after_print.get() {
            self.fire_after_print();
        }
        Ok(())
    }

    fn on_after_print(&self, callback: Box<dyn FnOnce()>) -> ListenerId {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.listeners.borrow_mut().push((id, callback));
        id
    }

    fn remove_after_print(&self, id: ListenerId) {
        self.removed.borrow_mut().push(id);
        self.listeners.borrow_mut().retain(|(l, _)| *l != id);
    }

    fn has_share_api(&self) -> bool {
        self.share_api.get()
    }

    fn can_share(&self, _blob: &PdfBlob) -> bool {
        self.share_files.get()
    }

    async fn share(&self, blob: &PdfBlob) -> Result<()> {
        if self.share_fails.get() {
            return Err(anyhow!("AbortError: share canceled"));
        }
        self.shared.borrow_mut().push(blob.filename.clone());
        Ok(())
    }

    fn can_download(&self) -> bool {
        self.downloads_allowed.get()
    }

    fn download(&self, blob: &PdfBlob) -> Result<()> {
        self.downloaded.borrow_mut().push(blob.filename.clone());
        Ok(())
    }
}

// ----------------------------- rasterizer -----------------------------------

/// Clones share state so the test keeps a handle after the pipeline takes one.
#[derive(Clone, Default)]
pub struct FakeRasterizer {
    pub fail: Rc<Cell<bool>>,
    pub saved: Rc<RefCell<Vec<PdfOptions>>>,
    pub rendered: Rc<Cell<usize>>,
}

impl FakeRasterizer {
    pub fn failing() -> Self {
        let r = FakeRasterizer::default();
        r.fail.set(true);
        r
    }
}

#[async_trait(?Send)]
impl Rasterizer for FakeRasterizer {
    async fn save(&self, _target: &dyn PrintTarget, opts: &PdfOptions) -> Result<()> {
        if self.fail.get() {
            return Err(anyhow!("canvas is tainted"));
        }
        self.saved.borrow_mut().push(opts.clone());
        Ok(())
    }

    async fn render_blob(&self, _target: &dyn PrintTarget, opts: &PdfOptions) -> Result<PdfBlob> {
        if self.fail.get() {
            return Err(anyhow!("canvas is tainted"));
        }
        self.rendered.set(self.rendered.get() + 1);
        Ok(PdfBlob::new(opts.filename.clone(), b"%PDF-1.7\n%%EOF".to_vec()))
    }
}

// ------------------------------- target -------------------------------------

#[derive(Clone, Copy, Debug)]
pub enum Image {
    /// Already complete when inspected.
    Ready(MediaOutcome),
    /// Fires load/error after a delay.
    After(Duration, MediaOutcome),
    /// Never fires either event.
    Stuck,
}

/// Counts `settled` futures still alive, standing in for attached DOM listeners.
struct Attached(Rc<Cell<usize>>);

impl Attached {
    fn new(count: &Rc<Cell<usize>>) -> Self {
        count.set(count.get() + 1);
        Attached(count.clone())
    }
}

impl Drop for Attached {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

struct FakeImage {
    image: Image,
    attached: Rc<Cell<usize>>,
}

impl MediaHandle for FakeImage {
    fn state(&self) -> Option<MediaOutcome> {
        match self.image {
            Image::Ready(o) => Some(o),
            _ => None,
        }
    }

    fn settled(&self) -> LocalBoxFuture<'static, MediaOutcome> {
        match self.image {
            Image::Ready(o) => Box::pin(future::ready(o)),
            Image::After(delay, o) => {
                let guard = Attached::new(&self.attached);
                Box::pin(async move {
                    let _guard = guard;
                    tokio::time::sleep(delay).await;
                    o
                })
            }
            Image::Stuck => {
                let guard = Attached::new(&self.attached);
                Box::pin(async move {
                    let _guard = guard;
                    future::pending().await
                })
            }
        }
    }
}

#[derive(Default)]
pub struct FakeTarget {
    images: Vec<Image>,
    pub scrolls: Cell<usize>,
    /// Pending image waits that have not been released yet.
    pub attached: Rc<Cell<usize>>,
}

impl FakeTarget {
    pub fn new(images: Vec<Image>) -> Self {
        FakeTarget {
            images,
            ..FakeTarget::default()
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl PrintTarget for FakeTarget {
    fn scroll_to_origin(&self) {
        self.scrolls.set(self.scrolls.get() + 1);
    }

    fn images(&self) -> Vec<Box<dyn MediaHandle>> {
        self.images
            .iter()
            .map(|i| {
                Box::new(FakeImage {
                    image: *i,
                    attached: self.attached.clone(),
                }) as Box<dyn MediaHandle>
            })
            .collect()
    }
}
