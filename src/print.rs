//! Device-adaptive print / PDF pipeline
//!
//! One `print` call is one job:
//!
//! ```text
//! Idle -> PreparingMedia -> Rendering -> Done
//!              |               |
//!              +----> Failed <-+
//! ```
//!
//! The device profile decides the path once per session. Rasterized output
//! that fails is reported through `on_error` and then retried exactly once as
//! a native print; a failing native print never falls back to rasterizing.
//!
//! The pipeline owns the `afterprint` listener it registers and removes that
//! exact listener before registering another, on firing, and on teardown.

use crate::debug::{self, cat};
use crate::device::DeviceProfile;
use crate::media::{prepare_element_for_pdf, MediaTiming, PrintTarget};
use crate::pdf::{PdfBlob, PdfOptions, DEFAULT_MARGIN_MM};
use crate::platform;
use crate::types::{DeviceClass, PrintJobState, PrintRequest};
use async_trait::async_trait;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

pub const PROGRESS_MEDIA: u8 = 20;
pub const PROGRESS_RENDER: u8 = 50;
pub const PROGRESS_DONE: u8 = 100;

pub type ListenerId = u64;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PrintError {
    #[error("printing is not supported in this environment")]
    NativePrintUnavailable,
    #[error("print dialog failed: {0}")]
    NativePrint(String),
    #[error("PDF generation failed: {0}")]
    Rasterize(String),
    #[error("sharing is not supported and the file cannot be downloaded here")]
    ShareUnavailable,
    #[error("share failed: {0}")]
    Share(String),
    #[error("download failed: {0}")]
    Download(String),
}

/// Browser-side print and file delivery capabilities.
#[async_trait(?Send)]
pub trait PrintHost {
    fn has_print(&self) -> bool;
    fn scroll_window_to_origin(&self);
    /// Open the native print dialog.
    fn print(&self) -> anyhow::Result<()>;
    /// Register a callback for the print-finished signal.
    fn on_after_print(&self, callback: Box<dyn FnOnce()>) -> ListenerId;
    fn remove_after_print(&self, id: ListenerId);

    fn has_share_api(&self) -> bool;
    fn can_share(&self, blob: &PdfBlob) -> bool;
    async fn share(&self, blob: &PdfBlob) -> anyhow::Result<()>;
    fn can_download(&self) -> bool;
    fn download(&self, blob: &PdfBlob) -> anyhow::Result<()>;
}

/// Caller hooks. Both are optional.
#[derive(Clone, Default)]
pub struct PrintCallbacks {
    on_complete: Option<Rc<dyn Fn()>>,
    on_error: Option<Rc<dyn Fn(&PrintError)>>,
}

impl PrintCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_complete(mut self, f: impl Fn() + 'static) -> Self {
        self.on_complete = Some(Rc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&PrintError) + 'static) -> Self {
        self.on_error = Some(Rc::new(f));
        self
    }

    fn complete(&self) {
        if let Some(f) = &self.on_complete {
            f();
        }
    }

    fn error(&self, err: &PrintError) {
        if let Some(f) = &self.on_error {
            f(err);
        }
    }
}

/// Which path a `print` call ended up taking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrintOutcome {
    Native,
    Rasterized,
    /// Rasterizing failed and the native dialog was opened instead.
    NativeFallback,
    Failed(PrintError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared,
    Downloaded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineTiming {
    pub media: MediaTiming,
    /// Delay between scrolling to the top and opening the print dialog.
    pub layout_settle: Duration,
    /// Delay before the progress indicator drops back to zero.
    pub progress_reset: Duration,
}

impl Default for PipelineTiming {
    fn default() -> Self {
        PipelineTiming {
            media: MediaTiming::default(),
            layout_settle: Duration::from_millis(250),
            progress_reset: Duration::from_millis(1000),
        }
    }
}

/// Hand a finished PDF to the share sheet, or download it when the host
/// cannot share files.
pub async fn deliver<H: PrintHost + ?Sized>(
    host: &H,
    blob: &PdfBlob,
) -> Result<ShareOutcome, PrintError> {
    if host.has_share_api() && host.can_share(blob) {
        debug::log(cat::SHARE, format!("sharing {}", blob.filename));
        return host
            .share(blob)
            .await
            .map(|()| ShareOutcome::Shared)
            .map_err(|e| PrintError::Share(format!("{e:#}")));
    }
    if !host.can_download() {
        return Err(PrintError::ShareUnavailable);
    }
    debug::log(cat::SHARE, format!("share unavailable, downloading {}", blob.filename));
    host.download(blob)
        .map(|()| ShareOutcome::Downloaded)
        .map_err(|e| PrintError::Download(format!("{e:#}")))
}

pub struct PrintPipeline<H: PrintHost + 'static, R> {
    host: Rc<H>,
    rasterizer: R,
    profile: DeviceProfile,
    timing: PipelineTiming,
    margin_mm: f64,
    state: Cell<PrintJobState>,
    progress: Cell<u8>,
    generating: Cell<bool>,
    job: Cell<u64>,
    active_listener: Rc<Cell<Option<ListenerId>>>,
    progress_observer: RefCell<Option<Rc<dyn Fn(u8)>>>,
}

impl<H, R> PrintPipeline<H, R>
where
    H: PrintHost + 'static,
    R: crate::pdf::Rasterizer,
{
    pub fn new(host: Rc<H>, rasterizer: R, profile: DeviceProfile) -> Self {
        PrintPipeline {
            host,
            rasterizer,
            profile,
            timing: PipelineTiming::default(),
            margin_mm: DEFAULT_MARGIN_MM,
            state: Cell::new(PrintJobState::Idle),
            progress: Cell::new(0),
            generating: Cell::new(false),
            job: Cell::new(0),
            active_listener: Rc::new(Cell::new(None)),
            progress_observer: RefCell::new(None),
        }
    }

    pub fn with_timing(mut self, timing: PipelineTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_margin_mm(mut self, margin_mm: f64) -> Self {
        self.margin_mm = margin_mm;
        self
    }

    /// Called with every progress change (0..=100).
    pub fn observe_progress(&self, f: impl Fn(u8) + 'static) {
        *self.progress_observer.borrow_mut() = Some(Rc::new(f));
    }

    pub fn progress(&self) -> u8 {
        self.progress.get()
    }

    pub fn is_generating(&self) -> bool {
        self.generating.get()
    }

    pub fn state(&self) -> PrintJobState {
        self.state.get()
    }

    pub fn profile(&self) -> DeviceProfile {
        self.profile
    }

    pub fn device_type(&self) -> DeviceClass {
        self.profile.device_type
    }

    pub fn is_pdf_mode(&self) -> bool {
        self.profile.is_pdf_mode
    }

    pub fn host(&self) -> &Rc<H> {
        &self.host
    }

    pub fn has_pending_after_print(&self) -> bool {
        self.active_listener.get().is_some()
    }

    /// Print `target` using the strategy picked for this device.
    pub async fn print(
        &self,
        target: &dyn PrintTarget,
        request: &PrintRequest,
        callbacks: &PrintCallbacks,
    ) -> PrintOutcome {
        self.begin_job();

        if !self.profile.is_pdf_mode {
            return match self.native_print(target, callbacks).await {
                Ok(()) => PrintOutcome::Native,
                Err(err) => {
                    callbacks.error(&err);
                    PrintOutcome::Failed(err)
                }
            };
        }

        let job = self.job.get();
        let res = self
            .rasterize(target, request, |opts| async move {
                self.rasterizer.save(target, &opts).await
            })
            .await;

        match res {
            Ok(()) => {
                callbacks.complete();
                self.reset_progress_later(job).await;
                PrintOutcome::Rasterized
            }
            Err(err) => {
                log::warn!("{err}; falling back to native print");
                callbacks.error(&err);
                match self.native_print(target, callbacks).await {
                    Ok(()) => PrintOutcome::NativeFallback,
                    Err(fallback_err) => {
                        // Only the first failure reaches the caller.
                        log::warn!("native print fallback failed: {fallback_err}");
                        PrintOutcome::Failed(err)
                    }
                }
            }
        }
    }

    /// Open the native print dialog for `target`.
    ///
    /// `on_complete` fires from the host's print-finished signal.
    pub async fn native_print(
        &self,
        target: &dyn PrintTarget,
        callbacks: &PrintCallbacks,
    ) -> Result<(), PrintError> {
        if !self.host.has_print() {
            return Err(PrintError::NativePrintUnavailable);
        }

        self.host.scroll_window_to_origin();
        target.scroll_to_origin();

        self.detach_after_print();
        let holder = self.active_listener.clone();
        let host = self.host.clone();
        let on_complete = callbacks.on_complete.clone();
        let id = self.host.on_after_print(Box::new(move || {
            if let Some(id) = holder.take() {
                host.remove_after_print(id);
            }
            if let Some(f) = on_complete {
                f();
            }
        }));
        self.active_listener.set(Some(id));

        self.transition(PrintJobState::Rendering);
        platform::sleep(self.timing.layout_settle).await;

        debug::log(cat::PRINT, "opening native print dialog");
        match self.host.print() {
            Ok(()) => {
                self.transition(PrintJobState::Done);
                Ok(())
            }
            Err(e) => {
                self.detach_after_print();
                self.transition(PrintJobState::Failed);
                Err(PrintError::NativePrint(format!("{e:#}")))
            }
        }
    }

    /// Rasterize `target` into an in-memory PDF.
    pub async fn get_blob(
        &self,
        target: &dyn PrintTarget,
        request: &PrintRequest,
    ) -> Result<PdfBlob, PrintError> {
        self.begin_job();
        let job = self.job.get();
        let blob = self
            .rasterize(target, request, |opts| async move {
                self.rasterizer.render_blob(target, &opts).await
            })
            .await?;
        self.reset_progress_later(job).await;
        Ok(blob)
    }

    /// Rasterize and hand the file to the share sheet, or download it when
    /// the host cannot share files.
    pub async fn share(
        &self,
        target: &dyn PrintTarget,
        request: &PrintRequest,
        callbacks: &PrintCallbacks,
    ) -> Result<ShareOutcome, PrintError> {
        let res = match self.get_blob(target, request).await {
            Ok(blob) => deliver(self.host.as_ref(), &blob).await,
            Err(e) => Err(e),
        };
        match &res {
            Ok(_) => callbacks.complete(),
            Err(e) => callbacks.error(e),
        }
        res
    }

    /// Deregister the pending print-finished listener, if any.
    pub fn teardown(&self) {
        self.detach_after_print();
    }

    async fn rasterize<T, F, Fut>(
        &self,
        target: &dyn PrintTarget,
        request: &PrintRequest,
        render: F,
    ) -> Result<T, PrintError>
    where
        F: FnOnce(PdfOptions) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let job = self.job.get();
        self.generating.set(true);
        self.transition(PrintJobState::PreparingMedia);
        self.set_progress(PROGRESS_MEDIA);

        let report = prepare_element_for_pdf(target, &self.timing.media).await;
        if report.failed > 0 || report.timed_out > 0 {
            log::info!(
                "rendering with {} of {} image(s) missing",
                report.failed + report.timed_out,
                report.total
            );
        }

        if self.is_current(job) {
            self.transition(PrintJobState::Rendering);
            self.set_progress(PROGRESS_RENDER);
        }

        let opts = PdfOptions::for_request(request, self.margin_mm);
        debug::log(cat::PRINT, format!("rasterizing into {}", opts.filename));
        let res = render(opts).await;

        // A superseded job still returns its result but leaves the status alone.
        let current = self.is_current(job);
        if !current {
            debug::log(cat::PRINT, format!("job {job} finished after job {}", self.job.get()));
        }
        match res {
            Ok(v) => {
                if current {
                    self.generating.set(false);
                    self.set_progress(PROGRESS_DONE);
                    self.transition(PrintJobState::Done);
                }
                Ok(v)
            }
            Err(e) => {
                if current {
                    self.generating.set(false);
                    self.set_progress(0);
                    self.transition(PrintJobState::Failed);
                }
                Err(PrintError::Rasterize(format!("{e:#}")))
            }
        }
    }

    fn is_current(&self, job: u64) -> bool {
        self.job.get() == job
    }

    fn begin_job(&self) {
        self.job.set(self.job.get().wrapping_add(1));
        if self.state.get() != PrintJobState::Idle {
            self.transition(PrintJobState::Idle);
        }
    }

    async fn reset_progress_later(&self, job: u64) {
        platform::sleep(self.timing.progress_reset).await;
        // A newer job owns the indicator now.
        if self.is_current(job) {
            self.set_progress(0);
        }
    }

    fn set_progress(&self, value: u8) {
        let value = value.min(100);
        self.progress.set(value);
        let observer = self.progress_observer.borrow().clone();
        if let Some(f) = observer {
            f(value);
        }
    }

    fn transition(&self, next: PrintJobState) {
        let cur = self.state.get();
        if !cur.can_transition_to(next) {
            log::debug!("unexpected print job transition {cur:?} -> {next:?}");
        }
        self.state.set(next);
    }

    fn detach_after_print(&self) {
        if let Some(id) = self.active_listener.take() {
            self.host.remove_after_print(id);
        }
    }
}

impl<H: PrintHost + 'static, R> Drop for PrintPipeline<H, R> {
    fn drop(&mut self) {
        if let Some(id) = self.active_listener.take() {
            self.host.remove_after_print(id);
        }
    }
}
