//! Waiting for embedded media before a subtree is rasterized.
//!
//! Every `<img>` under the target must have either loaded or failed before
//! capture; a failed image counts as settled. An image that never fires
//! either event is given up on after `media_timeout`. Once everything has
//! settled a fixed delay lets canvases (QR codes, charts) finish painting.

use crate::debug::{self, cat};
use crate::platform;
use futures::future::{self, Either, LocalBoxFuture};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaOutcome {
    Loaded,
    Failed,
    TimedOut,
}

/// One embedded image under the print target.
pub trait MediaHandle {
    /// `Some` once the image has loaded or errored, `None` while pending.
    fn state(&self) -> Option<MediaOutcome>;

    /// Resolves on the image's load or error event.
    fn settled(&self) -> LocalBoxFuture<'static, MediaOutcome>;

    fn describe(&self) -> String {
        "img".to_string()
    }
}

/// The subtree being printed. Owned by the caller; the pipeline only reads it.
pub trait PrintTarget {
    fn scroll_to_origin(&self);
    fn images(&self) -> Vec<Box<dyn MediaHandle>>;

    /// Lets a rasterizer recover its concrete element type.
    fn as_any(&self) -> Option<&dyn std::any::Any> {
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MediaTiming {
    pub settle_delay: Duration,
    pub media_timeout: Duration,
}

impl Default for MediaTiming {
    fn default() -> Self {
        MediaTiming {
            settle_delay: Duration::from_millis(500),
            media_timeout: Duration::from_millis(10_000),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MediaReport {
    pub total: usize,
    pub loaded: usize,
    pub failed: usize,
    pub timed_out: usize,
}

impl MediaReport {
    fn record(&mut self, outcome: MediaOutcome) {
        match outcome {
            MediaOutcome::Loaded => self.loaded += 1,
            MediaOutcome::Failed => self.failed += 1,
            MediaOutcome::TimedOut => self.timed_out += 1,
        }
    }
}

async fn wait_one(handle: Box<dyn MediaHandle>, timeout: Duration) -> MediaOutcome {
    if let Some(outcome) = handle.state() {
        return outcome;
    }
    let settled = handle.settled();
    let timer = Box::pin(platform::sleep(timeout));
    match future::select(settled, timer).await {
        Either::Left((outcome, _)) => outcome,
        Either::Right(((), pending)) => {
            // Releases the image's load/error listeners.
            drop(pending);
            log::warn!(
                "{} did not load within {}ms, printing without it",
                handle.describe(),
                timeout.as_millis()
            );
            MediaOutcome::TimedOut
        }
    }
}

/// Wait until all images under `target` have settled, then apply the settle delay.
pub async fn prepare_element_for_pdf(target: &dyn PrintTarget, timing: &MediaTiming) -> MediaReport {
    let images = target.images();
    let mut report = MediaReport {
        total: images.len(),
        ..MediaReport::default()
    };

    if !images.is_empty() {
        let outcomes =
            future::join_all(images.into_iter().map(|h| wait_one(h, timing.media_timeout))).await;
        for outcome in outcomes {
            report.record(outcome);
        }
    }

    debug::log(
        cat::MEDIA,
        format!(
            "media settled: {} total, {} loaded, {} failed, {} timed out",
            report.total, report.loaded, report.failed, report.timed_out
        ),
    );

    platform::sleep(timing.settle_delay).await;
    report
}
