//! Native host: no print dialog, no share sheet. "Downloads" land in a
//! directory when one is configured.

use crate::pdf::PdfBlob;
use crate::print::{ListenerId, PrintHost};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default)]
pub struct HeadlessHost {
    download_dir: Option<PathBuf>,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_download_dir(dir: impl Into<PathBuf>) -> Self {
        HeadlessHost {
            download_dir: Some(dir.into()),
        }
    }

    pub fn download_dir(&self) -> Option<&Path> {
        self.download_dir.as_deref()
    }
}

#[async_trait(?Send)]
impl PrintHost for HeadlessHost {
    fn has_print(&self) -> bool {
        false
    }

    fn scroll_window_to_origin(&self) {}

    fn print(&self) -> Result<()> {
        Err(anyhow!("no print dialog on a headless host"))
    }

    fn on_after_print(&self, _callback: Box<dyn FnOnce()>) -> ListenerId {
        0
    }

    fn remove_after_print(&self, _id: ListenerId) {}

    fn has_share_api(&self) -> bool {
        false
    }

    fn can_share(&self, _blob: &PdfBlob) -> bool {
        false
    }

    async fn share(&self, _blob: &PdfBlob) -> Result<()> {
        Err(anyhow!("no share sheet on a headless host"))
    }

    fn can_download(&self) -> bool {
        self.download_dir.is_some()
    }

    fn download(&self, blob: &PdfBlob) -> Result<()> {
        let dir = self
            .download_dir
            .as_ref()
            .ok_or_else(|| anyhow!("no download directory configured"))?;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        // Never let a filename escape the download directory.
        let name = Path::new(&blob.filename)
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| anyhow!("invalid filename '{}'", blob.filename))?;
        let path = dir.join(name);
        std::fs::write(&path, &blob.bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("saved {} ({} bytes)", path.display(), blob.len());
        Ok(())
    }
}
