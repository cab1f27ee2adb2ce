//! Rasterizer configuration and PDF output.
//!
//! The rasterizer itself (html2canvas + jsPDF via html2pdf in the browser) is
//! an opaque collaborator behind [`Rasterizer`]. This module owns what we hand
//! it and what we get back.

use crate::media::PrintTarget;
use crate::types::{Orientation, PageSize, PrintRequest};
use async_trait::async_trait;
use base64::Engine;
use serde::Serialize;

/// Oversampling factor for print-quality capture.
pub const RASTER_SCALE: u32 = 2;
pub const JPEG_QUALITY: f64 = 0.98;
pub const DEFAULT_MARGIN_MM: f64 = 10.0;

pub const PAGE_BREAK_BEFORE: &str = ".page-break-before";
pub const PAGE_BREAK_AFTER: &str = ".page-break-after";
pub const PAGE_BREAK_AVOID: &str = ".page-break-avoid";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImageOptions {
    #[serde(rename = "type")]
    pub codec: String,
    pub quality: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasOptions {
    pub scale: u32,
    #[serde(rename = "useCORS")]
    pub use_cors: bool,
    pub logging: bool,
    pub letter_rendering: bool,
    pub scroll_x: i32,
    pub scroll_y: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PageOptions {
    pub unit: String,
    pub format: PageSize,
    pub orientation: Orientation,
    pub compress: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PageBreakOptions {
    pub mode: Vec<String>,
    pub before: String,
    pub after: String,
    pub avoid: String,
}

impl Default for PageBreakOptions {
    fn default() -> Self {
        PageBreakOptions {
            mode: vec!["css".to_string(), "legacy".to_string()],
            before: PAGE_BREAK_BEFORE.to_string(),
            after: PAGE_BREAK_AFTER.to_string(),
            avoid: PAGE_BREAK_AVOID.to_string(),
        }
    }
}

/// Options object passed verbatim (as JSON) to the rasterizer.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfOptions {
    pub margin: f64,
    pub filename: String,
    pub image: ImageOptions,
    pub html2canvas: CanvasOptions,
    #[serde(rename = "jsPDF")]
    pub js_pdf: PageOptions,
    pub pagebreak: PageBreakOptions,
}

impl PdfOptions {
    pub fn for_request(request: &PrintRequest, margin_mm: f64) -> Self {
        PdfOptions {
            margin: margin_mm,
            filename: normalize_pdf_filename(&request.filename),
            image: ImageOptions {
                codec: "jpeg".to_string(),
                quality: JPEG_QUALITY,
            },
            html2canvas: CanvasOptions {
                scale: RASTER_SCALE,
                use_cors: true,
                logging: false,
                letter_rendering: true,
                scroll_x: 0,
                scroll_y: 0,
            },
            js_pdf: PageOptions {
                unit: "mm".to_string(),
                format: request.page_size,
                orientation: request.orientation,
                compress: true,
            },
            pagebreak: PageBreakOptions::default(),
        }
    }

    /// Printable area in millimeters after margins.
    pub fn content_area_mm(&self) -> (f64, f64) {
        let (w, h) = self.js_pdf.format.dimensions_mm(self.js_pdf.orientation);
        ((w - 2.0 * self.margin).max(0.0), (h - 2.0 * self.margin).max(0.0))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Ensure a usable `.pdf` filename. Blank names get a dated default.
pub fn normalize_pdf_filename(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return format!("document-{}.pdf", chrono::Local::now().format("%Y-%m-%d"));
    }
    if trimmed.to_ascii_lowercase().ends_with(".pdf") {
        trimmed.to_string()
    } else {
        format!("{trimmed}.pdf")
    }
}

/// Rendered document held in memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PdfBlob {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl PdfBlob {
    pub const MIME: &'static str = "application/pdf";

    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        PdfBlob {
            filename: filename.into(),
            bytes,
        }
    }

    pub fn mime(&self) -> &'static str {
        Self::MIME
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `data:` URL, the download link when the host cannot create object URLs.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            Self::MIME,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// Turns a DOM subtree into a paginated PDF.
#[async_trait(?Send)]
pub trait Rasterizer {
    /// Render and trigger a download named `opts.filename`.
    async fn save(&self, target: &dyn PrintTarget, opts: &PdfOptions) -> anyhow::Result<()>;

    /// Render and return the document instead of downloading it.
    async fn render_blob(&self, target: &dyn PrintTarget, opts: &PdfOptions) -> anyhow::Result<PdfBlob>;
}
