use anyhow::{anyhow, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Stable identifier of a listed car or part.
///
/// The backend hands out both numeric and string ids, so reads accept either
/// and normalize to a string. Writes always emit the string form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        ItemId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        ItemId(s)
    }
}

impl From<u64> for ItemId {
    fn from(n: u64) -> Self {
        ItemId(n.to_string())
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(ItemId(s)),
            Value::Number(n) => Ok(ItemId(n.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "item id must be a string or number, got {other}"
            ))),
        }
    }
}

/// Anything the collection store can hold: it only needs a stable id.
pub trait Identified {
    fn item_id(&self) -> &ItemId;
}

/// A car or part selected for side-by-side comparison.
///
/// Only the fields the comparison view reads are typed; everything else the
/// backend sent is kept in `extra` and written back unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompareItem {
    pub id: ItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// "car" or "part"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CompareItem {
    pub fn new(id: impl Into<ItemId>) -> Self {
        CompareItem {
            id: id.into(),
            title: None,
            price: None,
            sale_price: None,
            images: Vec::new(),
            image: None,
            kind: None,
            extra: Map::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_sale_price(mut self, sale_price: f64) -> Self {
        self.sale_price = Some(sale_price);
        self
    }

    /// Price shown to the customer: the sale price when it undercuts the list price.
    pub fn display_price(&self) -> Option<f64> {
        match (self.price, self.sale_price) {
            (Some(p), Some(s)) if s < p => Some(s),
            (Some(p), _) => Some(p),
            (None, s) => s,
        }
    }

    /// First usable image reference (gallery first, then the single cover image).
    pub fn cover_image(&self) -> Option<&str> {
        self.images
            .iter()
            .map(String::as_str)
            .find(|s| !s.is_empty())
            .or(self.image.as_deref())
    }
}

impl Identified for CompareItem {
    fn item_id(&self) -> &ItemId {
        &self.id
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    #[default]
    A4,
    A5,
    Letter,
}

impl PageSize {
    /// Page dimensions in millimeters as (width, height).
    pub fn dimensions_mm(self, orientation: Orientation) -> (f64, f64) {
        let (w, h) = match self {
            PageSize::A4 => (210.0, 297.0),
            PageSize::A5 => (148.0, 210.0),
            PageSize::Letter => (215.9, 279.4),
        };
        match orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PageSize::A4 => "a4",
            PageSize::A5 => "a5",
            PageSize::Letter => "letter",
        }
    }
}

impl std::str::FromStr for PageSize {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "a4" => Ok(PageSize::A4),
            "a5" => Ok(PageSize::A5),
            "letter" => Ok(PageSize::Letter),
            _ => Err(anyhow!("Invalid page size '{s}'. Valid options: a4, a5, letter")),
        }
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        }
    }
}

impl std::str::FromStr for Orientation {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "portrait" | "p" => Ok(Orientation::Portrait),
            "landscape" | "l" => Ok(Orientation::Landscape),
            _ => Err(anyhow!(
                "Invalid orientation '{s}'. Valid options: portrait, landscape"
            )),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse runtime category used to pick a print strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Ios,
    Android,
    Desktop,
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceClass::Ios => write!(f, "ios"),
            DeviceClass::Android => write!(f, "android"),
            DeviceClass::Desktop => write!(f, "desktop"),
        }
    }
}

/// Lifecycle of a single print action.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PrintJobState {
    #[default]
    Idle,
    PreparingMedia,
    Rendering,
    Done,
    Failed,
}

impl PrintJobState {
    pub fn can_transition_to(self, next: PrintJobState) -> bool {
        use PrintJobState::*;
        matches!(
            (self, next),
            (Idle, PreparingMedia)
                | (Idle, Rendering)
                | (PreparingMedia, Rendering)
                | (PreparingMedia, Failed)
                | (Rendering, Done)
                | (Rendering, Failed)
                | (Failed, Rendering)
                | (Done, Idle)
                | (Failed, Idle)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PrintJobState::Done | PrintJobState::Failed)
    }
}

/// What the caller wants printed and how.
#[derive(Clone, Debug, PartialEq)]
pub struct PrintRequest {
    pub filename: String,
    pub page_size: PageSize,
    pub orientation: Orientation,
}

impl PrintRequest {
    pub fn new(filename: impl Into<String>) -> Self {
        PrintRequest {
            filename: filename.into(),
            page_size: PageSize::default(),
            orientation: Orientation::default(),
        }
    }

    pub fn page_size(mut self, page_size: PageSize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }
}
