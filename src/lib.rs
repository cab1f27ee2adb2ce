//! partsx - comparison list and device-adaptive printing for the parts marketplace
//!
//! This library holds the client-side state and print logic shared by the
//! browser build and the native tooling.
//!
//! ## Architecture
//!
//! - **Comparison store**: a small, persisted, observable list of items
//! - **Device classifier**: decides once per session between native print
//!   and rasterized PDF output
//! - **Print pipeline**: waits for media, rasterizes, falls back to the
//!   native dialog, shares or downloads the result
//!
//! ## Usage
//!
//! For native builds (CLI, SQLite-backed store):
//! ```bash
//! cargo build --features native
//! ```
//!
//! For browser builds:
//! ```bash
//! cargo build --target wasm32-unknown-unknown --no-default-features --features dom-web
//! ```

// Core modules (available on all platforms)
pub mod config;
pub mod types;

// Debug logging system (available on all platforms)
pub mod debug;

// Durable key-value storage (SQLite on native, localStorage on web)
pub mod storage;

// Comparison list and its reactive adapter
pub mod compare_store;
pub mod watch;

// Print path decisions
pub mod device;

// Print / PDF pipeline
pub mod media;
pub mod pdf;
pub mod print;

// Platform abstraction layer
pub mod platform;

// WASM-facing exports (JS -> Rust) are only built for the DOM frontend.
#[cfg(all(target_arch = "wasm32", feature = "dom-web"))]
pub mod wasm_api;

// Re-export commonly used types
pub use compare_store::{CollectionStore, ComparisonStore, StoreOptions, Subscription};
pub use config::Config;
pub use device::{classify_device, DeviceClassifier, DeviceProfile, EnvProbe};
pub use media::{prepare_element_for_pdf, MediaHandle, PrintTarget};
pub use pdf::{normalize_pdf_filename, PdfBlob, PdfOptions, Rasterizer};
pub use print::{PrintCallbacks, PrintError, PrintHost, PrintOutcome, PrintPipeline};
pub use storage::{DurableStorage, MemoryStorage};
pub use types::{CompareItem, DeviceClass, ItemId, Orientation, PageSize, PrintRequest};
pub use watch::{CollectionWatch, ComparisonAction};
