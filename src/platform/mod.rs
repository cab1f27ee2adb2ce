//! Platform abstraction (timers, logging, browser/native hosts).

cfg_if::cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        mod runtime_wasm;
        pub use runtime_wasm::{init_logging, install_panic_hook, sleep};
    } else {
        mod runtime_native;
        pub use runtime_native::{init_logging, install_panic_hook, sleep};
    }
}

#[cfg(all(target_arch = "wasm32", feature = "dom-web"))]
mod web;
#[cfg(all(target_arch = "wasm32", feature = "dom-web"))]
pub use web::{BrowserEnv, DomTarget, Html2PdfBridge, LocalStorage};

#[cfg(not(target_arch = "wasm32"))]
mod native;
#[cfg(not(target_arch = "wasm32"))]
pub use native::HeadlessHost;
