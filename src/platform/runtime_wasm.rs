use std::sync::Once;
use std::time::Duration;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

/// `setTimeout`-backed sleep. Resolves immediately when there is no window.
pub async fn sleep(duration: Duration) {
    let millis = duration.as_millis().min(i32::MAX as u128) as i32;
    let promise = js_sys::Promise::new(&mut |resolve, _| {
        let Some(window) = web_sys::window() else {
            let _ = resolve.call0(&JsValue::UNDEFINED);
            return;
        };
        let resolve_fn = resolve.clone();
        let closure = Closure::once_into_js(move || {
            let _ = resolve_fn.call0(&JsValue::UNDEFINED);
        });
        if window
            .set_timeout_with_callback_and_timeout_and_arguments_0(closure.unchecked_ref(), millis)
            .is_err()
        {
            let _ = resolve.call0(&JsValue::UNDEFINED);
        }
    });

    let _ = JsFuture::from(promise).await;
}

struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let msg = format!("[partsx] {} {}", record.target(), record.args());
        let value = JsValue::from_str(&msg);
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&value),
            log::Level::Warn => web_sys::console::warn_1(&value),
            log::Level::Info => web_sys::console::info_1(&value),
            log::Level::Debug | log::Level::Trace => web_sys::console::log_1(&value),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;
static LOGGER_INIT: Once = Once::new();
static PANIC_HOOK: Once = Once::new();

pub fn init_logging(level: log::Level) {
    LOGGER_INIT.call_once(|| {
        let _ = log::set_logger(&LOGGER);
    });
    log::set_max_level(level.to_level_filter());
}

pub fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            let msg = info.to_string();
            web_sys::console::error_1(&JsValue::from_str(&format!("panic: {msg}")));
        }));
    });
}
