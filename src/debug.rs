//! Filterable debug logging for the comparison store and print pipeline
//!
//! Categories: STORE, DEVICE, MEDIA, PRINT, SHARE
//! Enable via: ?pxdebug=all or localStorage.setItem('partsx.debug','store,print')
//! Native: PARTSX_DEBUG=media,print

use std::sync::atomic::{AtomicU32, Ordering};

pub mod cat {
    pub const STORE: u32 = 1 << 0;
    pub const DEVICE: u32 = 1 << 1;
    pub const MEDIA: u32 = 1 << 2;
    pub const PRINT: u32 = 1 << 3;
    pub const SHARE: u32 = 1 << 4;
    pub const ALL: u32 = 0xffff_ffff;
}

static MASK: AtomicU32 = AtomicU32::new(0);

#[inline]
pub fn set(mask: u32) {
    MASK.store(mask, Ordering::Relaxed)
}

#[inline]
pub fn is(cat: u32) -> bool {
    (MASK.load(Ordering::Relaxed) & cat) != 0
}

#[inline]
pub fn cat_name(cat: u32) -> &'static str {
    match cat {
        c if c == cat::STORE => "store",
        c if c == cat::DEVICE => "device",
        c if c == cat::MEDIA => "media",
        c if c == cat::PRINT => "print",
        c if c == cat::SHARE => "share",
        _ => "misc",
    }
}

/// Parse a comma-separated category list ("store,print", "all", "none").
pub fn parse_list(list: &str) -> u32 {
    let mut m: u32 = 0;
    for tok in list.split(',').map(|s| s.trim().to_ascii_lowercase()) {
        match tok.as_str() {
            "" | "none" => m = 0,
            "all" => m = cat::ALL,
            "store" => m |= cat::STORE,
            "device" => m |= cat::DEVICE,
            "media" => m |= cat::MEDIA,
            "print" => m |= cat::PRINT,
            "share" => m |= cat::SHARE,
            _ => {}
        }
    }
    m
}

#[inline]
pub fn set_from_list(list: &str) {
    set(parse_list(list));
}

#[cfg(target_arch = "wasm32")]
pub fn init_once() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        use web_sys::window;
        if let Some(win) = window() {
            // URL query: ?pxdebug=store,print
            if let Ok(search) = win.location().search() {
                let qs = search.trim_start_matches('?');
                for part in qs.split('&') {
                    let mut it = part.splitn(2, '=');
                    let key = it.next().unwrap_or_default();
                    let val = it.next().unwrap_or_default();
                    if key.eq_ignore_ascii_case("pxdebug") {
                        if let Ok(decoded_js) = js_sys::decode_uri_component(val) {
                            let decoded = decoded_js.as_string().unwrap_or_default();
                            set_from_list(&decoded);
                        }
                    }
                }
            }
            // localStorage: partsx.debug = "store,print"
            if let Ok(Some(storage)) = win.local_storage() {
                if let Ok(Some(v)) = storage.get_item("partsx.debug") {
                    set_from_list(&v);
                }
            }
        }
        log(cat::STORE, "debug init (wasm) complete");
    });
}

#[cfg(not(target_arch = "wasm32"))]
pub fn init_once() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        if let Ok(v) = std::env::var("PARTSX_DEBUG") {
            set_from_list(&v);
        }
    });
}

#[cfg(target_arch = "wasm32")]
#[inline]
pub fn log(cat: u32, msg: impl AsRef<str>) {
    if !is(cat) {
        return;
    }
    let s = format!("[partsx][{}] {}", cat_name(cat), msg.as_ref());
    web_sys::console::log_1(&wasm_bindgen::JsValue::from_str(&s));
}

#[cfg(not(target_arch = "wasm32"))]
#[inline]
pub fn log(cat: u32, msg: impl AsRef<str>) {
    if !is(cat) {
        return;
    }
    eprintln!("[partsx][{}] {}", cat_name(cat), msg.as_ref());
}
