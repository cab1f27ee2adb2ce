//! Device classifier tests - memoization and the print-path decision

use partsx::device::{classify_device, DeviceClassifier, EnvProbe};
use partsx::types::DeviceClass;
use std::cell::Cell;

const IPHONE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1";
const IPAD_DESKTOP_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15";
const ANDROID_UA: &str = "Mozilla/5.0 (Linux; Android 13; SM-S911B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0 Mobile Safari/537.36";
const WINDOWS_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0 Safari/537.36";

/// Probe that counts how often the classification signals are read.
struct CountingProbe {
    ua: &'static str,
    platform: &'static str,
    touch_points: u32,
    print: bool,
    reads: Cell<usize>,
}

impl CountingProbe {
    fn new(ua: &'static str, platform: &'static str, touch_points: u32, print: bool) -> Self {
        CountingProbe {
            ua,
            platform,
            touch_points,
            print,
            reads: Cell::new(0),
        }
    }
}

impl EnvProbe for CountingProbe {
    fn user_agent(&self) -> Option<String> {
        self.reads.set(self.reads.get() + 1);
        Some(self.ua.to_string())
    }
    fn platform(&self) -> Option<String> {
        Some(self.platform.to_string())
    }
    fn max_touch_points(&self) -> Option<u32> {
        Some(self.touch_points)
    }
    fn has_print(&self) -> bool {
        self.print
    }
    fn has_share(&self) -> bool {
        false
    }
}

#[test]
fn classification_is_computed_once() {
    let c = DeviceClassifier::new(CountingProbe::new(ANDROID_UA, "Linux armv8l", 5, true));
    for _ in 0..5 {
        assert_eq!(c.classify(), DeviceClass::Android);
    }
    assert!(c.is_android());
    assert!(!c.is_ios());
    c.profile();
    assert_eq!(c.probe().reads.get(), 1);
}

#[test]
fn iphone_forces_rasterized_output_even_with_print() {
    let c = DeviceClassifier::new(CountingProbe::new(IPHONE_UA, "iPhone", 5, true));
    assert!(c.should_use_rasterized_output());
    assert!(!c.supports_native_print_well());
}

#[test]
fn ipad_with_desktop_user_agent_is_ios() {
    let c = DeviceClassifier::new(CountingProbe::new(IPAD_DESKTOP_UA, "MacIntel", 5, true));
    assert_eq!(c.classify(), DeviceClass::Ios);

    let mac = DeviceClassifier::new(CountingProbe::new(IPAD_DESKTOP_UA, "MacIntel", 0, true));
    assert_eq!(mac.classify(), DeviceClass::Desktop);
}

#[test]
fn desktop_uses_native_print_when_available() {
    let c = DeviceClassifier::new(CountingProbe::new(WINDOWS_UA, "Win32", 0, true));
    assert_eq!(c.classify(), DeviceClass::Desktop);
    assert!(c.supports_native_print_well());
    assert!(!c.should_use_rasterized_output());

    let no_print = DeviceClassifier::new(CountingProbe::new(WINDOWS_UA, "Win32", 0, false));
    assert!(no_print.should_use_rasterized_output());
    assert!(!no_print.supports_native_print_well());
}

#[test]
fn profile_serializes_for_the_view() {
    let c = DeviceClassifier::new(CountingProbe::new(IPHONE_UA, "iPhone", 5, true));
    let v = serde_json::to_value(c.profile()).unwrap();
    assert_eq!(
        v,
        serde_json::json!({ "deviceType": "ios", "isPDFMode": true, "nativePrint": false })
    );
}

#[test]
fn process_classification_is_stable() {
    let first = classify_device();
    assert_eq!(classify_device(), first);
    // Native test runs have no browser signals.
    assert_eq!(first, DeviceClass::Desktop);
}
