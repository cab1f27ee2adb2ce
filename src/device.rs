//! Device classification and print capability decisions.
//!
//! The runtime is classified once into [`DeviceClass`]; every capability
//! question after that is a pure function of the tag plus the host's print
//! capability. Nothing in here can fail: missing signals mean Desktop and
//! missing capabilities mean `false`.

use crate::debug::{self, cat};
use crate::types::DeviceClass;
use serde::Serialize;
use std::cell::OnceCell;
use std::sync::OnceLock;

/// Raw environment signals. Implementations must not panic or block.
pub trait EnvProbe {
    fn user_agent(&self) -> Option<String>;
    fn platform(&self) -> Option<String>;
    fn max_touch_points(&self) -> Option<u32>;
    fn has_print(&self) -> bool;
    fn has_share(&self) -> bool;
}

/// Classify from raw signals.
///
/// iPadOS 13+ reports a desktop Safari UA with platform `MacIntel`, so a Mac
/// with more than one touch point counts as iOS.
pub fn classify(user_agent: Option<&str>, platform: Option<&str>, touch_points: Option<u32>) -> DeviceClass {
    let ua = user_agent.unwrap_or_default();
    if ["iPhone", "iPad", "iPod"].iter().any(|p| ua.contains(p)) {
        return DeviceClass::Ios;
    }
    if platform == Some("MacIntel") && touch_points.unwrap_or(0) > 1 {
        return DeviceClass::Ios;
    }
    if ua.to_ascii_lowercase().contains("android") {
        return DeviceClass::Android;
    }
    DeviceClass::Desktop
}

/// `false` on iOS, where the native print dialog mangles long pages.
#[inline]
pub fn supports_native_print_well(device: DeviceClass, has_print: bool) -> bool {
    has_print && device != DeviceClass::Ios
}

/// The single decision the print pipeline consults.
#[inline]
pub fn should_use_rasterized_output(device: DeviceClass, has_print: bool) -> bool {
    device == DeviceClass::Ios || !has_print
}

/// Memoizing classifier over a probe. The probe's UA/platform/touch signals
/// are read on the first `classify` call only.
pub struct DeviceClassifier<P> {
    probe: P,
    class: OnceCell<DeviceClass>,
}

impl<P: EnvProbe> DeviceClassifier<P> {
    pub fn new(probe: P) -> Self {
        DeviceClassifier {
            probe,
            class: OnceCell::new(),
        }
    }

    pub fn classify(&self) -> DeviceClass {
        *self.class.get_or_init(|| {
            let class = classify(
                self.probe.user_agent().as_deref(),
                self.probe.platform().as_deref(),
                self.probe.max_touch_points(),
            );
            debug::log(cat::DEVICE, format!("classified as {class}"));
            class
        })
    }

    pub fn is_ios(&self) -> bool {
        self.classify() == DeviceClass::Ios
    }

    pub fn is_android(&self) -> bool {
        self.classify() == DeviceClass::Android
    }

    pub fn supports_native_print_well(&self) -> bool {
        supports_native_print_well(self.classify(), self.probe.has_print())
    }

    pub fn should_use_rasterized_output(&self) -> bool {
        should_use_rasterized_output(self.classify(), self.probe.has_print())
    }

    pub fn profile(&self) -> DeviceProfile {
        DeviceProfile::new(self.classify(), self.probe.has_print())
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }
}

/// Read-only summary of the session's print decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProfile {
    pub device_type: DeviceClass,
    #[serde(rename = "isPDFMode")]
    pub is_pdf_mode: bool,
    pub native_print: bool,
}

impl DeviceProfile {
    pub fn new(device: DeviceClass, has_print: bool) -> Self {
        DeviceProfile {
            device_type: device,
            is_pdf_mode: should_use_rasterized_output(device, has_print),
            native_print: supports_native_print_well(device, has_print),
        }
    }
}

/// Probe used when there is no browser: every signal is absent.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeadlessProbe;

impl EnvProbe for HeadlessProbe {
    fn user_agent(&self) -> Option<String> {
        None
    }
    fn platform(&self) -> Option<String> {
        None
    }
    fn max_touch_points(&self) -> Option<u32> {
        None
    }
    fn has_print(&self) -> bool {
        false
    }
    fn has_share(&self) -> bool {
        false
    }
}

static DEVICE: OnceLock<DeviceClass> = OnceLock::new();

/// Process-wide classification of the host environment, computed once.
pub fn classify_device() -> DeviceClass {
    *DEVICE.get_or_init(|| {
        cfg_if::cfg_if! {
            if #[cfg(all(target_arch = "wasm32", feature = "dom-web"))] {
                DeviceClassifier::new(crate::platform::BrowserEnv::new()).classify()
            } else {
                DeviceClassifier::new(HeadlessProbe).classify()
            }
        }
    })
}
