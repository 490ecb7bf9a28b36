//! Copying the PIX code across mobile browsers.
//!
//! The async clipboard API is missing or broken on a lot of Android skins,
//! so copying goes through an ordered list of strategies and silently gives
//! up when all of them fail. The code stays on screen for manual selection.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::COPY_FEEDBACK_MS;

static MOBILE_UA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)android|webos|iphone|ipad|ipod|blackberry|iemobile|opera mini|mobile|tablet")
        .unwrap()
});
static IOS_UA: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)iphone|ipad|ipod").unwrap());
static XIAOMI_UA: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)xiaomi|redmi|mi\s|poco").unwrap());
static SAMSUNG_UA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)samsung|galaxy|sm-|gt-|sgh-").unwrap());
static EDGE_UA: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)edg").unwrap());
static OPERA_UA: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)opr|opera").unwrap());

const SMALL_SCREEN_MAX_WIDTH: u32 = 768;
const EXEC_COPY_RETRIES: u32 = 2;

/// What the host page can tell us besides the user agent
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct BrowserCapabilities {
    pub has_touch: bool,
    pub viewport_width: u32,
    pub clipboard_api: bool,
    pub exec_command: bool,
    pub secure_context: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct DeviceInfo {
    pub is_mobile: bool,
    pub is_ios: bool,
    pub is_android: bool,
    pub is_xiaomi: bool,
    pub is_samsung: bool,
    pub is_chrome: bool,
    pub is_safari: bool,
    pub is_firefox: bool,
    pub is_edge: bool,
    pub is_opera: bool,
    pub capabilities: BrowserCapabilities,
}

impl DeviceInfo {
    pub fn detect(user_agent: &str, capabilities: BrowserCapabilities) -> Self {
        let ua = user_agent.to_lowercase();
        let is_small_screen = capabilities.viewport_width > 0
            && capabilities.viewport_width <= SMALL_SCREEN_MAX_WIDTH;
        let is_edge = EDGE_UA.is_match(&ua);
        let is_opera = OPERA_UA.is_match(&ua);

        Self {
            is_mobile: MOBILE_UA.is_match(&ua) || (capabilities.has_touch && is_small_screen),
            is_ios: IOS_UA.is_match(&ua),
            is_android: ua.contains("android"),
            is_xiaomi: XIAOMI_UA.is_match(&ua),
            is_samsung: SAMSUNG_UA.is_match(&ua),
            // Chrome, Edge and Opera all advertise "safari" too
            is_chrome: ua.contains("chrome") && !is_edge && !is_opera,
            is_safari: ua.contains("safari") && !ua.contains("chrome") && !is_edge && !is_opera,
            is_firefox: ua.contains("firefox") || ua.contains("fxios"),
            is_edge,
            is_opera,
            capabilities,
        }
    }
}

/// How the hidden textarea gets its selection before `execCommand("copy")`
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMethod {
    FocusSelectThenRange, // Xiaomi, with a second pass after a short delay
    FocusSelectRange,     // Samsung
    DocumentRange,        // iOS Selection API
    FocusSelectTryRange,  // other Android
    FocusSelect,          // desktop
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum CopyStrategy {
    ClipboardApi,
    SelectionCopy {
        method: SelectionMethod,
        delay_ms: u32,
    },
}

pub fn copy_plan(device: &DeviceInfo) -> Vec<CopyStrategy> {
    let mut plan = Vec::with_capacity(2);
    let caps = device.capabilities;
    if caps.clipboard_api
        && (device.is_chrome || device.is_edge || device.is_firefox || caps.secure_context)
    {
        plan.push(CopyStrategy::ClipboardApi);
    }

    let method = if device.is_xiaomi {
        SelectionMethod::FocusSelectThenRange
    } else if device.is_samsung {
        SelectionMethod::FocusSelectRange
    } else if device.is_ios {
        SelectionMethod::DocumentRange
    } else if device.is_android {
        SelectionMethod::FocusSelectTryRange
    } else {
        SelectionMethod::FocusSelect
    };
    let delay_ms = if device.is_xiaomi {
        50
    } else if device.is_ios {
        30
    } else {
        10
    };
    plan.push(CopyStrategy::SelectionCopy { method, delay_ms });
    plan
}

/// The host's clipboard primitives
pub trait ClipboardBackend {
    fn write_text(&mut self, text: &str) -> bool;
    fn select_and_copy(&mut self, text: &str, method: SelectionMethod, delay_ms: u32) -> bool;
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied(CopyStrategy),
    GaveUp,
    NothingToCopy,
}

impl CopyOutcome {
    /// How long the "copied" confirmation stays on the button, if shown at all
    pub fn feedback_ms(&self) -> Option<u32> {
        match self {
            CopyOutcome::Copied(_) => Some(COPY_FEEDBACK_MS),
            CopyOutcome::GaveUp | CopyOutcome::NothingToCopy => None,
        }
    }
}

pub fn copy_with_fallback<B: ClipboardBackend + ?Sized>(
    backend: &mut B,
    device: &DeviceInfo,
    text: &str,
) -> CopyOutcome {
    if text.trim().is_empty() {
        return CopyOutcome::NothingToCopy;
    }
    for strategy in copy_plan(device) {
        let copied = match strategy {
            CopyStrategy::ClipboardApi => backend.write_text(text),
            CopyStrategy::SelectionCopy { method, delay_ms } => {
                // retries plus one final attempt
                (0..=EXEC_COPY_RETRIES).any(|_| backend.select_and_copy(text, method, delay_ms))
            }
        };
        if copied {
            return CopyOutcome::Copied(strategy);
        }
        log::debug!("Copy strategy {:?} failed, falling back", strategy);
    }
    CopyOutcome::GaveUp
}
