//! Guards against firing the same browser pixel event more than once.
//!
//! The tracker is plain state owned by whoever hosts the pixels (one per page
//! load), so tests and re-mounts can reset it explicitly.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_CURRENCY;

// Purchase values above this are assumed to be in cents
const CENTS_THRESHOLD: f64 = 10_000.0;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Facebook,
    TikTok,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum StandardEvent {
    PageView,
    ViewContent,
    AddToCart,
    InitiateCheckout,
    Purchase,
}

impl StandardEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            StandardEvent::PageView => "PageView",
            StandardEvent::ViewContent => "ViewContent",
            StandardEvent::AddToCart => "AddToCart",
            StandardEvent::InitiateCheckout => "InitiateCheckout",
            StandardEvent::Purchase => "Purchase",
        }
    }
}

/// Admin toggles for which events are sent. Pixel ids are public; access
/// tokens never leave the server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PixelSettings {
    #[serde(default)]
    pub facebook_pixel_id: Option<String>,
    #[serde(default = "enabled")]
    pub pixel_on_checkout: bool,
    #[serde(default = "enabled")]
    pub pixel_on_purchase: bool,
    #[serde(default)]
    pub tiktok_pixel_id: Option<String>,
    #[serde(default = "enabled")]
    pub tiktok_track_view_content: bool,
    #[serde(default = "enabled")]
    pub tiktok_track_add_to_cart: bool,
    #[serde(default = "enabled")]
    pub tiktok_track_checkout: bool,
    #[serde(default = "enabled")]
    pub tiktok_track_purchase: bool,
}

fn enabled() -> bool {
    true
}

impl Default for PixelSettings {
    fn default() -> Self {
        Self {
            facebook_pixel_id: None,
            pixel_on_checkout: true,
            pixel_on_purchase: true,
            tiktok_pixel_id: None,
            tiktok_track_view_content: true,
            tiktok_track_add_to_cart: true,
            tiktok_track_checkout: true,
            tiktok_track_purchase: true,
        }
    }
}

impl PixelSettings {
    fn allows(&self, platform: Platform, event: StandardEvent) -> bool {
        match (platform, event) {
            (Platform::Facebook, StandardEvent::InitiateCheckout) => self.pixel_on_checkout,
            (Platform::Facebook, StandardEvent::Purchase) => self.pixel_on_purchase,
            (Platform::TikTok, StandardEvent::ViewContent) => self.tiktok_track_view_content,
            (Platform::TikTok, StandardEvent::AddToCart) => self.tiktok_track_add_to_cart,
            (Platform::TikTok, StandardEvent::InitiateCheckout) => self.tiktok_track_checkout,
            (Platform::TikTok, StandardEvent::Purchase) => self.tiktok_track_purchase,
            _ => true,
        }
    }
}

/// An event the host should hand to the platform's pixel
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TrackedEvent {
    pub platform: Platform,
    pub event: StandardEvent,
    pub value: Option<f64>,
    pub currency: Option<String>,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Default)]
pub struct PixelTracker {
    settings: PixelSettings,
    facebook_initialized: Option<String>,
    tiktok_initialized: Option<String>,
    checkout_initiated: bool,
    purchase_tracked: Option<Option<String>>, // transaction id of the last purchase
}

impl PixelTracker {
    pub fn new(settings: PixelSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &PixelSettings {
        &self.settings
    }

    /// Returns the PageView to fire on first init; later calls are ignored.
    pub fn init_facebook(&mut self, pixel_id: &str) -> Option<TrackedEvent> {
        if pixel_id.trim().is_empty() || self.facebook_initialized.is_some() {
            return None;
        }
        self.facebook_initialized = Some(pixel_id.to_string());
        Some(event(Platform::Facebook, StandardEvent::PageView, None, None))
    }

    /// TikTok re-sends a page view on repeat init instead of re-loading.
    pub fn init_tiktok(&mut self, pixel_id: &str) -> Option<TrackedEvent> {
        if pixel_id.trim().is_empty() {
            return None;
        }
        if self.tiktok_initialized.is_none() {
            self.tiktok_initialized = Some(pixel_id.to_string());
        }
        Some(event(Platform::TikTok, StandardEvent::PageView, None, None))
    }

    pub fn is_initialized(&self, platform: Platform) -> bool {
        match platform {
            Platform::Facebook => self.facebook_initialized.is_some(),
            Platform::TikTok => self.tiktok_initialized.is_some(),
        }
    }

    pub fn view_content(&self, value: Option<f64>) -> Vec<TrackedEvent> {
        self.fan_out(StandardEvent::ViewContent, value, None)
    }

    pub fn add_to_cart(&self, value: f64) -> Vec<TrackedEvent> {
        self.fan_out(StandardEvent::AddToCart, Some(value), None)
    }

    /// Fires once per tracker.
    pub fn initiate_checkout(&mut self, value: f64) -> Vec<TrackedEvent> {
        if self.checkout_initiated {
            log::debug!("InitiateCheckout already fired, ignoring");
            return Vec::new();
        }
        let events = self.fan_out(StandardEvent::InitiateCheckout, Some(value), None);
        if !events.is_empty() {
            self.checkout_initiated = true;
        }
        events
    }

    /// Fires once per transaction id. Values that look like cents are
    /// converted to reais.
    pub fn purchase(&mut self, value: f64, transaction_id: Option<&str>) -> Vec<TrackedEvent> {
        let transaction_id = transaction_id.map(str::to_string);
        if self.purchase_tracked.as_ref() == Some(&transaction_id) {
            log::debug!("Purchase already fired for this transaction, ignoring");
            return Vec::new();
        }
        let events = self.fan_out(
            StandardEvent::Purchase,
            Some(purchase_value_reais(value)),
            transaction_id.clone(),
        );
        if !events.is_empty() {
            self.purchase_tracked = Some(transaction_id);
        }
        events
    }

    pub fn reset_purchase(&mut self) {
        self.purchase_tracked = None;
    }

    pub fn reset(&mut self) {
        let settings = std::mem::take(&mut self.settings);
        *self = Self::new(settings);
    }

    fn fan_out(
        &self,
        kind: StandardEvent,
        value: Option<f64>,
        transaction_id: Option<String>,
    ) -> Vec<TrackedEvent> {
        [Platform::Facebook, Platform::TikTok]
            .into_iter()
            .filter(|p| self.is_initialized(*p) && self.settings.allows(*p, kind))
            .map(|p| {
                let mut tracked = event(p, kind, value, Some(DEFAULT_CURRENCY.to_string()));
                tracked.transaction_id = transaction_id.clone();
                tracked
            })
            .collect()
    }
}

pub fn purchase_value_reais(value: f64) -> f64 {
    if value > CENTS_THRESHOLD {
        value / 100.0
    } else {
        value
    }
}

fn event(
    platform: Platform,
    event: StandardEvent,
    value: Option<f64>,
    currency: Option<String>,
) -> TrackedEvent {
    TrackedEvent {
        platform,
        event,
        value,
        currency,
        transaction_id: None,
    }
}
