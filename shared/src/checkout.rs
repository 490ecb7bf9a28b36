use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pixel_tracking::PixelSettings;
use crate::shared_wheel_game::WheelSegment;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Product {
    pub name: String,
    pub price_cents: i64,
}

/// Operator-configured promotion behind the discount wheel
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Promotion {
    pub active: bool,
    pub product_price_cents: i64,
    pub discount_price_cents: i64,
}

impl Promotion {
    /// Whole percent off, or 0 when the prices don't describe a discount
    pub fn discount_percent(&self) -> u32 {
        let original = self.product_price_cents;
        let discounted = self.discount_price_cents;
        if original > 0 && discounted > 0 && discounted < original {
            let percent = (original - discounted) as f64 / original as f64 * 100.0;
            percent.round() as u32
        } else {
            0
        }
    }

    pub fn quote(&self) -> DiscountQuote {
        DiscountQuote {
            percent: self.discount_percent(),
            original_cents: self.product_price_cents,
            discounted_cents: self.discount_price_cents,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct DiscountQuote {
    pub percent: u32,
    pub original_cents: i64,
    pub discounted_cents: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UpsellOffer {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    #[serde(default)]
    pub original_price_cents: Option<i64>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl UpsellOffer {
    // No image means the offer is under maintenance
    pub fn is_available(&self) -> bool {
        self.image_url
            .as_deref()
            .map(|url| !url.trim().is_empty())
            .unwrap_or(false)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LineItem {
    pub label: String,
    pub amount_cents: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OrderSummary {
    pub items: Vec<LineItem>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub total_display: String,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OrderError {
    #[error("Unknown upsell: {0}")]
    UnknownUpsell(String),
    #[error("Upsell is unavailable: {0}")]
    UpsellUnavailable(String),
}

#[derive(Debug, Clone)]
pub struct Order {
    product: Product,
    wheel_discount: Option<DiscountQuote>,
    upsells: Vec<UpsellOffer>,
}

impl Order {
    pub fn new(product: Product) -> Self {
        Self {
            product,
            wheel_discount: None,
            upsells: Vec::new(),
        }
    }

    /// Applies a won wheel. Re-applying on a revisit is a no-op.
    pub fn apply_wheel_discount(&mut self, quote: DiscountQuote) {
        self.wheel_discount = Some(quote);
    }

    pub fn has_wheel_discount(&self) -> bool {
        self.wheel_discount.is_some()
    }

    /// Adds the offer if absent, removes it otherwise. Returns whether it is
    /// now in the order.
    pub fn toggle_upsell(&mut self, offer: &UpsellOffer) -> Result<bool, OrderError> {
        if let Some(pos) = self.upsells.iter().position(|u| u.id == offer.id) {
            self.upsells.remove(pos);
            return Ok(false);
        }
        if !offer.is_available() {
            return Err(OrderError::UpsellUnavailable(offer.id.clone()));
        }
        self.upsells.push(offer.clone());
        Ok(true)
    }

    pub fn summary(&self) -> OrderSummary {
        let mut items = vec![LineItem {
            label: self.product.name.clone(),
            amount_cents: self.product.price_cents,
        }];
        items.extend(self.upsells.iter().map(|u| LineItem {
            label: u.title.clone(),
            amount_cents: u.price_cents,
        }));

        let subtotal_cents: i64 = items.iter().map(|i| i.amount_cents).sum();
        let discount_cents = self
            .wheel_discount
            .map(|q| (self.product.price_cents - q.discounted_cents).max(0))
            .unwrap_or(0);
        let total_cents = subtotal_cents - discount_cents;

        OrderSummary {
            items,
            subtotal_cents,
            discount_cents,
            total_cents,
            total_display: format_brl(total_cents),
        }
    }
}

/// Builds an order from upsell ids picked by the shopper
pub fn build_order(
    product: &Product,
    offers: &[UpsellOffer],
    upsell_ids: &[String],
    wheel_discount: Option<DiscountQuote>,
) -> Result<Order, OrderError> {
    let mut order = Order::new(product.clone());
    if let Some(quote) = wheel_discount {
        order.apply_wheel_discount(quote);
    }
    for id in upsell_ids {
        let offer = offers
            .iter()
            .find(|o| &o.id == id)
            .ok_or_else(|| OrderError::UnknownUpsell(id.clone()))?;
        if order.upsells.iter().any(|u| u.id == offer.id) {
            continue;
        }
        order.toggle_upsell(offer)?;
    }
    Ok(order)
}

/// `R$ 1.234,56`
pub fn format_brl(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let reais = (cents / 100).to_string();
    let mut grouped = String::new();
    for (i, c) in reais.chars().enumerate() {
        if i > 0 && (reais.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    format!("{}R$ {},{:02}", sign, grouped, cents % 100)
}

// === API Types ===

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UpsellView {
    #[serde(flatten)]
    pub offer: UpsellOffer,
    pub available: bool,
}

impl From<&UpsellOffer> for UpsellView {
    fn from(offer: &UpsellOffer) -> Self {
        Self {
            offer: offer.clone(),
            available: offer.is_available(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CheckoutConfigResponse {
    pub product: Product,
    pub promotion: Promotion,
    pub discount: Option<DiscountQuote>,
    pub upsells: Vec<UpsellView>,
    pub wheel_segments: Vec<WheelSegment>,
    pub pixels: PixelSettings,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct QuoteRequest {
    #[serde(default)]
    pub upsell_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn promotion(original: i64, discounted: i64) -> Promotion {
        Promotion {
            active: true,
            product_price_cents: original,
            discount_price_cents: discounted,
        }
    }

    fn offer(id: &str, image: Option<&str>) -> UpsellOffer {
        UpsellOffer {
            id: id.to_string(),
            title: format!("Offer {}", id),
            description: String::new(),
            price_cents: 1990,
            original_price_cents: Some(2990),
            image_url: image.map(str::to_string),
        }
    }

    #[test]
    fn test_discount_percent() {
        assert_eq!(promotion(9700, 4700).discount_percent(), 52);
        assert_eq!(promotion(10000, 5000).discount_percent(), 50);
        assert_eq!(promotion(10000, 10000).discount_percent(), 0);
        assert_eq!(promotion(0, 100).discount_percent(), 0);
        assert_eq!(promotion(10000, 0).discount_percent(), 0);
    }

    #[test]
    fn test_upsell_without_image_is_unavailable() {
        assert!(!offer("a", None).is_available());
        assert!(!offer("a", Some("  ")).is_available());
        assert!(offer("a", Some("https://cdn/x.png")).is_available());
    }

    #[test]
    fn test_order_totals_with_discount_and_upsell() {
        let product = Product { name: "Course".into(), price_cents: 9700 };
        let offers = vec![offer("bonus", Some("img.png"))];
        let order = build_order(
            &product,
            &offers,
            &["bonus".to_string()],
            Some(promotion(9700, 4700).quote()),
        )
        .unwrap();
        let summary = order.summary();
        assert_eq!(summary.subtotal_cents, 9700 + 1990);
        assert_eq!(summary.discount_cents, 5000);
        assert_eq!(summary.total_cents, 4700 + 1990);
        assert_eq!(summary.total_display, "R$ 66,90");
    }

    #[test]
    fn test_toggle_upsell() {
        let mut order = Order::new(Product { name: "P".into(), price_cents: 100 });
        let bonus = offer("b", Some("img"));
        assert_eq!(order.toggle_upsell(&bonus), Ok(true));
        assert_eq!(order.toggle_upsell(&bonus), Ok(false));
        assert_eq!(
            order.toggle_upsell(&offer("m", None)),
            Err(OrderError::UpsellUnavailable("m".into()))
        );
    }

    #[test]
    fn test_build_order_rejects_unknown_upsell() {
        let product = Product { name: "P".into(), price_cents: 100 };
        let err = build_order(&product, &[], &["nope".to_string()], None).unwrap_err();
        assert_eq!(err, OrderError::UnknownUpsell("nope".into()));
    }

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(0), "R$ 0,00");
        assert_eq!(format_brl(19700), "R$ 197,00");
        assert_eq!(format_brl(123456), "R$ 1.234,56");
        assert_eq!(format_brl(100000000), "R$ 1.000.000,00");
        assert_eq!(format_brl(-50), "-R$ 0,50");
    }
}
