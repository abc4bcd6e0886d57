//! Order pricing: tax, shipping, discount, total.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingMethod {
    #[default]
    Standard,
    Express,
    Pickup,
}

/// Pricing knobs, loaded from configuration. Defaults: 10% tax, 10.00
/// standard shipping (free at or above 100.00), 20.00 express, free pickup.
#[derive(Clone, Debug)]
pub struct Pricing {
    pub tax_rate: Decimal,
    pub standard_fee: Decimal,
    pub express_fee: Decimal,
    pub free_shipping_threshold: Decimal,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(10, 2),
            standard_fee: Decimal::from(10),
            express_fee: Decimal::from(20),
            free_shipping_threshold: Decimal::from(100),
        }
    }
}

/// The immutable pricing block persisted on every order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl Pricing {
    pub fn shipping_fee(&self, method: ShippingMethod, subtotal: Decimal) -> Decimal {
        match method {
            ShippingMethod::Standard => {
                if subtotal >= self.free_shipping_threshold {
                    Decimal::ZERO
                } else {
                    self.standard_fee
                }
            }
            ShippingMethod::Express => self.express_fee,
            ShippingMethod::Pickup => Decimal::ZERO,
        }
    }

    /// total = subtotal + tax + shipping - discount, clamped at zero.
    pub fn quote(&self, subtotal: Decimal, method: ShippingMethod, discount: Decimal) -> Totals {
        let tax = (subtotal * self.tax_rate).round_dp(2);
        let shipping = self.shipping_fee(method, subtotal);
        let total = (subtotal + tax + shipping - discount).max(Decimal::ZERO);
        Totals {
            subtotal,
            tax,
            shipping,
            discount,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn below_threshold_pays_standard_shipping() {
        let totals = Pricing::default().quote(dec!(55), ShippingMethod::Standard, Decimal::ZERO);
        assert_eq!(totals.tax, dec!(5.50));
        assert_eq!(totals.shipping, dec!(10));
        assert_eq!(totals.total, dec!(70.50));
    }

    #[test]
    fn free_shipping_at_threshold_with_discount() {
        let totals = Pricing::default().quote(dec!(100), ShippingMethod::Standard, dec!(10));
        assert_eq!(totals.tax, dec!(10.00));
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.total, dec!(100.00));
    }

    #[test]
    fn express_fee_ignores_threshold() {
        let pricing = Pricing::default();
        assert_eq!(
            pricing.shipping_fee(ShippingMethod::Express, dec!(500)),
            dec!(20)
        );
        assert_eq!(
            pricing.shipping_fee(ShippingMethod::Pickup, dec!(5)),
            Decimal::ZERO
        );
    }

    #[test]
    fn total_clamps_at_zero() {
        let totals = Pricing::default().quote(dec!(10), ShippingMethod::Pickup, dec!(50));
        assert_eq!(totals.total, Decimal::ZERO);
    }
}
