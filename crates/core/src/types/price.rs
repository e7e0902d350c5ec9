//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are kept as [`Decimal`] so that cart totals never pick up binary
//! floating point drift (`0.1 + 0.2`).

use std::iter::Sum;
use std::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    #[serde(default)]
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a USD price from an amount in cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self::new(Decimal::new(cents, 2), CurrencyCode::USD)
    }

    /// A zero price in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Price of `quantity` units.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self::new(self.amount * Decimal::from(quantity), self.currency_code)
    }

    /// Amount with exactly two decimal places (e.g., `79.99`).
    #[must_use]
    pub fn amount_display(&self) -> String {
        format!("{:.2}", self.amount.round_dp(2))
    }

    /// Format for display (e.g., `$79.99`).
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{}", self.currency_code.symbol(), self.amount_display())
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.amount + rhs.amount, self.currency_code)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        let mut iter = iter.peekable();
        let currency = iter
            .peek()
            .map_or(CurrencyCode::default(), |p| p.currency_code);
        iter.fold(Self::zero(currency), Add::add)
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }
}
