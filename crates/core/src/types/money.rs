//! Type-safe money representation using decimal arithmetic.
//!
//! All cart and delivery amounts are held as [`Money`], a thin wrapper over
//! [`rust_decimal::Decimal`] in the currency's standard unit (rupees, not
//! cents). Binary floating point never touches a price.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Mul, Sub};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// An amount of money in the store currency.
///
/// ## Examples
///
/// ```
/// use emporium_core::Money;
/// use rust_decimal::Decimal;
///
/// let unit = Money::from_major(1_250);
/// assert_eq!(unit * 3, Money::from_major(3_750));
/// assert_eq!(Money::new(Decimal::new(7505, 1)).round_whole(), Money::from_major(751));
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero in any currency.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Wrap a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create an amount from whole currency units.
    #[must_use]
    pub fn from_major(units: i64) -> Self {
        Self(Decimal::from(units))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(self) -> Decimal {
        self.0
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// Whether the amount is strictly positive.
    #[must_use]
    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Multiply by a dimensionless factor (multipliers, discount factors).
    #[must_use]
    pub fn scale(self, factor: Decimal) -> Self {
        Self(self.0 * factor)
    }

    /// Round to the nearest whole currency unit, halves away from zero.
    #[must_use]
    pub fn round_whole(self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// `self - other`, floored at zero.
    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        if other.0 >= self.0 {
            Self::ZERO
        } else {
            Self(self.0 - other.0)
        }
    }

    /// Format with a currency prefix and thousands separators (e.g. `Rs. 8,000`).
    #[must_use]
    pub fn display(self, currency: CurrencyCode) -> String {
        format!("{} {}", currency.symbol(), group_thousands(self.0))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<u32> for Money {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self::Output {
        Self(self.0 * Decimal::from(rhs))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

/// Render a decimal with comma thousands separators, dropping a zero fraction.
fn group_thousands(amount: Decimal) -> String {
    let rounded = amount.round_dp(2).normalize();
    let text = rounded.abs().to_string();
    let (whole, fraction) = text
        .split_once('.')
        .map_or((text.as_str(), None), |(w, f)| (w, Some(f)));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    match fraction {
        Some(f) => format!("{sign}{grouped}.{f:0<2}"),
        None => format!("{sign}{grouped}"),
    }
}

/// ISO 4217 currency codes the storefront can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    LKR,
    USD,
    EUR,
    GBP,
    INR,
}

impl CurrencyCode {
    /// Display prefix for amounts in this currency.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::LKR => "Rs.",
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
            Self::INR => "₹",
        }
    }

    /// The ISO 4217 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::LKR => "LKR",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::INR => "INR",
        }
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LKR" => Ok(Self::LKR),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "INR" => Ok(Self::INR),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_round_whole_half_away_from_zero() {
        assert_eq!(
            Money::new(Decimal::new(7505, 1)).round_whole(),
            Money::from_major(751)
        );
        assert_eq!(
            Money::new(Decimal::new(7504, 1)).round_whole(),
            Money::from_major(750)
        );
    }

    #[test]
    fn test_saturating_sub_floors_at_zero() {
        let a = Money::from_major(300);
        let b = Money::from_major(500);
        assert_eq!(a.saturating_sub(b), Money::ZERO);
        assert_eq!(b.saturating_sub(a), Money::from_major(200));
    }

    #[test]
    fn test_sum_and_quantity_multiplication() {
        let total: Money = [Money::from_major(100) * 2, Money::from_major(50)]
            .into_iter()
            .sum();
        assert_eq!(total, Money::from_major(250));
    }

    #[test]
    fn test_display_with_currency() {
        assert_eq!(
            Money::from_major(8_000).display(CurrencyCode::LKR),
            "Rs. 8,000"
        );
        assert_eq!(
            Money::from_major(1_234_567).display(CurrencyCode::USD),
            "$ 1,234,567"
        );
        assert_eq!(
            Money::new(Decimal::new(12_505, 1)).display(CurrencyCode::LKR),
            "Rs. 1,250.50"
        );
        assert_eq!(Money::ZERO.display(CurrencyCode::LKR), "Rs. 0");
    }

    #[test]
    fn test_deserializes_from_json_number() {
        let money: Money = serde_json::from_str("1499.5").unwrap();
        assert_eq!(money, Money::new(Decimal::new(14995, 1)));
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("lkr".parse::<CurrencyCode>().unwrap(), CurrencyCode::LKR);
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }
}
