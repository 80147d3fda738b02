//! Value objects for cart lines.

use serde::{Deserialize, Serialize};

/// Name of a listed item (e.g. "Apple").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemName(String);

impl ItemName {
    /// Creates an item name from a string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the item name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ItemName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ItemName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Username of the seller who listed an item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SellerName(String);

impl SellerName {
    /// Creates a seller name from a string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the seller name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SellerName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SellerName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SellerName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for SellerName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identity of a line: the same item from two sellers is two lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineKey {
    pub item: ItemName,
    pub seller: SellerName,
}

impl LineKey {
    /// Creates a line key.
    pub fn new(item: impl Into<ItemName>, seller: impl Into<SellerName>) -> Self {
        Self {
            item: item.into(),
            seller: seller.into(),
        }
    }
}

impl std::fmt::Display for LineKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.item, self.seller)
    }
}

/// Largest unit cost a line may carry ($10,000,000.00).
pub const MAX_UNIT_COST_CENTS: i64 = 1_000_000_000;

/// Money amount represented in cents to avoid floating point issues.
///
/// Arithmetic saturates at the `i64` bounds instead of overflowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = $10.00)
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates a Money amount from a decimal unit price, rounding to the
    /// nearest cent.
    pub fn from_decimal(amount: f64) -> Self {
        Self {
            cents: (amount * 100.0).round() as i64,
        }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the amount as a decimal unit price.
    pub fn as_decimal(&self) -> f64 {
        self.cents as f64 / 100.0
    }

    /// Returns the dollar portion (whole number).
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            cents: self.cents.saturating_mul(i64::from(quantity)),
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-${}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents.saturating_add(rhs.cents),
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents = self.cents.saturating_add(rhs.cents);
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// One (item, seller) entry in a cart or in the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// The item being bought.
    pub item: ItemName,

    /// The seller who listed it.
    pub seller: SellerName,

    /// Units requested.
    pub quantity: u32,

    /// Price per unit.
    pub unit_cost: Money,
}

impl CartLine {
    /// Creates a new line.
    pub fn new(
        item: impl Into<ItemName>,
        seller: impl Into<SellerName>,
        quantity: u32,
        unit_cost: Money,
    ) -> Self {
        Self {
            item: item.into(),
            seller: seller.into(),
            quantity,
            unit_cost,
        }
    }

    /// Returns the key identifying this line.
    pub fn key(&self) -> LineKey {
        LineKey {
            item: self.item.clone(),
            seller: self.seller.clone(),
        }
    }

    /// Returns true if this line has the given key.
    pub fn has_key(&self, key: &LineKey) -> bool {
        self.item == key.item && self.seller == key.seller
    }

    /// Returns the total cost for this line (quantity * unit_cost).
    pub fn total_cost(&self) -> Money {
        self.unit_cost.multiply(self.quantity)
    }

    /// Checks the line is well formed.
    pub fn validate(&self) -> crate::Result<()> {
        if self.item.as_str().trim().is_empty() {
            return Err(crate::CartError::InvalidLine(
                "item name is empty".to_string(),
            ));
        }
        if self.seller.as_str().trim().is_empty() {
            return Err(crate::CartError::InvalidLine(
                "seller name is empty".to_string(),
            ));
        }
        if self.unit_cost.is_negative() {
            return Err(crate::CartError::InvalidLine(format!(
                "unit cost {} is negative",
                self.unit_cost
            )));
        }
        if self.unit_cost.cents() > MAX_UNIT_COST_CENTS {
            return Err(crate::CartError::InvalidLine(format!(
                "unit cost {} exceeds {}",
                self.unit_cost,
                Money::from_cents(MAX_UNIT_COST_CENTS)
            )));
        }
        Ok(())
    }
}
