//! Invoices produced by a completed checkout.

use cart::{CartLine, Money, SellerName};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The lines bought from one seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerSection {
    pub seller: SellerName,
    pub lines: Vec<CartLine>,
    pub subtotal: Money,
}

/// Summary of one checkout, sent to the buyer and to every seller in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub buyer: String,
    pub issued_at: DateTime<Utc>,
    /// One section per seller, in the order sellers first appear in the cart.
    pub sections: Vec<SellerSection>,
    pub total: Money,
}

impl Invoice {
    /// Groups `lines` by seller.
    pub fn new(buyer: impl Into<String>, lines: &[CartLine], issued_at: DateTime<Utc>) -> Self {
        let mut by_seller: IndexMap<SellerName, Vec<CartLine>> = IndexMap::new();
        for line in lines {
            by_seller
                .entry(line.seller.clone())
                .or_default()
                .push(line.clone());
        }

        let sections: Vec<SellerSection> = by_seller
            .into_iter()
            .map(|(seller, lines)| SellerSection {
                subtotal: lines.iter().map(CartLine::total_cost).sum(),
                seller,
                lines,
            })
            .collect();
        let total = sections.iter().map(|s| s.subtotal).sum();

        Self {
            buyer: buyer.into(),
            issued_at,
            sections,
            total,
        }
    }

    /// Returns the distinct sellers on the invoice.
    pub fn sellers(&self) -> impl Iterator<Item = &SellerName> {
        self.sections.iter().map(|s| &s.seller)
    }

    /// Returns who gets a copy: the buyer first, then each distinct seller.
    pub fn recipients(&self) -> Vec<String> {
        std::iter::once(self.buyer.clone())
            .chain(self.sellers().map(|s| s.to_string()))
            .collect()
    }
}
