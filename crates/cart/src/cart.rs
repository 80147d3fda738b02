//! A single buyer's cart.

use indexmap::IndexMap;

use crate::error::{CartError, Result};
use crate::value_objects::{CartLine, LineKey, Money};

/// Ordered collection of cart lines, unique by `(item, seller)`.
///
/// Iteration order is insertion order and is the order lines are shown
/// and checked out in. Positions are 1-based.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: IndexMap<LineKey, CartLine>,
}

impl Cart {
    /// Creates an empty cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a line, merging into an existing line with the same key.
    ///
    /// On merge the quantities are summed and every other field takes the
    /// new line's value; the line keeps its position. Returns the 1-based
    /// position of the line.
    pub fn add_or_merge(&mut self, line: CartLine) -> Result<usize> {
        line.validate()?;

        match self.lines.get_full_mut(&line.key()) {
            Some((index, _, existing)) => {
                let quantity = existing.quantity.checked_add(line.quantity).ok_or_else(|| {
                    CartError::InvalidLine(format!("quantity overflow for {}", line.key()))
                })?;
                *existing = CartLine { quantity, ..line };
                Ok(index + 1)
            }
            None => {
                let (index, _) = self.lines.insert_full(line.key(), line);
                Ok(index + 1)
            }
        }
    }

    /// Adds a line like [`add_or_merge`](Self::add_or_merge), refusing to
    /// let the line's merged quantity exceed `stock`.
    pub fn add_within(&mut self, line: CartLine, stock: u32) -> Result<usize> {
        let held = self.lines.get(&line.key()).map_or(0, |l| l.quantity);
        let available = stock.saturating_sub(held);
        if line.quantity > available {
            return Err(CartError::InsufficientStock {
                item: line.item.to_string(),
                seller: line.seller.to_string(),
                available,
            });
        }
        self.add_or_merge(line)
    }

    /// Takes a line that checkout applied out of the cart.
    ///
    /// When the line for the same key holds more than `applied.quantity`
    /// (more was merged in after checkout read the cart), only the applied
    /// quantity is subtracted and the rest keeps its position. Returns the
    /// line left behind, if any.
    pub fn settle(&mut self, applied: &CartLine) -> Option<CartLine> {
        let key = applied.key();
        match self.lines.get_mut(&key) {
            Some(line) if line.quantity > applied.quantity => {
                line.quantity -= applied.quantity;
                Some(line.clone())
            }
            Some(_) => {
                self.remove(&key);
                None
            }
            None => None,
        }
    }

    /// Finds the line for `key` and its 1-based position.
    pub fn find(&self, key: &LineKey) -> Result<(&CartLine, usize)> {
        self.lines
            .get_full(key)
            .map(|(index, _, line)| (line, index + 1))
            .ok_or_else(|| CartError::NotFound {
                item: key.item.to_string(),
                seller: key.seller.to_string(),
            })
    }

    /// Returns the line at a 1-based position.
    pub fn get(&self, position: usize) -> Result<&CartLine> {
        let index = self.index_of(position)?;
        self.lines
            .get_index(index)
            .map(|(_, line)| line)
            .ok_or(CartError::InvalidPosition {
                position,
                size: self.len(),
            })
    }

    /// Overwrites the line at a 1-based position, returning the old line.
    ///
    /// The new line may carry a different key as long as no other line
    /// already uses it.
    pub fn replace_at(&mut self, position: usize, line: CartLine) -> Result<CartLine> {
        let index = self.index_of(position)?;
        line.validate()?;

        let key = line.key();
        match self.lines.get_index_of(&key) {
            Some(other) if other != index => {
                return Err(CartError::DuplicateLine {
                    item: key.item.to_string(),
                    seller: key.seller.to_string(),
                    position: other + 1,
                });
            }
            _ => {}
        }

        let (_, old) = self.lines.shift_remove_index(index).ok_or(
            CartError::InvalidPosition {
                position,
                size: self.len(),
            },
        )?;
        self.lines.shift_insert(index, key, line);
        Ok(old)
    }

    /// Removes and returns the line at a 1-based position.
    pub fn remove_at(&mut self, position: usize) -> Result<CartLine> {
        let index = self.index_of(position)?;
        self.lines
            .shift_remove_index(index)
            .map(|(_, line)| line)
            .ok_or(CartError::InvalidPosition {
                position,
                size: self.len(),
            })
    }

    /// Removes the line for `key`, if present.
    pub fn remove(&mut self, key: &LineKey) -> Option<CartLine> {
        self.lines.shift_remove(key)
    }

    /// Returns a snapshot of every line in order.
    pub fn lines(&self) -> Vec<CartLine> {
        self.lines.values().cloned().collect()
    }

    /// Iterates over lines in order.
    pub fn iter(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.values()
    }

    /// Returns the cost of the whole cart.
    pub fn total(&self) -> Money {
        self.lines.values().map(CartLine::total_cost).sum()
    }

    /// Empties the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Returns the number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns true if the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn index_of(&self, position: usize) -> Result<usize> {
        if position == 0 || position > self.lines.len() {
            return Err(CartError::InvalidPosition {
                position,
                size: self.lines.len(),
            });
        }
        Ok(position - 1)
    }
}
