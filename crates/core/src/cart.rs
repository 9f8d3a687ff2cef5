//! Shopping cart bookkeeping.
//!
//! Line items are unique by product id. Adding a product that is already in
//! the cart merges the quantities instead of adding a second line.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId};
use crate::types::price::format_amount;

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub price: Price,
}

impl CartItem {
    /// Price of the whole line (`price × quantity`).
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price.times(self.quantity)
    }
}

/// An ordered collection of cart lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Add an item, merging quantity into an existing line with the same id.
    ///
    /// The existing line keeps its position, name and price.
    pub fn add(&mut self, item: CartItem) {
        if let Some(line) = self.items.iter_mut().find(|line| line.id == item.id) {
            line.quantity = line.quantity.saturating_add(item.quantity);
        } else {
            self.items.push(item);
        }
    }

    /// Remove the line with the given id. Returns whether a line was removed.
    pub fn remove(&mut self, id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|line| line.id != id);
        self.items.len() != before
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// The cart lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |count, line| count.saturating_add(line.quantity))
    }

    /// Sum of `price × quantity` over all lines.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// The total formatted for display (e.g., `$42.00`).
    #[must_use]
    pub fn total_display(&self) -> String {
        format_amount(self.total())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(id: i64, quantity: u32, price: &str) -> CartItem {
        CartItem {
            id: ProductId::new(id),
            name: format!("product-{id}"),
            quantity,
            price: Price::parse(price).unwrap(),
        }
    }

    #[test]
    fn test_duplicate_add_merges_quantity() {
        let mut cart = Cart::new();
        cart.add(item(5, 2, "1.00"));
        cart.add(item(5, 3, "1.00"));

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 5);
    }

    #[test]
    fn test_remove_leaves_empty_cart() {
        let mut cart = Cart::new();
        cart.add(item(5, 2, "1.00"));
        cart.add(item(5, 3, "1.00"));

        assert!(cart.remove(ProductId::new(5)));
        assert!(cart.is_empty());
        assert!(!cart.remove(ProductId::new(5)));
    }

    #[test]
    fn test_clear_always_empties() {
        let mut cart = Cart::new();
        cart.clear();
        assert!(cart.is_empty());

        cart.add(item(1, 1, "2.00"));
        cart.add(item(2, 4, "3.00"));
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.item_count(), 0);
    }

    #[test]
    fn test_merge_keeps_order() {
        let mut cart = Cart::new();
        cart.add(item(1, 1, "1.00"));
        cart.add(item(2, 1, "1.00"));
        cart.add(item(1, 1, "1.00"));

        let ids: Vec<_> = cart.items().iter().map(|line| line.id.as_i64()).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_total_sums_lines() {
        let mut cart = Cart::new();
        cart.add(item(1, 2, "1.25"));
        cart.add(item(2, 1, "10"));

        assert_eq!(cart.total(), Decimal::new(1250, 2));
        assert_eq!(cart.total_display(), "$12.50");
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_empty_total_is_zero() {
        assert_eq!(Cart::new().total_display(), "$0.00");
    }
}
