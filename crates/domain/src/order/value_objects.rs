//! Value objects for the order domain.

use common::MenuItemId;
use serde::{Deserialize, Serialize};

use crate::{LineStatus, Money};

/// Customer details denormalized onto the order at creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub vip: bool,
    #[serde(default)]
    pub party_size: Option<u32>,
}

/// One line of an order.
///
/// Name, price, category, station and preparation time are copied from the
/// menu when the line is placed and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub menu_item_id: MenuItemId,
    pub name: String,
    pub category: String,
    /// Kitchen station that prepares the item ("grill", "bar", ...).
    pub station: String,
    pub preparation_minutes: u32,
    pub unit_price: Money,
    pub quantity: u32,
    #[serde(default)]
    pub special_instructions: Option<String>,
    /// Mirrors the matching kitchen ticket line; `pending` until a ticket exists.
    #[serde(default)]
    pub status: LineStatus,
}

impl OrderItem {
    /// Creates a new order line with status `pending`.
    pub fn new(
        menu_item_id: impl Into<MenuItemId>,
        name: impl Into<String>,
        station: impl Into<String>,
        unit_price: Money,
        quantity: u32,
    ) -> Self {
        Self {
            menu_item_id: menu_item_id.into(),
            name: name.into(),
            category: String::new(),
            station: station.into(),
            preparation_minutes: 0,
            unit_price,
            quantity,
            special_instructions: None,
            status: LineStatus::Pending,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_preparation_minutes(mut self, minutes: u32) -> Self {
        self.preparation_minutes = minutes;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.special_instructions = Some(instructions.into());
        self
    }

    /// Returns the total price for this line (quantity × unit_price).
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }

    /// Minutes the kitchen needs for this line.
    pub fn preparation_total_minutes(&self) -> u32 {
        self.preparation_minutes.saturating_mul(self.quantity)
    }
}

/// Computed bill amounts. Never edited by hand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
}

impl Totals {
    /// Recomputes totals from the lines, the discount and the tax rate.
    ///
    /// `total = subtotal - discount + tax`, with tax charged on the
    /// discounted subtotal and rounded half up. `None` if any amount
    /// overflows.
    pub fn compute(items: &[OrderItem], discount: Money, tax_rate_bps: u32) -> Option<Self> {
        let subtotal = items.iter().try_fold(Money::zero(), |sum, item| {
            sum.checked_add(item.unit_price.checked_multiply(item.quantity)?)
        })?;
        let taxable = subtotal.checked_sub(discount)?;
        let tax = taxable.basis_points(tax_rate_bps);
        Some(Self {
            subtotal,
            discount,
            tax,
            total: taxable.checked_add(tax)?,
        })
    }
}

/// Opaque checkout handle returned by the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkout {
    pub redirect_url: String,
    pub qr_payload: String,
}
