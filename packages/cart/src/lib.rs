#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Session cart of selected samples.
//!
//! A [`Cart`] holds at most one [`CartEntry`] per sample id. Requested
//! quantities stay within `1..=available` whenever the sample's available
//! quantity is known. The cart lives only as long as the browsing session
//! that owns it; stock is never decremented here.

use sample_exchange_sample_models::SampleRecord;
use serde::{Deserialize, Serialize};

/// Errors returned by cart mutations. A failed mutation leaves the cart
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    /// The sample id is not in the cart.
    #[error("Sample {id} is not in the cart")]
    NotInCart {
        /// Requested sample id.
        id: String,
    },

    /// Quantity input was not a whole number.
    #[error("Quantity must be a whole number, got '{input}'")]
    NotANumber {
        /// The rejected input.
        input: String,
    },

    /// Quantity was zero or negative.
    #[error("Quantity must be at least 1, got {quantity}")]
    BelowMinimum {
        /// The rejected quantity.
        quantity: i64,
    },

    /// Quantity exceeded the known available stock.
    #[error("Only {available} of sample {id} available, requested {quantity}")]
    ExceedsAvailable {
        /// Sample id.
        id: String,
        /// The rejected quantity.
        quantity: i64,
        /// Units available.
        available: u32,
    },

    /// Quantity does not fit the cart's counter.
    #[error("Quantity {quantity} is too large")]
    TooLarge {
        /// The rejected quantity.
        quantity: i64,
    },

    /// The sample has a known available quantity of zero.
    #[error("Sample {id} is out of stock")]
    OutOfStock {
        /// Sample id.
        id: String,
    },
}

/// Result of [`Cart::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new entry with quantity 1 was created.
    Added,
    /// The sample was already in the cart; nothing changed.
    AlreadyPresent,
}

/// A sample paired with the quantity requested for purchase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartEntry {
    /// The selected sample.
    pub sample: SampleRecord,
    /// Requested quantity.
    pub quantity: u32,
}

impl CartEntry {
    /// `price × quantity`, unrounded.
    #[must_use]
    pub fn line_total(&self) -> f64 {
        self.sample.price * f64::from(self.quantity)
    }
}

/// One line of an [`OrderSummary`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    /// Sample id.
    pub sample_id: String,
    /// Sample name at checkout time.
    pub name: String,
    /// Requested quantity.
    pub quantity: u32,
    /// Unit price.
    pub unit_price: f64,
    /// `unit_price × quantity`, rounded to cents.
    pub line_total: f64,
}

/// Snapshot of the cart taken at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    /// Lines in the order they were added.
    pub lines: Vec<OrderLine>,
    /// Sum of all quantities.
    pub item_count: u64,
    /// Order total, rounded to cents.
    pub total: f64,
}

/// Rounds to two decimal places for display.
#[must_use]
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// In-memory cart owned by one browsing session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Cart {
    entries: Vec<CartEntry>,
}

impl Cart {
    /// Creates an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds a sample with quantity 1.
    ///
    /// Adding a sample that is already present is a no-op and reports
    /// [`AddOutcome::AlreadyPresent`].
    ///
    /// # Errors
    ///
    /// Returns [`CartError::OutOfStock`] when the sample's available quantity
    /// is known to be zero.
    pub fn add(&mut self, sample: SampleRecord) -> Result<AddOutcome, CartError> {
        if self.contains(&sample.id) {
            log::debug!("Sample {} already in cart", sample.id);
            return Ok(AddOutcome::AlreadyPresent);
        }
        if sample.quantity == Some(0) {
            return Err(CartError::OutOfStock { id: sample.id });
        }
        self.entries.push(CartEntry {
            sample,
            quantity: 1,
        });
        Ok(AddOutcome::Added)
    }

    /// Sets the requested quantity for a sample already in the cart.
    ///
    /// # Errors
    ///
    /// * [`CartError::NotInCart`] if `id` is not in the cart
    /// * [`CartError::BelowMinimum`] if `quantity < 1`
    /// * [`CartError::TooLarge`] if `quantity` does not fit in a `u32`
    /// * [`CartError::ExceedsAvailable`] if `quantity` is larger than the
    ///   sample's known available quantity
    pub fn set_quantity(&mut self, id: &str, quantity: i64) -> Result<(), CartError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.sample.id == id)
            .ok_or_else(|| CartError::NotInCart { id: id.to_string() })?;

        if quantity < 1 {
            return Err(CartError::BelowMinimum { quantity });
        }

        let Ok(requested) = u32::try_from(quantity) else {
            return Err(CartError::TooLarge { quantity });
        };
        if let Some(available) = entry.sample.quantity
            && requested > available
        {
            return Err(CartError::ExceedsAvailable {
                id: id.to_string(),
                quantity,
                available,
            });
        }

        entry.quantity = requested;
        Ok(())
    }

    /// Parses free-text quantity input (e.g. from a form field) and applies
    /// it with [`Cart::set_quantity`].
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotANumber`] for non-integer input, otherwise
    /// the errors of [`Cart::set_quantity`].
    pub fn set_quantity_from_input(&mut self, id: &str, input: &str) -> Result<(), CartError> {
        let quantity = input
            .trim()
            .parse::<i64>()
            .map_err(|_| CartError::NotANumber {
                input: input.to_string(),
            })?;
        self.set_quantity(id, quantity)
    }

    /// Removes a sample. Returns whether an entry was removed; removing an
    /// absent id is a no-op.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.sample.id != id);
        before != self.entries.len()
    }

    /// Sum of `price × quantity` over all entries, rounded to cents.
    #[must_use]
    pub fn total(&self) -> f64 {
        round_cents(self.entries.iter().map(CartEntry::line_total).sum())
    }

    /// Sum of all requested quantities.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.entries.iter().map(|e| u64::from(e.quantity)).sum()
    }

    /// Whether a sample id is in the cart.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.sample.id == id)
    }

    /// Looks up the entry for a sample id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CartEntry> {
        self.entries.iter().find(|e| e.sample.id == id)
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[CartEntry] {
        &self.entries
    }

    /// Number of distinct samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cart has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Builds an [`OrderSummary`] from the current entries and empties the
    /// cart.
    pub fn checkout(&mut self) -> OrderSummary {
        let summary = OrderSummary {
            lines: self
                .entries
                .iter()
                .map(|e| OrderLine {
                    sample_id: e.sample.id.clone(),
                    name: e.sample.name.clone(),
                    quantity: e.quantity,
                    unit_price: e.sample.price,
                    line_total: round_cents(e.line_total()),
                })
                .collect(),
            item_count: self.item_count(),
            total: self.total(),
        };
        log::info!(
            "Checked out {} line(s), {} item(s), total {:.2}",
            summary.lines.len(),
            summary.item_count,
            summary.total
        );
        self.clear();
        summary
    }
}
