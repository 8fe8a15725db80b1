//! # Draft Sale
//!
//! The in-progress sale the cashier is building.
//!
//! Every mutation is synchronous and side-effect free. After each one the
//! draft is recomputed: the total from its lines and manual charge, then the
//! payment splits against the new total.
//!
//! ## Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cashier Action           DraftSale method          Recompute?          │
//! │  ──────────────           ────────────────          ──────────          │
//! │  Scan barcode ──────────► scan_product()  ────────► total + splits      │
//! │  Pick product ──────────► add_product()   ────────► total + splits      │
//! │  Type quantity ─────────► set_quantity()  ────────► total + splits      │
//! │  Switch Kg/gr ──────────► change_unit()   ────────► total + splits      │
//! │  Extra charge ──────────► set_manual_amount() ────► total + splits      │
//! │  Type split amount ─────► set_payment_amount() ───► splits only         │
//! │  Add / remove method ───► add_payment() ... ──────► splits only         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//! ```text
//! Editing ──► Validating ──► Committing ──► Committed (terminal)
//!    ▲             │              │
//!    │             ▼              ▼
//!    └────────── Rejected ◄───────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::payment::PaymentSplits;
use crate::pricing;
use crate::types::{Customer, PaymentMethod, Product, SaleLineItem};
use crate::units::Unit;
use crate::validation;

/// Where a draft is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    #[default]
    Editing,
    Validating,
    Committing,
    Committed,
    /// Last commit attempt failed; the next edit returns to `Editing`.
    Rejected,
}

impl DraftStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DraftStatus::Editing => "editing",
            DraftStatus::Validating => "validating",
            DraftStatus::Committing => "committing",
            DraftStatus::Committed => "committed",
            DraftStatus::Rejected => "rejected",
        }
    }
}

/// An in-progress sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DraftSale {
    /// Id the sale will be committed under.
    pub id: String,
    items: Vec<SaleLineItem>,
    manual_amount: Option<Money>,
    payments: PaymentSplits,
    total: Money,
    credit: bool,
    customer_name: String,
    customer_phone: String,
    /// Set when the cashier picked an existing customer from the list.
    selected_customer_id: Option<String>,
    /// Scratch field for the barcode input.
    pub barcode: Option<String>,
    status: DraftStatus,
}

impl DraftSale {
    /// Creates an empty draft paid in cash.
    pub fn new() -> Self {
        DraftSale {
            id: uuid::Uuid::new_v4().to_string(),
            items: Vec::new(),
            manual_amount: None,
            payments: PaymentSplits::single(PaymentMethod::Cash, Money::zero()),
            total: Money::zero(),
            credit: false,
            customer_name: String::new(),
            customer_phone: String::new(),
            selected_customer_id: None,
            barcode: None,
            status: DraftStatus::Editing,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn items(&self) -> &[SaleLineItem] {
        &self.items
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn manual_amount(&self) -> Option<Money> {
        self.manual_amount
    }

    pub fn payments(&self) -> &PaymentSplits {
        &self.payments
    }

    pub fn is_credit(&self) -> bool {
        self.credit
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn customer_phone(&self) -> &str {
        &self.customer_phone
    }

    pub fn selected_customer_id(&self) -> Option<&str> {
        self.selected_customer_id.as_deref()
    }

    pub fn status(&self) -> DraftStatus {
        self.status
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    // -------------------------------------------------------------------------
    // Line Items
    // -------------------------------------------------------------------------

    /// Adds a line for `product` in the given quantity and unit.
    ///
    /// ## Errors
    /// - `Validation` if the unit belongs to another family than the
    ///   product's stock unit, or the draft is full
    /// - `InsufficientStock` if the product has no stock left at all
    ///
    /// Partial shortages are caught at commit, against the stored level.
    pub fn add_product(&mut self, product: &Product, quantity: f64, unit: Unit) -> CoreResult<()> {
        self.ensure_editable()?;
        if product.is_out_of_stock() {
            return Err(CoreError::InsufficientStock {
                product: product.name.clone(),
                available: product.stock.max(0.0),
                unit: product.unit,
                requested: quantity,
                requested_unit: unit,
            });
        }
        if !unit.is_compatible_with(product.unit) {
            return Err(ValidationError::IncompatibleUnit {
                field: "unit".to_string(),
                from: product.unit,
                to: unit,
            }
            .into());
        }
        validation::validate_quantity(quantity)?;
        validation::validate_line_count(self.items.len())?;

        self.items.push(SaleLineItem::from_product(product, quantity, unit));
        self.refresh();
        Ok(())
    }

    /// Barcode scan: one more of `product`.
    ///
    /// An existing line for the product grows by 1 in its own unit;
    /// otherwise a new line of 1 in the product's unit is added.
    pub fn scan_product(&mut self, product: &Product) -> CoreResult<()> {
        self.ensure_editable()?;
        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product.id) {
            item.quantity += 1.0;
            self.barcode = None;
            self.refresh();
            return Ok(());
        }
        self.add_product(product, 1.0, product.unit)?;
        self.barcode = None;
        Ok(())
    }

    /// Sets the quantity of line `index`.
    ///
    /// Zero is accepted while editing; the commit rejects it.
    pub fn set_quantity(&mut self, index: usize, quantity: f64) -> CoreResult<()> {
        self.ensure_editable()?;
        if !quantity.is_finite() || quantity < 0.0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }
        self.item_mut(index)?.quantity = quantity;
        self.refresh();
        Ok(())
    }

    /// Switches line `index` to another unit of the same family, keeping
    /// the physical amount (1.5 Kg becomes 1500 gr).
    pub fn change_unit(&mut self, index: usize, unit: Unit) -> CoreResult<()> {
        self.ensure_editable()?;
        let item = self.item_mut(index)?;
        item.quantity = pricing::change_unit(item.quantity, item.unit, unit)?;
        item.unit = unit;
        self.refresh();
        Ok(())
    }

    /// Attaches a promotion discount to line `index`. Ticket display only.
    pub fn set_discount(&mut self, index: usize, discount_pct: Option<f64>) -> CoreResult<()> {
        self.ensure_editable()?;
        if let Some(pct) = discount_pct {
            if !(0.0..=100.0).contains(&pct) {
                return Err(ValidationError::OutOfRange {
                    field: "discount".to_string(),
                    min: 0,
                    max: 100,
                }
                .into());
            }
        }
        self.item_mut(index)?.discount_pct = discount_pct;
        Ok(())
    }

    pub fn remove_item(&mut self, index: usize) -> CoreResult<SaleLineItem> {
        self.ensure_editable()?;
        self.item_mut(index)?;
        let removed = self.items.remove(index);
        self.refresh();
        Ok(removed)
    }

    /// Sets the non-product charge. `None` clears it.
    pub fn set_manual_amount(&mut self, amount: Option<Money>) -> CoreResult<()> {
        self.ensure_editable()?;
        if let Some(amount) = amount {
            validation::validate_price(amount)?;
        }
        self.manual_amount = amount.filter(|a| !a.is_zero());
        self.refresh();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Payments
    // -------------------------------------------------------------------------

    /// Cashier typed an amount for split `index`.
    pub fn set_payment_amount(&mut self, index: usize, amount: Money) -> CoreResult<()> {
        self.ensure_editable()?;
        self.payments.set_amount(index, amount, self.total)?;
        Ok(())
    }

    pub fn set_payment_method(&mut self, index: usize, method: PaymentMethod) -> CoreResult<()> {
        self.ensure_editable()?;
        self.payments.set_method(index, method)?;
        Ok(())
    }

    /// Adds a payment method. Returns `false` when all methods are in use.
    pub fn add_payment(&mut self) -> CoreResult<bool> {
        self.ensure_editable()?;
        Ok(self.payments.add(self.total))
    }

    pub fn remove_payment(&mut self, index: usize) -> CoreResult<()> {
        self.ensure_editable()?;
        self.payments.remove(index, self.total)?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Credit & Customer
    // -------------------------------------------------------------------------

    /// Marks the sale as on account (no payment now).
    pub fn set_credit(&mut self, credit: bool) -> CoreResult<()> {
        self.ensure_editable()?;
        self.credit = credit;
        Ok(())
    }

    /// Types a customer name, dropping any selection from the list.
    pub fn set_customer(&mut self, name: &str, phone: &str) -> CoreResult<()> {
        self.ensure_editable()?;
        self.customer_name = name.to_string();
        self.customer_phone = phone.to_string();
        self.selected_customer_id = None;
        Ok(())
    }

    /// Picks an existing customer.
    pub fn select_customer(&mut self, customer: &Customer) -> CoreResult<()> {
        self.ensure_editable()?;
        self.customer_name = customer.name.clone();
        self.customer_phone = customer.phone.clone();
        self.selected_customer_id = Some(customer.id.clone());
        Ok(())
    }

    pub fn clear_customer(&mut self) -> CoreResult<()> {
        self.set_customer("", "")
    }

    // -------------------------------------------------------------------------
    // Recompute
    // -------------------------------------------------------------------------

    /// Recomputes the total and re-targets the payment splits.
    ///
    /// Mutators call this themselves; it is exposed for drafts rebuilt from
    /// the UI's serialized state.
    pub fn recompute(mut self) -> Self {
        self.refresh();
        self
    }

    fn refresh(&mut self) {
        self.total = pricing::sale_total(&self.items, self.manual_amount);
        self.payments.sync_total(self.total);
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Editing (or Rejected) → Validating.
    pub fn begin_validation(&mut self) -> CoreResult<()> {
        self.ensure_editable()?;
        self.status = DraftStatus::Validating;
        Ok(())
    }

    /// Validating → Committing.
    pub fn begin_commit(&mut self) -> CoreResult<()> {
        self.transition(DraftStatus::Validating, DraftStatus::Committing)
    }

    /// Committing → Committed.
    pub fn mark_committed(&mut self) -> CoreResult<()> {
        self.transition(DraftStatus::Committing, DraftStatus::Committed)
    }

    /// Any in-flight state → Rejected. A committed draft stays committed.
    pub fn mark_rejected(&mut self) {
        if self.status != DraftStatus::Committed {
            self.status = DraftStatus::Rejected;
        }
    }

    fn transition(&mut self, from: DraftStatus, to: DraftStatus) -> CoreResult<()> {
        if self.status != from {
            return Err(self.invalid_status());
        }
        self.status = to;
        Ok(())
    }

    fn ensure_editable(&mut self) -> CoreResult<()> {
        match self.status {
            DraftStatus::Editing => Ok(()),
            DraftStatus::Rejected => {
                self.status = DraftStatus::Editing;
                Ok(())
            }
            _ => Err(self.invalid_status()),
        }
    }

    fn invalid_status(&self) -> CoreError {
        CoreError::InvalidSaleStatus {
            sale_id: self.id.clone(),
            current_status: self.status.as_str().to_string(),
        }
    }

    fn item_mut(&mut self, index: usize) -> CoreResult<&mut SaleLineItem> {
        let len = self.items.len();
        self.items.get_mut(index).ok_or_else(|| {
            ValidationError::OutOfRange {
                field: "line".to_string(),
                min: 0,
                max: len as i64 - 1,
            }
            .into()
        })
    }
}

impl Default for DraftSale {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheese() -> Product {
        Product::new(
            "Queso",
            Money::from_cents(10000),
            Money::from_cents(6000),
            5.0,
            Unit::Kilogram,
        )
    }

    fn soda() -> Product {
        Product::new("Soda", Money::from_cents(250), Money::from_cents(100), 24.0, Unit::Unit)
    }

    #[test]
    fn test_add_product_updates_total_and_split() {
        let mut draft = DraftSale::new();
        draft.add_product(&cheese(), 2000.0, Unit::Gram).unwrap();

        assert_eq!(draft.total().cents(), 20000);
        assert_eq!(draft.payments().total_paid().cents(), 20000);
    }

    #[test]
    fn test_add_product_rejects_empty_stock() {
        let mut product = soda();
        product.stock = 0.0;
        let mut draft = DraftSale::new();

        let err = draft.add_product(&product, 1.0, Unit::Unit).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { available, .. } if available == 0.0));
        assert!(draft.scan_product(&product).is_err());
        assert!(draft.is_empty());
    }

    #[test]
    fn test_large_gram_line_is_accepted() {
        let mut flour = cheese();
        flour.stock = 200.0;
        let mut draft = DraftSale::new();
        draft.add_product(&flour, 150_000.0, Unit::Gram).unwrap();
        assert_eq!(draft.total().cents(), 1_500_000);

        let mut draft = DraftSale::new();
        draft.add_product(&flour, 150.0, Unit::Kilogram).unwrap();
        draft.change_unit(0, Unit::Gram).unwrap();
        assert_eq!(draft.items()[0].quantity, 150_000.0);
    }

    #[test]
    fn test_scan_increments_existing_line() {
        let soda = soda();
        let mut draft = DraftSale::new();
        draft.barcode = Some("7790001".to_string());
        draft.scan_product(&soda).unwrap();
        draft.scan_product(&soda).unwrap();

        assert_eq!(draft.items().len(), 1);
        assert_eq!(draft.items()[0].quantity, 2.0);
        assert_eq!(draft.total().cents(), 500);
        assert!(draft.barcode.is_none());
    }

    #[test]
    fn test_change_unit_preserves_amount() {
        let mut draft = DraftSale::new();
        draft.add_product(&cheese(), 1.5, Unit::Kilogram).unwrap();
        draft.change_unit(0, Unit::Gram).unwrap();

        assert_eq!(draft.items()[0].quantity, 1500.0);
        assert_eq!(draft.items()[0].unit, Unit::Gram);
        assert_eq!(draft.total().cents(), 15000);

        let err = draft.change_unit(0, Unit::Liter).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::IncompatibleUnit { .. })));
        assert_eq!(draft.items()[0].unit, Unit::Gram);
    }

    #[test]
    fn test_add_product_rejects_foreign_unit() {
        let mut draft = DraftSale::new();
        let err = draft.add_product(&soda(), 1.0, Unit::Kilogram).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(draft.is_empty());
    }

    #[test]
    fn test_manual_amount_moves_last_split() {
        let mut draft = DraftSale::new();
        draft.add_product(&cheese(), 1.0, Unit::Kilogram).unwrap();
        draft.add_payment().unwrap();
        draft.set_payment_amount(0, Money::from_cents(4000)).unwrap();

        draft.set_manual_amount(Some(Money::from_cents(500))).unwrap();
        assert_eq!(draft.total().cents(), 10500);
        let amounts: Vec<i64> = draft.payments().as_slice().iter().map(|s| s.amount.cents()).collect();
        assert_eq!(amounts, vec![4000, 6500]);
    }

    /// Total 150.00 with Cash 150 + Transfer 0; Cash edited to 100.
    #[test]
    fn test_two_way_split_edit() {
        let mut draft = DraftSale::new();
        draft.add_product(&cheese(), 1.5, Unit::Kilogram).unwrap();
        assert!(draft.add_payment().unwrap());
        draft.set_payment_amount(0, Money::from_cents(10000)).unwrap();

        let splits = draft.payments().as_slice();
        assert_eq!(splits[0].method, PaymentMethod::Cash);
        assert_eq!(splits[1].method, PaymentMethod::Transfer);
        assert_eq!(splits[1].amount.cents(), 5000);
        assert!(draft.payments().check_balance(draft.total()).is_ok());
    }

    #[test]
    fn test_remove_item() {
        let mut draft = DraftSale::new();
        draft.add_product(&cheese(), 1.0, Unit::Kilogram).unwrap();
        draft.add_product(&soda(), 2.0, Unit::Unit).unwrap();

        let removed = draft.remove_item(0).unwrap();
        assert_eq!(removed.name, "Queso");
        assert_eq!(draft.total().cents(), 500);
        assert!(draft.remove_item(5).is_err());
    }

    #[test]
    fn test_quantity_edits() {
        let mut draft = DraftSale::new();
        draft.add_product(&soda(), 1.0, Unit::Unit).unwrap();
        draft.set_quantity(0, 0.0).unwrap();
        assert!(draft.total().is_zero());
        assert!(draft.set_quantity(0, -1.0).is_err());
        assert!(draft.set_quantity(0, f64::NAN).is_err());
    }

    #[test]
    fn test_committed_draft_is_frozen() {
        let mut draft = DraftSale::new();
        draft.add_product(&soda(), 1.0, Unit::Unit).unwrap();
        draft.begin_validation().unwrap();
        draft.begin_commit().unwrap();
        draft.mark_committed().unwrap();

        let err = draft.add_product(&soda(), 1.0, Unit::Unit).unwrap_err();
        assert!(matches!(err, CoreError::InvalidSaleStatus { .. }));
        draft.mark_rejected();
        assert_eq!(draft.status(), DraftStatus::Committed);
    }

    #[test]
    fn test_rejected_draft_returns_to_editing() {
        let mut draft = DraftSale::new();
        draft.begin_validation().unwrap();
        draft.mark_rejected();
        assert_eq!(draft.status(), DraftStatus::Rejected);

        draft.add_product(&soda(), 1.0, Unit::Unit).unwrap();
        assert_eq!(draft.status(), DraftStatus::Editing);
    }

    #[test]
    fn test_select_then_type_clears_selection() {
        let customer = Customer::new("Ana", "555", chrono::Utc::now());
        let mut draft = DraftSale::new();
        draft.select_customer(&customer).unwrap();
        assert_eq!(draft.selected_customer_id(), Some(customer.id.as_str()));

        draft.set_customer("Ana B", "").unwrap();
        assert!(draft.selected_customer_id().is_none());
    }

    #[test]
    fn test_recompute_rebuilds_total() {
        let mut draft = DraftSale::new();
        draft.add_product(&soda(), 2.0, Unit::Unit).unwrap();
        let json = serde_json::to_string(&draft).unwrap();
        let restored: DraftSale = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.recompute().total().cents(), 500);
    }
}
