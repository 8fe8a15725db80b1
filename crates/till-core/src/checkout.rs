//! # Checkout Rules
//!
//! The pure half of sale finalization: decide whether a draft may be
//! committed and build the records the commit will write.
//!
//! ```text
//! DraftSale ──► validate_draft() ──► ValidatedSale ──► build_sale() ──► Sale
//!                    │                                                   │
//!                    ▼                                                   ▼
//!         Validation / PaymentMismatch /              DailyCashMovement::for_sale
//!         DuplicateCustomer                           (non-credit only)
//! ```
//!
//! Stock is checked by [`crate::stock::reserve_for_sale`] once the products
//! are loaded inside the commit transaction.

use chrono::{DateTime, Utc};

use crate::draft::DraftSale;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::pricing;
use crate::types::{normalize_customer_name, Customer, PaymentSplit, Sale, SaleLineItem};
use crate::validation;
use crate::WALK_IN_CUSTOMER;

/// Who the sale is recorded against.
#[derive(Debug, Clone, PartialEq)]
pub enum CustomerChoice {
    /// Non-credit sale.
    WalkIn,
    /// Credit sale for a customer picked from the list.
    Existing { id: String, name: String, phone: String },
    /// Credit sale for a name not on file; the commit creates it.
    New { name: String, phone: String },
}

/// A draft that passed every pre-commit rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSale {
    pub sale_id: String,
    pub items: Vec<SaleLineItem>,
    pub total: Money,
    pub manual_amount: Option<Money>,
    pub credit: bool,
    /// Empty for credit sales.
    pub payment_splits: Vec<PaymentSplit>,
    pub customer: CustomerChoice,
    pub barcode: Option<String>,
}

/// Runs the pre-commit rules on `draft`.
///
/// `existing` is the stored customer whose name matches the draft's
/// customer name case-insensitively, if any.
///
/// ## Rules
/// 1. At least one line, every quantity positive
/// 2. Non-credit: payment splits add up exactly to the total
/// 3. Credit: a customer name is given; if it matches a stored customer,
///    that customer must be the one selected
///
/// ## Errors
/// `Validation`, `PaymentMismatch`, `DuplicateCustomer`
pub fn validate_draft(draft: &DraftSale, existing: Option<&Customer>) -> CoreResult<ValidatedSale> {
    if draft.items().is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        }
        .into());
    }
    for item in draft.items() {
        validation::validate_quantity(item.quantity)?;
    }

    // Recomputed here so a stale serialized total cannot slip through.
    let total = pricing::sale_total(draft.items(), draft.manual_amount());

    let (payment_splits, customer) = if draft.is_credit() {
        (Vec::new(), resolve_credit_customer(draft, existing)?)
    } else {
        draft.payments().check_balance(total)?;
        let splits = draft
            .payments()
            .as_slice()
            .iter()
            .copied()
            .filter(|s| !s.amount.is_zero())
            .collect();
        (splits, CustomerChoice::WalkIn)
    };

    Ok(ValidatedSale {
        sale_id: draft.id.clone(),
        items: draft.items().to_vec(),
        total,
        manual_amount: draft.manual_amount(),
        credit: draft.is_credit(),
        payment_splits,
        customer,
        barcode: draft.barcode.clone(),
    })
}

fn resolve_credit_customer(draft: &DraftSale, existing: Option<&Customer>) -> CoreResult<CustomerChoice> {
    validation::validate_customer_name(draft.customer_name())?;
    let name = normalize_customer_name(draft.customer_name());

    match existing {
        Some(customer) if draft.selected_customer_id() == Some(customer.id.as_str()) => {
            Ok(CustomerChoice::Existing {
                id: customer.id.clone(),
                name: customer.name.clone(),
                phone: customer.phone.clone(),
            })
        }
        Some(customer) => Err(CoreError::DuplicateCustomer {
            name: customer.name.clone(),
        }),
        None => match draft.selected_customer_id() {
            // Selected customer was renamed or deleted since it was picked.
            Some(id) => Err(ValidationError::InvalidFormat {
                field: "customer".to_string(),
                reason: format!("selected customer {} no longer matches '{}'", id, name),
            }
            .into()),
            None => Ok(CustomerChoice::New {
                name,
                phone: draft.customer_phone().trim().to_string(),
            }),
        },
    }
}

/// Builds the customer record for a [`CustomerChoice::New`].
pub fn new_customer(choice: &CustomerChoice, now: DateTime<Utc>) -> Option<Customer> {
    match choice {
        CustomerChoice::New { name, phone } => Some(Customer::new(name, phone, now)),
        _ => None,
    }
}

/// Builds the sale record.
///
/// `customer_id` is the id of the existing or freshly created customer for
/// credit sales.
pub fn build_sale(validated: &ValidatedSale, customer_id: Option<String>, now: DateTime<Utc>) -> Sale {
    let (customer_name, customer_phone) = match &validated.customer {
        CustomerChoice::WalkIn => (WALK_IN_CUSTOMER.to_string(), String::new()),
        CustomerChoice::Existing { name, phone, .. } | CustomerChoice::New { name, phone } => {
            (name.clone(), phone.clone())
        }
    };

    Sale {
        id: validated.sale_id.clone(),
        items: validated.items.clone(),
        payment_splits: if validated.credit {
            Vec::new()
        } else {
            validated.payment_splits.clone()
        },
        total: validated.total,
        manual_amount: validated.manual_amount,
        date: now,
        credit: validated.credit,
        paid: !validated.credit,
        customer_id: if validated.credit { customer_id } else { None },
        customer_name,
        customer_phone,
        barcode: validated.barcode.clone(),
    }
}
