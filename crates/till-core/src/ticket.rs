//! # Ticket Hand-off
//!
//! Read-only view of a finalized sale for the printing collaborator.
//! The sale is already committed when a ticket is built; printing can fail
//! without touching it.
//!
//! Promotion discounts show up here and nowhere else: a discounted line
//! prints its reduced amount while the sale total stays as charged.

use chrono::{DateTime, Utc};
use serde::Serialize;
use ts_rs::TS;

use crate::money::Money;
use crate::pricing;
use crate::types::{BusinessProfile, PaymentSplit, Sale};
use crate::units::Unit;

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TicketLine {
    pub name: String,
    pub quantity: f64,
    pub unit: Unit,
    /// Price per major unit.
    pub unit_price: Money,
    pub discount_pct: Option<f64>,
    /// Line amount after the discount.
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub business: BusinessProfile,
    pub sale_id: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub customer_name: String,
    pub lines: Vec<TicketLine>,
    pub manual_amount: Option<Money>,
    pub payments: Vec<PaymentSplit>,
    pub total: Money,
    pub credit: bool,
}

impl Ticket {
    pub fn new(sale: &Sale, business: &BusinessProfile) -> Self {
        let lines = sale
            .items
            .iter()
            .map(|item| TicketLine {
                name: item.name.clone(),
                quantity: item.quantity,
                unit: item.unit,
                unit_price: item.unit_price,
                discount_pct: item.discount_pct,
                amount: pricing::discounted_line_total(item.unit_price, item.quantity, item.unit, item.discount_pct),
            })
            .collect();

        Ticket {
            business: business.clone(),
            sale_id: sale.id.clone(),
            date: sale.date,
            customer_name: sale.customer_name.clone(),
            lines,
            manual_amount: sale.manual_amount,
            payments: sale.payment_splits.clone(),
            total: sale.total,
            credit: sale.credit,
        }
    }

    /// Sum of the printed line amounts plus the manual charge.
    pub fn printed_subtotal(&self) -> Money {
        let lines: Money = self.lines.iter().map(|l| l.amount).sum();
        lines + self.manual_amount.unwrap_or_default()
    }
}
