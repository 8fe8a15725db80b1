//! # Daily Cash Ledger
//!
//! One [`DailyCash`] per calendar day holds every money movement of that day
//! plus three running aggregates.
//!
//! ## Aggregate Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  post(Income  m)  ──► total_income  += m.amount                        │
//! │                       total_profit  += m.profit                        │
//! │  post(Expense m)  ──► total_expense += m.amount                        │
//! │                                                                         │
//! │  Invariant (checked by reconcile):                                     │
//! │    total_income  == Σ income.amount                                    │
//! │    total_expense == Σ expense.amount                                   │
//! │    total_profit  == Σ movement.profit                                  │
//! │                                                                         │
//! │  expected cash = initial_amount + total_income - total_expense         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A closed ledger accepts no postings.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::pricing::SaleFigures;
use crate::types::{PaymentSplit, Sale};
use crate::units::Unit;
use crate::MIXED_PAYMENT_TAG;

/// Description used for sale income movements.
pub const SALE_DESCRIPTION: &str = "Sale";

// =============================================================================
// Movement
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Income,
    Expense,
}

impl MovementType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MovementType::Income => "income",
            MovementType::Expense => "expense",
        }
    }
}

/// Line snapshot carried by a sale movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MovementItem {
    pub product_id: String,
    pub product_name: String,
    pub quantity: f64,
    pub unit: Unit,
    /// Price per major unit at time of sale.
    pub price: Money,
}

/// One entry in a day's ledger. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DailyCashMovement {
    pub id: String,
    pub movement_type: MovementType,
    pub amount: Money,
    pub description: String,
    pub items: Vec<MovementItem>,
    pub cost_total: Money,
    pub sell_total: Money,
    pub profit: Money,
    /// A method name, or [`MIXED_PAYMENT_TAG`] for sale movements.
    pub payment_method: String,
    pub payment_splits: Vec<PaymentSplit>,
    pub sale_id: Option<String>,
    /// Settles an earlier credit sale.
    pub is_credit_payment: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl DailyCashMovement {
    /// Income movement for a committed sale, aggregating all its lines.
    pub fn for_sale(sale: &Sale, now: DateTime<Utc>) -> Self {
        let figures = SaleFigures::of(&sale.items);
        DailyCashMovement {
            id: uuid::Uuid::new_v4().to_string(),
            movement_type: MovementType::Income,
            amount: sale.total,
            description: SALE_DESCRIPTION.to_string(),
            items: sale
                .items
                .iter()
                .map(|item| MovementItem {
                    product_id: item.product_id.clone(),
                    product_name: item.name.clone(),
                    quantity: item.quantity,
                    unit: item.unit,
                    price: item.unit_price,
                })
                .collect(),
            cost_total: figures.cost,
            sell_total: figures.sell,
            profit: figures.profit,
            payment_method: MIXED_PAYMENT_TAG.to_string(),
            payment_splits: sale.payment_splits.clone(),
            sale_id: Some(sale.id.clone()),
            is_credit_payment: sale.credit,
            created_at: now,
        }
    }

    /// Free-standing income (a credit settlement, a deposit).
    pub fn income(amount: Money, description: &str, payment_method: &str, now: DateTime<Utc>) -> Self {
        Self::manual(MovementType::Income, amount, description, payment_method, now)
    }

    /// Cash leaving the register.
    pub fn expense(amount: Money, description: &str, payment_method: &str, now: DateTime<Utc>) -> Self {
        Self::manual(MovementType::Expense, amount, description, payment_method, now)
    }

    pub fn with_credit_payment(mut self, sale_id: &str) -> Self {
        self.is_credit_payment = true;
        self.sale_id = Some(sale_id.to_string());
        self
    }

    fn manual(
        movement_type: MovementType,
        amount: Money,
        description: &str,
        payment_method: &str,
        now: DateTime<Utc>,
    ) -> Self {
        DailyCashMovement {
            id: uuid::Uuid::new_v4().to_string(),
            movement_type,
            amount,
            description: description.trim().to_string(),
            items: Vec::new(),
            cost_total: Money::zero(),
            sell_total: Money::zero(),
            profit: Money::zero(),
            payment_method: payment_method.to_string(),
            payment_splits: Vec::new(),
            sale_id: None,
            is_credit_payment: false,
            created_at: now,
        }
    }
}

// =============================================================================
// Daily Cash
// =============================================================================

/// The three running aggregates of a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LedgerTotals {
    pub income: Money,
    pub expense: Money,
    pub profit: Money,
}

impl LedgerTotals {
    /// Recomputes the aggregates from scratch.
    pub fn of(movements: &[DailyCashMovement]) -> Self {
        movements.iter().fold(LedgerTotals::default(), |mut acc, m| {
            acc.add(m);
            acc
        })
    }

    fn add(&mut self, movement: &DailyCashMovement) {
        match movement.movement_type {
            MovementType::Income => self.income += movement.amount,
            MovementType::Expense => self.expense += movement.amount,
        }
        self.profit += movement.profit;
    }
}

/// The ledger of one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DailyCash {
    pub id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub initial_amount: Money,
    pub movements: Vec<DailyCashMovement>,
    pub closed: bool,
    pub total_income: Money,
    pub total_expense: Money,
    pub total_profit: Money,
}

impl DailyCash {
    /// An open, empty ledger for `date`.
    pub fn open(date: NaiveDate, initial_amount: Money) -> Self {
        DailyCash {
            id: uuid::Uuid::new_v4().to_string(),
            date,
            initial_amount,
            movements: Vec::new(),
            closed: false,
            total_income: Money::zero(),
            total_expense: Money::zero(),
            total_profit: Money::zero(),
        }
    }

    /// Appends a movement and bumps the aggregates.
    ///
    /// ## Errors
    /// - `LedgerClosed` once the register has been closed
    /// - `Validation` for a negative amount
    pub fn post(&mut self, movement: DailyCashMovement) -> CoreResult<()> {
        check_postable(self, &movement)?;
        let mut totals = self.totals();
        totals.add(&movement);
        self.set_totals(totals);
        self.movements.push(movement);
        Ok(())
    }

    /// Closes the register. Idempotent.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn totals(&self) -> LedgerTotals {
        LedgerTotals {
            income: self.total_income,
            expense: self.total_expense,
            profit: self.total_profit,
        }
    }

    fn set_totals(&mut self, totals: LedgerTotals) {
        self.total_income = totals.income;
        self.total_expense = totals.expense;
        self.total_profit = totals.profit;
    }

    /// Cash that should be in the drawer.
    pub fn expected_cash(&self) -> Money {
        self.initial_amount + self.total_income - self.total_expense
    }

    /// Checks the stored aggregates against the movements.
    pub fn reconcile(&self) -> CoreResult<()> {
        let computed = LedgerTotals::of(&self.movements);
        let checks = [
            ("total_income", self.total_income, computed.income),
            ("total_expense", self.total_expense, computed.expense),
            ("total_profit", self.total_profit, computed.profit),
        ];
        for (field, recorded, computed) in checks {
            if recorded != computed {
                return Err(CoreError::LedgerOutOfBalance {
                    date: self.date.to_string(),
                    field: field.to_string(),
                    recorded,
                    computed,
                });
            }
        }
        Ok(())
    }
}

/// The rules a movement must pass before it lands on `ledger`.
///
/// Split out so the persistence layer can post without loading every
/// movement of the day.
pub fn check_postable(ledger: &DailyCash, movement: &DailyCashMovement) -> CoreResult<()> {
    if ledger.closed {
        return Err(CoreError::LedgerClosed {
            date: ledger.date.to_string(),
        });
    }
    if movement.amount.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "amount".to_string(),
            min: 0,
            max: i64::MAX,
        }
        .into());
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
