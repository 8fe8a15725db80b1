//! # Payment Split Allocator
//!
//! Keeps the per-method amounts of a sale consistent with its total.
//!
//! ## Allocation Rules
//! ```text
//! ┌──────────┬────────────────────────────┬──────────────────────────────────┐
//! │ Splits   │ Total changes              │ Cashier edits split i            │
//! ├──────────┼────────────────────────────┼──────────────────────────────────┤
//! │ 1        │ amount = total             │ amount = value                   │
//! │ 2        │ last = total - first       │ other = total - value (≥ 0)      │
//! │ 3        │ last = total - others (≥0) │ amount = value, nothing else     │
//! └──────────┴────────────────────────────┴──────────────────────────────────┘
//! ```
//!
//! Three-way splits are balanced by hand; [`PaymentSplits::check_balance`]
//! catches anything left over before commit.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{PaymentMethod, PaymentSplit};

/// Ordered payment splits of a draft sale.
///
/// Order matters: the last split absorbs the residual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentSplits(Vec<PaymentSplit>);

impl PaymentSplits {
    /// A single split of `method` pinned to `total`.
    pub fn single(method: PaymentMethod, total: Money) -> Self {
        PaymentSplits(vec![PaymentSplit::new(method, total)])
    }

    /// No splits (credit sales).
    pub fn empty() -> Self {
        PaymentSplits(Vec::new())
    }

    /// Wraps existing splits, rejecting repeated methods.
    pub fn from_splits(splits: Vec<PaymentSplit>) -> Result<Self, ValidationError> {
        for (i, split) in splits.iter().enumerate() {
            if splits[..i].iter().any(|s| s.method == split.method) {
                return Err(duplicate_method(split.method));
            }
        }
        Ok(PaymentSplits(splits))
    }

    pub fn as_slice(&self) -> &[PaymentSplit] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<PaymentSplit> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total_paid(&self) -> Money {
        self.0.iter().map(|s| s.amount).sum()
    }

    /// Re-targets the splits after a non-amount change (items, quantities,
    /// manual charge).
    ///
    /// One split is pinned to the total; otherwise the last split becomes
    /// `total - sum(others)`, never negative.
    pub fn sync_total(&mut self, total: Money) {
        match self.0.len() {
            0 => {}
            1 => self.0[0].amount = total,
            n => {
                let others: Money = self.0[..n - 1].iter().map(|s| s.amount).sum();
                self.0[n - 1].amount = (total - others).non_negative();
            }
        }
    }

    /// Sets the amount of split `index` as typed by the cashier.
    ///
    /// With exactly two splits the other one becomes `total - amount`,
    /// clamped at zero.
    pub fn set_amount(&mut self, index: usize, amount: Money, total: Money) -> Result<(), ValidationError> {
        if amount.is_negative() {
            return Err(ValidationError::OutOfRange {
                field: "payment amount".to_string(),
                min: 0,
                max: total.cents().max(0),
            });
        }
        self.check_index(index)?;
        self.0[index].amount = amount;

        if self.0.len() == 2 {
            let other = 1 - index;
            self.0[other].amount = (total - amount).non_negative();
        }
        Ok(())
    }

    /// Changes the method of split `index`. A method may appear only once.
    pub fn set_method(&mut self, index: usize, method: PaymentMethod) -> Result<(), ValidationError> {
        self.check_index(index)?;
        if self
            .0
            .iter()
            .enumerate()
            .any(|(i, s)| i != index && s.method == method)
        {
            return Err(duplicate_method(method));
        }
        self.0[index].method = method;
        Ok(())
    }

    /// Adds a split using the first method not already in use.
    ///
    /// Returns `false` (and changes nothing) once every method is taken.
    /// Going from two splits to three zeroes the existing amounts and the
    /// new last split takes the whole total.
    pub fn add(&mut self, total: Money) -> bool {
        let Some(method) = PaymentMethod::ALL
            .into_iter()
            .find(|m| self.0.iter().all(|s| s.method != *m))
        else {
            return false;
        };

        if self.0.len() == 2 {
            for split in &mut self.0 {
                split.amount = Money::zero();
            }
        }
        self.0.push(PaymentSplit::new(method, Money::zero()));
        self.sync_total(total);
        true
    }

    /// Removes split `index`.
    ///
    /// The last remaining split cannot be removed. Dropping to two splits
    /// divides the total evenly (odd cent on the last); dropping to one
    /// pins it to the total.
    pub fn remove(&mut self, index: usize, total: Money) -> Result<(), ValidationError> {
        self.check_index(index)?;
        if self.0.len() <= 1 {
            return Err(ValidationError::OutOfRange {
                field: "payment methods".to_string(),
                min: 1,
                max: PaymentMethod::ALL.len() as i64,
            });
        }
        self.0.remove(index);

        if self.0.len() == 2 {
            for (split, share) in self.0.iter_mut().zip(total.split_evenly(2)) {
                split.amount = share;
            }
        } else {
            self.sync_total(total);
        }
        Ok(())
    }

    /// Commit gate: the splits must add up exactly to `total`.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    /// use till_core::payment::PaymentSplits;
    /// use till_core::types::PaymentMethod;
    ///
    /// let splits = PaymentSplits::single(PaymentMethod::Cash, Money::from_cents(15000));
    /// assert!(splits.check_balance(Money::from_cents(15000)).is_ok());
    /// assert!(splits.check_balance(Money::from_cents(15001)).is_err());
    /// ```
    pub fn check_balance(&self, total: Money) -> CoreResult<()> {
        let paid = self.total_paid();
        if paid != total {
            return Err(CoreError::PaymentMismatch {
                total,
                paid,
                difference: (total - paid).abs(),
            });
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<(), ValidationError> {
        if index >= self.0.len() {
            return Err(ValidationError::OutOfRange {
                field: "payment split".to_string(),
                min: 0,
                max: self.0.len() as i64 - 1,
            });
        }
        Ok(())
    }
}

impl Default for PaymentSplits {
    fn default() -> Self {
        PaymentSplits::single(PaymentMethod::Cash, Money::zero())
    }
}

fn duplicate_method(method: PaymentMethod) -> ValidationError {
    ValidationError::Duplicate {
        field: "payment method".to_string(),
        value: method.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(c: i64) -> Money {
        Money::from_cents(c)
    }

    fn amounts(splits: &PaymentSplits) -> Vec<i64> {
        splits.as_slice().iter().map(|s| s.amount.cents()).collect()
    }

    #[test]
    fn test_single_split_tracks_total() {
        let mut splits = PaymentSplits::single(PaymentMethod::Cash, cents(1000));
        splits.sync_total(cents(2500));
        assert_eq!(amounts(&splits), vec![2500]);
    }

    #[test]
    fn test_two_splits_edit_rebalances_other() {
        let total = cents(15000);
        let mut splits = PaymentSplits::single(PaymentMethod::Cash, total);
        assert!(splits.add(total));
        assert_eq!(splits.as_slice()[1].method, PaymentMethod::Transfer);
        assert_eq!(amounts(&splits), vec![15000, 0]);

        splits.set_amount(0, cents(10000), total).unwrap();
        assert_eq!(amounts(&splits), vec![10000, 5000]);
        assert!(splits.check_balance(total).is_ok());

        splits.set_amount(1, cents(20000), total).unwrap();
        assert_eq!(amounts(&splits), vec![0, 20000]);
        assert!(splits.check_balance(total).is_err());
    }

    #[test]
    fn test_total_change_moves_last_split() {
        let mut splits = PaymentSplits::from_splits(vec![
            PaymentSplit::new(PaymentMethod::Cash, cents(6000)),
            PaymentSplit::new(PaymentMethod::Card, cents(4000)),
        ])
        .unwrap();

        splits.sync_total(cents(12000));
        assert_eq!(amounts(&splits), vec![6000, 6000]);

        splits.sync_total(cents(5000));
        assert_eq!(amounts(&splits), vec![6000, 0]);
    }

    #[test]
    fn test_third_split_resets_amounts() {
        let total = cents(9000);
        let mut splits = PaymentSplits::single(PaymentMethod::Cash, total);
        splits.add(total);
        splits.set_amount(0, cents(3000), total).unwrap();

        assert!(splits.add(total));
        assert_eq!(splits.as_slice()[2].method, PaymentMethod::Card);
        assert_eq!(amounts(&splits), vec![0, 0, 9000]);

        // no fourth method
        assert!(!splits.add(total));
        assert_eq!(splits.len(), 3);

        // three-way edits touch only the edited split
        splits.set_amount(0, cents(1000), total).unwrap();
        assert_eq!(amounts(&splits), vec![1000, 0, 9000]);
    }

    #[test]
    fn test_remove_rebalances() {
        let total = cents(1001);
        let mut splits = PaymentSplits::single(PaymentMethod::Cash, total);
        splits.add(total);
        splits.add(total);

        splits.remove(1, total).unwrap();
        assert_eq!(amounts(&splits), vec![500, 501]);
        assert_eq!(splits.as_slice()[1].method, PaymentMethod::Card);

        splits.remove(0, total).unwrap();
        assert_eq!(amounts(&splits), vec![1001]);

        let err = splits.remove(0, total).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { .. }));
    }

    #[test]
    fn test_added_split_takes_first_free_method() {
        let total = cents(100);
        let mut splits = PaymentSplits::single(PaymentMethod::Transfer, total);
        splits.add(total);
        assert_eq!(splits.as_slice()[1].method, PaymentMethod::Cash);
    }

    #[test]
    fn test_methods_are_unique() {
        let total = cents(100);
        let mut splits = PaymentSplits::single(PaymentMethod::Cash, total);
        splits.add(total);

        let err = splits.set_method(1, PaymentMethod::Cash).unwrap_err();
        assert!(matches!(err, ValidationError::Duplicate { .. }));
        splits.set_method(1, PaymentMethod::Card).unwrap();

        let dup = PaymentSplits::from_splits(vec![
            PaymentSplit::new(PaymentMethod::Card, total),
            PaymentSplit::new(PaymentMethod::Card, total),
        ]);
        assert!(dup.is_err());
    }

    #[test]
    fn test_balance_reports_difference() {
        let splits = PaymentSplits::single(PaymentMethod::Cash, cents(14000));
        let err = splits.check_balance(cents(15000)).unwrap_err();
        assert_eq!(
            err,
            CoreError::PaymentMismatch {
                total: cents(15000),
                paid: cents(14000),
                difference: cents(1000),
            }
        );
    }

    #[test]
    fn test_out_of_range_index() {
        let mut splits = PaymentSplits::single(PaymentMethod::Cash, cents(100));
        assert!(splits.set_amount(3, cents(10), cents(100)).is_err());
        assert!(splits.set_amount(0, cents(-10), cents(100)).is_err());
    }
}
