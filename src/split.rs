// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Expense splitting.
//!
//! [`compute_split`] turns an expense total and a [`SplitStrategy`] into one
//! [`SplitDetail`] per member.
//!
//! | Strategy | Member amount |
//! |----------|---------------|
//! | Equal | `total / n` |
//! | Shares | `total * shares / sum(shares)` |
//! | Percentage | `total * percentage / 100` |
//! | Unequal | caller-supplied amount |
//!
//! Amounts are cents. Equal, shares and percentage splits are allocated with
//! the largest-remainder method: every share is truncated to cents and the
//! cents left over go to the members with the largest truncated fractions,
//! earlier members first on ties. The amounts therefore always add up to the
//! rounded allocation target exactly (`100 / 3` gives `33.34, 33.33, 33.33`).
//!
//! Percentages are taken as declared. When they do not add up to 100 the
//! allocation misses the total and [`Split::reconcile`] rejects it.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use split_ledger_rs::{MemberId, SplitStrategy, compute_split};
//!
//! let members = [MemberId(1), MemberId(2), MemberId(3)];
//! let split = compute_split(dec!(300), &members, &SplitStrategy::Equal).unwrap();
//! assert_eq!(split.amount_for(&MemberId(2)), Some(dec!(100.00)));
//! split.reconcile(dec!(300)).unwrap();
//! ```

use crate::base::{CURRENCY_PRECISION, EPSILON, MemberId, round_currency};
use crate::error::LedgerError;
use crate::expense::SplitDetail;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

const ONE_HUNDRED: Decimal = dec!(100);

/// How an expense total is divided between members.
///
/// Parameter maps must hold exactly one non-negative entry per member being
/// split across.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitStrategy {
    Equal,
    Unequal(BTreeMap<MemberId, Decimal>),
    Percentage(BTreeMap<MemberId, Decimal>),
    Shares(BTreeMap<MemberId, Decimal>),
}

/// Parameterless tag of a [`SplitStrategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplitKind {
    Equal,
    Unequal,
    Percentage,
    Shares,
}

impl SplitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Unequal => "unequal",
            Self::Percentage => "percentage",
            Self::Shares => "shares",
        }
    }
}

impl fmt::Display for SplitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "equal" => Ok(Self::Equal),
            "unequal" => Ok(Self::Unequal),
            "percentage" => Ok(Self::Percentage),
            "shares" => Ok(Self::Shares),
            other => Err(format!("unknown split strategy '{other}'")),
        }
    }
}

impl SplitStrategy {
    /// Builds a strategy from its tag and per-member parameters.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidParameter`] when parameters are given for an
    /// equal split.
    pub fn from_kind(
        kind: SplitKind,
        params: BTreeMap<MemberId, Decimal>,
    ) -> Result<Self, LedgerError> {
        match kind {
            SplitKind::Equal if !params.is_empty() => Err(LedgerError::InvalidParameter(
                "equal split takes no parameters".to_string(),
            )),
            SplitKind::Equal => Ok(Self::Equal),
            SplitKind::Unequal => Ok(Self::Unequal(params)),
            SplitKind::Percentage => Ok(Self::Percentage(params)),
            SplitKind::Shares => Ok(Self::Shares(params)),
        }
    }

    pub fn kind(&self) -> SplitKind {
        match self {
            Self::Equal => SplitKind::Equal,
            Self::Unequal(_) => SplitKind::Unequal,
            Self::Percentage(_) => SplitKind::Percentage,
            Self::Shares(_) => SplitKind::Shares,
        }
    }

    /// Percentage pre-fill for `members`: `100 / n` each, rounded to one
    /// decimal place.
    pub fn equal_percentages(members: &[MemberId]) -> Self {
        let mut params = BTreeMap::new();
        if !members.is_empty() {
            let each = (ONE_HUNDRED / Decimal::from(members.len()))
                .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
            params.extend(members.iter().map(|id| (*id, each)));
        }
        Self::Percentage(params)
    }

    /// Shares pre-fill for `members`: one share each.
    pub fn one_share_each(members: &[MemberId]) -> Self {
        Self::Shares(members.iter().map(|id| (*id, Decimal::ONE)).collect())
    }
}

/// Computed split of one expense, in member order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    details: Vec<SplitDetail>,
}

impl Split {
    pub fn details(&self) -> &[SplitDetail] {
        &self.details
    }

    pub fn into_details(self) -> Vec<SplitDetail> {
        self.details
    }

    pub fn amount_for(&self, member_id: &MemberId) -> Option<Decimal> {
        self.details
            .iter()
            .find(|detail| detail.member_id == *member_id)
            .map(|detail| detail.amount)
    }

    /// Iterates `(member, amount)` pairs in member order.
    pub fn iter(&self) -> impl Iterator<Item = (MemberId, Decimal)> + '_ {
        self.details.iter().map(|detail| (detail.member_id, detail.amount))
    }

    pub fn total(&self) -> Decimal {
        self.details.iter().map(|detail| detail.amount).sum()
    }

    /// Checks that the split adds up to `expected` within [`EPSILON`].
    ///
    /// # Errors
    ///
    /// [`LedgerError::ReconciliationMismatch`] otherwise.
    pub fn reconcile(&self, expected: Decimal) -> Result<(), LedgerError> {
        let actual = self.total();
        if (expected - actual).abs() > EPSILON {
            return Err(LedgerError::ReconciliationMismatch { expected, actual });
        }
        Ok(())
    }
}

/// Splits `total` across `members` according to `strategy`.
///
/// # Errors
///
/// - [`LedgerError::NonPositiveAmount`] - `total` is zero or negative.
/// - [`LedgerError::NoMembers`] - `members` is empty.
/// - [`LedgerError::DuplicateMember`] - a member is listed twice.
/// - [`LedgerError::UnknownMember`] - a parameter names someone not in `members`.
/// - [`LedgerError::MissingParameter`] - a member has no parameter.
/// - [`LedgerError::InvalidParameter`] - a parameter is negative, or the
///   amounts are too large to divide without overflow.
/// - [`LedgerError::DivisionByZero`] - shares or percentages sum to zero.
pub fn compute_split(
    total: Decimal,
    members: &[MemberId],
    strategy: &SplitStrategy,
) -> Result<Split, LedgerError> {
    if total <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveAmount);
    }
    if members.is_empty() {
        return Err(LedgerError::NoMembers);
    }
    let mut seen = HashSet::with_capacity(members.len());
    if let Some(duplicate) = members.iter().find(|id| !seen.insert(**id)) {
        return Err(LedgerError::DuplicateMember(*duplicate));
    }

    let details: Vec<SplitDetail> = match strategy {
        SplitStrategy::Equal => {
            let weights = vec![Decimal::ONE; members.len()];
            let amounts = allocate(round_currency(total), &weights)?;
            members
                .iter()
                .zip(amounts)
                .map(|(id, amount)| SplitDetail::new(*id, amount))
                .collect()
        }
        SplitStrategy::Shares(shares) => {
            let weights = weights_for(members, shares)?;
            let amounts = allocate(round_currency(total), &weights)?;
            members
                .iter()
                .zip(weights.iter().zip(amounts))
                .map(|(id, (weight, amount))| SplitDetail {
                    share_count: Some(*weight),
                    ..SplitDetail::new(*id, amount)
                })
                .collect()
        }
        SplitStrategy::Percentage(percentages) => {
            let weights = weights_for(members, percentages)?;
            let declared = checked_sum(&weights)?;
            let target = total
                .checked_mul(declared)
                .and_then(|scaled| scaled.checked_div(ONE_HUNDRED))
                .map(round_currency)
                .ok_or_else(overflow)?;
            let amounts = allocate(target, &weights)?;
            members
                .iter()
                .zip(weights.iter().zip(amounts))
                .map(|(id, (weight, amount))| SplitDetail {
                    share_percentage: Some(*weight),
                    ..SplitDetail::new(*id, amount)
                })
                .collect()
        }
        SplitStrategy::Unequal(amounts) => {
            let amounts = weights_for(members, amounts)?;
            checked_sum(&amounts)?;
            amounts
                .into_iter()
                .zip(members)
                .map(|(amount, id)| SplitDetail::new(*id, round_currency(amount)))
                .collect()
        }
    };

    tracing::debug!(
        strategy = %strategy.kind(),
        %total,
        members = members.len(),
        "computed split"
    );

    Ok(Split { details })
}

/// Looks up one parameter per member, rejecting strays, gaps and negatives.
fn weights_for(
    members: &[MemberId],
    params: &BTreeMap<MemberId, Decimal>,
) -> Result<Vec<Decimal>, LedgerError> {
    if let Some(stray) = params.keys().find(|id| !members.contains(id)) {
        return Err(LedgerError::UnknownMember(*stray));
    }

    members
        .iter()
        .map(|id| {
            let value = *params.get(id).ok_or(LedgerError::MissingParameter(*id))?;
            if value < Decimal::ZERO {
                return Err(LedgerError::InvalidParameter(format!(
                    "negative split value {value} for member {id}"
                )));
            }
            Ok(value)
        })
        .collect()
}

fn overflow() -> LedgerError {
    LedgerError::InvalidParameter("amount is too large to split".to_string())
}

fn checked_sum(values: &[Decimal]) -> Result<Decimal, LedgerError> {
    values
        .iter()
        .try_fold(Decimal::ZERO, |sum, value| sum.checked_add(*value))
        .ok_or_else(overflow)
}

/// Distributes `target` (already in cents) proportionally to `weights`.
fn allocate(target: Decimal, weights: &[Decimal]) -> Result<Vec<Decimal>, LedgerError> {
    let weight_sum = checked_sum(weights)?;
    if weight_sum.is_zero() {
        return Err(LedgerError::DivisionByZero);
    }

    let mut amounts = Vec::with_capacity(weights.len());
    let mut remainders = Vec::with_capacity(weights.len());
    for (index, weight) in weights.iter().enumerate() {
        let exact = target
            .checked_mul(*weight)
            .and_then(|scaled| scaled.checked_div(weight_sum))
            .ok_or_else(overflow)?;
        let truncated =
            round_currency(exact.round_dp_with_strategy(CURRENCY_PRECISION, RoundingStrategy::ToZero));
        amounts.push(truncated);
        remainders.push((index, exact - truncated));
    }

    // Both sides are whole cents, so the residue is an exact number of cents.
    let mut residue = target - amounts.iter().copied().sum::<Decimal>();
    remainders.sort_by(|a, b| b.1.cmp(&a.1));
    for (index, _) in remainders {
        if residue < EPSILON {
            break;
        }
        amounts[index] += EPSILON;
        residue -= EPSILON;
    }

    Ok(amounts)
}
