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

//! Core identifier types and currency helpers.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of decimal places money is displayed and allocated with.
pub const CURRENCY_PRECISION: u32 = 2;

/// Tolerance used for every comparison of a money amount against zero.
///
/// Equal to one cent.
pub const EPSILON: Decimal = dec!(0.01);

/// Unique identifier for a person taking part in one or more groups.
///
/// The same `MemberId` appearing in two groups denotes the same person, which
/// is what cross-group balance aggregation keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct MemberId(pub u32);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct GroupId(pub u32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an expense record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ExpenseId(pub u32);

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rounds an amount to cents, halves away from zero.
///
/// The result always carries exactly two decimal places, so `30` becomes
/// `30.00`.
pub fn round_currency(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(CURRENCY_PRECISION, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(CURRENCY_PRECISION);
    rounded
}

/// Returns `true` when `amount` is within [`EPSILON`] of zero.
pub fn is_settled(amount: Decimal) -> bool {
    amount.abs() < EPSILON
}
