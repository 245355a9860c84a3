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

//! Error types for splitting, ledger updates and persistence.

use crate::base::{GroupId, MemberId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by the split calculator, the balance ledger, the debt
/// simplifier and the tracker service.
///
/// Every operation that returns one of these has performed no mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Expense or transfer amount is zero or negative
    #[error("invalid amount (must be positive)")]
    NonPositiveAmount,

    /// No members were given to split across
    #[error("member list is empty")]
    NoMembers,

    /// A member is listed more than once
    #[error("member {0} is listed more than once")]
    DuplicateMember(MemberId),

    /// A split strategy has no parameter for a listed member
    #[error("missing split parameter for member {0}")]
    MissingParameter(MemberId),

    /// A parameter or argument is malformed
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Shares or percentages sum to zero
    #[error("split weights sum to zero")]
    DivisionByZero,

    /// Referenced member is not part of the group or member list
    #[error("unknown member {0}")]
    UnknownMember(MemberId),

    /// Split amounts do not add up to the expense total
    #[error("split total {actual} does not match expense amount {expected}")]
    ReconciliationMismatch { expected: Decimal, actual: Decimal },

    /// Balances do not sum to zero
    #[error("balances do not sum to zero (residue {0})")]
    UnbalancedLedger(Decimal),

    /// Referenced group does not exist
    #[error("group {0} not found")]
    GroupNotFound(GroupId),

    /// A member with this email is already in the group
    #[error("member with email {0} already exists in the group")]
    MemberAlreadyExists(String),

    /// Member still owes or is owed money
    #[error("member {0} has an unsettled balance")]
    UnsettledBalance(MemberId),

    /// No chain of shared groups links the two members
    #[error("members {from} and {to} share no group")]
    NoSettlementRoute { from: MemberId, to: MemberId },

    /// Backing store could not be read or written
    #[error("storage failure: {0}")]
    Storage(String),

    /// Stored value could not be encoded or decoded
    #[error("serialization failure: {0}")]
    Serialization(String),
}

impl LedgerError {
    /// Returns `true` for errors caused by malformed caller input.
    ///
    /// [`LedgerError::DivisionByZero`] is reported as invalid input as well:
    /// zero shares or percentages are a caller mistake, not an arithmetic fault.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::NonPositiveAmount
                | Self::NoMembers
                | Self::DuplicateMember(_)
                | Self::MissingParameter(_)
                | Self::InvalidParameter(_)
                | Self::DivisionByZero
                | Self::UnknownMember(_)
        )
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
