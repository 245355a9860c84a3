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

//! Balance ledger updates.
//!
//! Member balances only change through the two functions here:
//!
//! - [`apply_expense_to_balances`]: every member in the split is debited their
//!   share and the payer is credited with the split total.
//! - [`record_settlement`]: a repayment, booked as an expense paid by the
//!   debtor and charged entirely to the creditor.
//!
//! Both work on a copy of the members and return it, so a rejected update
//! leaves the caller's state as it was. Each update moves money between members
//! without creating or destroying any, so the group's balances keep summing to
//! zero.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use split_ledger_rs::{GroupMember, MemberId, SplitDetail, apply_expense_to_balances};
//!
//! let members = vec![
//!     GroupMember::new(MemberId(1), "Asha", ""),
//!     GroupMember::new(MemberId(2), "Ben", ""),
//! ];
//! let details = [
//!     SplitDetail::new(MemberId(1), dec!(30)),
//!     SplitDetail::new(MemberId(2), dec!(30)),
//! ];
//! let updated = apply_expense_to_balances(&members, &MemberId(1), &details).unwrap();
//! assert_eq!(updated[0].balance, dec!(30));
//! assert_eq!(updated[1].balance, dec!(-30));
//! ```

use crate::base::MemberId;
use crate::error::LedgerError;
use crate::expense::SplitDetail;
use crate::group::GroupMember;
use crate::settlement::Transfer;
use rust_decimal::Decimal;

/// Sum of all member balances. Zero for a consistent group.
pub fn balance_sum(members: &[GroupMember]) -> Decimal {
    members.iter().map(|member| member.balance).sum()
}

/// Applies a committed expense to `members`, returning the updated list.
///
/// Every split detail's member has `amount` subtracted from their balance. The
/// payer is credited the sum of all split amounts.
///
/// # Errors
///
/// - [`LedgerError::UnknownMember`] - the payer or a split member is not in `members`.
/// - [`LedgerError::InvalidParameter`] - a split amount is negative, or a
///   balance would overflow.
pub fn apply_expense_to_balances(
    members: &[GroupMember],
    paid_by: &MemberId,
    details: &[SplitDetail],
) -> Result<Vec<GroupMember>, LedgerError> {
    if !members.iter().any(|member| member.id == *paid_by) {
        return Err(LedgerError::UnknownMember(*paid_by));
    }

    let mut updated = members.to_vec();
    let mut charged = Decimal::ZERO;
    for detail in details {
        if detail.amount < Decimal::ZERO {
            return Err(LedgerError::InvalidParameter(format!(
                "negative split amount {} for member {}",
                detail.amount, detail.member_id
            )));
        }
        let member = find_mut(&mut updated, &detail.member_id)?;
        member.balance = member.balance.checked_sub(detail.amount).ok_or_else(overflow)?;
        charged = charged.checked_add(detail.amount).ok_or_else(overflow)?;
    }
    let payer = find_mut(&mut updated, paid_by)?;
    payer.balance = payer.balance.checked_add(charged).ok_or_else(overflow)?;

    debug_assert_eq!(
        balance_sum(&updated),
        balance_sum(members),
        "Invariant violated: expense changed the group balance sum"
    );

    tracing::debug!(payer = %paid_by, %charged, splits = details.len(), "applied expense");
    Ok(updated)
}

/// Records that `transfer.from` paid `transfer.to`, returning the updated list.
///
/// The debtor's balance rises by the amount and the creditor's falls by it.
///
/// # Errors
///
/// - [`LedgerError::NonPositiveAmount`] - the amount is zero or negative.
/// - [`LedgerError::InvalidParameter`] - a member would pay themselves.
/// - [`LedgerError::UnknownMember`] - either side is not in `members`.
pub fn record_settlement(
    members: &[GroupMember],
    transfer: &Transfer,
) -> Result<Vec<GroupMember>, LedgerError> {
    if transfer.amount <= Decimal::ZERO {
        return Err(LedgerError::NonPositiveAmount);
    }
    if transfer.from == transfer.to {
        return Err(LedgerError::InvalidParameter(format!(
            "member {} cannot settle with themselves",
            transfer.from
        )));
    }

    apply_expense_to_balances(
        members,
        &transfer.from,
        &[SplitDetail::new(transfer.to, transfer.amount)],
    )
}

fn overflow() -> LedgerError {
    LedgerError::InvalidParameter("balance overflow".to_string())
}

fn find_mut<'a>(
    members: &'a mut [GroupMember],
    member_id: &MemberId,
) -> Result<&'a mut GroupMember, LedgerError> {
    members
        .iter_mut()
        .find(|member| member.id == *member_id)
        .ok_or(LedgerError::UnknownMember(*member_id))
}
