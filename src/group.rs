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

//! Groups and their members.

use crate::base::{GroupId, MemberId, is_settled};
use crate::error::LedgerError;
use crate::expense::SplitDetail;
use crate::ledger;
use crate::settlement::{MemberBalance, Transfer};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A person within a group together with their running balance.
///
/// Positive balance: the group owes this member. Negative: the member owes
/// the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub id: MemberId,
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub balance: Decimal,
}

impl GroupMember {
    /// Creates a member with a zero balance.
    pub fn new(id: MemberId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            balance: Decimal::ZERO,
        }
    }

    pub fn as_balance(&self) -> MemberBalance {
        MemberBalance::new(self.id, self.balance)
    }
}

/// A set of members sharing expenses.
///
/// # Invariants
///
/// - Member IDs are unique within the group.
/// - Member balances sum to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub members: Vec<GroupMember>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    /// Creates a group whose only member is its creator.
    pub fn new(
        id: GroupId,
        name: impl Into<String>,
        description: impl Into<String>,
        creator: GroupMember,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            members: vec![GroupMember {
                balance: Decimal::ZERO,
                ..creator
            }],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn member(&self, member_id: &MemberId) -> Option<&GroupMember> {
        self.members.iter().find(|member| member.id == *member_id)
    }

    pub fn contains(&self, member_id: &MemberId) -> bool {
        self.member(member_id).is_some()
    }

    pub fn member_ids(&self) -> Vec<MemberId> {
        self.members.iter().map(|member| member.id).collect()
    }

    pub fn balances(&self) -> Vec<MemberBalance> {
        self.members.iter().map(GroupMember::as_balance).collect()
    }

    /// Adds a member with a zero balance.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::DuplicateMember`] - the ID is already in the group.
    /// - [`LedgerError::MemberAlreadyExists`] - the email is already in the group.
    pub fn add_member(
        &mut self,
        member: GroupMember,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        if self.contains(&member.id) {
            return Err(LedgerError::DuplicateMember(member.id));
        }
        if !member.email.is_empty() && self.members.iter().any(|m| m.email == member.email) {
            return Err(LedgerError::MemberAlreadyExists(member.email));
        }
        self.members.push(GroupMember {
            balance: Decimal::ZERO,
            ..member
        });
        self.updated_at = now;
        Ok(())
    }

    /// Removes a settled member.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnknownMember`] - no such member.
    /// - [`LedgerError::UnsettledBalance`] - the member's balance is not zero;
    ///   dropping it would break the zero-sum invariant.
    pub fn remove_member(
        &mut self,
        member_id: &MemberId,
        now: DateTime<Utc>,
    ) -> Result<GroupMember, LedgerError> {
        let index = self
            .members
            .iter()
            .position(|member| member.id == *member_id)
            .ok_or(LedgerError::UnknownMember(*member_id))?;
        if !is_settled(self.members[index].balance) {
            return Err(LedgerError::UnsettledBalance(*member_id));
        }
        self.updated_at = now;
        Ok(self.members.remove(index))
    }

    /// Applies a committed expense to the member balances.
    ///
    /// See [`ledger::apply_expense_to_balances`].
    pub fn apply_expense(
        &mut self,
        paid_by: &MemberId,
        details: &[SplitDetail],
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.members = ledger::apply_expense_to_balances(&self.members, paid_by, details)?;
        self.updated_at = now;
        Ok(())
    }

    /// Records that `transfer` has been paid.
    ///
    /// See [`ledger::record_settlement`].
    pub fn apply_settlement(
        &mut self,
        transfer: &Transfer,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.members = ledger::record_settlement(&self.members, transfer)?;
        self.updated_at = now;
        Ok(())
    }
}
