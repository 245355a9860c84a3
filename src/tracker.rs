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

//! Expense tracking service.
//!
//! [`Tracker`] is the layer that ties the pure split, ledger and settlement
//! functions to a store. Each operation:
//!
//! 1. re-reads the current groups and expenses from the store,
//! 2. validates and computes on that snapshot,
//! 3. writes the new state back only if every step succeeded.
//!
//! # Thread Safety
//!
//! Read-modify-write cycles are serialised by an internal lock, so a shared
//! `Tracker` never loses an update. Separate trackers over the same backing
//! files are not coordinated.

use crate::base::{ExpenseId, GroupId, MemberId, is_settled};
use crate::error::LedgerError;
use crate::expense::{Expense, ExpenseCategory, SplitDetail};
use crate::group::{Group, GroupMember};
use crate::settlement::{
    MemberBalance, Transfer, aggregate_balances, route_transfer, simplify_across_groups,
    simplify_debts,
};
use crate::split::{SplitStrategy, compute_split};
use crate::store::{ExpenseRepository, GroupRepository};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;

/// Which balances a settlement plan covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleScope {
    /// Members of one group.
    Group(GroupId),
    /// Every person across all groups, balances summed per member.
    ///
    /// Plans in this scope only pair people linked through shared groups and
    /// are booked with [`Tracker::record_settlement_across`].
    All,
}

/// Input for [`Tracker::add_split_expense`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSplitExpense {
    pub group_id: GroupId,
    pub paid_by: MemberId,
    pub amount: Decimal,
    pub category: ExpenseCategory,
    pub description: String,
    pub strategy: SplitStrategy,
    /// Members to split across. `None` means every member of the group.
    pub members: Option<Vec<MemberId>>,
    pub tags: Vec<String>,
}

impl NewSplitExpense {
    /// An equal split across the whole group.
    pub fn equal(group_id: GroupId, paid_by: MemberId, amount: Decimal) -> Self {
        Self {
            group_id,
            paid_by,
            amount,
            category: ExpenseCategory::default(),
            description: String::new(),
            strategy: SplitStrategy::Equal,
            members: None,
            tags: Vec::new(),
        }
    }
}

/// Expense tracker over a group and expense store.
pub struct Tracker<S> {
    store: S,
    lock: Mutex<()>,
    clock: fn() -> DateTime<Utc>,
}

impl<S> Tracker<S>
where
    S: GroupRepository + ExpenseRepository,
{
    pub fn new(store: S) -> Self {
        Self::with_clock(store, Utc::now)
    }

    /// Creates a tracker that timestamps records with `clock`.
    pub fn with_clock(store: S, clock: fn() -> DateTime<Utc>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
            clock,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn groups(&self) -> Result<Vec<Group>, LedgerError> {
        self.store.get_groups()
    }

    /// Returns a group by ID.
    ///
    /// # Errors
    ///
    /// [`LedgerError::GroupNotFound`] when no such group exists.
    pub fn group(&self, group_id: GroupId) -> Result<Group, LedgerError> {
        self.store
            .get_groups()?
            .into_iter()
            .find(|group| group.id == group_id)
            .ok_or(LedgerError::GroupNotFound(group_id))
    }

    pub fn expenses(&self) -> Result<Vec<Expense>, LedgerError> {
        self.store.get_expenses()
    }

    /// Creates a group with its creator as the only member.
    pub fn create_group(
        &self,
        name: &str,
        description: &str,
        creator_name: &str,
        creator_email: &str,
    ) -> Result<Group, LedgerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::InvalidParameter(
                "group name is required".to_string(),
            ));
        }

        let _guard = self.lock.lock();
        let mut groups = self.store.get_groups()?;
        let expenses = self.store.get_expenses()?;
        let creator = GroupMember::new(
            next_member_id(&groups, &expenses),
            creator_name,
            creator_email,
        );
        let group = Group::new(
            next_group_id(&groups, &expenses),
            name,
            description,
            creator,
            (self.clock)(),
        );
        groups.push(group.clone());
        self.store.set_groups(&groups)?;

        tracing::info!(group = %group.id, name = %group.name, "created group");
        Ok(group)
    }

    /// Adds a new person to a group.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidParameter`] - name or email is blank.
    /// - [`LedgerError::GroupNotFound`] - no such group.
    /// - [`LedgerError::MemberAlreadyExists`] - the email is taken in this group.
    pub fn add_member(
        &self,
        group_id: GroupId,
        name: &str,
        email: &str,
    ) -> Result<GroupMember, LedgerError> {
        let (name, email) = (name.trim(), email.trim());
        if name.is_empty() || email.is_empty() {
            return Err(LedgerError::InvalidParameter(
                "member name and email are required".to_string(),
            ));
        }

        let _guard = self.lock.lock();
        let mut groups = self.store.get_groups()?;
        let expenses = self.store.get_expenses()?;
        let member = GroupMember::new(next_member_id(&groups, &expenses), name, email);
        let now = (self.clock)();
        find_group(&mut groups, group_id)?.add_member(member.clone(), now)?;
        self.store.set_groups(&groups)?;

        tracing::info!(group = %group_id, member = %member.id, "added member");
        Ok(member)
    }

    /// Adds a person who already belongs to another group, keeping their ID so
    /// balances can be aggregated across groups.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnknownMember`] - the person is in no group.
    /// - [`LedgerError::GroupNotFound`] - no such group.
    /// - [`LedgerError::DuplicateMember`] - already a member.
    pub fn join_group(
        &self,
        group_id: GroupId,
        member_id: MemberId,
    ) -> Result<GroupMember, LedgerError> {
        let _guard = self.lock.lock();
        let mut groups = self.store.get_groups()?;
        let person = groups
            .iter()
            .find_map(|group| group.member(&member_id))
            .map(|member| GroupMember::new(member.id, member.name.clone(), member.email.clone()))
            .ok_or(LedgerError::UnknownMember(member_id))?;
        let now = (self.clock)();
        find_group(&mut groups, group_id)?.add_member(person.clone(), now)?;
        self.store.set_groups(&groups)?;

        tracing::info!(group = %group_id, member = %member_id, "member joined group");
        Ok(person)
    }

    /// Deletes a group whose members are all settled.
    ///
    /// Expenses recorded against the group are kept.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::GroupNotFound`] - no such group.
    /// - [`LedgerError::UnsettledBalance`] - a member still owes or is owed.
    pub fn delete_group(&self, group_id: GroupId) -> Result<Group, LedgerError> {
        let _guard = self.lock.lock();
        let mut groups = self.store.get_groups()?;
        let index = groups
            .iter()
            .position(|group| group.id == group_id)
            .ok_or(LedgerError::GroupNotFound(group_id))?;
        if let Some(member) = groups[index]
            .members
            .iter()
            .find(|member| !is_settled(member.balance))
        {
            return Err(LedgerError::UnsettledBalance(member.id));
        }
        let removed = groups.remove(index);
        self.store.set_groups(&groups)?;

        tracing::info!(group = %group_id, name = %removed.name, "deleted group");
        Ok(removed)
    }

    /// Removes a member whose balance is settled.
    pub fn remove_member(
        &self,
        group_id: GroupId,
        member_id: MemberId,
    ) -> Result<GroupMember, LedgerError> {
        let _guard = self.lock.lock();
        let mut groups = self.store.get_groups()?;
        let now = (self.clock)();
        let removed = find_group(&mut groups, group_id)?.remove_member(&member_id, now)?;
        self.store.set_groups(&groups)?;

        tracing::info!(group = %group_id, member = %member_id, "removed member");
        Ok(removed)
    }

    /// Records a personal expense. Balances are unaffected.
    pub fn add_expense(
        &self,
        amount: Decimal,
        category: ExpenseCategory,
        description: &str,
        date: Option<DateTime<Utc>>,
    ) -> Result<Expense, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount);
        }

        let _guard = self.lock.lock();
        let mut expenses = self.store.get_expenses()?;
        let expense = Expense::personal(
            next_expense_id(&expenses),
            amount,
            category,
            description,
            date.unwrap_or_else(self.clock),
        );
        expenses.push(expense.clone());
        self.store.set_expenses(&expenses)?;

        tracing::info!(expense = %expense.id, %amount, %category, "added expense");
        Ok(expense)
    }

    /// Splits an expense across group members and updates their balances.
    ///
    /// Members whose share comes out as zero are left out of the stored split
    /// details.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::GroupNotFound`] - no such group.
    /// - [`LedgerError::UnknownMember`] - the payer or a listed member is not in the group.
    /// - Any error from [`compute_split`].
    /// - [`LedgerError::ReconciliationMismatch`] - the split misses the amount by
    ///   more than one cent.
    pub fn add_split_expense(&self, request: NewSplitExpense) -> Result<Expense, LedgerError> {
        let _guard = self.lock.lock();
        let original = self.store.get_groups()?;
        let mut groups = original.clone();
        let group = find_group(&mut groups, request.group_id)?;

        let members = request.members.unwrap_or_else(|| group.member_ids());
        if let Some(stranger) = members.iter().find(|id| !group.contains(id)) {
            return Err(LedgerError::UnknownMember(*stranger));
        }

        let split = compute_split(request.amount, &members, &request.strategy)?;
        split.reconcile(request.amount)?;

        let mut details = split.into_details();
        details.retain(|detail| !detail.amount.is_zero());

        let now = (self.clock)();
        group.apply_expense(&request.paid_by, &details, now)?;

        let mut expenses = self.store.get_expenses()?;
        let expense = Expense {
            id: next_expense_id(&expenses),
            amount: request.amount,
            category: request.category,
            description: request.description,
            date: now,
            tags: request.tags,
            group_id: Some(request.group_id),
            paid_by: Some(request.paid_by),
            split_details: details,
        };
        expenses.push(expense.clone());
        self.commit(&original, &groups, &expenses)?;

        tracing::info!(
            expense = %expense.id,
            group = %request.group_id,
            amount = %expense.amount,
            strategy = %request.strategy.kind(),
            members = expense.split_details.len(),
            "added split expense"
        );
        Ok(expense)
    }

    /// Records that `transfer` was paid within a group.
    ///
    /// The payment is stored as a [`ExpenseCategory::Settlement`] expense paid
    /// by the debtor and charged to the creditor.
    pub fn record_settlement(
        &self,
        group_id: GroupId,
        transfer: Transfer,
    ) -> Result<Expense, LedgerError> {
        let _guard = self.lock.lock();
        let original = self.store.get_groups()?;
        let mut groups = original.clone();
        let now = (self.clock)();
        find_group(&mut groups, group_id)?.apply_settlement(&transfer, now)?;

        let mut expenses = self.store.get_expenses()?;
        let expense = settlement_expense(next_expense_id(&expenses), group_id, &transfer, now);
        expenses.push(expense.clone());
        self.commit(&original, &groups, &expenses)?;

        tracing::info!(
            group = %group_id,
            from = %transfer.from,
            to = %transfer.to,
            amount = %transfer.amount,
            "recorded settlement"
        );
        Ok(expense)
    }

    /// Records that `transfer` was paid, booking it in groups both members
    /// belong to or along a chain of groups linked by shared members.
    ///
    /// One settlement expense is stored per group the payment passes through.
    /// Intermediate members are credited and debited the same amount, so only
    /// the two named balances change overall.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NonPositiveAmount`] - the amount is zero or negative.
    /// - [`LedgerError::InvalidParameter`] - a member would pay themselves.
    /// - [`LedgerError::UnknownMember`] - either side is in no group.
    /// - [`LedgerError::NoSettlementRoute`] - no shared groups link the two.
    pub fn record_settlement_across(
        &self,
        transfer: Transfer,
    ) -> Result<Vec<Expense>, LedgerError> {
        if transfer.amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount);
        }
        if transfer.from == transfer.to {
            return Err(LedgerError::InvalidParameter(format!(
                "member {} cannot settle with themselves",
                transfer.from
            )));
        }

        let _guard = self.lock.lock();
        let original = self.store.get_groups()?;
        for member_id in [transfer.from, transfer.to] {
            if !original.iter().any(|group| group.contains(&member_id)) {
                return Err(LedgerError::UnknownMember(member_id));
            }
        }
        let route = route_transfer(&original, &transfer).ok_or(LedgerError::NoSettlementRoute {
            from: transfer.from,
            to: transfer.to,
        })?;

        let mut groups = original.clone();
        let mut expenses = self.store.get_expenses()?;
        let now = (self.clock)();
        let mut recorded = Vec::with_capacity(route.len());
        for (group_id, hop) in &route {
            find_group(&mut groups, *group_id)?.apply_settlement(hop, now)?;
            let expense = settlement_expense(next_expense_id(&expenses), *group_id, hop, now);
            expenses.push(expense.clone());
            recorded.push(expense);
        }
        self.commit(&original, &groups, &expenses)?;

        tracing::info!(
            from = %transfer.from,
            to = %transfer.to,
            amount = %transfer.amount,
            hops = route.len(),
            "recorded settlement across groups"
        );
        Ok(recorded)
    }

    /// Current balances for `scope`.
    pub fn balances(&self, scope: SettleScope) -> Result<Vec<MemberBalance>, LedgerError> {
        match scope {
            SettleScope::Group(group_id) => Ok(self.group(group_id)?.balances()),
            SettleScope::All => Ok(aggregate_balances(&self.store.get_groups()?)),
        }
    }

    /// Settlement plan for the current balances in `scope`.
    pub fn settle_up(&self, scope: SettleScope) -> Result<Vec<Transfer>, LedgerError> {
        match scope {
            SettleScope::Group(group_id) => Ok(simplify_debts(&self.group(group_id)?.balances())),
            SettleScope::All => Ok(simplify_across_groups(&self.store.get_groups()?)),
        }
    }

    /// Writes groups then expenses, restoring the previous groups if the
    /// expense write fails.
    fn commit(
        &self,
        original: &[Group],
        groups: &[Group],
        expenses: &[Expense],
    ) -> Result<(), LedgerError> {
        self.store.set_groups(groups)?;
        if let Err(err) = self.store.set_expenses(expenses) {
            if let Err(restore) = self.store.set_groups(original) {
                tracing::error!("failed to restore groups after write failure: {restore}");
            }
            return Err(err);
        }
        Ok(())
    }
}

/// Settlement booked as an expense paid by the debtor and charged to the
/// creditor.
fn settlement_expense(
    id: ExpenseId,
    group_id: GroupId,
    transfer: &Transfer,
    now: DateTime<Utc>,
) -> Expense {
    Expense {
        id,
        amount: transfer.amount,
        category: ExpenseCategory::Settlement,
        description: format!("{} paid {}", transfer.from, transfer.to),
        date: now,
        tags: Vec::new(),
        group_id: Some(group_id),
        paid_by: Some(transfer.from),
        split_details: vec![SplitDetail::new(transfer.to, transfer.amount)],
    }
}

fn find_group(groups: &mut [Group], group_id: GroupId) -> Result<&mut Group, LedgerError> {
    groups
        .iter_mut()
        .find(|group| group.id == group_id)
        .ok_or(LedgerError::GroupNotFound(group_id))
}

// Ids still referenced by stored expenses are never handed out again, so a
// deleted group or removed member keeps its history.

fn next_group_id(groups: &[Group], expenses: &[Expense]) -> GroupId {
    let max = groups
        .iter()
        .map(|group| group.id.0)
        .chain(expenses.iter().filter_map(|expense| expense.group_id).map(|id| id.0))
        .max();
    GroupId(max.map_or(1, |max| max + 1))
}

fn next_member_id(groups: &[Group], expenses: &[Expense]) -> MemberId {
    let referenced = expenses.iter().flat_map(|expense| {
        expense
            .paid_by
            .into_iter()
            .chain(expense.split_details.iter().map(|detail| detail.member_id))
    });
    let max = groups
        .iter()
        .flat_map(|group| group.members.iter().map(|member| member.id))
        .chain(referenced)
        .map(|id| id.0)
        .max();
    MemberId(max.map_or(1, |max| max + 1))
}

fn next_expense_id(expenses: &[Expense]) -> ExpenseId {
    ExpenseId(expenses.iter().map(|expense| expense.id.0).max().map_or(1, |max| max + 1))
}
