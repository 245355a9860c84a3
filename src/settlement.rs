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

//! Debt simplification.
//!
//! [`simplify_debts`] turns a snapshot of member balances into a list of
//! transfers that settles every balance. It matches the largest creditor with
//! the largest debtor until one side runs out:
//!
//! ```text
//! creditors (desc):  C +50
//! debtors   (asc):   A -30   B -20
//!
//! A -> C 30    A settled, C +20 left
//! B -> C 20    B settled, C settled
//! ```
//!
//! Every round fully settles at least one side, so the plan has at most
//! `creditors + debtors - 1` transfers. This is a greedy bound, not the global
//! minimum, which is NP-hard to find.
//!
//! Every comparison with zero uses [`EPSILON`]. Sorting is stable, so equal
//! balances keep their input order and the output is deterministic.

use crate::base::{EPSILON, GroupId, MemberId, is_settled};
use crate::error::LedgerError;
use crate::group::Group;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// One member's net position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberBalance {
    pub member_id: MemberId,
    pub balance: Decimal,
}

impl MemberBalance {
    pub fn new(member_id: MemberId, balance: Decimal) -> Self {
        Self { member_id, balance }
    }
}

/// Payment instruction: `from` (debtor) pays `to` (creditor) `amount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: MemberId,
    pub to: MemberId,
    pub amount: Decimal,
}

impl Transfer {
    pub fn new(from: MemberId, to: MemberId, amount: Decimal) -> Self {
        Self { from, to, amount }
    }
}

/// Computes a settlement plan for `balances`.
///
/// The input is not checked for consistency. If the balances do not sum to
/// zero, the unmatched remainder is logged as a warning and the plan covers
/// only what can be matched. Use [`checked_simplify_debts`] to reject such
/// input instead.
pub fn simplify_debts(balances: &[MemberBalance]) -> Vec<Transfer> {
    let mut creditors: Vec<MemberBalance> = balances
        .iter()
        .filter(|entry| entry.balance >= EPSILON)
        .copied()
        .collect();
    creditors.sort_by(|a, b| b.balance.cmp(&a.balance));

    let mut debtors: Vec<MemberBalance> = balances
        .iter()
        .filter(|entry| entry.balance <= -EPSILON)
        .copied()
        .collect();
    debtors.sort_by(|a, b| a.balance.cmp(&b.balance));

    let mut transfers = Vec::with_capacity(creditors.len() + debtors.len());
    let (mut next_creditor, mut next_debtor) = (0, 0);

    while next_creditor < creditors.len() && next_debtor < debtors.len() {
        let creditor = &mut creditors[next_creditor];
        let debtor = &mut debtors[next_debtor];

        let amount = debtor.balance.abs().min(creditor.balance);
        transfers.push(Transfer::new(debtor.member_id, creditor.member_id, amount));

        debtor.balance += amount;
        creditor.balance -= amount;

        if is_settled(debtor.balance) {
            next_debtor += 1;
        }
        if is_settled(creditor.balance) {
            next_creditor += 1;
        }
    }

    let unmatched: Decimal = creditors[next_creditor..]
        .iter()
        .chain(&debtors[next_debtor..])
        .map(|entry| entry.balance)
        .sum();
    if !is_settled(unmatched) {
        tracing::warn!(
            residue = %unmatched,
            creditors = creditors.len() - next_creditor,
            debtors = debtors.len() - next_debtor,
            "balances do not sum to zero, settlement plan is partial"
        );
    }

    tracing::debug!(
        members = balances.len(),
        transfers = transfers.len(),
        "simplified debts"
    );
    transfers
}

/// Like [`simplify_debts`], but rejects inconsistent input first.
///
/// # Errors
///
/// - [`LedgerError::DuplicateMember`] - a member appears more than once.
/// - [`LedgerError::UnbalancedLedger`] - balances do not sum to zero within
///   [`EPSILON`].
pub fn checked_simplify_debts(balances: &[MemberBalance]) -> Result<Vec<Transfer>, LedgerError> {
    let mut seen = HashSet::with_capacity(balances.len());
    if let Some(duplicate) = balances.iter().find(|entry| !seen.insert(entry.member_id)) {
        return Err(LedgerError::DuplicateMember(duplicate.member_id));
    }

    let sum: Decimal = balances.iter().map(|entry| entry.balance).sum();
    if sum.abs() > EPSILON {
        return Err(LedgerError::UnbalancedLedger(sum));
    }

    Ok(simplify_debts(balances))
}

/// Sums balances per member, keeping first-seen order.
pub fn aggregate(balances: impl IntoIterator<Item = MemberBalance>) -> Vec<MemberBalance> {
    let mut index: HashMap<MemberId, usize> = HashMap::new();
    let mut merged: Vec<MemberBalance> = Vec::new();

    for entry in balances {
        match index.get(&entry.member_id) {
            Some(&position) => merged[position].balance += entry.balance,
            None => {
                index.insert(entry.member_id, merged.len());
                merged.push(entry);
            }
        }
    }

    merged
}

/// Combines each person's balances across `groups` into one working balance.
///
/// A member of a single group passes through unchanged.
pub fn aggregate_balances(groups: &[Group]) -> Vec<MemberBalance> {
    aggregate(groups.iter().flat_map(|group| group.balances()))
}

/// Settlement plan across every group.
///
/// Groups that share a member form one component. Balances are summed per
/// person within a component and simplified there, so every transfer joins two
/// people linked through shared groups and can be booked with
/// [`route_transfer`].
pub fn simplify_across_groups(groups: &[Group]) -> Vec<Transfer> {
    connected_components(groups)
        .into_iter()
        .flat_map(|component| {
            let balances = aggregate(component.iter().flat_map(|group| group.balances()));
            simplify_debts(&balances)
        })
        .collect()
}

/// Splits `transfer` into one hop per group along the shortest chain of shared
/// memberships from `transfer.from` to `transfer.to`.
///
/// Each hop moves the full amount, so intermediate members end up where they
/// started. Returns `None` when no chain exists or both sides are the same
/// member.
pub fn route_transfer(
    groups: &[Group],
    transfer: &Transfer,
) -> Option<Vec<(GroupId, Transfer)>> {
    let mut previous: HashMap<MemberId, (MemberId, GroupId)> = HashMap::new();
    let mut visited = HashSet::from([transfer.from]);
    let mut queue = VecDeque::from([transfer.from]);

    while let Some(current) = queue.pop_front() {
        if current == transfer.to {
            break;
        }
        for group in groups.iter().filter(|group| group.contains(&current)) {
            for member in &group.members {
                if visited.insert(member.id) {
                    previous.insert(member.id, (current, group.id));
                    queue.push_back(member.id);
                }
            }
        }
    }

    let mut hops = Vec::new();
    let mut current = transfer.to;
    while current != transfer.from {
        let &(payer, group_id) = previous.get(&current)?;
        hops.push((group_id, Transfer::new(payer, current, transfer.amount)));
        current = payer;
    }
    if hops.is_empty() {
        return None;
    }
    hops.reverse();
    Some(hops)
}

/// Groups linked by shared members, in order of each component's first group.
fn connected_components(groups: &[Group]) -> Vec<Vec<&Group>> {
    let mut parent: Vec<usize> = (0..groups.len()).collect();
    let mut first_seen: HashMap<MemberId, usize> = HashMap::new();

    for (index, group) in groups.iter().enumerate() {
        for member in &group.members {
            match first_seen.get(&member.id) {
                Some(&other) => {
                    let (a, b) = (root(&mut parent, index), root(&mut parent, other));
                    parent[a.max(b)] = a.min(b);
                }
                None => {
                    first_seen.insert(member.id, index);
                }
            }
        }
    }

    // Roots are always the lowest index in their component.
    let mut components: BTreeMap<usize, Vec<&Group>> = BTreeMap::new();
    for (index, group) in groups.iter().enumerate() {
        components
            .entry(root(&mut parent, index))
            .or_default()
            .push(group);
    }
    components.into_values().collect()
}

fn root(parent: &mut [usize], mut index: usize) -> usize {
    while parent[index] != index {
        parent[index] = parent[parent[index]];
        index = parent[index];
    }
    index
}

/// Returns `balances` as they would be after every transfer is paid.
///
/// Transfers naming a member absent from `balances` are ignored.
pub fn apply_transfers(balances: &[MemberBalance], transfers: &[Transfer]) -> Vec<MemberBalance> {
    let mut result = balances.to_vec();
    for transfer in transfers {
        if let Some(debtor) = result.iter_mut().find(|e| e.member_id == transfer.from) {
            debtor.balance += transfer.amount;
        }
        if let Some(creditor) = result.iter_mut().find(|e| e.member_id == transfer.to) {
            creditor.balance -= transfer.amount;
        }
    }
    result
}
