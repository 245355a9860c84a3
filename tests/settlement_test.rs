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

//! Debt simplifier public API integration tests.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use split_ledger_rs::{
    LedgerError, MemberBalance, MemberId, Transfer, apply_transfers, checked_simplify_debts,
    is_settled, simplify_debts,
};

const A: MemberId = MemberId(1);
const B: MemberId = MemberId(2);
const C: MemberId = MemberId(3);
const D: MemberId = MemberId(4);

fn make_balances(entries: &[(MemberId, Decimal)]) -> Vec<MemberBalance> {
    entries
        .iter()
        .map(|&(member_id, balance)| MemberBalance::new(member_id, balance))
        .collect()
}

fn assert_all_settled(balances: &[MemberBalance], transfers: &[Transfer]) {
    for entry in apply_transfers(balances, transfers) {
        assert!(
            is_settled(entry.balance),
            "member {} left with {}",
            entry.member_id,
            entry.balance
        );
    }
}

#[test]
fn two_party_settlement() {
    let balances = make_balances(&[(A, dec!(-50)), (B, dec!(50))]);
    let transfers = simplify_debts(&balances);
    assert_eq!(transfers, vec![Transfer::new(A, B, dec!(50))]);
}

#[test]
fn three_party_chain() {
    let balances = make_balances(&[(A, dec!(-30)), (B, dec!(-20)), (C, dec!(50))]);
    let transfers = simplify_debts(&balances);
    assert_eq!(
        transfers,
        vec![
            Transfer::new(A, C, dec!(30)),
            Transfer::new(B, C, dec!(20)),
        ]
    );
}

#[test]
fn already_settled() {
    let balances = make_balances(&[(A, dec!(0)), (B, dec!(0))]);
    assert!(simplify_debts(&balances).is_empty());
}

#[test]
fn empty_input() {
    assert!(simplify_debts(&[]).is_empty());
}

#[test]
fn sub_cent_balances_are_ignored() {
    let balances = make_balances(&[(A, dec!(0.005)), (B, dec!(-0.005))]);
    assert!(simplify_debts(&balances).is_empty());
}

#[test]
fn largest_debtor_pays_largest_creditor_first() {
    let balances = make_balances(&[(A, dec!(-10)), (B, dec!(-40)), (C, dec!(20)), (D, dec!(30))]);
    let transfers = simplify_debts(&balances);
    assert_eq!(
        transfers,
        vec![
            Transfer::new(B, D, dec!(30)),
            Transfer::new(B, C, dec!(10)),
            Transfer::new(A, C, dec!(10)),
        ]
    );
    assert_all_settled(&balances, &transfers);
}

#[test]
fn ties_keep_input_order() {
    let balances = make_balances(&[(A, dec!(-10)), (B, dec!(-10)), (C, dec!(20))]);
    assert_eq!(
        simplify_debts(&balances),
        vec![
            Transfer::new(A, C, dec!(10)),
            Transfer::new(B, C, dec!(10)),
        ]
    );

    let balances = make_balances(&[(A, dec!(-20)), (C, dec!(10)), (B, dec!(10))]);
    assert_eq!(
        simplify_debts(&balances),
        vec![
            Transfer::new(A, C, dec!(10)),
            Transfer::new(A, B, dec!(10)),
        ]
    );
}

#[test]
fn transfer_count_is_bounded() {
    let balances = make_balances(&[
        (A, dec!(-25.50)),
        (B, dec!(-14.25)),
        (C, dec!(19.75)),
        (D, dec!(20.00)),
    ]);
    let transfers = simplify_debts(&balances);
    assert!(transfers.len() <= 3);
    assert!(transfers.iter().all(|t| t.amount >= dec!(0.01)));
    assert_all_settled(&balances, &transfers);
}

#[test]
fn repeated_calls_are_identical() {
    let balances = make_balances(&[
        (A, dec!(-12.34)),
        (B, dec!(12.34)),
        (C, dec!(-7.00)),
        (D, dec!(7.00)),
    ]);
    let first = simplify_debts(&balances);
    for _ in 0..10 {
        assert_eq!(simplify_debts(&balances), first);
    }
}

#[test]
fn unbalanced_input_yields_partial_plan() {
    let balances = make_balances(&[(A, dec!(-50)), (B, dec!(30))]);
    assert_eq!(simplify_debts(&balances), vec![Transfer::new(A, B, dec!(30))]);
}

#[test]
fn checked_rejects_unbalanced_input() {
    let balances = make_balances(&[(A, dec!(-50)), (B, dec!(30))]);
    assert_eq!(
        checked_simplify_debts(&balances),
        Err(LedgerError::UnbalancedLedger(dec!(-20)))
    );
}

#[test]
fn checked_rejects_duplicate_members() {
    let balances = make_balances(&[(A, dec!(-10)), (B, dec!(10)), (A, dec!(0))]);
    assert_eq!(
        checked_simplify_debts(&balances),
        Err(LedgerError::DuplicateMember(A))
    );
}

#[test]
fn checked_accepts_one_cent_drift() {
    let balances = make_balances(&[(A, dec!(-33.33)), (B, dec!(-33.33)), (C, dec!(66.67))]);
    let transfers = checked_simplify_debts(&balances).unwrap();
    assert_eq!(
        transfers,
        vec![
            Transfer::new(A, C, dec!(33.33)),
            Transfer::new(B, C, dec!(33.33)),
        ]
    );
}
