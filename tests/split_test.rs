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

//! Split calculator public API integration tests.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use split_ledger_rs::{LedgerError, MemberId, SplitStrategy, compute_split};
use std::collections::BTreeMap;

const A: MemberId = MemberId(1);
const B: MemberId = MemberId(2);
const C: MemberId = MemberId(3);

fn params(pairs: &[(MemberId, Decimal)]) -> BTreeMap<MemberId, Decimal> {
    pairs.iter().copied().collect()
}

// === Strategy Tests ===

#[test]
fn equal_split_three_ways() {
    let split = compute_split(dec!(300), &[A, B, C], &SplitStrategy::Equal).unwrap();
    assert_eq!(split.amount_for(&A), Some(dec!(100)));
    assert_eq!(split.amount_for(&B), Some(dec!(100)));
    assert_eq!(split.amount_for(&C), Some(dec!(100)));
    assert_eq!(split.total(), dec!(300));
}

#[test]
fn equal_split_corrects_rounding_residue() {
    let split = compute_split(dec!(100), &[A, B, C], &SplitStrategy::Equal).unwrap();
    let amounts: Vec<Decimal> = split.iter().map(|(_, amount)| amount).collect();
    assert_eq!(amounts, vec![dec!(33.34), dec!(33.33), dec!(33.33)]);
    assert_eq!(split.total(), dec!(100));
}

#[test]
fn equal_split_many_members_sums_exactly() {
    let members: Vec<MemberId> = (1..=7).map(MemberId).collect();
    let split = compute_split(dec!(10), &members, &SplitStrategy::Equal).unwrap();
    assert_eq!(split.total(), dec!(10));
    assert!(split.iter().all(|(_, amount)| amount == dec!(1.43) || amount == dec!(1.42)));
}

#[test]
fn percentage_split() {
    let strategy = SplitStrategy::Percentage(params(&[(A, dec!(30)), (B, dec!(70))]));
    let split = compute_split(dec!(200), &[A, B], &strategy).unwrap();
    assert_eq!(split.amount_for(&A), Some(dec!(60)));
    assert_eq!(split.amount_for(&B), Some(dec!(140)));
    assert_eq!(split.details()[0].share_percentage, Some(dec!(30)));
    assert_eq!(split.details()[0].share_count, None);
}

#[test]
fn percentage_under_100_under_allocates() {
    let strategy = SplitStrategy::Percentage(params(&[(A, dec!(50)), (B, dec!(40))]));
    let split = compute_split(dec!(100), &[A, B], &strategy).unwrap();
    assert_eq!(split.total(), dec!(90));
    assert_eq!(
        split.reconcile(dec!(100)),
        Err(LedgerError::ReconciliationMismatch {
            expected: dec!(100),
            actual: dec!(90),
        })
    );
}

#[test]
fn percentage_over_100_over_allocates() {
    let strategy = SplitStrategy::Percentage(params(&[(A, dec!(50)), (B, dec!(60))]));
    let split = compute_split(dec!(100), &[A, B], &strategy).unwrap();
    assert_eq!(split.total(), dec!(110));
    assert!(split.reconcile(dec!(100)).is_err());
}

#[test]
fn prefilled_thirds_miss_by_ten_cents() {
    // 33.3% each only covers 99.9% of the total.
    let strategy = SplitStrategy::equal_percentages(&[A, B, C]);
    let split = compute_split(dec!(100), &[A, B, C], &strategy).unwrap();
    assert_eq!(split.total(), dec!(99.90));
    assert!(split.reconcile(dec!(100)).is_err());
}

#[test]
fn shares_split_equal_weights() {
    let strategy = SplitStrategy::Shares(params(&[(A, dec!(1)), (B, dec!(1)), (C, dec!(1))]));
    let split = compute_split(dec!(150), &[A, B, C], &strategy).unwrap();
    assert_eq!(split.amount_for(&A), Some(dec!(50)));
    assert_eq!(split.amount_for(&B), Some(dec!(50)));
    assert_eq!(split.amount_for(&C), Some(dec!(50)));
    assert_eq!(split.details()[2].share_count, Some(dec!(1)));
}

#[test]
fn shares_split_weighted() {
    let strategy = SplitStrategy::Shares(params(&[(A, dec!(2)), (B, dec!(1)), (C, dec!(0))]));
    let split = compute_split(dec!(100), &[A, B, C], &strategy).unwrap();
    assert_eq!(split.amount_for(&A), Some(dec!(66.67)));
    assert_eq!(split.amount_for(&B), Some(dec!(33.33)));
    assert_eq!(split.amount_for(&C), Some(Decimal::ZERO));
    split.reconcile(dec!(100)).unwrap();
}

#[test]
fn fractional_shares() {
    let strategy = SplitStrategy::Shares(params(&[(A, dec!(0.5)), (B, dec!(1.5))]));
    let split = compute_split(dec!(80), &[A, B], &strategy).unwrap();
    assert_eq!(split.amount_for(&A), Some(dec!(20)));
    assert_eq!(split.amount_for(&B), Some(dec!(60)));
}

#[test]
fn unequal_split_passes_amounts_through() {
    let strategy = SplitStrategy::Unequal(params(&[(A, dec!(10.555)), (B, dec!(20))]));
    let split = compute_split(dec!(30.56), &[A, B], &strategy).unwrap();
    assert_eq!(split.amount_for(&A), Some(dec!(10.56)));
    assert_eq!(split.amount_for(&B), Some(dec!(20)));
    split.reconcile(dec!(30.56)).unwrap();
}

#[test]
fn unequal_split_is_not_corrected() {
    let strategy = SplitStrategy::Unequal(params(&[(A, dec!(10)), (B, dec!(10))]));
    let split = compute_split(dec!(25), &[A, B], &strategy).unwrap();
    assert_eq!(split.total(), dec!(20));
    assert!(split.reconcile(dec!(25)).is_err());
}

#[test]
fn reconcile_tolerates_one_cent() {
    let strategy = SplitStrategy::Unequal(params(&[(A, dec!(10)), (B, dec!(10.01))]));
    let split = compute_split(dec!(20), &[A, B], &strategy).unwrap();
    split.reconcile(dec!(20)).unwrap();
}

#[test]
fn split_preserves_member_order() {
    let split = compute_split(dec!(30), &[C, A, B], &SplitStrategy::Equal).unwrap();
    let order: Vec<MemberId> = split.iter().map(|(id, _)| id).collect();
    assert_eq!(order, vec![C, A, B]);
}

// === Validation Tests ===

#[test]
fn zero_total_is_rejected() {
    let result = compute_split(Decimal::ZERO, &[A, B], &SplitStrategy::Equal);
    assert_eq!(result, Err(LedgerError::NonPositiveAmount));
}

#[test]
fn negative_total_is_rejected() {
    let result = compute_split(dec!(-5), &[A, B], &SplitStrategy::Equal);
    assert_eq!(result, Err(LedgerError::NonPositiveAmount));
}

#[test]
fn empty_members_are_rejected() {
    let result = compute_split(dec!(10), &[], &SplitStrategy::Equal);
    assert_eq!(result, Err(LedgerError::NoMembers));
    assert!(result.unwrap_err().is_invalid_input());
}

#[test]
fn duplicate_members_are_rejected() {
    let result = compute_split(dec!(10), &[A, B, A], &SplitStrategy::Equal);
    assert_eq!(result, Err(LedgerError::DuplicateMember(A)));
}

#[test]
fn zero_shares_divide_by_zero() {
    let strategy = SplitStrategy::Shares(params(&[(A, dec!(0)), (B, dec!(0))]));
    let result = compute_split(dec!(10), &[A, B], &strategy);
    assert_eq!(result, Err(LedgerError::DivisionByZero));
    assert!(result.unwrap_err().is_invalid_input());
}

#[test]
fn zero_percentages_divide_by_zero() {
    let strategy = SplitStrategy::Percentage(params(&[(A, dec!(0)), (B, dec!(0))]));
    let result = compute_split(dec!(10), &[A, B], &strategy);
    assert_eq!(result, Err(LedgerError::DivisionByZero));
}

#[test]
fn missing_parameter_is_rejected() {
    let strategy = SplitStrategy::Shares(params(&[(A, dec!(1))]));
    let result = compute_split(dec!(10), &[A, B], &strategy);
    assert_eq!(result, Err(LedgerError::MissingParameter(B)));
}

#[test]
fn parameter_for_stranger_is_rejected() {
    let strategy = SplitStrategy::Unequal(params(&[(A, dec!(5)), (B, dec!(5)), (C, dec!(5))]));
    let result = compute_split(dec!(10), &[A, B], &strategy);
    assert_eq!(result, Err(LedgerError::UnknownMember(C)));
}

#[test]
fn negative_parameter_is_rejected() {
    let strategy = SplitStrategy::Percentage(params(&[(A, dec!(120)), (B, dec!(-20))]));
    let result = compute_split(dec!(10), &[A, B], &strategy);
    assert!(matches!(result, Err(LedgerError::InvalidParameter(_))));
}

#[test]
fn huge_amount_with_large_shares_is_rejected() {
    let strategy = SplitStrategy::Shares(params(&[(A, dec!(100000)), (B, dec!(1))]));
    let result = compute_split(dec!(1000000000000000000000000), &[A, B], &strategy);
    assert!(matches!(result, Err(LedgerError::InvalidParameter(_))));
}

#[test]
fn huge_percentage_split_is_rejected() {
    let strategy = SplitStrategy::Percentage(params(&[(A, dec!(60)), (B, dec!(40))]));
    let result = compute_split(dec!(1000000000000000000000000000), &[A, B], &strategy);
    assert!(matches!(result, Err(LedgerError::InvalidParameter(_))));
}

#[test]
fn unequal_amounts_that_overflow_are_rejected() {
    let strategy = SplitStrategy::Unequal(params(&[(A, Decimal::MAX), (B, Decimal::MAX)]));
    let result = compute_split(dec!(10), &[A, B], &strategy);
    assert!(matches!(result, Err(LedgerError::InvalidParameter(_))));
}
