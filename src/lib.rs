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

//! # Split Ledger
//!
//! This library tracks shared expenses: it splits costs between group members,
//! keeps each member's running balance and works out who should pay whom to
//! settle up.
//!
//! ## Core Components
//!
//! - [`compute_split`]: Divides an expense total using a [`SplitStrategy`]
//! - [`apply_expense_to_balances`]: Applies a split to group member balances
//! - [`simplify_debts`]: Turns balances into a short list of [`Transfer`]s
//! - [`Tracker`]: Service running the above against a [`store`] backend
//! - [`report`]: Spending summaries, filters and CSV export
//! - [`LedgerError`]: Error type shared by every operation
//!
//! ## Example
//!
//! ```
//! use split_ledger_rs::{MemoryStore, NewSplitExpense, SettleScope, Tracker};
//! use rust_decimal_macros::dec;
//!
//! let tracker = Tracker::new(MemoryStore::new());
//! let group = tracker.create_group("Trip", "", "Asha", "asha@example.com").unwrap();
//! let asha = group.members[0].id;
//! let ben = tracker.add_member(group.id, "Ben", "ben@example.com").unwrap().id;
//!
//! // Asha pays 90.00 for both of them.
//! tracker
//!     .add_split_expense(NewSplitExpense::equal(group.id, asha, dec!(90.00)))
//!     .unwrap();
//!
//! let plan = tracker.settle_up(SettleScope::Group(group.id)).unwrap();
//! assert_eq!(plan.len(), 1);
//! assert_eq!((plan[0].from, plan[0].to, plan[0].amount), (ben, asha, dec!(45.00)));
//! ```
//!
//! ## Money
//!
//! Amounts are [`rust_decimal::Decimal`]. Comparisons against zero use a one
//! cent tolerance ([`EPSILON`]).

mod base;
pub mod error;
mod expense;
mod group;
pub mod ledger;
pub mod report;
pub mod settlement;
pub mod split;
pub mod store;
mod tracker;

pub use base::{
    CURRENCY_PRECISION, EPSILON, ExpenseId, GroupId, MemberId, is_settled, round_currency,
};
pub use error::LedgerError;
pub use expense::{Expense, ExpenseCategory, SplitDetail};
pub use group::{Group, GroupMember};
pub use ledger::{apply_expense_to_balances, balance_sum, record_settlement};
pub use settlement::{
    MemberBalance, Transfer, aggregate_balances, apply_transfers, checked_simplify_debts,
    route_transfer, simplify_across_groups, simplify_debts,
};
pub use split::{Split, SplitKind, SplitStrategy, compute_split};
pub use store::{ExpenseRepository, FileStore, GroupRepository, KeyValueStore, MemoryStore};
pub use tracker::{NewSplitExpense, SettleScope, Tracker};
