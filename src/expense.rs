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

//! Expense records and their split details.

use crate::base::{ExpenseId, GroupId, MemberId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What an expense was spent on.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseCategory {
    #[default]
    Lunch,
    Dinner,
    Breakfast,
    Snacks,
    Beverages,
    Groceries,
    Other,
    /// Repayment between two members. Not counted as spending.
    Settlement,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 8] = [
        Self::Lunch,
        Self::Dinner,
        Self::Breakfast,
        Self::Snacks,
        Self::Beverages,
        Self::Groceries,
        Self::Other,
        Self::Settlement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::Breakfast => "breakfast",
            Self::Snacks => "snacks",
            Self::Beverages => "beverages",
            Self::Groceries => "groceries",
            Self::Other => "other",
            Self::Settlement => "settlement",
        }
    }

    /// Returns `true` for categories that count as money spent.
    pub fn is_spending(&self) -> bool {
        !matches!(self, Self::Settlement)
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == needle)
            .ok_or_else(|| format!("unknown category '{s}'"))
    }
}

/// One member's share of an expense.
///
/// `share_percentage` and `share_count` record the strategy input that produced
/// `amount`; only `amount` affects balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitDetail {
    pub member_id: MemberId,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_percentage: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_count: Option<Decimal>,
}

impl SplitDetail {
    pub fn new(member_id: MemberId, amount: Decimal) -> Self {
        Self {
            member_id,
            amount,
            share_percentage: None,
            share_count: None,
        }
    }
}

/// A recorded expense.
///
/// Personal expenses carry no group, payer or split details. Group expenses
/// carry all three.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub amount: Decimal,
    pub category: ExpenseCategory,
    #[serde(default)]
    pub description: String,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_by: Option<MemberId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub split_details: Vec<SplitDetail>,
}

impl Expense {
    /// Creates a personal expense.
    pub fn personal(
        id: ExpenseId,
        amount: Decimal,
        category: ExpenseCategory,
        description: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            amount,
            category,
            description: description.into(),
            date,
            tags: Vec::new(),
            group_id: None,
            paid_by: None,
            split_details: Vec::new(),
        }
    }

    pub fn is_shared(&self) -> bool {
        self.group_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("Dinner".parse::<ExpenseCategory>(), Ok(ExpenseCategory::Dinner));
        assert_eq!(" groceries ".parse::<ExpenseCategory>(), Ok(ExpenseCategory::Groceries));
        assert!("rent".parse::<ExpenseCategory>().is_err());
    }

    #[test]
    fn category_serializes_lowercase() {
        let json = serde_json::to_string(&ExpenseCategory::Beverages).unwrap();
        assert_eq!(json, "\"beverages\"");
    }

    #[test]
    fn settlement_is_not_spending() {
        assert!(!ExpenseCategory::Settlement.is_spending());
        assert!(ExpenseCategory::Snacks.is_spending());
    }

    #[test]
    fn personal_expense_json_omits_split_fields() {
        let date = DateTime::parse_from_rfc3339("2025-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let expense = Expense::personal(ExpenseId(1), dec!(12.50), ExpenseCategory::Lunch, "", date);

        let parsed: serde_json::Value = serde_json::to_value(&expense).unwrap();
        assert_eq!(parsed["amount"], "12.50");
        assert_eq!(parsed["category"], "lunch");
        assert!(parsed.get("group_id").is_none());
        assert!(parsed.get("split_details").is_none());
        assert!(!expense.is_shared());
    }
}
