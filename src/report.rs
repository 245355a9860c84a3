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

//! Spending summaries and expense reports.
//!
//! Settlement records move money between members without anyone spending it,
//! so every total here skips [`ExpenseCategory::Settlement`]. [`ExpenseFilter`]
//! still returns them when asked for that category.

use crate::base::{ExpenseId, GroupId, round_currency};
use crate::expense::{Expense, ExpenseCategory};
use chrono::{Days, Months, NaiveDate};
use csv::Writer;
use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::io::Write;

/// Number of days covered by [`Summary::last_week`].
pub const WEEK_DAYS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// Preset reporting windows, ending today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Week,
    Month,
    Quarter,
    Year,
    AllTime,
}

impl Period {
    /// First day of the window, `None` for [`Period::AllTime`].
    pub fn start(&self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Week => today.checked_sub_days(Days::new(7)),
            Self::Month => today.checked_sub_days(Days::new(30)),
            Self::Quarter => today.checked_sub_months(Months::new(3)),
            Self::Year => today.checked_sub_months(Months::new(12)),
            Self::AllTime => None,
        }
    }
}

/// Selects and orders expenses for a report.
///
/// Empty category and group lists match everything. Date bounds are inclusive
/// calendar days in UTC.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub categories: Vec<ExpenseCategory>,
    pub groups: Vec<GroupId>,
    pub search: Option<String>,
    pub order: SortOrder,
}

impl ExpenseFilter {
    /// Filter covering `period` up to and including `today`.
    pub fn for_period(period: Period, today: NaiveDate) -> Self {
        Self {
            from: period.start(today),
            to: Some(today),
            ..Self::default()
        }
    }

    pub fn matches(&self, expense: &Expense) -> bool {
        let day = expense.date.date_naive();
        if self.from.is_some_and(|from| day < from) || self.to.is_some_and(|to| day > to) {
            return false;
        }
        if !self.categories.is_empty() && !self.categories.contains(&expense.category) {
            return false;
        }
        if !self.groups.is_empty()
            && !expense.group_id.is_some_and(|group| self.groups.contains(&group))
        {
            return false;
        }

        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                expense.description.to_lowercase().contains(&term)
                    || expense.category.as_str().contains(&term)
                    || expense
                        .group_id
                        .is_some_and(|group| group.to_string().contains(&term))
                    || day.to_string().contains(&term)
            }
            _ => true,
        }
    }

    /// Matching expenses sorted by date. Ties keep their stored order.
    pub fn apply(&self, expenses: &[Expense]) -> Vec<Expense> {
        let mut selected: Vec<Expense> = expenses
            .iter()
            .filter(|expense| self.matches(expense))
            .cloned()
            .collect();
        match self.order {
            SortOrder::Ascending => selected.sort_by_key(|expense| expense.date),
            SortOrder::Descending => selected.sort_by_key(|expense| Reverse(expense.date)),
        }
        selected
    }
}

fn spending(expenses: &[Expense]) -> impl Iterator<Item = &Expense> {
    expenses.iter().filter(|expense| expense.category.is_spending())
}

/// Total amount spent.
pub fn total_spent(expenses: &[Expense]) -> Decimal {
    spending(expenses).map(|expense| expense.amount).sum()
}

/// Amount spent per category. Categories with no expenses are absent.
pub fn by_category(expenses: &[Expense]) -> BTreeMap<ExpenseCategory, Decimal> {
    let mut totals = BTreeMap::new();
    for expense in spending(expenses) {
        *totals.entry(expense.category).or_insert(Decimal::ZERO) += expense.amount;
    }
    totals
}

/// Amount spent on each of the `days` days ending with `today`, oldest first.
///
/// Days without expenses are present with a zero total.
pub fn by_day(expenses: &[Expense], today: NaiveDate, days: u32) -> Vec<(NaiveDate, Decimal)> {
    let mut totals: BTreeMap<NaiveDate, Decimal> = (0..days)
        .filter_map(|offset| today.checked_sub_days(Days::new(u64::from(offset))))
        .map(|day| (day, Decimal::ZERO))
        .collect();
    for expense in spending(expenses) {
        if let Some(total) = totals.get_mut(&expense.date.date_naive()) {
            *total += expense.amount;
        }
    }
    totals.into_iter().collect()
}

/// Dashboard figures for a set of expenses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub total: Decimal,
    pub today: Decimal,
    pub count: usize,
    pub by_category: BTreeMap<ExpenseCategory, Decimal>,
    pub last_week: Vec<(NaiveDate, Decimal)>,
}

impl Summary {
    pub fn build(expenses: &[Expense], today: NaiveDate) -> Self {
        let today_total = spending(expenses)
            .filter(|expense| expense.date.date_naive() == today)
            .map(|expense| expense.amount)
            .sum();
        Self {
            total: total_spent(expenses),
            today: today_total,
            count: spending(expenses).count(),
            by_category: by_category(expenses),
            last_week: by_day(expenses, today, WEEK_DAYS),
        }
    }
}

/// CSV row of an exported expense.
#[derive(Debug, Serialize)]
struct ExpenseRow<'a> {
    id: ExpenseId,
    date: NaiveDate,
    category: ExpenseCategory,
    amount: Decimal,
    description: &'a str,
    group: Option<GroupId>,
}

/// Writes `expenses` as CSV with amounts rounded to cents.
///
/// # CSV Format
///
/// Columns: `id, date, category, amount, description, group`
///
/// ```csv
/// id,date,category,amount,description,group
/// 1,2025-03-01,lunch,12.50,noodles,
/// 2,2025-03-02,dinner,90.00,team dinner,1
/// ```
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_expenses_csv<W: Write>(expenses: &[Expense], writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    for expense in expenses {
        wtr.serialize(ExpenseRow {
            id: expense.id,
            date: expense.date.date_naive(),
            category: expense.category,
            amount: round_currency(expense.amount),
            description: &expense.description,
            group: expense.group_id,
        })?;
    }
    wtr.flush()?;
    Ok(())
}
