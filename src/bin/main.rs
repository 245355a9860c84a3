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

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use csv::Writer;
use rust_decimal::Decimal;
use serde::Serialize;
use split_ledger_rs::report::{ExpenseFilter, SortOrder, Summary, write_expenses_csv};
use split_ledger_rs::{
    ExpenseCategory, ExpenseRepository, FileStore, Group, GroupId, GroupRepository, LedgerError,
    MemberId, NewSplitExpense, SettleScope, SplitKind, SplitStrategy, Tracker, Transfer,
    round_currency,
};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::process;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Split Ledger - Track shared expenses and settle group debts
///
/// Data lives as JSON files in the data directory. Tables are written to
/// stdout as CSV.
#[derive(Parser, Debug)]
#[command(name = "split-ledger")]
#[command(about = "Track shared expenses and settle group debts", long_about = None)]
struct Args {
    /// Directory holding groups.json and expenses.json
    #[arg(long, env = "SPLIT_LEDGER_DATA", default_value = ".split-ledger", global = true)]
    data_dir: PathBuf,

    /// Log filter level (error, warn, info, debug, trace)
    #[arg(long, env = "SPLIT_LEDGER_LOG", default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or list groups
    #[command(subcommand)]
    Group(GroupCommand),

    /// Add or remove group members
    #[command(subcommand)]
    Member(MemberCommand),

    /// Record a personal expense
    Expense {
        amount: Decimal,
        #[arg(long, default_value = "other")]
        category: ExpenseCategory,
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Record an expense split across group members
    ///
    /// Example: split 1 120 --paid-by 1 --strategy shares --param 1=2 --param 2=1
    Split {
        group: u32,
        amount: Decimal,
        /// Member who paid
        #[arg(long)]
        paid_by: u32,
        #[arg(long, default_value = "other")]
        category: ExpenseCategory,
        #[arg(long, default_value = "")]
        description: String,
        /// equal, unequal, percentage or shares
        #[arg(long, default_value = "equal")]
        strategy: SplitKind,
        /// Per-member strategy value as MEMBER=VALUE
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(MemberId, Decimal)>,
        /// Members to split across (defaults to the whole group)
        #[arg(long = "member")]
        members: Vec<u32>,
    },

    /// Print member balances as CSV
    Balances {
        /// Limit to one group; otherwise balances are summed across groups
        #[arg(long)]
        group: Option<u32>,
    },

    /// Print who should pay whom as CSV
    ///
    /// Without --group, people are settled across every group they share.
    Settle {
        #[arg(long)]
        group: Option<u32>,
    },

    /// Record that a member paid back another
    ///
    /// Without --group, the payment is booked through the groups linking them.
    SettleRecord {
        from: u32,
        to: u32,
        amount: Decimal,
        #[arg(long)]
        group: Option<u32>,
    },

    /// Summarise or export expenses
    Report {
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        category: Vec<ExpenseCategory>,
        #[arg(long)]
        group: Vec<u32>,
        #[arg(long)]
        search: Option<String>,
        /// Oldest first
        #[arg(long)]
        ascending: bool,
        /// Write the matching expenses as CSV instead of a summary
        #[arg(long)]
        csv: bool,
    },
}

#[derive(Subcommand, Debug)]
enum GroupCommand {
    Create {
        name: String,
        #[arg(long)]
        creator: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    List,
    /// Delete a group whose members are all settled
    Delete { group: u32 },
}

#[derive(Subcommand, Debug)]
enum MemberCommand {
    Add {
        group: u32,
        name: String,
        email: String,
    },
    /// Add an existing member of another group
    Join { group: u32, member: u32 },
    Remove { group: u32, member: u32 },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("output failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("output failed: {0}")]
    Io(#[from] std::io::Error),
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!(
            "split_ledger={level},split_ledger_rs={level}",
            level = args.log_level
        )))
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(data_dir = %args.data_dir.display(), "opening store");
    let tracker = Tracker::new(FileStore::new(&args.data_dir));
    let today = Utc::now().date_naive();

    if let Err(e) = run(&tracker, args.command, today, std::io::stdout()) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn parse_param(raw: &str) -> Result<(MemberId, Decimal), String> {
    let (member, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected MEMBER=VALUE, got '{raw}'"))?;
    let member = member
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid member '{member}': {e}"))?;
    let value = value
        .trim()
        .parse::<Decimal>()
        .map_err(|e| format!("invalid value '{value}': {e}"))?;
    Ok((MemberId(member), value))
}

#[derive(Debug, Serialize)]
struct BalanceRow<'a> {
    member: MemberId,
    name: &'a str,
    balance: Decimal,
}

#[derive(Debug, Serialize)]
struct TransferRow<'a> {
    from: MemberId,
    from_name: &'a str,
    to: MemberId,
    to_name: &'a str,
    amount: Decimal,
}

fn member_name(groups: &[Group], member_id: MemberId) -> &str {
    groups
        .iter()
        .find_map(|group| group.member(&member_id))
        .map_or("", |member| member.name.as_str())
}

fn scope(group: Option<u32>) -> SettleScope {
    group.map_or(SettleScope::All, |id| SettleScope::Group(GroupId(id)))
}

/// Executes one command against `tracker`, writing results to `out`.
fn run<S, W>(
    tracker: &Tracker<S>,
    command: Command,
    today: NaiveDate,
    mut out: W,
) -> Result<(), CliError>
where
    S: GroupRepository + ExpenseRepository,
    W: Write,
{
    match command {
        Command::Group(GroupCommand::Create {
            name,
            creator,
            email,
            description,
        }) => {
            let group = tracker.create_group(&name, &description, &creator, &email)?;
            writeln!(
                out,
                "created group {} ({}) with member {}",
                group.id, group.name, group.members[0].id
            )?;
        }
        Command::Group(GroupCommand::List) => {
            for group in tracker.groups()? {
                writeln!(out, "{}\t{}\t{} members", group.id, group.name, group.members.len())?;
            }
        }
        Command::Group(GroupCommand::Delete { group }) => {
            let group = tracker.delete_group(GroupId(group))?;
            writeln!(out, "deleted group {} ({})", group.id, group.name)?;
        }
        Command::Member(MemberCommand::Add { group, name, email }) => {
            let member = tracker.add_member(GroupId(group), &name, &email)?;
            writeln!(out, "added member {} ({})", member.id, member.name)?;
        }
        Command::Member(MemberCommand::Join { group, member }) => {
            let member = tracker.join_group(GroupId(group), MemberId(member))?;
            writeln!(out, "member {} joined group {}", member.id, group)?;
        }
        Command::Member(MemberCommand::Remove { group, member }) => {
            let member = tracker.remove_member(GroupId(group), MemberId(member))?;
            writeln!(out, "removed member {} ({})", member.id, member.name)?;
        }
        Command::Expense {
            amount,
            category,
            description,
        } => {
            let expense = tracker.add_expense(amount, category, &description, None)?;
            writeln!(out, "added expense {}", expense.id)?;
        }
        Command::Split {
            group,
            amount,
            paid_by,
            category,
            description,
            strategy,
            params,
            members,
        } => {
            let params: BTreeMap<MemberId, Decimal> = params.into_iter().collect();
            let request = NewSplitExpense {
                group_id: GroupId(group),
                paid_by: MemberId(paid_by),
                amount,
                category,
                description,
                strategy: SplitStrategy::from_kind(strategy, params)?,
                members: (!members.is_empty())
                    .then(|| members.into_iter().map(MemberId).collect()),
                tags: Vec::new(),
            };
            let expense = tracker.add_split_expense(request)?;
            writeln!(
                out,
                "added split expense {} across {} members",
                expense.id,
                expense.split_details.len()
            )?;
        }
        Command::Balances { group } => {
            let groups = tracker.groups()?;
            let mut wtr = Writer::from_writer(out);
            for entry in tracker.balances(scope(group))? {
                wtr.serialize(BalanceRow {
                    member: entry.member_id,
                    name: member_name(&groups, entry.member_id),
                    balance: round_currency(entry.balance),
                })?;
            }
            wtr.flush()?;
        }
        Command::Settle { group } => {
            let groups = tracker.groups()?;
            let mut wtr = Writer::from_writer(out);
            for transfer in tracker.settle_up(scope(group))? {
                wtr.serialize(TransferRow {
                    from: transfer.from,
                    from_name: member_name(&groups, transfer.from),
                    to: transfer.to,
                    to_name: member_name(&groups, transfer.to),
                    amount: round_currency(transfer.amount),
                })?;
            }
            wtr.flush()?;
        }
        Command::SettleRecord {
            from,
            to,
            amount,
            group,
        } => {
            let transfer = Transfer::new(MemberId(from), MemberId(to), amount);
            let expenses = match group {
                Some(group) => vec![tracker.record_settlement(GroupId(group), transfer)?],
                None => tracker.record_settlement_across(transfer)?,
            };
            for expense in expenses {
                writeln!(out, "recorded settlement {}", expense.id)?;
            }
        }
        Command::Report {
            from,
            to,
            category,
            group,
            search,
            ascending,
            csv,
        } => {
            let filter = ExpenseFilter {
                from,
                to,
                categories: category,
                groups: group.into_iter().map(GroupId).collect(),
                search,
                order: if ascending {
                    SortOrder::Ascending
                } else {
                    SortOrder::Descending
                },
            };
            let expenses = filter.apply(&tracker.expenses()?);
            if csv {
                write_expenses_csv(&expenses, out)?;
            } else {
                write_summary(&Summary::build(&expenses, today), &mut out)?;
            }
        }
    }

    Ok(())
}

fn write_summary<W: Write>(summary: &Summary, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "expenses: {}", summary.count)?;
    writeln!(out, "total: {}", round_currency(summary.total))?;
    writeln!(out, "today: {}", round_currency(summary.today))?;
    for (category, amount) in &summary.by_category {
        writeln!(out, "  {category}: {}", round_currency(*amount))?;
    }
    for (day, amount) in &summary.last_week {
        writeln!(out, "  {day}: {}", round_currency(*amount))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use split_ledger_rs::MemoryStore;

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn exec(tracker: &Tracker<MemoryStore>, argv: &[&str]) -> Result<String, CliError> {
        let args = Args::try_parse_from(std::iter::once("split-ledger").chain(argv.iter().copied()))
            .unwrap();
        let mut output = Vec::new();
        run(tracker, args.command, today(), &mut output)?;
        Ok(String::from_utf8(output).unwrap())
    }

    fn seeded() -> Tracker<MemoryStore> {
        let tracker = Tracker::new(MemoryStore::new());
        exec(&tracker, &["group", "create", "Flat", "--creator", "Asha", "--email", "a@x.io"]).unwrap();
        exec(&tracker, &["member", "add", "1", "Ben", "b@x.io"]).unwrap();
        exec(&tracker, &["member", "add", "1", "Chen", "c@x.io"]).unwrap();
        tracker
    }

    #[test]
    fn parse_param_accepts_member_value() {
        assert_eq!(parse_param("2=1.5"), Ok((MemberId(2), dec!(1.5))));
        assert_eq!(parse_param(" 3 = 40 "), Ok((MemberId(3), dec!(40))));
        assert!(parse_param("2").is_err());
        assert!(parse_param("x=1").is_err());
        assert!(parse_param("2=abc").is_err());
    }

    #[test]
    fn equal_split_then_settle() {
        let tracker = seeded();
        exec(&tracker, &["split", "1", "90", "--paid-by", "1", "--category", "dinner"]).unwrap();

        let plan = exec(&tracker, &["settle", "--group", "1"]).unwrap();
        assert_eq!(
            plan,
            "from,from_name,to,to_name,amount\n\
             2,Ben,1,Asha,30.00\n\
             3,Chen,1,Asha,30.00\n"
        );
    }

    #[test]
    fn shares_split_with_params() {
        let tracker = seeded();
        exec(
            &tracker,
            &[
                "split", "1", "120", "--paid-by", "2", "--strategy", "shares", "--param", "1=2",
                "--param", "2=1", "--param", "3=1",
            ],
        )
        .unwrap();

        let balances = exec(&tracker, &["balances", "--group", "1"]).unwrap();
        assert_eq!(
            balances,
            "member,name,balance\n\
             1,Asha,-60.00\n\
             2,Ben,90.00\n\
             3,Chen,-30.00\n"
        );
    }

    #[test]
    fn mismatched_percentages_are_rejected() {
        let tracker = seeded();
        let result = exec(
            &tracker,
            &[
                "split", "1", "100", "--paid-by", "1", "--strategy", "percentage", "--member", "1",
                "--member", "2", "--param", "1=50", "--param", "2=40",
            ],
        );
        assert!(matches!(
            result,
            Err(CliError::Ledger(LedgerError::ReconciliationMismatch { .. }))
        ));
        assert!(tracker.expenses().unwrap().is_empty());
    }

    #[test]
    fn settle_record_clears_plan() {
        let tracker = seeded();
        exec(&tracker, &["split", "1", "60", "--paid-by", "1", "--member", "1", "--member", "2"]).unwrap();
        exec(&tracker, &["settle-record", "2", "1", "30", "--group", "1"]).unwrap();

        let plan = exec(&tracker, &["settle"]).unwrap();
        assert_eq!(plan, "");
    }

    #[test]
    fn settle_plan_across_groups_can_be_recorded() {
        let tracker = seeded();
        exec(&tracker, &["group", "create", "Club", "--creator", "Dev", "--email", "d@x.io"]).unwrap();
        exec(&tracker, &["member", "join", "2", "2"]).unwrap();
        exec(&tracker, &["split", "1", "40", "--paid-by", "1", "--member", "1", "--member", "2"]).unwrap();
        exec(&tracker, &["split", "2", "60", "--paid-by", "2"]).unwrap();

        let plan = exec(&tracker, &["settle"]).unwrap();
        assert_eq!(
            plan,
            "from,from_name,to,to_name,amount\n\
             4,Dev,1,Asha,20.00\n\
             4,Dev,2,Ben,10.00\n"
        );

        let recorded = exec(&tracker, &["settle-record", "4", "1", "20"]).unwrap();
        assert_eq!(recorded.lines().count(), 2);
        exec(&tracker, &["settle-record", "4", "2", "10"]).unwrap();
        assert_eq!(exec(&tracker, &["settle"]).unwrap(), "");
    }

    #[test]
    fn group_delete_requires_settled_members() {
        let tracker = seeded();
        exec(&tracker, &["split", "1", "30", "--paid-by", "1"]).unwrap();
        let result = exec(&tracker, &["group", "delete", "1"]);
        assert!(matches!(
            result,
            Err(CliError::Ledger(LedgerError::UnsettledBalance(_)))
        ));

        exec(&tracker, &["settle-record", "2", "1", "10"]).unwrap();
        exec(&tracker, &["settle-record", "3", "1", "10"]).unwrap();
        let output = exec(&tracker, &["group", "delete", "1"]).unwrap();
        assert_eq!(output, "deleted group 1 (Flat)\n");
        assert!(exec(&tracker, &["group", "list"]).unwrap().is_empty());
    }

    #[test]
    fn report_csv_lists_expenses() {
        let tracker = seeded();
        exec(&tracker, &["expense", "12.5", "--category", "lunch", "--description", "noodles"]).unwrap();

        let csv = exec(&tracker, &["report", "--csv"]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("id,date,category,amount,description,group"));
        assert_eq!(
            lines.next(),
            Some(format!("1,{},lunch,12.50,noodles,", today()).as_str())
        );
    }

    #[test]
    fn report_summary_totals() {
        let tracker = seeded();
        exec(&tracker, &["expense", "10", "--category", "snacks"]).unwrap();
        exec(&tracker, &["expense", "5.25", "--category", "snacks"]).unwrap();

        let summary = exec(&tracker, &["report"]).unwrap();
        assert!(summary.contains("expenses: 2\n"));
        assert!(summary.contains("total: 15.25\n"));
        assert!(summary.contains("  snacks: 15.25\n"));
    }
}
