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

//! Persistence for groups and expenses.
//!
//! Records are stored as JSON documents under a logical key ([`GROUPS_KEY`],
//! [`EXPENSES_KEY`]) in a [`KeyValueStore`]. Any key-value backend gets the
//! typed [`GroupRepository`] and [`ExpenseRepository`] for free.
//!
//! Backends:
//!
//! - [`MemoryStore`]: process-local, backed by a [`DashMap`].
//! - [`FileStore`]: one `<key>.json` file per key inside a directory.

use crate::error::LedgerError;
use crate::expense::Expense;
use crate::group::Group;
use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const GROUPS_KEY: &str = "groups";
pub const EXPENSES_KEY: &str = "expenses";

/// Raw string storage keyed by logical name.
pub trait KeyValueStore {
    /// Returns the stored value, or `None` if the key was never written.
    fn read(&self, key: &str) -> Result<Option<String>, LedgerError>;

    fn write(&self, key: &str, value: String) -> Result<(), LedgerError>;
}

/// Storage of the full group list.
pub trait GroupRepository {
    fn get_groups(&self) -> Result<Vec<Group>, LedgerError>;

    fn set_groups(&self, groups: &[Group]) -> Result<(), LedgerError>;
}

/// Storage of the full expense list.
pub trait ExpenseRepository {
    fn get_expenses(&self) -> Result<Vec<Expense>, LedgerError>;

    fn set_expenses(&self, expenses: &[Expense]) -> Result<(), LedgerError>;
}

impl<S: KeyValueStore + ?Sized> GroupRepository for S {
    fn get_groups(&self) -> Result<Vec<Group>, LedgerError> {
        load(self, GROUPS_KEY)
    }

    fn set_groups(&self, groups: &[Group]) -> Result<(), LedgerError> {
        save(self, GROUPS_KEY, groups)
    }
}

impl<S: KeyValueStore + ?Sized> ExpenseRepository for S {
    fn get_expenses(&self) -> Result<Vec<Expense>, LedgerError> {
        load(self, EXPENSES_KEY)
    }

    fn set_expenses(&self, expenses: &[Expense]) -> Result<(), LedgerError> {
        save(self, EXPENSES_KEY, expenses)
    }
}

/// A missing key reads as an empty list.
fn load<S, T>(store: &S, key: &str) -> Result<Vec<T>, LedgerError>
where
    S: KeyValueStore + ?Sized,
    T: DeserializeOwned,
{
    match store.read(key)? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(Vec::new()),
    }
}

fn save<S, T>(store: &S, key: &str, values: &[T]) -> Result<(), LedgerError>
where
    S: KeyValueStore + ?Sized,
    T: Serialize,
{
    let raw = serde_json::to_string(values)?;
    store.write(key, raw)
}

/// In-memory store, safe to share between threads.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, LedgerError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn write(&self, key: &str, value: String) -> Result<(), LedgerError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// Directory-backed store writing one pretty-printed JSON file per key.
///
/// The directory is created on first write. Writes go to a temporary file that
/// is then renamed over the target, so a crash never leaves half a document.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, LedgerError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, key: &str, value: String) -> Result<(), LedgerError> {
        fs::create_dir_all(&self.dir)?;
        let target = self.path_for(key);
        let staging = self.dir.join(format!(".{key}.json.tmp"));

        // Re-indent so the files stay readable by hand.
        let pretty = match serde_json::from_str::<serde_json::Value>(&value) {
            Ok(parsed) => serde_json::to_string_pretty(&parsed)?,
            Err(_) => value,
        };
        fs::write(&staging, pretty)?;
        fs::rename(&staging, &target)?;
        tracing::debug!(path = %target.display(), "wrote store file");
        Ok(())
    }
}
