use std::path::{Path, PathBuf};
use std::str::FromStr;

use snafu::{ensure, OptionExt};
use tracing::warn;

use crate::error::{self, Error};
use crate::store::TileTables;
use crate::util::Result;

/// Optional prefix that marks a target as a tile store
pub const SCHEME_PREFIX: &str = "RASTERLITE:";

/// Where a create-copy run writes to: `[RASTERLITE:]STORE_PATH[,table=NAME]*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpecifier {
    pub store_path: PathBuf,
    pub table: Option<String>,
}

impl TargetSpecifier {
    /// Picks the table prefix for the target.
    /// Without an explicit `table=` option the prefix is the store's file stem, which is only allowed for a new store.
    pub fn resolve_tables(&self, store_exists: bool) -> Result<TileTables> {
        if let Some(table) = &self.table {
            return Ok(TileTables::new(table.clone()));
        }

        ensure!(
            !store_exists,
            error::AmbiguousTargetTable {
                store_path: self.store_path.clone()
            }
        );

        let prefix = self
            .store_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .context(error::EmptyTarget)?;

        Ok(TileTables::new(prefix))
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }
}

impl FromStr for TargetSpecifier {
    type Err = Error;

    fn from_str(target: &str) -> Result<Self, Self::Err> {
        let target = strip_scheme_prefix(target);

        let mut tokens = target.split(',').filter(|token| !token.is_empty());

        let store_path = tokens.next().context(error::EmptyTarget)?;

        let mut table = None;
        for token in tokens {
            match token.get(..6) {
                Some(key) if key.eq_ignore_ascii_case("table=") => {
                    let name = &token[6..];
                    table = (!name.is_empty()).then(|| name.to_string());
                }
                _ => warn!("Invalid option : {token}"),
            }
        }

        Ok(Self {
            store_path: PathBuf::from(store_path),
            table,
        })
    }
}

fn strip_scheme_prefix(target: &str) -> &str {
    match target.get(..SCHEME_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(SCHEME_PREFIX) => {
            &target[SCHEME_PREFIX.len()..]
        }
        _ => target,
    }
}
