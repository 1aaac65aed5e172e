//! Database enumeration and per-unit target resolution

use crate::executor::{DocumentExecutor, StoreError};
use crate::migration::TargetDatabases;

/// Cluster-internal databases that are never migrated
pub const SYSTEM_DATABASES: [&str; 3] = ["admin", "config", "local"];

/// Whether `database` is reserved: a system database or the ledger database itself
pub fn is_reserved(database: &str, ledger_db: &str) -> bool {
    database == ledger_db || SYSTEM_DATABASES.contains(&database)
}

/// List every database of the cluster minus the reserved ones
///
/// This is the universe used whenever a unit does not restrict its targets.
/// It is computed once per run, before the first unit.
pub fn list_allowed_databases(
    executor: &dyn DocumentExecutor,
    ledger_db: &str,
) -> Result<Vec<String>, StoreError> {
    let allowed: Vec<String> = executor
        .list_database_names()?
        .into_iter()
        .filter(|name| !is_reserved(name, ledger_db))
        .collect();
    log::debug!("allowed databases: {allowed:?}");
    Ok(allowed)
}

/// Resolve a unit's target set against the allowed universe
///
/// `All` yields the universe unchanged. `Only` keeps the unit's own order,
/// drops duplicates and drops any name outside the universe.
pub fn resolve_targets(allowed: &[String], targets: &TargetDatabases) -> Vec<String> {
    match targets {
        TargetDatabases::All => allowed.to_vec(),
        TargetDatabases::Only(names) => {
            let mut resolved: Vec<String> = Vec::with_capacity(names.len());
            for name in names {
                if !allowed.contains(name) {
                    log::debug!("target database '{name}' is reserved or absent, ignoring");
                    continue;
                }
                if !resolved.contains(name) {
                    resolved.push(name.clone());
                }
            }
            resolved
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryExecutor;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_reserved_databases_excluded() {
        let cluster =
            MemoryExecutor::with_databases(["admin", "config", "local", "_migration", "orgdb", "acme"]);
        let allowed = list_allowed_databases(&cluster, "_migration").unwrap();
        assert_eq!(allowed, names(&["acme", "orgdb"]));
    }

    #[test]
    fn test_custom_ledger_name_is_reserved() {
        let cluster = MemoryExecutor::with_databases(["_ledger", "_migration", "orgdb"]);
        let allowed = list_allowed_databases(&cluster, "_ledger").unwrap();
        assert_eq!(allowed, names(&["_migration", "orgdb"]));
    }

    #[test]
    fn test_resolve_all() {
        let allowed = names(&["acme", "orgdb"]);
        assert_eq!(resolve_targets(&allowed, &TargetDatabases::All), allowed);
    }

    #[test]
    fn test_resolve_only_intersects_and_keeps_order() {
        let allowed = names(&["acme", "orgdb", "zeta"]);
        let targets = TargetDatabases::only(["zeta", "admin", "missing", "orgdb", "zeta"]);
        assert_eq!(resolve_targets(&allowed, &targets), names(&["zeta", "orgdb"]));
    }

    #[test]
    fn test_resolve_only_never_reaches_reserved() {
        let allowed = names(&["orgdb"]);
        let targets = TargetDatabases::only(["admin", "config", "local", "_migration"]);
        assert!(resolve_targets(&allowed, &targets).is_empty());
    }
}
