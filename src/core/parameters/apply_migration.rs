//! Apply the generated migration script to the target database.

use crate::core::context::Context;
use crate::core::parameters::{db_connection, migration};
use crate::core::pipeline::{Abort, Parameter};
use crate::core::shell;
use crate::utils::io;

pub const ALIAS: &str = "apply";
pub const FORCE_OPTION: &str = "force";

/// Destructive step, so it never runs implicitly: the user either confirms
/// interactively or passes the force flag.
fn confirmed(context: &mut Context) -> bool {
    if context.contains(FORCE_OPTION) {
        return true;
    }
    if !context.can_interact() {
        context.error("Use --force to apply the migration without confirmation.");
        return false;
    }
    match context.ask("Apply migration to the database? (y/N):") {
        Some(answer) if answer.eq_ignore_ascii_case("y") => true,
        _ => {
            context.show("Migration canceled.");
            false
        }
    }
}

pub struct ApplyMigration;

impl Parameter for ApplyMigration {
    fn alias(&self) -> &'static str {
        ALIAS
    }

    fn short_description(&self) -> &'static str {
        "Apply the generated migration script to the database"
    }

    fn detailed_description(&self) -> &'static str {
        "Runs the script produced by the migration step through psql against \
the selected database. The script runs in a transaction, so a failed \
migration leaves the database untouched."
    }

    fn check(&self, context: &mut Context) -> bool {
        if !context.contains(ALIAS) {
            return true;
        }
        if !context.contains(migration::ALIAS) {
            context.error("Migration must be selected to apply it to the database");
            return false;
        }
        if !context.contains(db_connection::ALIAS) {
            context.error("Connection string is required to apply the migration");
            return false;
        }
        true
    }

    fn run(&self, context: &mut Context) -> Result<(), Abort> {
        if !context.contains(ALIAS) {
            return Ok(());
        }
        let file = migration::migration_file(context);
        let script = match io::read_file(&file) {
            Ok(script) => script,
            Err(err) => {
                context.error(format!(
                    "Error reading migration script {}: {err}",
                    file.display()
                ));
                return Err(Abort);
            }
        };
        if script.is_empty() {
            context.show("Nothing to apply.");
            return Ok(());
        }

        if !confirmed(context) {
            return Err(Abort);
        }

        let connection_string = match context.get(db_connection::ALIAS).map(str::to_owned) {
            Some(value) if !value.is_empty() => value,
            _ => {
                context.error("Connection string is required to apply the migration");
                return Err(Abort);
            }
        };

        context.show("Applying migration...");
        let args = vec![
            connection_string,
            "-f".to_string(),
            file.to_string_lossy().into_owned(),
        ];
        match shell::execute("psql", &args, context.sink()) {
            Ok(true) => {
                context.show("Database migrated.");
                Ok(())
            }
            Ok(false) => {
                context.error("Error applying migration script.");
                Err(Abort)
            }
            Err(err) => {
                context.error(format!("Error running psql: {err}"));
                Err(Abort)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn context_with_script(dir: &tempfile::TempDir, script: &str) -> Context {
        let file = dir.path().join("sql-migration-1.sql");
        fs::write(&file, script).unwrap();
        let mut context = Context::new(false, false);
        context.put(ALIAS, None);
        context.put(migration::ALIAS, None);
        context.put(
            db_connection::ALIAS,
            Some("postgresql://localhost/db".to_string()),
        );
        context.cache(migration::CACHE_KEY, file);
        context
    }

    #[test]
    fn check_requires_migration_selection() {
        let mut context = Context::new(false, false);
        context.put(ALIAS, None);

        assert!(!ApplyMigration.check(&mut context));
        assert!(!context.errors().is_empty());
    }

    #[test]
    fn check_requires_connection_string() {
        let mut context = Context::new(false, false);
        context.put(ALIAS, None);
        context.put(migration::ALIAS, None);

        assert!(!ApplyMigration.check(&mut context));
        assert_eq!(
            context.errors(),
            &["Connection string is required to apply the migration".to_string()]
        );
    }

    #[test]
    fn check_passes_with_migration_and_connection() {
        let mut context = Context::new(false, false);
        context.put(ALIAS, None);
        context.put(migration::ALIAS, None);
        context.put(
            db_connection::ALIAS,
            Some("postgresql://localhost/db".to_string()),
        );

        assert!(ApplyMigration.check(&mut context));
    }

    #[test]
    fn empty_script_applies_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut context = context_with_script(&dir, "");

        assert!(ApplyMigration.run(&mut context).is_ok());
        assert!(context.errors().is_empty());
    }

    #[test]
    fn declined_confirmation_stops_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut context = context_with_script(&dir, "ALTER TABLE t ADD COLUMN c int;");
        context.enqueue_answer("n");

        assert!(ApplyMigration.run(&mut context).is_err());
    }

    #[test]
    fn non_interactive_run_requires_force() {
        let dir = tempfile::tempdir().unwrap();
        let mut context = context_with_script(&dir, "ALTER TABLE t ADD COLUMN c int;");

        assert!(ApplyMigration.run(&mut context).is_err());
        assert_eq!(
            context.errors(),
            &["Use --force to apply the migration without confirmation.".to_string()]
        );
    }

    #[test]
    fn unselected_apply_is_a_no_op() {
        let mut context = Context::new(false, false);
        assert!(ApplyMigration.check(&mut context));
        assert!(ApplyMigration.run(&mut context).is_ok());
    }
}
