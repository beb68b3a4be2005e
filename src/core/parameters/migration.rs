//! SQL migration generation from the previously applied DSL to the current
//! one, either through the compiler service or a local compiler.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::context::Context;
use crate::core::parameters::db_connection::{self, DatabaseInfo};
use crate::core::parameters::{dsl_compiler, dsl_path, temp_path};
use crate::core::pipeline::{Abort, Parameter};
use crate::core::remote;
use crate::utils::io;

pub const ALIAS: &str = "migration";
pub const SQL_PATH_OPTION: &str = "sql";

const DESCRIPTION_START: &str = "/*MIGRATION_DESCRIPTION";
const DESCRIPTION_END: &str = "MIGRATION_DESCRIPTION*/";
pub(crate) const CACHE_KEY: &str = "migration_file";

/// Path of the generated migration script. Valid only after
/// [`Migration::run`] has executed in this pipeline instance.
pub fn migration_file(context: &Context) -> PathBuf {
    context.load::<PathBuf>(CACHE_KEY).clone()
}

/// Extract the user-facing change summaries embedded in a migration script.
///
/// The script may carry one comment block delimited by
/// `/*MIGRATION_DESCRIPTION` and `MIGRATION_DESCRIPTION*/` holding
/// newline-separated entries. The first entry is a header and is not part of
/// the result.
pub fn extract_descriptions(sql: &str) -> Vec<String> {
    let Some(start) = sql.find(DESCRIPTION_START) else {
        return Vec::new();
    };
    let body_start = start + DESCRIPTION_START.len();
    let Some(end) = sql[body_start..].find(DESCRIPTION_END).map(|i| i + body_start) else {
        return Vec::new();
    };
    sql[body_start..end]
        .split('\n')
        .filter(|entry| !entry.is_empty())
        .skip(1)
        .map(str::to_string)
        .collect()
}

/// The service answers with either a JSON-quoted string or raw SQL text;
/// quoted responses are unquoted before anything downstream sees them.
pub(crate) fn unquote(raw: &str) -> String {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        serde_json::from_str::<String>(raw).unwrap_or_else(|_| raw.to_string())
    } else {
        raw.to_string()
    }
}

#[derive(Serialize)]
struct MigrationRequest<'a> {
    #[serde(rename = "Old")]
    old: &'a BTreeMap<String, String>,
    #[serde(rename = "New")]
    new: &'a BTreeMap<String, String>,
}

fn online_migration(
    context: &mut Context,
    db_info: &DatabaseInfo,
) -> Result<String, Abort> {
    let current = dsl_path::current_dsl(context);
    let url = format!(
        "unmanaged/postgres-migration?version={}&postgres={}",
        db_info.compiler_version, db_info.postgres_version
    );
    let body = match serde_json::to_value(MigrationRequest {
        old: &db_info.previous_dsl,
        new: &current,
    }) {
        Ok(body) => body,
        Err(err) => {
            context.error(format!("Error encoding DSL sources: {err}"));
            return Err(Abort);
        }
    };

    context.show("Downloading SQL migration...");
    let response = remote::put(context, &url, &body);
    if !response.is_success() {
        let reason = response.why_not().to_string();
        context.error("Error creating online SQL migration:");
        context.error(reason);
        return Err(Abort);
    }
    Ok(unquote(response.get()))
}

fn offline_migration(
    context: &mut Context,
    db_info: &DatabaseInfo,
) -> Result<String, Abort> {
    context.show("Creating SQL migration...");
    let script = dsl_compiler::migration(context, &db_info.postgres_version);
    if !script.is_success() {
        let reason = script.why_not().to_string();
        context.error("Error creating local SQL migration:");
        context.error(reason);
        return Err(Abort);
    }
    Ok(script.get().to_string())
}

pub struct Migration;

impl Parameter for Migration {
    fn alias(&self) -> &'static str {
        ALIAS
    }

    fn short_description(&self) -> &'static str {
        "Create SQL migration from the previous DSL to the current one"
    }

    fn detailed_description(&self) -> &'static str {
        "The previously applied DSL is compared with the current one and a \
migration SQL script is produced. The script can be inspected before applying \
(it contains boilerplate due to the Postgres dependency graph); every \
migration embeds a description of the important changes to the database.\n\
\n\
Postgres migrations are transactional thanks to Postgres transactional DDL."
    }

    fn check(&self, context: &mut Context) -> bool {
        if !context.contains(ALIAS) {
            return true;
        }
        if !context.contains(db_connection::ALIAS) {
            context.error("Connection string is required to create a migration script");
            return false;
        }
        if context.contains(SQL_PATH_OPTION) {
            let value = context.get(SQL_PATH_OPTION).map(str::to_owned);
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                if !Path::new(&value).exists() {
                    context.error(format!(
                        "Path for SQL migration script provided ({value}) but not found"
                    ));
                    return false;
                }
            }
        }
        true
    }

    fn run(&self, context: &mut Context) -> Result<(), Abort> {
        if !context.contains(ALIAS) {
            return Ok(());
        }
        let db_info = db_connection::database_info(context)?;

        let sql_value = context.get(SQL_PATH_OPTION).map(str::to_owned);
        let path = match sql_value.filter(|v| !v.is_empty()) {
            Some(value) => PathBuf::from(value),
            None => temp_path::project_path(context),
        };
        if !path.exists() {
            context.error(format!("Error accessing SQL path ({}).", path.display()));
            return Err(Abort);
        }

        let script = if context.contains(dsl_compiler::ALIAS) {
            offline_migration(context, &db_info)?
        } else {
            online_migration(context, &db_info)?
        };

        let file = path.join(format!(
            "sql-migration-{}.sql",
            chrono::Utc::now().timestamp_millis()
        ));
        if let Err(err) = io::write_file(&file, &script) {
            context.error(format!(
                "Error saving migration script to {}",
                file.display()
            ));
            context.error(err.to_string());
            return Err(Abort);
        }

        if script.is_empty() {
            context.show("No database changes detected.");
        } else {
            context.show(&format!("Migration saved to {}", file.display()));
            for description in extract_descriptions(&script) {
                context.show(&description);
            }
        }
        context.cache(CACHE_KEY, file);
        Ok(())
    }
}
