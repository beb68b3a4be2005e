//! Concrete pipeline parameters.
//!
//! `PARAMETERS` is the declared execution order: every producer of a cached
//! artifact is listed strictly before its consumers. The orchestrator does
//! not infer dependencies — this ordering is the contract.

pub mod apply_migration;
pub mod db_connection;
pub mod dsl_compiler;
pub mod dsl_path;
pub mod migration;
pub mod parse;
pub mod temp_path;

use crate::core::pipeline::Parameter;

pub static PARAMETERS: &[&dyn Parameter] = &[
    &temp_path::TempPath,
    &db_connection::DbConnection,
    &dsl_path::DslPath,
    &dsl_compiler::DslCompiler,
    &parse::Parse,
    &migration::Migration,
    &apply_migration::ApplyMigration,
];
