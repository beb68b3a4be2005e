//! Local DSL compiler executable. Its presence switches migration
//! computation from the remote service to an offline process invocation.

use std::path::Path;

use crate::core::context::Context;
use crate::core::either::Either;
use crate::core::parameters::dsl_path;
use crate::core::pipeline::{Abort, Parameter};
use crate::core::shell;
use crate::utils::command;

pub const ALIAS: &str = "compiler";

/// Compute the migration script offline by invoking the local compiler with
/// the target engine version and the current schema files, capturing its
/// stdout as the script.
pub fn migration(context: &Context, postgres_version: &str) -> Either<String> {
    let compiler = match context.get(ALIAS).filter(|value| !value.is_empty()) {
        Some(compiler) => compiler.to_string(),
        None => return Either::fail("Compiler path is not selected"),
    };
    let files = dsl_path::dsl_files(context);

    let mut args = vec![
        "target=postgres".to_string(),
        format!("postgres={postgres_version}"),
    ];
    args.extend(files.iter().map(|file| file.to_string_lossy().into_owned()));
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

    match command::run(&compiler, &arg_refs, "DSL compiler") {
        Ok(script) => Either::success(script),
        Err(err) => Either::fail(err.to_string()),
    }
}

pub struct DslCompiler;

impl Parameter for DslCompiler {
    fn alias(&self) -> &'static str {
        ALIAS
    }

    fn usage(&self) -> Option<&'static str> {
        Some("path")
    }

    fn short_description(&self) -> &'static str {
        "Path to a local DSL compiler for offline migration computation"
    }

    fn detailed_description(&self) -> &'static str {
        "When a local compiler is available, migration scripts are computed \
without contacting the compiler service. The executable bit is set on a \
best-effort basis; a failure there only degrades, it never stops the run."
    }

    fn check(&self, context: &mut Context) -> bool {
        if !context.contains(ALIAS) {
            return true;
        }
        let value = context.get(ALIAS).map(str::to_owned);
        let compiler = match value.filter(|v| !v.is_empty()) {
            Some(value) => value,
            None => {
                context.error("Compiler parameter is present but no path was given");
                return false;
            }
        };
        let path = Path::new(&compiler);
        if !path.is_file() {
            context.error(format!("Compiler not found at {compiler}"));
            return false;
        }
        if !shell::make_executable(path, context.sink()) {
            context.log("Continuing without the executable bit on the compiler.");
        }
        true
    }

    fn run(&self, _context: &mut Context) -> Result<(), Abort> {
        Ok(())
    }
}
