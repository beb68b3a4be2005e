use std::io::IsTerminal;

use clap::Parser;

use dslc::core::parameters::{
    self, apply_migration, db_connection, dsl_compiler, dsl_path, migration, parse, temp_path,
};
use dslc::core::{pipeline, remote};
use dslc::Context;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "dslc")]
#[command(version = VERSION)]
#[command(about = "Compile DSL schemas and migrate Postgres databases")]
#[command(arg_required_else_help = true)]
#[command(after_help = parameter_summary())]
#[command(after_long_help = parameter_details())]
struct Cli {
    /// Create a SQL migration from the previous DSL to the current one
    #[arg(long)]
    migration: bool,

    /// Check the current DSL syntax against the compiler service
    #[arg(long)]
    parse: bool,

    /// Apply the generated migration script to the database
    #[arg(long)]
    apply: bool,

    /// Working directory for intermediate files; without a value a managed
    /// system path is used
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = "")]
    temp: Option<String>,

    /// Connection string to the target Postgres database
    #[arg(long, value_name = "CONNECTION_STRING")]
    connection_string: Option<String>,

    /// Path to DSL sources (default: ./dsl)
    #[arg(long, value_name = "PATH")]
    dsl_path: Option<String>,

    /// Directory for the generated SQL migration script
    #[arg(long, value_name = "PATH")]
    sql_path: Option<String>,

    /// Path to a local DSL compiler for offline migration computation
    #[arg(long, value_name = "PATH")]
    compiler: Option<String>,

    /// Compiler version requested when the database carries none
    #[arg(long, value_name = "VERSION")]
    compiler_version: Option<String>,

    /// Base URL of the compiler service
    #[arg(long, value_name = "URL", default_value = remote::DEFAULT_SERVER_URL)]
    server_url: String,

    /// Apply the migration without interactive confirmation
    #[arg(long)]
    force: bool,

    /// Print verbose progress output
    #[arg(long, short)]
    verbose: bool,
}

fn parameter_summary() -> String {
    let mut help = String::from("Pipeline steps (validated together, executed in order):\n");
    for parameter in parameters::PARAMETERS {
        let usage = parameter
            .usage()
            .map(|usage| format!(" <{usage}>"))
            .unwrap_or_default();
        help.push_str(&format!(
            "  {}{usage}\n      {}\n",
            parameter.alias(),
            parameter.short_description()
        ));
    }
    help
}

fn parameter_details() -> String {
    let mut help = String::from("Pipeline steps (validated together, executed in order):\n");
    for parameter in parameters::PARAMETERS {
        help.push_str(&format!(
            "  {}\n      {}\n\n",
            parameter.alias(),
            parameter.detailed_description().replace('\n', "\n      ")
        ));
    }
    help
}

fn expand(path: String) -> String {
    shellexpand::tilde(&path).into_owned()
}

fn populate(cli: Cli, context: &mut Context) {
    if cli.migration {
        context.put(migration::ALIAS, None);
    }
    if cli.parse {
        context.put(parse::ALIAS, None);
    }
    if cli.apply {
        context.put(apply_migration::ALIAS, None);
    }
    if let Some(temp) = cli.temp {
        context.put(temp_path::ALIAS, Some(expand(temp)));
    }
    if let Some(connection_string) = cli.connection_string {
        context.put(db_connection::ALIAS, Some(connection_string));
    }
    if let Some(dsl_path) = cli.dsl_path {
        context.put(dsl_path::ALIAS, Some(expand(dsl_path)));
    }
    if let Some(sql_path) = cli.sql_path {
        context.put(migration::SQL_PATH_OPTION, Some(expand(sql_path)));
    }
    if let Some(compiler) = cli.compiler {
        context.put(dsl_compiler::ALIAS, Some(expand(compiler)));
    }
    if let Some(compiler_version) = cli.compiler_version {
        context.put(db_connection::COMPILER_VERSION_OPTION, Some(compiler_version));
    }
    context.put(remote::SERVER_URL_OPTION, Some(cli.server_url));
    if cli.force {
        context.put(apply_migration::FORCE_OPTION, None);
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let interactive = std::io::stdin().is_terminal() && std::io::stdout().is_terminal();
    let mut context = Context::new(interactive, cli.verbose);
    populate(cli, &mut context);

    let code = pipeline::process(parameters::PARAMETERS, &mut context);
    std::process::ExitCode::from(exit_code_to_u8(code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_populate_context_selections() {
        let cli = Cli::parse_from([
            "dslc",
            "--migration",
            "--apply",
            "--force",
            "--connection-string",
            "postgresql://localhost/db",
            "--dsl-path",
            "./schema",
            "--temp",
        ]);
        let mut context = Context::new(false, false);
        populate(cli, &mut context);

        assert!(context.contains(migration::ALIAS));
        assert!(context.contains(apply_migration::ALIAS));
        assert!(context.contains(apply_migration::FORCE_OPTION));
        assert_eq!(
            context.get(db_connection::ALIAS),
            Some("postgresql://localhost/db")
        );
        assert_eq!(context.get(dsl_path::ALIAS), Some("./schema"));
        // Valueless --temp selects the managed system path.
        assert!(context.contains(temp_path::ALIAS));
        assert_eq!(context.get(temp_path::ALIAS), Some(""));
        assert_eq!(
            context.get(remote::SERVER_URL_OPTION),
            Some(remote::DEFAULT_SERVER_URL)
        );
        assert!(!context.contains(parse::ALIAS));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parameter_help_lists_every_alias() {
        let summary = parameter_summary();
        for parameter in parameters::PARAMETERS {
            assert!(summary.contains(parameter.alias()));
        }
    }
}
