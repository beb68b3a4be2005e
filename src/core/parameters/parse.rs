//! Online syntax check of the current DSL against the compiler service.

use crate::core::context::Context;
use crate::core::parameters::{db_connection, dsl_path};
use crate::core::pipeline::{Abort, Parameter};
use crate::core::remote;

pub const ALIAS: &str = "parse";

pub struct Parse;

impl Parameter for Parse {
    fn alias(&self) -> &'static str {
        ALIAS
    }

    fn short_description(&self) -> &'static str {
        "Check the current DSL syntax against the compiler service"
    }

    fn detailed_description(&self) -> &'static str {
        "Uploads the current DSL sources for a syntax-only check. Useful before \
requesting a migration: a parse failure stops the pipeline before anything \
touches the database."
    }

    fn check(&self, _context: &mut Context) -> bool {
        // DSL presence and readability are validated by the dsl parameter.
        true
    }

    fn run(&self, context: &mut Context) -> Result<(), Abort> {
        if !context.contains(ALIAS) {
            return Ok(());
        }
        let sources = dsl_path::current_dsl(context);
        let version = db_connection::requested_compiler_version(context);

        let body = match serde_json::to_value(&sources) {
            Ok(body) => body,
            Err(err) => {
                context.error(format!("Error encoding DSL sources: {err}"));
                return Err(Abort);
            }
        };
        context.show("Checking DSL syntax...");
        let response = remote::put(context, &format!("unmanaged/parse?version={version}"), &body);
        if !response.is_success() {
            let reason = response.why_not().to_string();
            context.error("Error parsing DSL:");
            context.error(reason);
            return Err(Abort);
        }
        context.show("Parse OK.");
        Ok(())
    }
}
