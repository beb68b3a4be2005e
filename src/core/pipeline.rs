//! The validate-then-execute pipeline over selected parameters.

use crate::core::context::Context;

/// Terminal failure signal for the execution pass. The triggering cause is
/// recorded through [`Context::error`] before returning this; remaining
/// parameters do not run.
#[derive(Debug, PartialEq, Eq)]
pub struct Abort;

/// A named, independently selectable pipeline operation.
///
/// Parameters are stateless singletons dispatched in declared order; anything
/// they derive flows through the [`Context`] cache. `check` validates
/// preconditions and **may have side effects** — eagerly preparing a working
/// directory, reading and caching source files — so that every discoverable
/// error surfaces before any destructive or networked action. That is a
/// deliberate property of the model, not a leak: by the time `run` starts,
/// each parameter's staging is already in place.
pub trait Parameter: Sync {
    fn alias(&self) -> &'static str;

    fn usage(&self) -> Option<&'static str> {
        None
    }

    fn short_description(&self) -> &'static str;

    fn detailed_description(&self) -> &'static str;

    /// Validate preconditions against already-populated selections and
    /// artifacts cached by parameters ordered earlier. Reports problems via
    /// `context.error` and returns `false`; never aborts on its own.
    fn check(&self, context: &mut Context) -> bool;

    /// Perform the operation's effect. On success, derived artifacts go into
    /// the cache for downstream parameters. On unrecoverable failure the
    /// cause is recorded and `Abort` returned.
    fn run(&self, context: &mut Context) -> Result<(), Abort>;
}

/// Drive the pipeline: check every parameter in declared order, and only if
/// all of them pass, run every parameter in the same order.
///
/// All validation failures are collected so the user sees every problem at
/// once; no `run` is invoked if any `check` failed. The execution pass stops
/// at the first `Abort`. Returns the process exit code.
pub fn process(parameters: &[&dyn Parameter], context: &mut Context) -> i32 {
    let mut valid = true;
    for parameter in parameters {
        if !parameter.check(context) {
            valid = false;
        }
    }
    if !valid {
        context.flush_errors();
        return 1;
    }

    for parameter in parameters {
        if parameter.run(context).is_err() {
            context.flush_errors();
            return 1;
        }
    }

    context.flush_errors();
    0
}
