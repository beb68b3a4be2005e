//! Process-lifetime shared state for the parameter pipeline.
//!
//! `Context` carries the raw selected-parameter values (populated once at
//! startup), a string-keyed cache of derived artifacts flowing between
//! parameters, the accumulated error sink, two stdout verbosity tiers and
//! the interactive prompt gate.

use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::io::{self, BufRead, Write};

use crate::core::shell::ProcessLog;

/// Append-safe logging sink shared with the process runner's stream readers.
///
/// `show` is the user-facing tier (always printed), `trace` the verbose tier,
/// `error` goes straight to stderr. Holds no mutable state, so it is safe to
/// hand to the reader threads by reference.
pub struct LogSink {
    verbose: bool,
}

impl LogSink {
    pub fn show(&self, message: &str) {
        println!("{message}");
    }

    pub fn trace(&self, message: &str) {
        if self.verbose {
            println!("{message}");
        }
    }

    pub fn error(&self, message: &str) {
        eprintln!("{message}");
    }
}

impl ProcessLog for LogSink {
    fn output_line(&self, line: &str) {
        self.trace(line);
    }

    fn error_line(&self, line: &str) {
        self.error(line);
    }
}

pub struct Context {
    selected: HashMap<String, Option<String>>,
    cache: HashMap<String, Box<dyn Any>>,
    errors: Vec<String>,
    answers: VecDeque<String>,
    interactive: bool,
    log: LogSink,
}

impl Context {
    pub fn new(interactive: bool, verbose: bool) -> Self {
        Context {
            selected: HashMap::new(),
            cache: HashMap::new(),
            errors: Vec::new(),
            answers: VecDeque::new(),
            interactive,
            log: LogSink { verbose },
        }
    }

    /// Record a selected parameter. `None` marks a presence-only flag.
    /// Selections are populated once at startup and read-only afterwards.
    pub fn put(&mut self, alias: &str, value: Option<String>) {
        self.selected.insert(alias.to_string(), value);
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.selected.contains_key(alias)
    }

    pub fn get(&self, alias: &str) -> Option<&str> {
        self.selected.get(alias).and_then(|value| value.as_deref())
    }

    /// Store a derived artifact for downstream parameters. Overwriting is
    /// permitted.
    pub fn cache<T: Any>(&mut self, key: &str, value: T) {
        self.cache.insert(key.to_string(), Box::new(value));
    }

    pub fn cached(&self, key: &str) -> bool {
        self.cache.contains_key(key)
    }

    /// Load a previously cached artifact.
    ///
    /// Panics when the key is absent or holds a different type: the declared
    /// parameter order guarantees producers run before consumers, so a miss
    /// here is a programming error in the pipeline wiring, not a runtime
    /// condition to recover from.
    pub fn load<T: Any>(&self, key: &str) -> &T {
        self.cache
            .get(key)
            .unwrap_or_else(|| panic!("cache entry '{key}' requested before its producer ran"))
            .downcast_ref::<T>()
            .unwrap_or_else(|| panic!("cache entry '{key}' holds an unexpected type"))
    }

    /// Record an error and continue. Accumulated errors are printed together
    /// by the orchestrator; recording never aborts by itself.
    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn flush_errors(&mut self) {
        for error in self.errors.drain(..) {
            eprintln!("{error}");
        }
    }

    pub fn show(&self, message: &str) {
        self.log.show(message);
    }

    pub fn log(&self, message: &str) {
        self.log.trace(message);
    }

    pub fn sink(&self) -> &LogSink {
        &self.log
    }

    pub fn can_interact(&self) -> bool {
        self.interactive || !self.answers.is_empty()
    }

    /// Queue a canned reply consumed by [`ask`](Self::ask) before falling back
    /// to stdin. Test-harness hook; queued answers also open the interactive
    /// gate.
    pub fn enqueue_answer(&mut self, answer: impl Into<String>) {
        self.answers.push_back(answer.into());
    }

    /// Block for one line of interactive input. Returns `None` when the
    /// context cannot interact; the caller decides whether that degrades or
    /// aborts the operation.
    pub fn ask(&mut self, question: &str) -> Option<String> {
        if let Some(answer) = self.answers.pop_front() {
            return Some(answer);
        }
        if !self.interactive {
            return None;
        }
        eprint!("{question} ");
        io::stderr().flush().ok();
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(_) => Some(line.trim().to_string()),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn selections_are_presence_or_value() {
        let mut context = Context::new(false, false);
        context.put("migration", None);
        context.put("dsl", Some("./dsl".to_string()));

        assert!(context.contains("migration"));
        assert_eq!(context.get("migration"), None);
        assert_eq!(context.get("dsl"), Some("./dsl"));
        assert!(!context.contains("apply"));
    }

    #[test]
    fn cache_round_trips_typed_values() {
        let mut context = Context::new(false, false);
        context.cache("temp_path", PathBuf::from("/tmp/project"));

        assert!(context.cached("temp_path"));
        assert_eq!(
            context.load::<PathBuf>("temp_path"),
            &PathBuf::from("/tmp/project")
        );
    }

    #[test]
    #[should_panic(expected = "requested before its producer ran")]
    fn load_before_producer_is_fatal() {
        let context = Context::new(false, false);
        context.load::<PathBuf>("migration_file");
    }

    #[test]
    #[should_panic(expected = "holds an unexpected type")]
    fn load_with_wrong_type_is_fatal() {
        let mut context = Context::new(false, false);
        context.cache("temp_path", "a string".to_string());
        context.load::<PathBuf>("temp_path");
    }

    #[test]
    fn ask_returns_none_when_not_interactive() {
        let mut context = Context::new(false, false);
        assert!(!context.can_interact());
        assert_eq!(context.ask("Continue? (y/N):"), None);
    }

    #[test]
    fn ask_consumes_queued_answers_in_order() {
        let mut context = Context::new(false, false);
        context.enqueue_answer("y");
        context.enqueue_answer("n");

        assert!(context.can_interact());
        assert_eq!(context.ask("First?"), Some("y".to_string()));
        assert_eq!(context.ask("Second?"), Some("n".to_string()));
        assert_eq!(context.ask("Third?"), None);
    }

    #[test]
    fn errors_accumulate_until_flushed() {
        let mut context = Context::new(false, false);
        context.error("first problem");
        context.error("second problem");
        assert_eq!(context.errors().len(), 2);

        context.flush_errors();
        assert!(context.errors().is_empty());
    }
}
