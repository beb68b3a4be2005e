//! Location of the current DSL sources.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::context::Context;
use crate::core::parameters::{migration, parse};
use crate::core::pipeline::{Abort, Parameter};
use crate::utils::io;

pub const ALIAS: &str = "dsl";

const DEFAULT_PATH: &str = "./dsl";
const CACHE_KEY: &str = "current_dsl";
const FILES_CACHE_KEY: &str = "dsl_files";

/// Current DSL sources keyed by path relative to the DSL root. Valid only
/// after [`DslPath::check`] has succeeded in this pipeline instance.
pub fn current_dsl(context: &Context) -> BTreeMap<String, String> {
    context.load::<BTreeMap<String, String>>(CACHE_KEY).clone()
}

/// File paths of the current DSL sources, for tools that take files rather
/// than content.
pub fn dsl_files(context: &Context) -> Vec<PathBuf> {
    context.load::<Vec<PathBuf>>(FILES_CACHE_KEY).clone()
}

pub struct DslPath;

impl Parameter for DslPath {
    fn alias(&self) -> &'static str {
        ALIAS
    }

    fn usage(&self) -> Option<&'static str> {
        Some("path")
    }

    fn short_description(&self) -> &'static str {
        "Path to DSL sources (default: ./dsl)"
    }

    fn detailed_description(&self) -> &'static str {
        "All *.dsl files under the path, recursively, form the current schema \
definition. Operations that compare or compile the schema read them from here."
    }

    /// Reads and caches the DSL sources as part of validation, so every
    /// missing or unreadable file is reported before anything executes.
    fn check(&self, context: &mut Context) -> bool {
        let needed = context.contains(ALIAS)
            || context.contains(parse::ALIAS)
            || context.contains(migration::ALIAS);
        if !needed {
            return true;
        }

        let root = context
            .get(ALIAS)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_PATH)
            .to_string();
        let path = Path::new(&root);
        if !path.is_dir() {
            context.error(format!("DSL path ({root}) is not an existing directory"));
            return false;
        }

        let files = match io::collect_files(path, "dsl") {
            Ok(files) => files,
            Err(err) => {
                context.error(format!("Error reading DSL path ({root}): {err}"));
                return false;
            }
        };
        if files.is_empty() {
            context.error(format!("No DSL files found in {root}"));
            return false;
        }

        let mut sources = BTreeMap::new();
        for file in &files {
            match io::read_file(file) {
                Ok(content) => {
                    let key = file
                        .strip_prefix(path)
                        .unwrap_or(file.as_path())
                        .to_string_lossy()
                        .replace('\\', "/");
                    sources.insert(key, content);
                }
                Err(err) => {
                    context.error(format!("Error reading {}: {err}", file.display()));
                    return false;
                }
            }
        }

        context.cache(FILES_CACHE_KEY, files);
        context.cache(CACHE_KEY, sources);
        true
    }

    fn run(&self, _context: &mut Context) -> Result<(), Abort> {
        Ok(())
    }
}
