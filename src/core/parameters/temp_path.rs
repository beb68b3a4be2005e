//! Temporary working directory for downloaded and generated artifacts.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::context::Context;
use crate::core::pipeline::{Abort, Parameter};
use crate::utils::io;

pub const ALIAS: &str = "temp";

const CACHE_KEY: &str = "temp_path";

/// The prepared working directory. Valid only after [`TempPath::check`] has
/// succeeded in this pipeline instance.
pub fn project_path(context: &Context) -> PathBuf {
    context.load::<PathBuf>(CACHE_KEY).clone()
}

fn prepare_system_path(context: &mut Context) -> bool {
    let project_name = std::env::current_dir()
        .ok()
        .and_then(|dir| {
            dir.parent()
                .and_then(|parent| parent.file_name())
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "root".to_string());
    let path = std::env::temp_dir().join("DSL-Platform").join(project_name);

    let prepared = if path.exists() {
        io::clear_directory(&path)
    } else {
        fs::create_dir_all(&path).map_err(Into::into)
    };
    match prepared {
        Ok(()) => {
            context.cache(CACHE_KEY, path);
            true
        }
        Err(err) => {
            context.error(format!(
                "Error preparing system temporary path in {}: {err}",
                path.display()
            ));
            false
        }
    }
}

fn prepare_custom_path(context: &mut Context, path: &Path) -> bool {
    match io::clear_directory(path) {
        Ok(()) => {
            context.cache(CACHE_KEY, path.to_path_buf());
            true
        }
        Err(err) => {
            context.error(format!("Error preparing custom temporary path: {err}"));
            false
        }
    }
}

pub struct TempPath;

impl Parameter for TempPath {
    fn alias(&self) -> &'static str {
        ALIAS
    }

    fn usage(&self) -> Option<&'static str> {
        Some("path")
    }

    fn short_description(&self) -> &'static str {
        "Use custom temporary path instead of system default"
    }

    fn detailed_description(&self) -> &'static str {
        "Files downloaded from the compiler service and generated migration scripts \
are staged in the temporary path.\n\
When unspecified, a DSL-Platform folder in the system temporary path is used."
    }

    /// Prepares the working directory eagerly, even when the parameter is not
    /// selected — later steps rely on the cached path. Clearing a non-empty
    /// user-supplied directory is gated behind an interactive confirmation.
    fn check(&self, context: &mut Context) -> bool {
        if context.contains(ALIAS) {
            let value = context.get(ALIAS).map(str::to_owned);
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                let path = Path::new(&value);
                if !path.exists() {
                    context.error(format!(
                        "Temporary path provided ({value}), but it does not exist. \
Create it or use the system path."
                    ));
                    return false;
                }
                if !path.is_dir() {
                    context.error(format!(
                        "Temporary path provided, but it is not a directory: {value}"
                    ));
                    return false;
                }
                let has_entries = fs::read_dir(path)
                    .map(|mut entries| entries.next().is_some())
                    .unwrap_or(false);
                if has_entries {
                    context.error("Temporary path contains files.");
                    if !context.can_interact() {
                        context.error("Please manage the path you have assigned as temporary.");
                        return false;
                    }
                    let delete = context.ask("Delete files in temporary path? (y/N):");
                    return match delete.as_deref() {
                        Some(answer) if answer.eq_ignore_ascii_case("y") => {
                            prepare_custom_path(context, path)
                        }
                        _ => false,
                    };
                }
                context.cache(CACHE_KEY, path.to_path_buf());
                return true;
            }
        }
        prepare_system_path(context)
    }

    fn run(&self, _context: &mut Context) -> Result<(), Abort> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn non_empty_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("leftover.sql"), "select 1;").unwrap();
        dir
    }

    fn context_with_temp(dir: &tempfile::TempDir) -> Context {
        let mut context = Context::new(false, false);
        context.put(ALIAS, Some(dir.path().to_string_lossy().into_owned()));
        context
    }

    #[test]
    fn empty_custom_path_is_cached_directly() {
        let dir = tempfile::tempdir().unwrap();
        let mut context = context_with_temp(&dir);

        assert!(TempPath.check(&mut context));
        assert_eq!(project_path(&context), dir.path());
    }

    #[test]
    fn missing_custom_path_fails_validation() {
        let mut context = Context::new(false, false);
        context.put(ALIAS, Some("/no/such/temp/dir".to_string()));

        assert!(!TempPath.check(&mut context));
        assert!(!context.errors().is_empty());
    }

    #[test]
    fn non_empty_path_without_interaction_deletes_nothing() {
        let dir = non_empty_dir();
        let mut context = context_with_temp(&dir);

        assert!(!TempPath.check(&mut context));
        assert!(dir.path().join("leftover.sql").exists());
    }

    #[test]
    fn confirmed_deletion_clears_path_and_passes() {
        let dir = non_empty_dir();
        let mut context = context_with_temp(&dir);
        context.enqueue_answer("y");

        assert!(TempPath.check(&mut context));
        assert!(!dir.path().join("leftover.sql").exists());
        assert_eq!(project_path(&context), dir.path());
    }

    #[test]
    fn declined_deletion_leaves_contents_untouched() {
        let dir = non_empty_dir();
        let mut context = context_with_temp(&dir);
        context.enqueue_answer("n");

        assert!(!TempPath.check(&mut context));
        assert!(dir.path().join("leftover.sql").exists());
    }
}
