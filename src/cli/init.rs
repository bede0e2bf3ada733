//! taskflow init command implementation
//!
//! Writes a default `.taskflow.toml` so the settings can be edited.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{Config, CONFIG_FILE_NAME};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};

#[derive(Serialize)]
struct InitReport {
    config: PathBuf,
    created: bool,
}

/// Create the config file at `explicit`, or in `cwd` when absent.
/// An existing file is left untouched.
pub fn run(
    explicit: Option<&Path>,
    store_dir: Option<PathBuf>,
    cwd: &Path,
    output: OutputOptions,
) -> Result<()> {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cwd.join(CONFIG_FILE_NAME));
    let created = ensure_config(&path, store_dir)?;

    let mut human = HumanOutput::new(if created {
        "taskflow init: created config"
    } else {
        "taskflow init: config already present"
    });
    human.push_summary("config", path.display().to_string());
    if created {
        human.push_next_step("taskflow add \"first task\"");
    }

    emit_success(
        output,
        "init",
        &InitReport {
            config: path,
            created,
        },
        Some(&human),
    )
}

fn ensure_config(path: &Path, store_dir: Option<PathBuf>) -> Result<bool> {
    if path.exists() {
        if !path.is_file() {
            return Err(Error::InvalidArgument(format!(
                "config path exists but is not a file: {}",
                path.display()
            )));
        }
        return Ok(false);
    }

    let mut config = Config::default();
    config.store.dir = store_dir;
    config.save(path)?;
    tracing::info!(path = %path.display(), "wrote default config");
    Ok(true)
}
