//! Load `.filesig.toml` (CLI only). Lib callers pass [`SignOpts`](crate::SignOpts) directly.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::utils::config::PackagePaths;
use crate::{Algorithm, Opts, OutputFormat};

#[derive(Debug, Default, Deserialize)]
pub struct FilesigToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsSection {
    algorithm: Option<String>,
    jobs: Option<usize>,
    follow_links: Option<bool>,
    include_special: Option<bool>,
    exclude: Option<Vec<String>>,
    timeout_secs: Option<u64>,
    deadline_secs: Option<u64>,
    sorted: Option<bool>,
    format: Option<String>,
    fail_on_error: Option<bool>,
    parallel_walk: Option<bool>,
    verbose: Option<bool>,
    progress: Option<bool>,
}

/// Default config path: `.filesig.toml` in the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from(PackagePaths::get().config_filename())
}

/// Parse config text.
pub fn parse_filesig_toml(s: &str) -> Result<FilesigToml> {
    toml::from_str(s).context("parse filesig config")
}

/// Load config from `path`. A missing file is `None` unless `required` (explicit `--config`).
pub fn load_filesig_toml(path: &Path, required: bool) -> Result<Option<FilesigToml>> {
    match std::fs::read_to_string(path) {
        Ok(s) => parse_filesig_toml(&s)
            .with_context(|| format!("load {}", path.display()))
            .map(Some),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => Ok(None),
        Err(e) => Err(e).with_context(|| format!("read {}", path.display())),
    }
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($idx:expr, $opts:expr, $idx_field:ident => $opts_field:ident) => {
        if let Some(v) = $idx.$idx_field {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file config to opts (only set fields present in the file). Call before applying CLI.
/// An unknown algorithm here is a configuration error, same as on the command line.
pub fn apply_file_to_opts(file: &FilesigToml, opts: &mut Opts) -> Result<()> {
    let s = &file.settings;
    if let Some(ref id) = s.algorithm {
        opts.algorithm = id.parse::<Algorithm>()?;
    }
    if let Some(jobs) = s.jobs {
        opts.jobs = Some(jobs);
    }
    apply_file_opt!(s, opts, follow_links => follow_links);
    apply_file_opt!(s, opts, include_special => include_special);
    if let Some(ref v) = s.exclude {
        opts.exclude = v.clone();
    }
    if let Some(secs) = s.timeout_secs {
        opts.timeout_secs = Some(secs);
    }
    if let Some(secs) = s.deadline_secs {
        opts.deadline_secs = Some(secs);
    }
    apply_file_opt!(s, opts, sorted => sorted);
    if let Some(ref f) = s.format {
        opts.format = f.parse::<OutputFormat>().map_err(anyhow::Error::msg)?;
    }
    apply_file_opt!(s, opts, fail_on_error => fail_on_error);
    apply_file_opt!(s, opts, parallel_walk => parallel_walk);
    apply_file_opt!(s, opts, verbose => verbose);
    apply_file_opt!(s, opts, progress => progress);
    Ok(())
}
