use anyhow::{Context, Result};
use chrono::Utc;
use std::{fs, path::Path};

use dexcatch_game::CatchConfig;

pub fn artifacts_dir(base: &str, scenario: &str, seed: u64) -> String {
    let ts = Utc::now().format("%Y%m%dT%H%M%S");
    format!("{base}/{scenario}/seed-{seed}/{ts}")
}

/// Dump what is known about a failed live run so it can be replayed offline.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn write_failure_artifacts(
    dir: &Path,
    context: Option<&serde_json::Value>,
    err: &anyhow::Error,
) -> Result<()> {
    fs::create_dir_all(dir).context("creating artifacts dir")?;

    if let Some(context) = context {
        let payload = serde_json::to_vec_pretty(context).unwrap_or_default();
        let _ = fs::write(dir.join("context.json"), payload);
    }

    let _ = fs::write(dir.join("error.txt"), format!("{err:#}"));

    Ok(())
}

/// Load tuning from a JSON file, or the built-in defaults when no path is given.
///
/// # Errors
/// Returns an error if the file cannot be read or fails validation.
pub fn load_config(path: Option<&Path>) -> Result<CatchConfig> {
    let Some(path) = path else {
        return Ok(CatchConfig::default_config());
    };
    let text =
        fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    CatchConfig::from_json(&text).with_context(|| format!("parsing config {}", path.display()))
}

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}
