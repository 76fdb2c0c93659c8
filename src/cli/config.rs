use std::fmt;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Subcommand};
use serde_json::Value as JsonValue;
use tokio::fs;
use tracing::info;

use crate::cli::context::CliContext;
use crate::cli::output::OutputFormat;
use crate::config::Config;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Print the configuration file, or the defaults when there is none
    Show,

    /// Change one setting and save the file
    Set {
        /// Dotted key, e.g. fill.profiles.slow.timeout_ms or fill.overrides.IshodV012
        key: ConfigKey,

        /// New value; parsed as JSON when possible, otherwise taken as text
        value: String,
    },

    /// Print one setting
    Get { key: ConfigKey },

    /// Overwrite the file with the defaults
    Reset,

    /// Check profiles, the debugger url and the task list
    Validate,
}

/// Dotted path into the configuration document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigKey(Vec<String>);

impl std::str::FromStr for ConfigKey {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let segments: Vec<String> = raw
            .split('.')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(String::from)
            .collect();
        if segments.is_empty() {
            return Err("configuration key cannot be empty".to_string());
        }
        Ok(Self(segments))
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl ConfigKey {
    fn lookup<'a>(&self, doc: &'a JsonValue) -> Option<&'a JsonValue> {
        self.0
            .iter()
            .try_fold(doc, |node, segment| node.as_object()?.get(segment))
    }

    /// Write `value` at the key. Every section above the leaf must already
    /// exist; the leaf itself may be new (optional settings, map entries).
    fn assign(&self, doc: &mut JsonValue, value: JsonValue) -> Result<()> {
        let Some((leaf, sections)) = self.0.split_last() else {
            bail!("configuration key cannot be empty");
        };
        let mut node = doc;
        for section in sections {
            node = node
                .as_object_mut()
                .and_then(|map| map.get_mut(section))
                .ok_or_else(|| anyhow!("{} has no section '{}'", self, section))?;
        }
        let map = node
            .as_object_mut()
            .ok_or_else(|| anyhow!("{} does not lead into a section", self))?;
        map.insert(leaf.clone(), value);
        Ok(())
    }
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext) -> Result<()> {
    let path = ctx.config_path();
    match args.action {
        ConfigAction::Show => {
            let config = read_file(path).await?;
            match ctx.output().render(&config)? {
                Some(rendered) => println!("{rendered}"),
                None => {
                    println!("# {}", path.display());
                    print!("{}", serde_yaml::to_string(&config)?);
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let config = with_setting(&read_file(path).await?, &key, &value)?;
            write_file(path, &config).await?;
            info!(%key, path = %path.display(), "configuration updated");
            println!("Saved {} to {}", key, path.display());
        }
        ConfigAction::Get { key } => {
            let doc = serde_json::to_value(read_file(path).await?)?;
            let value = key
                .lookup(&doc)
                .ok_or_else(|| anyhow!("{} is not set", key))?;
            match ctx.output() {
                OutputFormat::Human => println!("{}", serde_yaml::to_string(value)?.trim_end()),
                format => println!("{}", format.render(value)?.unwrap_or_default()),
            }
        }
        ConfigAction::Reset => {
            write_file(path, &Config::default()).await?;
            println!("Wrote default configuration to {}", path.display());
        }
        ConfigAction::Validate => {
            let present = fs::try_exists(path).await?;
            read_file(path)
                .await?
                .validate()
                .with_context(|| format!("validating {}", path.display()))?;
            if present {
                println!("{} is valid", path.display());
            } else {
                println!("No file at {}; defaults are valid", path.display());
            }
        }
    }
    Ok(())
}

/// Copy of `config` with one setting changed, validated.
fn with_setting(config: &Config, key: &ConfigKey, raw: &str) -> Result<Config> {
    let value = serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.to_string()));
    let before = serde_json::to_value(config)?;
    let mut doc = before.clone();
    key.assign(&mut doc, value.clone())?;

    let updated: Config =
        serde_json::from_value(doc).with_context(|| format!("invalid value for {}", key))?;
    updated.validate()?;

    // Unknown leaves are dropped on deserialization and leave the document as it was.
    let after = serde_json::to_value(&updated)?;
    if after == before && key.lookup(&after) != Some(&value) {
        bail!("{} is not a configuration key", key);
    }
    Ok(updated)
}

async fn read_file(path: &Path) -> Result<Config> {
    if !fs::try_exists(path).await? {
        return Ok(Config::default());
    }
    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

async fn write_file(path: &Path, config: &Config) -> Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
    }
    fs::write(path, serde_yaml::to_string(config)?)
        .await
        .with_context(|| format!("writing {}", path.display()))
}
