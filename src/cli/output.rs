use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Render a value for the machine formats; `None` for human output,
    /// which every command formats itself.
    pub fn render<T: Serialize>(self, value: &T) -> Result<Option<String>> {
        let rendered = match self {
            OutputFormat::Human => return Ok(None),
            OutputFormat::Json => serde_json::to_string_pretty(value)?,
            OutputFormat::Yaml => serde_yaml::to_string(value)?,
        };
        Ok(Some(rendered))
    }
}
