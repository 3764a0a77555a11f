//! Output encoders: JSON, YAML, and flattened `key=value` lines
mod flatten;

pub use flatten::{flat, SEPARATOR};

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::Value;

use crate::error::{Error, Result};

#[derive(clap::ArgEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Flat,
}

impl OutputFormat {
    pub const NAMES: [&'static str; 3] = ["json", "yaml", "flat"];

    /// Encode `data`; scalars print raw regardless of the format
    pub fn render<T: Serialize + ?Sized>(&self, data: &T) -> Result<String> {
        let value = serde_json::to_value(data)?;
        if !(value.is_object() || value.is_array()) {
            return Ok(flatten::scalar_to_string(&value));
        }
        match self {
            OutputFormat::Json => to_json(&value),
            OutputFormat::Yaml => to_yaml(&value),
            OutputFormat::Flat => Ok(flatten::render(&value)),
        }
    }

    /// Render and write `data` followed by a newline, nothing at all when it renders empty
    pub fn write<W: Write, T: Serialize + ?Sized>(&self, out: &mut W, data: &T) -> Result<()> {
        let rendered = self.render(data)?;
        if rendered.is_empty() {
            return Ok(());
        }
        writeln!(out, "{}", rendered).map_err(|err| Error::io("Writing output", err))
    }
}

fn to_json(value: &Value) -> Result<String> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn to_yaml(value: &Value) -> Result<String> {
    let document = serde_yaml::to_string(value)?;
    Ok(format!("---\n{}", document.trim_end()))
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Flat => "flat",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            "flat" => Ok(OutputFormat::Flat),
            _ => Err(format!("Unsupported output format: {}", s)),
        }
    }
}
