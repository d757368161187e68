use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Stable element locator.
///
/// Serialized as `name:<value>`, `tag:<value>` or `css:<value>` so it can live in
/// YAML configuration as a plain string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Selector {
    /// Form control by its `name` attribute.
    Name(String),
    /// First element with the given tag.
    Tag(String),
    /// Raw CSS selector.
    Css(String),
}

impl Selector {
    pub fn name(value: impl Into<String>) -> Self {
        Selector::Name(value.into())
    }

    pub fn tag(value: impl Into<String>) -> Self {
        Selector::Tag(value.into())
    }

    /// CSS form understood by the browser.
    pub fn to_css(&self) -> String {
        match self {
            Selector::Name(name) => format!("[name=\"{}\"]", name.replace('"', "\\\"")),
            Selector::Tag(tag) => tag.clone(),
            Selector::Css(css) => css.clone(),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Name(v) => write!(f, "name:{}", v),
            Selector::Tag(v) => write!(f, "tag:{}", v),
            Selector::Css(v) => write!(f, "css:{}", v),
        }
    }
}

impl FromStr for Selector {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (prefix, value) = raw
            .split_once(':')
            .ok_or_else(|| format!("selector '{}' must look like name:..., tag:... or css:...", raw))?;
        if value.is_empty() {
            return Err(format!("selector '{}' has an empty value", raw));
        }
        match prefix {
            "name" => Ok(Selector::Name(value.to_string())),
            "tag" => Ok(Selector::Tag(value.to_string())),
            "css" => Ok(Selector::Css(value.to_string())),
            other => Err(format!("unknown selector kind '{}'", other)),
        }
    }
}

impl TryFrom<String> for Selector {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Selector> for String {
    fn from(value: Selector) -> Self {
        value.to_string()
    }
}
