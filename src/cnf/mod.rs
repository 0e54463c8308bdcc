//! Renderer for the toolkit's `.cnf` block/key=value configuration dialect
//!
//! A [`ConfigDocument`] is an ordered list of named blocks. Rendering is
//! pure text assembly: absent blocks produce no text at all, falsy values
//! (empty string, zero) produce no line, and every other entry renders as
//! `<key><padding> = <value>` with the `=` in column 24.

mod sanitize;
mod templates;

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use sanitize::{check_key, escape_value, sanitize_block};
pub use templates::{
    ALT_NAMES, CA_EXTENSIONS, DISTINGUISHED_NAME, LEAF_EXTENSIONS, REQ, REQ_EXTENSIONS, ca_config,
    csr_config,
};

/// Columns taken by the key, its padding and the space before `=`
pub const KEY_COLUMN_WIDTH: usize = 23;

/// Scalar option value: a short display string or an integer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Number(i64),
    Text(String),
}

impl ConfigValue {
    /// Empty strings and zero are treated as "not supplied"
    pub fn is_falsy(&self) -> bool {
        match self {
            ConfigValue::Text(s) => s.is_empty(),
            ConfigValue::Number(n) => *n == 0,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Text(s) => f.write_str(s),
            ConfigValue::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Text(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Text(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Number(value)
    }
}

impl From<u32> for ConfigValue {
    fn from(value: u32) -> Self {
        ConfigValue::Number(i64::from(value))
    }
}

/// Insertion-ordered entries of one block; keys are unique within the block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigBlock {
    entries: IndexMap<String, ConfigValue>,
}

impl ConfigBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with<K: Into<String>, V: Into<ConfigValue>>(mut self, key: K, value: V) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or overwrite; an existing key keeps its original position
    pub fn insert<K: Into<String>, V: Into<ConfigValue>>(&mut self, key: K, value: V) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// At least one entry would produce a line when rendered
    pub fn has_renderable(&self) -> bool {
        self.entries.values().any(|v| !v.is_falsy())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K, V> FromIterator<(K, V)> for ConfigBlock
where
    K: Into<String>,
    V: Into<ConfigValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut block = ConfigBlock::new();
        for (key, value) in iter {
            block.insert(key, value);
        }
        block
    }
}

/// How a reference line names its target block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRef {
    /// `key = target` (e.g. `distinguished_name`, `req_extensions`)
    Name,
    /// `key = @target` (e.g. `subjectAltName`)
    Section,
}

/// Ordered sequence of named blocks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    blocks: Vec<(String, Option<ConfigBlock>)>,
}

impl ConfigDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a block; `None` or a block without truthy entries is omitted
    pub fn block<T: Into<String>>(mut self, title: T, data: Option<ConfigBlock>) -> Self {
        self.blocks.push((title.into(), data));
        self
    }

    pub fn get(&self, title: &str) -> Option<&ConfigBlock> {
        self.blocks
            .iter()
            .find(|(t, _)| t == title)
            .and_then(|(_, data)| data.as_ref())
    }

    /// Whether `title` carries caller-supplied data and will render a header
    pub fn is_present(&self, title: &str) -> bool {
        self.get(title).is_some_and(ConfigBlock::has_renderable)
    }

    /// Point block `from` at block `to` through option `key`.
    ///
    /// The reference line is appended after `from`'s inline entries and only
    /// when `to` is present. A missing or absent `from` block is created.
    pub fn link(mut self, from: &str, key: &str, to: &str, style: BlockRef) -> Self {
        if !self.is_present(to) {
            return self;
        }
        let value = match style {
            BlockRef::Name => to.to_string(),
            BlockRef::Section => format!("@{to}"),
        };

        match self.blocks.iter_mut().find(|(t, _)| t == from) {
            Some((_, data)) => data.get_or_insert_with(ConfigBlock::new).insert(key, value),
            None => self
                .blocks
                .push((from.to_string(), Some(ConfigBlock::new().with(key, value)))),
        }
        self
    }

    pub fn render(&self) -> String {
        self.blocks
            .iter()
            .map(|(title, data)| render_block(title, data.as_ref()))
            .collect()
    }
}

impl fmt::Display for ConfigDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// `<key><padding> = <value>\n` with `=` in column 24, or nothing for a falsy value
pub fn render_line(key: &str, value: &ConfigValue) -> String {
    if value.is_falsy() {
        return String::new();
    }
    format!("{key:<width$} = {value}\n", width = KEY_COLUMN_WIDTH - 1)
}

/// Header plus entry lines and a trailing blank line; nothing when absent
/// or when every entry is falsy
pub fn render_block(title: &str, data: Option<&ConfigBlock>) -> String {
    let Some(block) = data.filter(|b| b.has_renderable()) else {
        return String::new();
    };

    let mut out = format!("[ {title} ]\n");
    for (key, value) in block.iter() {
        out.push_str(&render_line(key, value));
    }
    out.push('\n');
    out
}
