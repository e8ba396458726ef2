//! Grok pattern compilation
//!
//! A grok expression is a regular expression with `%{SYNTAX}`, `%{SYNTAX:field}` or
//! `%{SYNTAX:field:type}` references. References expand recursively against a named
//! pattern library; every reference with a field name becomes a capture group whose
//! text is converted to the requested type (`int`, `float`, `bool`, default string).
//!
//! ```
//! use logwarp_worker::pattern::PatternCompiler;
//! use logwarp_worker::record::FieldValue;
//!
//! let pattern = PatternCompiler::new()
//!     .compile("%{IP:client} %{WORD:verb} %{INT:bytes:int}")
//!     .unwrap();
//! let fields = pattern.extract("10.0.0.1 GET 512").unwrap();
//! assert_eq!(fields["bytes"], FieldValue::Integer(512));
//! ```

pub mod library;

use regex::Regex;
use std::collections::HashMap;
use thiserror::Error;

use crate::record::{FieldValue, Fields};

/// Matches one `%{SYNTAX:semantic:type}` reference.
const REFERENCE: &str =
    r"%\{(?P<syntax>[A-Za-z0-9_]+)(?::(?P<semantic>[A-Za-z0-9_@.\[\]-]+))?(?::(?P<type>[A-Za-z]+))?\}";

/// Prefix for generated capture group names; user field names never reach the regex.
const GROUP_PREFIX: &str = "__grok";

/// Deepest allowed chain of nested references.
const MAX_DEPTH: usize = 32;

#[derive(Error, Debug)]
pub enum PatternError {
    #[error("pattern is empty")]
    Empty,

    #[error("unknown grok pattern %{{{0}}}")]
    UnknownPattern(String),

    #[error("pattern %{{{0}}} nests too deeply (recursive definition?)")]
    TooDeep(String),

    #[error("unknown type '{kind}' for field '{field}'")]
    UnknownType { field: String, kind: String },

    #[error(transparent)]
    Regex(#[from] regex::Error),
}

#[derive(Error, Debug, PartialEq)]
pub enum MatchError {
    #[error("line does not match pattern")]
    NoMatch,

    #[error("field '{field}' value '{value}' is not a valid {kind}")]
    Conversion {
        field: String,
        value: String,
        kind: &'static str,
    },
}

/// Target type of a captured field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Int,
    Float,
    Bool,
}

impl ValueKind {
    fn parse(field: &str, kind: &str) -> Result<Self, PatternError> {
        match kind.to_lowercase().as_str() {
            "string" => Ok(ValueKind::String),
            "int" | "integer" | "long" => Ok(ValueKind::Int),
            "float" | "double" => Ok(ValueKind::Float),
            "bool" | "boolean" => Ok(ValueKind::Bool),
            _ => Err(PatternError::UnknownType {
                field: field.to_string(),
                kind: kind.to_string(),
            }),
        }
    }

    fn name(self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Int => "integer",
            ValueKind::Float => "float",
            ValueKind::Bool => "boolean",
        }
    }

    /// Empty captures of typed fields are dropped rather than failing the line
    fn convert(self, field: &str, raw: &str) -> Result<Option<FieldValue>, MatchError> {
        if self != ValueKind::String && raw.is_empty() {
            return Ok(None);
        }

        let invalid = || MatchError::Conversion {
            field: field.to_string(),
            value: raw.to_string(),
            kind: self.name(),
        };

        let value = match self {
            ValueKind::String => FieldValue::String(raw.to_string()),
            ValueKind::Int => FieldValue::Integer(raw.parse().map_err(|_| invalid())?),
            ValueKind::Float => FieldValue::Float(raw.parse().map_err(|_| invalid())?),
            ValueKind::Bool => match raw.to_lowercase().as_str() {
                "true" | "1" => FieldValue::Boolean(true),
                "false" | "0" => FieldValue::Boolean(false),
                _ => return Err(invalid()),
            },
        };

        Ok(Some(value))
    }
}

#[derive(Debug, Clone)]
struct Capture {
    group: String,
    field: String,
    kind: ValueKind,
}

/// Compiles grok expressions against a pattern library
#[derive(Debug, Clone)]
pub struct PatternCompiler {
    definitions: HashMap<String, String>,
}

impl PatternCompiler {
    /// Compiler preloaded with the built-in library
    pub fn new() -> Self {
        let definitions = library::DEFAULT_PATTERNS
            .iter()
            .map(|(name, definition)| (name.to_string(), definition.to_string()))
            .collect();

        Self { definitions }
    }

    /// Add or replace a named definition
    pub fn add_pattern(&mut self, name: impl Into<String>, definition: impl Into<String>) -> &mut Self {
        self.definitions.insert(name.into(), definition.into());
        self
    }

    /// Expand and compile `pattern`
    pub fn compile(&self, pattern: &str) -> Result<GrokPattern, PatternError> {
        if pattern.trim().is_empty() {
            return Err(PatternError::Empty);
        }

        let reference = Regex::new(REFERENCE)?;
        let mut captures = Vec::new();
        let expanded = self.expand(&reference, pattern, 0, &mut captures)?;
        let regex = Regex::new(&expanded)?;

        // Plain named groups written by the user are captured as strings
        for name in regex.capture_names().flatten() {
            if !name.starts_with(GROUP_PREFIX) {
                captures.push(Capture {
                    group: name.to_string(),
                    field: name.to_string(),
                    kind: ValueKind::String,
                });
            }
        }

        Ok(GrokPattern {
            regex,
            captures,
        })
    }

    fn expand(
        &self,
        reference: &Regex,
        pattern: &str,
        depth: usize,
        captures: &mut Vec<Capture>,
    ) -> Result<String, PatternError> {
        let mut out = String::with_capacity(pattern.len());
        let mut last = 0;

        for caps in reference.captures_iter(pattern) {
            let (Some(whole), Some(syntax)) = (caps.get(0), caps.name("syntax")) else {
                continue;
            };
            let syntax = syntax.as_str();

            if depth >= MAX_DEPTH {
                return Err(PatternError::TooDeep(syntax.to_string()));
            }

            let definition = self
                .definitions
                .get(syntax)
                .ok_or_else(|| PatternError::UnknownPattern(syntax.to_string()))?;

            out.push_str(&pattern[last..whole.start()]);

            match caps.name("semantic") {
                Some(semantic) => {
                    let field = semantic.as_str().to_string();
                    let kind = match caps.name("type") {
                        Some(kind) => ValueKind::parse(&field, kind.as_str())?,
                        None => ValueKind::String,
                    };
                    let group = format!("{GROUP_PREFIX}{}", captures.len());
                    captures.push(Capture {
                        group: group.clone(),
                        field,
                        kind,
                    });

                    let inner = self.expand(reference, definition, depth + 1, captures)?;
                    out.push_str(&format!("(?P<{group}>{inner})"));
                }
                None => {
                    let inner = self.expand(reference, definition, depth + 1, captures)?;
                    out.push_str(&format!("(?:{inner})"));
                }
            }

            last = whole.end();
        }

        out.push_str(&pattern[last..]);
        Ok(out)
    }
}

impl Default for PatternCompiler {
    fn default() -> Self {
        Self::new()
    }
}

/// A compiled grok expression
#[derive(Debug, Clone)]
pub struct GrokPattern {
    regex: Regex,
    captures: Vec<Capture>,
}

impl GrokPattern {
    /// Match one line and convert its named captures
    ///
    /// Unmatched optional groups are omitted. When a field name is captured more
    /// than once, the last matched occurrence wins.
    pub fn extract(&self, line: &str) -> Result<Fields, MatchError> {
        let caps = self.regex.captures(line).ok_or(MatchError::NoMatch)?;
        let mut fields = Fields::new();

        for capture in &self.captures {
            let Some(matched) = caps.name(&capture.group) else {
                continue;
            };
            if let Some(value) = capture.kind.convert(&capture.field, matched.as_str())? {
                fields.insert(capture.field.clone(), value);
            }
        }

        Ok(fields)
    }
}
