//! Line-to-record extraction strategies
//!
//! A job picks one [`RecordExtractor`] by its parser kind. The grok strategy matches each
//! line against a compiled pattern; the structured strategy decodes each line as a bulk
//! export document (`{"_id": .., "_index": .., "_source": {..}}`).

use logwarp_common::types::ParserKind;
use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{PipelineError, PipelineResult};
use crate::pattern::{GrokPattern, PatternCompiler};
use crate::record::{FieldValue, Fields};

/// Fields extracted from one line, before the index is resolved
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub id: String,
    /// Index embedded in the line, if the format carries one
    pub index: Option<String>,
    pub fields: Fields,
}

/// Turns one source line into record content
pub trait RecordExtractor: Send + Sync {
    /// Extract one line; the error string is the per-line failure reason
    fn extract(&self, line: &str) -> Result<Extracted, String>;

    /// Whether records from this extractor carry a combined-log `timestamp` to rewrite
    fn normalizes_timestamp(&self) -> bool {
        false
    }
}

/// Build the extractor for a job; a pattern that does not compile is a setup failure
pub fn extractor_for(kind: ParserKind, pattern: &str) -> PipelineResult<Box<dyn RecordExtractor>> {
    match kind {
        ParserKind::Grok => {
            let compiled = PatternCompiler::new().compile(pattern).map_err(|e| {
                PipelineError::PatternCompile {
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                }
            })?;
            Ok(Box::new(GrokExtractor::new(compiled)))
        }
        ParserKind::Elastic => Ok(Box::new(StructuredExtractor)),
    }
}

/// Grok-based extraction; every record gets a fresh UUID v4
pub struct GrokExtractor {
    pattern: GrokPattern,
}

impl GrokExtractor {
    pub fn new(pattern: GrokPattern) -> Self {
        Self { pattern }
    }
}

impl RecordExtractor for GrokExtractor {
    fn extract(&self, line: &str) -> Result<Extracted, String> {
        let fields = self.pattern.extract(line).map_err(|e| e.to_string())?;

        Ok(Extracted {
            id: Uuid::new_v4().to_string(),
            index: None,
            fields,
        })
    }

    fn normalizes_timestamp(&self) -> bool {
        true
    }
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(rename = "_id", default)]
    id: Option<Value>,
    #[serde(rename = "_index", default)]
    index: Option<String>,
    #[serde(rename = "_source")]
    source: Option<Value>,
}

/// Raw structured extraction from bulk-export JSON lines
pub struct StructuredExtractor;

impl RecordExtractor for StructuredExtractor {
    fn extract(&self, line: &str) -> Result<Extracted, String> {
        let raw: RawDocument =
            serde_json::from_str(line).map_err(|e| format!("Failed to parse JSON: {e}"))?;

        let source: Map<String, Value> = match raw.source {
            Some(Value::Object(map)) => map,
            Some(_) => return Err("_source is not an object".to_string()),
            None => return Err("_source is missing".to_string()),
        };

        let id = match raw.id {
            Some(Value::String(s)) if !s.is_empty() => s,
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Null) | None => Uuid::new_v4().to_string(),
            Some(Value::String(_)) => Uuid::new_v4().to_string(),
            Some(other) => return Err(format!("_id must be a string, got {other}")),
        };

        let fields = source
            .into_iter()
            .map(|(name, value)| (name, FieldValue::from(value)))
            .collect();

        Ok(Extracted {
            id,
            index: raw.index.filter(|i| !i.trim().is_empty()),
            fields,
        })
    }
}

/// Decides the target index for each record of one job
///
/// An explicit job index always wins. Without one, the first embedded index seen is
/// pinned and reused for the rest of the job.
#[derive(Debug, Default)]
pub struct IndexResolver {
    explicit: Option<String>,
    pinned: Option<String>,
}

impl IndexResolver {
    pub fn new(explicit: Option<&str>) -> Self {
        Self {
            explicit: explicit.map(str::to_string),
            pinned: None,
        }
    }

    pub fn resolve(&mut self, embedded: Option<&str>) -> Option<String> {
        if let Some(explicit) = &self.explicit {
            return Some(explicit.clone());
        }
        if self.pinned.is_none() {
            self.pinned = embedded.map(str::to_string);
        }
        self.pinned.clone()
    }
}
