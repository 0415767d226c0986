//! `{{.Field}}` text templates for rendering records.
//!
//! Field names match serialized record fields case-insensitively with
//! underscores ignored, so `{{.ReviewDate}}` and `{{.review_date}}` both
//! address `review_date`.

use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_REVIEW_TEMPLATE: &str = "{{.Artist}}: {{.Album}} [{{.Score}}] ({{.Url}})";
pub const NEWS_TEMPLATE: &str = "{{.Title}} ({{.Url}})";

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("unclosed action starting at byte {0}")]
    Unclosed(usize),

    #[error("empty field name at byte {0}")]
    EmptyField(usize),

    #[error("unsupported action \"{0}\", expected .FieldName")]
    Unsupported(String),

    #[error("can't evaluate field {0}")]
    UnknownField(String),

    #[error("record does not serialize to an object")]
    NotAnObject,

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Field { key: String, name: String },
}

/// A compiled template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }

            let after = &rest[start + 2..];
            let end = after
                .find("}}")
                .ok_or(TemplateError::Unclosed(offset + start))?;
            let action = after[..end].trim();

            let name = action
                .strip_prefix('.')
                .ok_or_else(|| TemplateError::Unsupported(action.to_string()))?
                .trim();
            if name.is_empty() {
                return Err(TemplateError::EmptyField(offset + start));
            }
            if !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return Err(TemplateError::Unsupported(action.to_string()));
            }
            segments.push(Segment::Field {
                key: normalize(name),
                name: name.to_string(),
            });

            let consumed = start + 2 + end + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self { segments })
    }

    /// Render `record`, looking fields up in its serialized form.
    pub fn render<T: Serialize>(&self, record: &T) -> Result<String, TemplateError> {
        let value = serde_json::to_value(record)?;
        let fields = value.as_object().ok_or(TemplateError::NotAnObject)?;

        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Field { key, name } => {
                    let value = fields
                        .iter()
                        .find(|(k, _)| normalize(k) == *key)
                        .map(|(_, v)| v)
                        .ok_or_else(|| TemplateError::UnknownField(name.clone()))?;
                    push_value(&mut out, value);
                }
            }
        }

        Ok(out)
    }
}

impl FromStr for Template {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn push_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push_str(s),
        // 8.0 prints as "8", 8.4 as "8.4"
        Value::Number(n) if n.is_f64() => {
            if let Some(f) = n.as_f64() {
                out.push_str(&f.to_string());
            }
        }
        other => out.push_str(&other.to_string()),
    }
}
