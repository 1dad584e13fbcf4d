use std::fmt::Display;

use serde_json::{Map, Value};

use crate::vocabulary::EntryCreate;

/// A vocabulary entry proposed for import, already validated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    pub writing: String,
    pub reading: String,
    pub meaning: String,
    pub level: Option<String>,
    pub part_of_speech: Option<String>,
    pub example: Option<String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CandidateError {
    #[error("record is not an object")]
    NotAnObject,

    #[error("missing or empty field `{0}`")]
    MissingField(&'static str),

    #[error("field `{0}` is not a string")]
    InvalidField(&'static str),
}

/// Aliases accepted for each field, first match wins.
const WRITING_KEYS: &[&str] = &["writing", "japanese"];
const READING_KEYS: &[&str] = &["reading"];
const MEANING_KEYS: &[&str] = &["meaning", "english", "gloss"];
const LEVEL_KEYS: &[&str] = &["level", "jlpt_level"];
const PART_OF_SPEECH_KEYS: &[&str] = &["part_of_speech"];
const EXAMPLE_KEYS: &[&str] = &["example", "example_sentence"];

fn lookup<'v>(
    record: &'v Map<String, Value>,
    keys: &[&str],
    name: &'static str,
) -> Result<Option<&'v str>, CandidateError> {
    let Some(value) = keys.iter().find_map(|key| record.get(*key)) else {
        return Ok(None);
    };

    match value {
        Value::Null => Ok(None),
        Value::String(s) => {
            let s = s.trim();
            Ok((!s.is_empty()).then_some(s))
        }
        _ => Err(CandidateError::InvalidField(name)),
    }
}

fn required(
    record: &Map<String, Value>,
    keys: &[&str],
    name: &'static str,
) -> Result<String, CandidateError> {
    lookup(record, keys, name)?
        .map(str::to_string)
        .ok_or(CandidateError::MissingField(name))
}

fn optional(
    record: &Map<String, Value>,
    keys: &[&str],
    name: &'static str,
) -> Result<Option<String>, CandidateError> {
    Ok(lookup(record, keys, name)?.map(str::to_string))
}

impl Candidate {
    /// Build a candidate from a free-form upstream record.
    pub fn from_value(value: &Value) -> Result<Self, CandidateError> {
        let record = value.as_object().ok_or(CandidateError::NotAnObject)?;

        Ok(Self {
            writing: required(record, WRITING_KEYS, "writing")?,
            reading: required(record, READING_KEYS, "reading")?,
            meaning: required(record, MEANING_KEYS, "meaning")?,
            level: optional(record, LEVEL_KEYS, "level")?,
            part_of_speech: optional(record, PART_OF_SPEECH_KEYS, "part_of_speech")?,
            example: optional(record, EXAMPLE_KEYS, "example")?,
        })
    }
}

impl Display for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}) - {}", self.writing, self.reading, self.meaning)
    }
}

impl From<Candidate> for EntryCreate {
    fn from(candidate: Candidate) -> Self {
        EntryCreate {
            writing: candidate.writing,
            reading: candidate.reading,
            meaning: candidate.meaning,
            level: candidate.level,
            part_of_speech: candidate.part_of_speech,
            example: candidate.example,
        }
    }
}

/// Best-effort identity of a raw record for log lines.
pub fn describe(value: &Value) -> String {
    let Some(record) = value.as_object() else {
        return value.to_string();
    };

    let field = |keys: &[&str]| {
        keys.iter()
            .find_map(|key| record.get(*key).and_then(Value::as_str))
            .unwrap_or("?")
            .to_string()
    };

    format!(
        "{} ({}) - {}",
        field(WRITING_KEYS),
        field(READING_KEYS),
        field(MEANING_KEYS)
    )
}
