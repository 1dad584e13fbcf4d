//! Level word lists on disk.
//!
//! Each level ships as `{level}-words.ts` (a TypeScript module exporting an
//! array literal) or `{level}-words.json`. The TS file wins when both exist.

use std::fmt::Display;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::storage::StorageManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JlptLevel {
    N5,
    N4,
    N3,
    N2,
    N1,
}

impl JlptLevel {
    /// Easiest first.
    pub const ALL: [JlptLevel; 5] = [
        JlptLevel::N5,
        JlptLevel::N4,
        JlptLevel::N3,
        JlptLevel::N2,
        JlptLevel::N1,
    ];

    /// Lowercase form used in file and export names.
    pub fn stem(&self) -> &'static str {
        match self {
            JlptLevel::N5 => "n5",
            JlptLevel::N4 => "n4",
            JlptLevel::N3 => "n3",
            JlptLevel::N2 => "n2",
            JlptLevel::N1 => "n1",
        }
    }

    /// Tag stored on entries.
    pub fn tag(&self) -> String {
        self.stem().to_uppercase()
    }
}

impl Display for JlptLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelSelector {
    One(JlptLevel),
    All,
}

impl LevelSelector {
    pub fn levels(&self) -> Vec<JlptLevel> {
        match self {
            LevelSelector::One(level) => vec![*level],
            LevelSelector::All => JlptLevel::ALL.to_vec(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read {file}: {source}")]
    Read {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{file} is not valid utf8")]
    Encoding { file: String },

    #[error("could not parse {file}: {source}")]
    Json {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{file} does not contain a word array")]
    UnrecognizedLayout { file: String },
}

static OBJECT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^}]+\}").expect("valid pattern"));

static FIELD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(\w+)\s*:\s*(?:"([^"]*)"|'([^']*)')"#).expect("field pattern is valid")
});

fn read_text(storage: &dyn StorageManager, file: &str) -> Result<String, SourceError> {
    let bytes = storage.read(file).map_err(|source| SourceError::Read {
        file: file.to_string(),
        source,
    })?;

    String::from_utf8(bytes).map_err(|_| SourceError::Encoding {
        file: file.to_string(),
    })
}

/// Extract word records from the `export const {level}Words = [...]` literal.
///
/// Only string-valued properties are picked up; anything else in an object
/// is ignored.
pub fn parse_ts_words(
    content: &str,
    level: JlptLevel,
    file: &str,
) -> Result<Vec<Value>, SourceError> {
    let array_re = Regex::new(&format!(
        r"(?s)export const {}Words\b[^=]*=\s*\[(.*?)\];",
        level.stem()
    ))
    .map_err(|_| SourceError::UnrecognizedLayout {
        file: file.to_string(),
    })?;

    let words = array_re
        .captures(content)
        .and_then(|captures| captures.get(1))
        .ok_or_else(|| SourceError::UnrecognizedLayout {
            file: file.to_string(),
        })?;

    let records = OBJECT_RE
        .find_iter(words.as_str())
        .map(|object| {
            let mut record = Map::new();
            for field in FIELD_RE.captures_iter(object.as_str()) {
                let value = field.get(2).or_else(|| field.get(3));
                if let Some(value) = value {
                    let value = Value::String(value.as_str().to_string());
                    record.insert(field[1].to_string(), value);
                }
            }
            Value::Object(record)
        })
        .collect();

    Ok(records)
}

pub fn parse_json_words(content: &str, file: &str) -> Result<Vec<Value>, SourceError> {
    let value: Value = serde_json::from_str(content).map_err(|source| SourceError::Json {
        file: file.to_string(),
        source,
    })?;

    match value {
        Value::Array(records) => Ok(records),
        _ => Err(SourceError::UnrecognizedLayout {
            file: file.to_string(),
        }),
    }
}

/// Tag records that carry no level of their own.
fn tag_level(records: &mut [Value], level: JlptLevel) {
    for record in records.iter_mut() {
        if let Value::Object(fields) = record {
            if !fields.contains_key("level") && !fields.contains_key("jlpt_level") {
                fields.insert("level".to_string(), Value::String(level.tag()));
            }
        }
    }
}

/// Load the raw records for one level.
///
/// Returns `Ok(None)` when the data directory has no file for the level.
pub fn load_level(
    storage: &dyn StorageManager,
    level: JlptLevel,
) -> Result<Option<Vec<Value>>, SourceError> {
    let ts_file = format!("{}-words.ts", level.stem());
    let json_file = format!("{}-words.json", level.stem());

    let mut records = if storage.exists(&ts_file) {
        log::info!("Importing from TS file: {ts_file}");
        parse_ts_words(&read_text(storage, &ts_file)?, level, &ts_file)?
    } else if storage.exists(&json_file) {
        log::info!("Importing from JSON file: {json_file}");
        parse_json_words(&read_text(storage, &json_file)?, &json_file)?
    } else {
        return Ok(None);
    };

    tag_level(&mut records, level);
    log::debug!("{} records found for {level}", records.len());

    Ok(Some(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::BackendLocal;
    use serde_json::json;

    const N5_TS: &str = r#"
import { Word } from "./types";

export const n5Words: Word[] = [
  { id: "n5-1", japanese: "猫", reading: "ねこ", meaning: "cat" },
  {
    id: "n5-2",
    japanese: '水',
    reading: "みず",
    meaning: "water",
  },
  { id: "n5-3", japanese: "犬", meaning: "dog" },
];
"#;

    #[test]
    fn test_parse_ts_words() {
        let records = parse_ts_words(N5_TS, JlptLevel::N5, "n5-words.ts").unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0],
            json!({"id": "n5-1", "japanese": "猫", "reading": "ねこ", "meaning": "cat"})
        );
        assert_eq!(records[1]["japanese"], "水");
        // incomplete record is kept for the pipeline to reject
        assert!(records[2].get("reading").is_none());
    }

    #[test]
    fn test_parse_ts_wrong_export() {
        let result = parse_ts_words(N5_TS, JlptLevel::N4, "n4-words.ts");
        assert!(matches!(result, Err(SourceError::UnrecognizedLayout { .. })));
    }

    #[test]
    fn test_parse_json_words() {
        let content = r#"[{"writing": "猫", "reading": "ねこ", "meaning": "cat"}]"#;
        let records = parse_json_words(content, "f").unwrap();
        assert_eq!(records.len(), 1);

        assert!(matches!(
            parse_json_words(r#"{"words": []}"#, "f"),
            Err(SourceError::UnrecognizedLayout { .. })
        ));
        assert!(matches!(
            parse_json_words("[{", "f"),
            Err(SourceError::Json { .. })
        ));
    }

    #[test]
    fn test_load_level_prefers_ts_and_tags_level() {
        let dir = tempfile::tempdir().unwrap();
        let storage = BackendLocal::new(dir.path()).unwrap();
        storage.write("n5-words.ts", N5_TS.as_bytes()).unwrap();
        storage
            .write("n5-words.json", br#"[{"writing": "x", "reading": "y", "meaning": "z"}]"#)
            .unwrap();

        let records = load_level(&storage, JlptLevel::N5).unwrap().unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r["level"] == "N5"));
    }

    #[test]
    fn test_load_level_json_keeps_own_level() {
        let dir = tempfile::tempdir().unwrap();
        let storage = BackendLocal::new(dir.path()).unwrap();
        storage
            .write(
                "n3-words.json",
                br#"[{"writing": "a", "reading": "b", "meaning": "c", "jlpt_level": "N2"},
                     {"writing": "d", "reading": "e", "meaning": "f"}]"#,
            )
            .unwrap();

        let records = load_level(&storage, JlptLevel::N3).unwrap().unwrap();
        assert_eq!(records[0].get("level"), None);
        assert_eq!(records[0]["jlpt_level"], "N2");
        assert_eq!(records[1]["level"], "N3");
    }

    #[test]
    fn test_load_level_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = BackendLocal::new(dir.path()).unwrap();
        assert!(load_level(&storage, JlptLevel::N1).unwrap().is_none());
    }

    #[test]
    fn test_selector_levels() {
        assert_eq!(LevelSelector::One(JlptLevel::N3).levels(), vec![JlptLevel::N3]);
        assert_eq!(
            LevelSelector::All.levels(),
            vec![
                JlptLevel::N5,
                JlptLevel::N4,
                JlptLevel::N3,
                JlptLevel::N2,
                JlptLevel::N1
            ]
        );
        assert_eq!(JlptLevel::N4.to_string(), "N4");
    }
}
