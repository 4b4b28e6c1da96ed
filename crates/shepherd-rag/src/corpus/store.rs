//! Document Store: turns heterogeneous JSON corpus records into flat,
//! searchable passages.
//!
//! Loading is a pure transform over the record list; persistence of the JSON
//! sources is the caller's concern. A missing or corrupt source yields an
//! empty passage list with a warning; partial corpus availability must never
//! crash retrieval.

use std::path::Path;

use serde_json::Value;

use crate::types::{Metadata, Passage};

/// Ordered, corpus-specific lists of text-bearing fields.
/// Unknown corpus ids fall back to the generic list.
pub fn text_fields(corpus_id: &str) -> &'static [&'static str] {
    match corpus_id {
        "primary_qa" => &["question", "answer"],
        "thematic_qa" => &["theme", "question", "answer"],
        "session_notes" => &["title", "summary", "notes", "quotes"],
        "numbered_themes" => &["number", "theme", "description", "themes"],
        _ => &["title", "question", "answer", "text", "notes"],
    }
}

/// Flatten each record into a Passage. Records yielding no non-empty text are
/// silently excluded; that is expected data shape variance, not an error.
pub fn load(corpus_id: &str, records: &[Value]) -> Vec<Passage> {
    let fields = text_fields(corpus_id);
    let mut passages = Vec::with_capacity(records.len());

    for record in records {
        let text = match record {
            Value::Object(map) => {
                let chunks: Vec<String> = fields
                    .iter()
                    .filter_map(|field| map.get(*field).and_then(flatten_value))
                    .collect();
                chunks.join(" ").trim().to_string()
            }
            // A bare scalar record is its own text.
            other => flatten_value(other).unwrap_or_default(),
        };

        if text.is_empty() {
            continue;
        }

        let metadata: Metadata = match record {
            Value::Object(map) => map.clone().into_iter().collect(),
            _ => Metadata::new(),
        };

        passages.push(Passage {
            text,
            metadata,
            corpus_id: corpus_id.to_string(),
        });
    }

    passages
}

/// Read a JSON array from disk and flatten it. Never raises: any failure is
/// logged and treated as an empty corpus.
pub fn load_file(corpus_id: &str, path: &Path) -> Vec<Passage> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(
                corpus = %corpus_id,
                path = %path.display(),
                error = %e,
                "Corpus source unreadable, treating as empty"
            );
            return Vec::new();
        }
    };

    let records: Vec<Value> = match serde_json::from_str(&content) {
        Ok(Value::Array(records)) => records,
        Ok(_) => {
            tracing::warn!(
                corpus = %corpus_id,
                path = %path.display(),
                "Corpus source is not a JSON array, treating as empty"
            );
            return Vec::new();
        }
        Err(e) => {
            tracing::warn!(
                corpus = %corpus_id,
                path = %path.display(),
                error = %e,
                "Corpus source is not valid JSON, treating as empty"
            );
            return Vec::new();
        }
    };

    let passages = load(corpus_id, &records);
    tracing::info!(
        corpus = %corpus_id,
        records = records.len(),
        passages = passages.len(),
        "Loaded corpus"
    );
    passages
}

/// Flatten one field value per the corpus rules:
/// scalars directly, lists of scalars space-joined, lists of objects projected
/// through known text sub-fields, maps joined over their values.
fn flatten_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    Value::Object(map) => map
                        .get("quote")
                        .or_else(|| map.get("text"))
                        .and_then(flatten_value),
                    other => flatten_value(other),
                })
                .collect();
            parts.join(" ")
        }
        Value::Object(map) => {
            let parts: Vec<String> = map.values().filter_map(flatten_value).collect();
            parts.join(" ")
        }
        Value::Null => String::new(),
    };

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_qa_records() {
        let records = vec![json!({
            "id": 1001,
            "category": "faces_of_eve",
            "question": "Who does God say I am?",
            "answer": "Fearfully and wonderfully made."
        })];
        let passages = load("primary_qa", &records);
        assert_eq!(passages.len(), 1);
        assert_eq!(
            passages[0].text,
            "Who does God say I am? Fearfully and wonderfully made."
        );
        assert_eq!(passages[0].corpus_id, "primary_qa");
        assert_eq!(passages[0].metadata["id"], json!(1001));
    }

    #[test]
    fn drops_records_with_no_derivable_text() {
        let records = vec![
            json!({"question": "", "answer": "   "}),
            json!({"id": 7}),
            json!({"question": "kept?", "answer": "yes"}),
        ];
        let passages = load("primary_qa", &records);
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].text, "kept? yes");
    }

    #[test]
    fn joins_list_of_scalars() {
        let records = vec![json!({"title": "Night one", "notes": ["stand", "endure"]})];
        let passages = load("session_notes", &records);
        assert_eq!(passages[0].text, "Night one stand endure");
    }

    #[test]
    fn projects_list_of_objects_through_quote_field() {
        let records = vec![json!({
            "title": "Session",
            "quotes": [{"quote": "delay is not denial", "speaker": "PD"},
                       {"text": "stand in faith"}]
        })];
        let passages = load("session_notes", &records);
        assert_eq!(passages[0].text, "Session delay is not denial stand in faith");
    }

    #[test]
    fn joins_map_fields_over_values() {
        let records = vec![json!({
            "number": 7,
            "themes": {"first": "rest", "second": "completion"}
        })];
        let passages = load("numbered_themes", &records);
        assert!(passages[0].text.starts_with("7 "));
        assert!(passages[0].text.contains("rest"));
        assert!(passages[0].text.contains("completion"));
    }

    #[test]
    fn field_order_is_fixed() {
        let records = vec![json!({"answer": "second", "question": "first"})];
        let passages = load("primary_qa", &records);
        assert_eq!(passages[0].text, "first second");
    }

    #[test]
    fn missing_file_yields_empty() {
        let passages = load_file("primary_qa", Path::new("/nonexistent/corpus.json"));
        assert!(passages.is_empty());
    }

    #[test]
    fn corrupt_file_yields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_file("primary_qa", &path).is_empty());

        let path = dir.path().join("object.json");
        std::fs::write(&path, "{\"not\": \"an array\"}").unwrap();
        assert!(load_file("primary_qa", &path).is_empty());
    }

    #[test]
    fn load_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qa.json");
        std::fs::write(
            &path,
            r#"[{"question": "What is grace?", "answer": "Unmerited favor."}]"#,
        )
        .unwrap();
        let passages = load_file("primary_qa", &path);
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].text, "What is grace? Unmerited favor.");
    }
}
