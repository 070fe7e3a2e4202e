//! Response validation: normalize the model's untrusted JSON into a
//! [`Lesson`].
//!
//! ## Why an explicit classifier?
//!
//! The generation API returns free-form JSON that only *usually* matches the
//! prompt contract. Deriving `Deserialize` on the schema would make any one
//! malformed section abort the whole document. Instead this module parses
//! into an untyped [`serde_json::Value`] tree and runs a total classifier
//! per item: well-formed entries become typed [`Topic`]s and [`Section`]s,
//! malformed entries are dropped with a [`DropReason`] recorded in the
//! returned [`Diagnostics`]. A drop is always whole-item: a topic or section
//! is either fully present or fully absent, never partially included.
//!
//! Only two conditions are fatal for the request: the body is not JSON, or
//! the root lacks a string `titulo` / array `topicos`. Everything below the
//! root degrades best-effort.
//!
//! The function is pure aside from `warn!` traces, so feeding the same raw
//! payload twice yields identical output.

use crate::error::{Diagnostics, DropReason, LessonError};
use crate::material::{Lesson, Section, Topic};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

/// Models sometimes wrap the object in ```json fences despite the prompt
/// saying not to; strip one outer fence pair before parsing.
static RE_JSON_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*\n?(.*?)\n?\s*```$").unwrap());

/// Strip an outer fenced code block from the response body, if present.
pub fn strip_json_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    match RE_JSON_FENCES.captures(trimmed) {
        Some(caps) => caps.get(1).map_or(trimmed, |m| m.as_str().trim()),
        None => trimmed,
    }
}

/// Validate and normalize a raw generation response into a [`Lesson`].
///
/// # Errors
/// Returns [`LessonError::MalformedResponse`] when the body is not valid
/// JSON or the root shape is wrong. Item-level problems never error; they
/// are recorded in the returned [`Diagnostics`].
pub fn normalize_lesson(raw: &str) -> Result<(Lesson, Diagnostics), LessonError> {
    let body = strip_json_fences(raw);

    let root: Value =
        serde_json::from_str(body).map_err(|e| LessonError::MalformedResponse {
            detail: format!("response body is not valid JSON: {e}"),
        })?;

    let title = match root.get("titulo").and_then(Value::as_str) {
        Some(t) => t.to_string(),
        None => {
            return Err(LessonError::MalformedResponse {
                detail: "root 'titulo' is missing or not a string".into(),
            })
        }
    };
    let raw_topics = match root.get("topicos").and_then(Value::as_array) {
        Some(a) => a,
        None => {
            return Err(LessonError::MalformedResponse {
                detail: "root 'topicos' is missing or not an array".into(),
            })
        }
    };

    let mut diagnostics = Diagnostics::default();
    let mut topics = Vec::with_capacity(raw_topics.len());

    for candidate in raw_topics {
        match classify_topic(candidate, &mut diagnostics) {
            Some(topic) => topics.push(topic),
            None => {
                // Reason already recorded by classify_topic.
            }
        }
    }

    if topics.is_empty() && !raw_topics.is_empty() {
        warn!(
            raw_count = raw_topics.len(),
            "no topic survived validation; returning an empty lesson"
        );
        diagnostics.all_topics_dropped = true;
    }

    Ok((Lesson { title, topics }, diagnostics))
}

/// Classify one entry of the `topicos` array.
///
/// Returns `None` when the entry is dropped, after recording why. Three
/// outcomes are distinguished: a valid topic, a section-shaped object that
/// strayed to topic level (has a kind tag and content but no topic fields),
/// and anything else.
fn classify_topic(candidate: &Value, diagnostics: &mut Diagnostics) -> Option<Topic> {
    let obj = candidate.as_object();

    let id = obj.and_then(|o| o.get("id")).and_then(Value::as_str);
    let title = obj.and_then(|o| o.get("titulo")).and_then(Value::as_str);
    let objectives = obj.and_then(|o| o.get("objetivos")).and_then(Value::as_array);
    let sections = obj.and_then(|o| o.get("secoes")).and_then(Value::as_array);

    let (Some(id), Some(title), Some(objectives), Some(sections)) =
        (id, title, objectives, sections)
    else {
        // Not topic-shaped. A stray section at topic level is recognized by
        // its kind tag plus a content payload, and reported distinctly
        // rather than misreported as "not a topic".
        let kind = obj.and_then(|o| o.get("tipo")).and_then(Value::as_str);
        let reason = match kind {
            Some(kind) if obj.is_some_and(|o| o.contains_key("conteudo")) => {
                warn!(kind, "section-shaped object found at topic level; dropping");
                DropReason::StraySectionAtTopicLevel { kind: kind.to_string() }
            }
            _ => {
                warn!("item in 'topicos' is neither a topic nor a recognizable section; dropping");
                DropReason::TopicShape
            }
        };
        diagnostics.dropped_topics.push(reason);
        return None;
    };

    // All-string check on objectives drops the whole topic, not just the
    // offending entry: a topic with corrupt objectives is untrustworthy.
    let Some(objectives) = all_strings(objectives) else {
        warn!(topic = title, "topic has non-string 'objetivos'; dropping topic");
        diagnostics.dropped_topics.push(DropReason::TopicObjectives {
            title: title.to_string(),
        });
        return None;
    };

    let mut valid_sections = Vec::with_capacity(sections.len());
    for section in sections {
        match classify_section(section) {
            Ok(s) => valid_sections.push(s),
            Err(reason) => {
                warn!(topic = title, %reason, "dropping malformed section");
                diagnostics
                    .dropped_sections
                    .push((title.to_string(), reason));
            }
        }
    }

    Some(Topic {
        id: id.to_string(),
        title: title.to_string(),
        objectives,
        sections: valid_sections,
        image: None,
    })
}

/// Classify one entry of a topic's `secoes` array.
///
/// Total over its input: every value maps to exactly one [`Section`]
/// variant or one [`DropReason`]. Each kind's decoder is independent; no
/// implicit structural coercion happens anywhere.
pub fn classify_section(value: &Value) -> Result<Section, DropReason> {
    let Some(obj) = value.as_object() else {
        return Err(DropReason::SectionUntagged);
    };
    let Some(kind) = obj.get("tipo").and_then(Value::as_str) else {
        return Err(DropReason::SectionUntagged);
    };

    let title = optional_string(obj.get("titulo"));

    match kind {
        "lista" => {
            let items = obj
                .get("itens")
                .and_then(Value::as_array)
                .and_then(|a| all_strings(a))
                .ok_or(DropReason::SectionListItems)?;
            Ok(Section::List { title, items })
        }
        "texto" | "exemplo" | "destaque" | "pergunta_reflexiva" | "codigo" => {
            let content = obj
                .get("conteudo")
                .and_then(Value::as_str)
                .ok_or_else(|| DropReason::SectionContent {
                    kind: kind.to_string(),
                })?
                .to_string();

            match kind {
                "texto" => Ok(Section::Text { title, content }),
                "exemplo" => Ok(Section::Example { title, content }),
                "destaque" => Ok(Section::Highlight { title, content }),
                "pergunta_reflexiva" => Ok(Section::ReflectiveQuestion { title, content }),
                _ => {
                    // codigo: 'linguagem' is optional, but when present it
                    // must be a string or the section is dropped.
                    let language = match obj.get("linguagem") {
                        None | Some(Value::Null) => None,
                        Some(Value::String(s)) => Some(s.clone()),
                        Some(_) => return Err(DropReason::SectionCodeLanguage),
                    };
                    Ok(Section::Code {
                        title,
                        content,
                        language,
                    })
                }
            }
        }
        other => Err(DropReason::SectionUnknownKind {
            kind: other.to_string(),
        }),
    }
}

/// Convert a JSON array to `Vec<String>` only when every entry is a string.
fn all_strings(values: &[Value]) -> Option<Vec<String>> {
    values
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

/// An optional string field: present-and-string or absent. A present
/// non-string title is ignored rather than dropping the section; `titulo`
/// is decorative, not payload.
fn optional_string(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}
