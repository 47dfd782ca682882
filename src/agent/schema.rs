//! Structured output contracts for the draft and revise responders.
//!
//! Two schemas are declared: [`SchemaKind::AnswerQuestion`] (a draft) and
//! [`SchemaKind::ReviseAnswer`] (a revision, which adds `citations`). The
//! model is offered the schema as a tool definition; its tool call is then
//! checked by [`SchemaKind::validate`], a pure function returning either a
//! [`StructuredAnswer`] or a [`ValidationError`] listing every bad field.
//!
//! Text fields tolerate JSON numbers (rendered verbatim) but never parse
//! anything: `novelty_score` stays free text.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::message::Message;
use super::tool::{ToolCall, ToolDefinition};
use crate::error::AgentError;

/// The model's self-critique of its answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    /// Critique of what is missing.
    pub missing: String,
    /// Critique of what is superfluous.
    pub superfluous: String,
    /// Critique of what has already been published.
    pub not_novel: String,
    /// One-sentence summary of the core idea.
    pub short_name: String,
    /// Novelty on a 0–10 scale, as the model wrote it.
    pub novelty_score: String,
    /// References by `PubMed` id or other ids.
    pub references: String,
    /// Whether the inputs and hypothesis make sense.
    pub flag: String,
}

/// A draft answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    /// The ~250 word hypothesis.
    pub answer: String,
    /// Self-critique.
    pub reflection: Reflection,
    /// 1–3 queries for researching improvements.
    pub search_queries: Vec<String>,
}

/// A revised answer: a draft plus citations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisedAnswerRecord {
    /// Fields shared with the draft.
    #[serde(flatten)]
    pub record: AnswerRecord,
    /// Citations motivating the revision.
    pub citations: Vec<String>,
}

/// A validated structured response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuredAnswer {
    /// Bound to `AnswerQuestion`.
    Draft(AnswerRecord),
    /// Bound to `ReviseAnswer`.
    Revision(RevisedAnswerRecord),
}

impl StructuredAnswer {
    /// Returns the fields common to both schemas.
    #[must_use]
    pub const fn record(&self) -> &AnswerRecord {
        match self {
            Self::Draft(record) => record,
            Self::Revision(revised) => &revised.record,
        }
    }

    /// Returns the schema this answer was bound to.
    #[must_use]
    pub const fn kind(&self) -> SchemaKind {
        match self {
            Self::Draft(_) => SchemaKind::AnswerQuestion,
            Self::Revision(_) => SchemaKind::ReviseAnswer,
        }
    }
}

/// The declared output schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    /// Initial answer with reflection and search queries.
    AnswerQuestion,
    /// Revised answer; additionally requires `citations`.
    ReviseAnswer,
}

impl SchemaKind {
    /// Returns the schema name, used as the tool name and discriminator.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AnswerQuestion => "AnswerQuestion",
            Self::ReviseAnswer => "ReviseAnswer",
        }
    }

    /// Looks up a schema by its declared name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "AnswerQuestion" => Some(Self::AnswerQuestion),
            "ReviseAnswer" => Some(Self::ReviseAnswer),
            _ => None,
        }
    }

    /// Returns the tool definition that steers the model to this schema.
    #[must_use]
    pub fn definition(self) -> ToolDefinition {
        let reflection = json!({
            "type": "object",
            "description": "Your reflection on the initial answer.",
            "properties": {
                "missing": { "type": "string", "description": "Critique of what is missing." },
                "superfluous": { "type": "string", "description": "Critique of what is superfluous." },
                "not_novel": { "type": "string", "description": "Critique of what has already been published." },
                "short_name": { "type": "string", "description": "A one sentence summary of the core idea in the hypothesis." },
                "novelty_score": { "type": "string", "description": "A number between 0 and 10 on how novel the hypothesis is." },
                "references": { "type": "string", "description": "References by PubMed id or other ids." },
                "flag": { "type": "string", "description": "Does the hypothesis make sense? Consider whether the input gene names and other features are real, and rethink whether the hypothesis makes sense." }
            },
            "required": REFLECTION_FIELDS
        });

        let mut properties = json!({
            "answer": { "type": "string", "description": "~250 word detailed answer to the question." },
            "reflection": reflection,
            "search_queries": {
                "type": "array",
                "items": { "type": "string" },
                "minItems": 1,
                "description": "1-3 search queries for researching improvements to address the critique of your current answer."
            }
        });
        let mut required = vec!["answer", "reflection", "search_queries"];

        let description = match self {
            Self::AnswerQuestion => {
                "Answer the question. Provide an answer, reflection, and then follow up with search queries to improve the answer."
            }
            Self::ReviseAnswer => {
                if let Some(props) = properties.as_object_mut() {
                    props.insert(
                        "citations".to_string(),
                        json!({
                            "type": "array",
                            "items": { "type": "string" },
                            "minItems": 1,
                            "description": "Citations motivating your updated answer."
                        }),
                    );
                }
                required.push("citations");
                "Revise your original answer to the question. Provide an answer, reflection, cite your reflection with references, and add search queries to improve the answer."
            }
        };

        ToolDefinition {
            name: self.name().to_string(),
            description: description.to_string(),
            parameters: json!({
                "type": "object",
                "properties": properties,
                "required": required
            }),
        }
    }

    /// Renders the parameter schema as compact JSON, for corrective prompts.
    #[must_use]
    pub fn schema_json(self) -> String {
        self.definition().parameters.to_string()
    }

    /// Validates the first tool call of a model message against this schema.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the message has no tool call, the
    /// call names a different schema, its arguments are not a JSON object,
    /// or any required field is missing or empty.
    pub fn validate(self, message: &Message) -> Result<StructuredAnswer, ValidationError> {
        let Some(call) = message.first_tool_call() else {
            return Err(ValidationError::root(
                self,
                format!("no tool call found; respond using the {} function", self.name()),
            ));
        };
        self.validate_call(call)
    }

    /// Validates a single tool call against this schema.
    ///
    /// # Errors
    ///
    /// See [`SchemaKind::validate`].
    pub fn validate_call(self, call: &ToolCall) -> Result<StructuredAnswer, ValidationError> {
        if call.name != self.name() {
            return Err(ValidationError::root(
                self,
                format!("expected a call to {}, got {}", self.name(), call.name),
            ));
        }
        let value: Value = serde_json::from_str(&call.arguments).map_err(|e| {
            ValidationError::root(self, format!("arguments are not valid JSON: {e}"))
        })?;
        self.validate_payload(&value)
    }

    /// Validates raw arguments against this schema.
    ///
    /// A `ReviseAnswer` payload passes as `AnswerQuestion` (extra fields are
    /// ignored), but `citations` is required to pass as `ReviseAnswer`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing every failing field.
    pub fn validate_payload(self, value: &Value) -> Result<StructuredAnswer, ValidationError> {
        let Some(obj) = value.as_object() else {
            return Err(ValidationError::root(self, "arguments must be a JSON object"));
        };

        let mut checker = FieldChecker::default();
        let record = checker.record(obj);
        let citations = match self {
            Self::AnswerQuestion => None,
            Self::ReviseAnswer => Some(checker.list(obj, "", "citations")),
        };

        if !checker.errors.is_empty() {
            return Err(ValidationError {
                schema: self,
                errors: checker.errors,
            });
        }

        Ok(match citations {
            None => StructuredAnswer::Draft(record),
            Some(citations) => StructuredAnswer::Revision(RevisedAnswerRecord { record, citations }),
        })
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Best-effort read of a possibly invalid final message.
///
/// The responder may hand back an unvalidated message after exhausting its
/// attempts. This extracts whatever fields are present, substituting empty
/// text for the rest and reporting them in the returned error list.
///
/// # Errors
///
/// Returns [`AgentError::ResponseParse`] when the message carries no tool
/// call or its arguments are not a JSON object.
pub fn salvage_record(message: &Message) -> Result<(AnswerRecord, Vec<FieldError>), AgentError> {
    let call = message
        .first_tool_call()
        .ok_or_else(|| AgentError::ResponseParse {
            message: "final message carries no structured answer".to_string(),
            content: message.content.clone(),
        })?;

    let value: Value =
        serde_json::from_str(&call.arguments).map_err(|e| AgentError::ResponseParse {
            message: format!("structured answer is not valid JSON: {e}"),
            content: call.arguments.clone(),
        })?;
    let obj = value.as_object().ok_or_else(|| AgentError::ResponseParse {
        message: "structured answer is not a JSON object".to_string(),
        content: call.arguments.clone(),
    })?;

    let mut checker = FieldChecker::default();
    let record = checker.record(obj);
    Ok((record, checker.errors))
}

/// Reflection field names, in declaration order.
const REFLECTION_FIELDS: [&str; 7] = [
    "missing",
    "superfluous",
    "not_novel",
    "short_name",
    "novelty_score",
    "references",
    "flag",
];

/// A single failing field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted path of the field (empty for the payload itself).
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

/// Structured output failed to bind to the expected schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Schema the output was checked against.
    pub schema: SchemaKind,
    /// Every failing field.
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    fn root(schema: SchemaKind, message: impl Into<String>) -> Self {
        Self {
            schema,
            errors: vec![FieldError {
                field: String::new(),
                message: message.into(),
            }],
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.errors.len();
        let plural = if n == 1 { "" } else { "s" };
        write!(f, "{n} validation error{plural} for {}", self.schema)?;
        for err in &self.errors {
            let field = if err.field.is_empty() {
                "__root__"
            } else {
                &err.field
            };
            write!(f, "\n{field}\n  {}", err.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Reads fields out of a JSON object, collecting errors instead of stopping
/// at the first one.
#[derive(Default)]
struct FieldChecker {
    errors: Vec<FieldError>,
}

impl FieldChecker {
    fn record(&mut self, obj: &Map<String, Value>) -> AnswerRecord {
        let answer = self.text(obj, "", "answer");
        let reflection = match obj.get("reflection") {
            Some(Value::Object(inner)) => {
                let [missing, superfluous, not_novel, short_name, novelty_score, references, flag] =
                    REFLECTION_FIELDS.map(|key| self.text(inner, "reflection.", key));
                Reflection {
                    missing,
                    superfluous,
                    not_novel,
                    short_name,
                    novelty_score,
                    references,
                    flag,
                }
            }
            Some(Value::Null) | None => {
                self.push("reflection", "field required");
                Reflection::default()
            }
            Some(_) => {
                self.push("reflection", "must be an object");
                Reflection::default()
            }
        };
        let search_queries = self.list(obj, "", "search_queries");
        AnswerRecord {
            answer,
            reflection,
            search_queries,
        }
    }

    fn text(&mut self, obj: &Map<String, Value>, prefix: &str, key: &str) -> String {
        let problem = match obj.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return s.clone(),
            Some(Value::Number(n)) => return n.to_string(),
            Some(Value::String(_)) => "must not be empty",
            Some(Value::Null) | None => "field required",
            Some(_) => "must be a string",
        };
        self.push(&format!("{prefix}{key}"), problem);
        String::new()
    }

    fn list(&mut self, obj: &Map<String, Value>, prefix: &str, key: &str) -> Vec<String> {
        let problem = match obj.get(key) {
            Some(Value::Array(items)) if items.is_empty() => "must contain at least one item",
            Some(Value::Array(items)) => {
                let strings: Vec<String> = items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .filter(|s| !s.trim().is_empty())
                    .map(String::from)
                    .collect();
                if strings.len() == items.len() {
                    return strings;
                }
                "items must be non-empty strings"
            }
            Some(Value::Null) | None => "field required",
            Some(_) => "must be a list of strings",
        };
        self.push(&format!("{prefix}{key}"), problem);
        Vec::new()
    }

    fn push(&mut self, field: &str, message: &str) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }
}
