//! Host commands: routing table, parsing and payload validation.
//!
//! Commands arrive as `"action"` envelopes.  Early hosts sent three of them
//! as `"event"` envelopes under different names; [`route`] folds those into
//! their canonical action before anything else looks at them, so the rest of
//! the bridge has a single code path per command.
//!
//! # Deprecated names
//!
//! | legacy (type, name)  | canonical action  |
//! |----------------------|-------------------|
//! | (event, prepare)     | `prepare`         |
//! | (event, newPoint)    | `add_annotation`  |
//! | (event, savePoint)   | `save_annotation` |

use serde_json::Value;
use thiserror::Error;

use frame_core::protocol::MessageKind;

/// Legacy `(type, name)` pairs and the action each one stands for.
pub const DEPRECATED_NAMES: &[(MessageKind, &str, &str)] = &[
    (MessageKind::Event, "prepare", "prepare"),
    (MessageKind::Event, "newPoint", "add_annotation"),
    (MessageKind::Event, "savePoint", "save_annotation"),
];

/// Where an authenticated envelope should go, decided from `(type, name)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    /// A canonical action name.  May still be unknown to [`Command::parse`].
    Action(&'a str),
    /// A legacy name that maps onto a canonical action.
    Deprecated {
        legacy: &'a str,
        canonical: &'static str,
    },
    /// Not a command: an event without a legacy mapping, or an unknown type.
    Ignored,
}

/// Applies the deprecation table to `(kind, name)`.
pub fn route(kind: MessageKind, name: &str) -> Route<'_> {
    if let Some(&(_, legacy, canonical)) = DEPRECATED_NAMES
        .iter()
        .find(|(k, legacy, _)| *k == kind && *legacy == name)
    {
        return Route::Deprecated { legacy, canonical };
    }
    match kind {
        MessageKind::Action => Route::Action(name),
        MessageKind::Event | MessageKind::Unknown => Route::Ignored,
    }
}

/// A command payload failed validation.  The command is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("{command}: missing required field `{field}`")]
    MissingField {
        command: &'static str,
        field: &'static str,
    },

    #[error("{command}: `{field}` must not be empty")]
    EmptyField {
        command: &'static str,
        field: &'static str,
    },

    #[error("{command}: `{field}` is invalid: {reason}")]
    InvalidField {
        command: &'static str,
        field: &'static str,
        reason: String,
    },
}

/// Arguments of `add_annotation`, before defaults are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationRequest {
    pub shape_type: Option<String>,
    pub shape_color: Option<i64>,
    pub comment: Option<String>,
}

/// A validated host command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Ask the viewer to (re)load region data for the current image.
    Prepare,
    ZoomToFit,
    AddAnnotation(AnnotationRequest),
    CancelAnnotation,
    SaveAnnotation,
    DeselectAnnotation { id: String },
    ZoomToAnnotation { id: String },
    ZoomToAnnotations { ids: Vec<String> },
    PanToAnnotation { id: String },
    HideAnnotations { ids: Vec<String> },
    ShowAnnotations { ids: Vec<String> },
    HideAllAnnotations,
    ShowAllAnnotations,
    SetHeaderActions { visible: bool },
    SetNavbar { visible: bool },
    SetInteraction { enabled: bool },
    SetComments { enabled: bool },
}

impl Command {
    /// Parses the canonical action `name` with its `payload`.
    ///
    /// Returns `Ok(None)` for names this bridge does not know, so newer hosts
    /// can send commands older viewers simply ignore.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] when a known command's payload is missing a
    /// required field or a field is empty or of the wrong type.
    pub fn parse(name: &str, payload: Option<&Value>) -> Result<Option<Self>, CommandError> {
        let cmd = match name {
            "prepare" => Command::Prepare,
            "zoom_to_fit" => Command::ZoomToFit,
            "add_annotation" => Command::AddAnnotation(parse_annotation(payload)?),
            "cancel_annotation" => Command::CancelAnnotation,
            "save_annotation" => Command::SaveAnnotation,
            "deselect_annotation" => Command::DeselectAnnotation {
                id: required_id("deselect_annotation", payload)?,
            },
            "zoom_to_annotation" => Command::ZoomToAnnotation {
                id: required_id("zoom_to_annotation", payload)?,
            },
            "zoom_to_annotations" => Command::ZoomToAnnotations {
                ids: required_ids("zoom_to_annotations", payload)?,
            },
            "pan_to_annotation" => Command::PanToAnnotation {
                id: required_id("pan_to_annotation", payload)?,
            },
            "hide_annotations" => Command::HideAnnotations {
                ids: required_ids("hide_annotations", payload)?,
            },
            "show_annotations" => Command::ShowAnnotations {
                ids: required_ids("show_annotations", payload)?,
            },
            "hide_all_annotations" => Command::HideAllAnnotations,
            "show_all_annotations" => Command::ShowAllAnnotations,
            "show_header_actions" => Command::SetHeaderActions { visible: true },
            "hide_header_actions" => Command::SetHeaderActions { visible: false },
            "show_navbar" => Command::SetNavbar { visible: true },
            "hide_navbar" => Command::SetNavbar { visible: false },
            "enable_interaction" => Command::SetInteraction { enabled: true },
            "disable_interaction" => Command::SetInteraction { enabled: false },
            "enable_comments" => Command::SetComments { enabled: true },
            "disable_comments" => Command::SetComments { enabled: false },
            _ => return Ok(None),
        };
        Ok(Some(cmd))
    }

    /// Short name for log lines; never includes payload values.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Prepare => "prepare",
            Command::ZoomToFit => "zoom_to_fit",
            Command::AddAnnotation(_) => "add_annotation",
            Command::CancelAnnotation => "cancel_annotation",
            Command::SaveAnnotation => "save_annotation",
            Command::DeselectAnnotation { .. } => "deselect_annotation",
            Command::ZoomToAnnotation { .. } => "zoom_to_annotation",
            Command::ZoomToAnnotations { .. } => "zoom_to_annotations",
            Command::PanToAnnotation { .. } => "pan_to_annotation",
            Command::HideAnnotations { .. } => "hide_annotations",
            Command::ShowAnnotations { .. } => "show_annotations",
            Command::HideAllAnnotations => "hide_all_annotations",
            Command::ShowAllAnnotations => "show_all_annotations",
            Command::SetHeaderActions { visible: true } => "show_header_actions",
            Command::SetHeaderActions { visible: false } => "hide_header_actions",
            Command::SetNavbar { visible: true } => "show_navbar",
            Command::SetNavbar { visible: false } => "hide_navbar",
            Command::SetInteraction { enabled: true } => "enable_interaction",
            Command::SetInteraction { enabled: false } => "disable_interaction",
            Command::SetComments { enabled: true } => "enable_comments",
            Command::SetComments { enabled: false } => "disable_comments",
        }
    }
}

// ── Payload helpers ───────────────────────────────────────────────────────────

fn field<'a>(payload: Option<&'a Value>, name: &str) -> Option<&'a Value> {
    payload
        .and_then(|p| p.get(name))
        .filter(|v| !v.is_null())
}

/// Shape ids are `"roi:shape"` strings; bare numbers are accepted too.
fn id_value(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn required_id(command: &'static str, payload: Option<&Value>) -> Result<String, CommandError> {
    const FIELD: &str = "annotationId";
    let raw = field(payload, FIELD).ok_or(CommandError::MissingField { command, field: FIELD })?;
    let id = id_value(raw).ok_or_else(|| CommandError::InvalidField {
        command,
        field: FIELD,
        reason: "expected a string or number".to_string(),
    })?;
    if id.is_empty() {
        return Err(CommandError::EmptyField { command, field: FIELD });
    }
    Ok(id)
}

fn required_ids(
    command: &'static str,
    payload: Option<&Value>,
) -> Result<Vec<String>, CommandError> {
    const FIELD: &str = "annotationIds";
    let raw = field(payload, FIELD).ok_or(CommandError::MissingField { command, field: FIELD })?;
    let items = raw.as_array().ok_or_else(|| CommandError::InvalidField {
        command,
        field: FIELD,
        reason: "expected an array".to_string(),
    })?;
    if items.is_empty() {
        return Err(CommandError::EmptyField { command, field: FIELD });
    }
    items
        .iter()
        .map(|item| match id_value(item) {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(CommandError::InvalidField {
                command,
                field: FIELD,
                reason: format!("bad identifier {item}"),
            }),
        })
        .collect()
}

/// Empty strings count as absent, as older hosts send `""` for "default".
fn optional_string(payload: Option<&Value>, name: &str) -> Option<String> {
    field(payload, name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_annotation(payload: Option<&Value>) -> Result<AnnotationRequest, CommandError> {
    const COMMAND: &str = "add_annotation";
    let shape_color = match field(payload, "shapeColor") {
        None => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s.trim().parse::<i64>().map_err(|_| {
            CommandError::InvalidField {
                command: COMMAND,
                field: "shapeColor",
                reason: format!("`{s}` is not an integer colour"),
            }
        })?),
        Some(Value::Number(n)) => Some(n.as_i64().ok_or_else(|| CommandError::InvalidField {
            command: COMMAND,
            field: "shapeColor",
            reason: format!("{n} is not an integer colour"),
        })?),
        Some(other) => {
            return Err(CommandError::InvalidField {
                command: COMMAND,
                field: "shapeColor",
                reason: format!("unexpected value {other}"),
            })
        }
    };

    Ok(AnnotationRequest {
        shape_type: optional_string(payload, "shapeType"),
        shape_color,
        comment: optional_string(payload, "shapeComment"),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
