//! Command dispatcher: turns a validated [`Command`] into bus publications.
//!
//! Nothing here touches the bus.  [`Dispatcher::plan`] returns a [`Plan`]
//! describing what to publish and which bookkeeping the controller has to do
//! (await a generated shape, discard pending draws); the controller carries
//! it out against the real bus.  The only state is the correlation ids,
//! which every session on one viewer draws from the same [`DrawIds`].

use std::sync::Arc;

use serde_json::{json, Value};

use frame_core::protocol::CorrelationCounter;
use frame_core::topics;

use crate::domain::{AnnotationRequest, BridgeConfig, ChromeChange, Command};

/// Fill colour of shapes drawn on behalf of the host (transparent yellow).
pub const SHAPE_FILL_COLOR: i64 = -256;

/// Stroke width of shapes drawn on behalf of the host, in pixels.
pub const SHAPE_STROKE_WIDTH_PX: u32 = 2;

/// Shape-edit modes: select only, or select plus move and reshape.
const MODES_LOCKED: &[&str] = &["Select"];
const MODES_EDITABLE: &[&str] = &["Select", "Translate", "Modify"];

/// One message for the bus.
#[derive(Debug, Clone, PartialEq)]
pub struct Publication {
    pub topic: &'static str,
    pub payload: Value,
}

impl Publication {
    pub fn new(topic: &'static str, payload: Value) -> Self {
        Self { topic, payload }
    }
}

/// A draw request waiting for the viewer to report the generated shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDraw {
    pub hist_id: u64,
    pub comment: Option<String>,
}

/// Everything one command asks of the controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    pub publications: Vec<Publication>,
    /// Set by `add_annotation`: subscribe for the shape this draw produces.
    pub await_shape: Option<PendingDraw>,
    /// Set by `add_annotation` and `cancel_annotation`: forget every pending
    /// draw before anything else happens.  The viewer has a single draw mode,
    /// so a new request supersedes the previous one.
    pub discard_pending: bool,
}

impl Plan {
    fn publish(topic: &'static str, payload: Value) -> Self {
        Self {
            publications: vec![Publication::new(topic, payload)],
            ..Self::default()
        }
    }
}

/// Correlation ids for draw requests.
///
/// The viewer announces every generated shape to all bus participants, so
/// every bridge attached to one viewer must draw its ids from the same
/// `DrawIds`.
#[derive(Debug)]
pub struct DrawIds {
    hist: CorrelationCounter,
    new_region: CorrelationCounter,
}

impl DrawIds {
    pub fn new() -> Self {
        Self {
            hist: CorrelationCounter::starting_at(1),
            new_region: CorrelationCounter::starting_at(1),
        }
    }

    /// `(hist_id, roi_id)` for the next draw request.  Provisional region ids
    /// count downwards from -1.
    pub fn next(&self) -> (u64, i64) {
        (self.hist.next(), -(self.new_region.next() as i64))
    }
}

impl Default for DrawIds {
    fn default() -> Self {
        Self::new()
    }
}

/// Stateless apart from the shared [`DrawIds`].
#[derive(Debug)]
pub struct Dispatcher {
    ids: Arc<DrawIds>,
    default_shape_type: String,
    default_shape_color: i64,
}

impl Dispatcher {
    pub fn new(config: &BridgeConfig, ids: Arc<DrawIds>) -> Self {
        Self {
            ids,
            default_shape_type: config.default_shape_type.clone(),
            default_shape_color: config.default_shape_color,
        }
    }

    /// Translates `command` for the image identified by `config_id`.
    pub fn plan(&self, command: Command, config_id: i64) -> Plan {
        match command {
            Command::Prepare => {
                Plan::publish(topics::REGIONS_REQUEST_DATA, json!({ "config_id": config_id }))
            }
            Command::ZoomToFit => {
                Plan::publish(topics::VIEWER_ZOOM_TO_FIT, json!({ "config_id": config_id }))
            }
            Command::AddAnnotation(request) => self.plan_draw(request, config_id),
            Command::CancelAnnotation => Plan {
                discard_pending: true,
                ..Plan::publish(topics::REGIONS_DRAW_SHAPE, abort_payload(config_id))
            },
            Command::SaveAnnotation => {
                Plan::publish(topics::REGIONS_STORE_SHAPES, json!({ "config_id": config_id }))
            }
            Command::DeselectAnnotation { id } => select_shape(&id, false, false, false),
            Command::ZoomToAnnotation { id } => select_shape(&id, true, true, true),
            Command::PanToAnnotation { id } => select_shape(&id, true, true, false),
            Command::ZoomToAnnotations { ids } => {
                Plan::publish(topics::VIEWER_ZOOM_TO_SHAPES, json!({ "args": [ids] }))
            }
            Command::HideAnnotations { ids } => Plan::publish(
                topics::VIEWER_SET_REGIONS_VISIBILITY,
                json!({ "args": [false, ids] }),
            ),
            Command::ShowAnnotations { ids } => Plan::publish(
                topics::VIEWER_SET_REGIONS_VISIBILITY,
                json!({ "args": [true, ids] }),
            ),
            Command::HideAllAnnotations => {
                Plan::publish(topics::VIEWER_SET_REGIONS_VISIBILITY, json!({ "args": [false] }))
            }
            Command::ShowAllAnnotations => {
                Plan::publish(topics::VIEWER_SET_REGIONS_VISIBILITY, json!({ "args": [true] }))
            }
            Command::SetHeaderActions { visible } => {
                Plan::publish(topics::UI_MODIFY, ui_modify("header_actions", show_hide(visible)))
            }
            Command::SetNavbar { visible } => {
                Plan::publish(topics::UI_MODIFY, ui_modify("header", show_hide(visible)))
            }
            Command::SetInteraction { enabled } => {
                let modes = if enabled { MODES_EDITABLE } else { MODES_LOCKED };
                Plan::publish(
                    topics::REGIONS_CHANGE_MODES,
                    json!({ "config_id": config_id, "modes": modes }),
                )
            }
            Command::SetComments { enabled } => Plan::publish(
                topics::REGIONS_SHOW_COMMENTS,
                json!({ "config_id": config_id, "shape_comments": enabled }),
            ),
        }
    }

    fn plan_draw(&self, request: AnnotationRequest, config_id: i64) -> Plan {
        let (hist_id, roi_id) = self.ids.next();
        let shape_type = request
            .shape_type
            .unwrap_or_else(|| self.default_shape_type.clone());
        let shape_color = request.shape_color.unwrap_or(self.default_shape_color);

        let payload = json!({
            "config_id": config_id,
            "abort": false,
            "hist_id": hist_id,
            "roi_id": roi_id,
            "shape": {
                "type": shape_type,
                "StrokeColor": shape_color,
                "FillColor": SHAPE_FILL_COLOR,
                "StrokeWidth": {
                    "@type": "TBD#LengthI",
                    "Unit": "PIXEL",
                    "Symbol": "pixel",
                    "Value": SHAPE_STROKE_WIDTH_PX,
                },
            },
        });

        Plan {
            publications: vec![Publication::new(topics::REGIONS_DRAW_SHAPE, payload)],
            await_shape: Some(PendingDraw {
                hist_id,
                comment: request.comment,
            }),
            discard_pending: true,
        }
    }
}

// ── Completion and follow-up publications ─────────────────────────────────────

/// Publications of the connection completion step, in order.
pub fn completion_publications(layout: &[ChromeChange]) -> Vec<Publication> {
    let mut out: Vec<Publication> = layout
        .iter()
        .map(|c| Publication::new(topics::UI_MODIFY, ui_modify(&c.subject, &c.action)))
        .collect();
    out.push(Publication::new(
        topics::VIEWER_REMOVE_INTERACTION_OR_CONTROL,
        json!({ "args": ["fullscreen"] }),
    ));
    out.push(Publication::new(
        topics::VIEWER_SET_SHAPE_POPUP_VISIBILITY,
        Value::Bool(false),
    ));
    out
}

/// Leaves draw mode.
pub fn abort_draw(config_id: i64) -> Publication {
    Publication::new(topics::REGIONS_DRAW_SHAPE, abort_payload(config_id))
}

/// Sets the comment text of freshly generated shapes.
pub fn attach_comment(config_id: i64, shape_ids: Vec<Value>, comment: &str) -> Publication {
    Publication::new(
        topics::REGIONS_MODIFY_SHAPES,
        json!({
            "config_id": config_id,
            "shapes": shape_ids,
            "definition": { "Text": comment },
        }),
    )
}

/// The `hist_id` a `REGIONS_SHAPE_GENERATED` payload echoes, if any.
pub fn generated_hist_id(payload: &Value) -> Option<u64> {
    match payload.get("hist_id")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Shape ids listed under `shapes` in a regions payload.
///
/// Entries are either bare ids or shape objects carrying `shape_id`.
pub fn shape_ids(payload: &Value) -> Vec<Value> {
    payload
        .get("shapes")
        .and_then(Value::as_array)
        .map(|shapes| {
            shapes
                .iter()
                .filter_map(|s| match s {
                    Value::String(_) | Value::Number(_) => Some(s.clone()),
                    Value::Object(o) => o.get("shape_id").cloned(),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

fn abort_payload(config_id: i64) -> Value {
    json!({ "config_id": config_id, "abort": true })
}

fn ui_modify(subject: &str, action: &str) -> Value {
    json!({ "subject": subject, "action": action })
}

fn show_hide(visible: bool) -> &'static str {
    if visible {
        "show"
    } else {
        "hide"
    }
}

/// `VIEWER_SELECT_SHAPES` arguments: ids, selected, clear, pan target,
/// zoom, center.
fn select_shape(id: &str, selected: bool, pan: bool, zoom: bool) -> Plan {
    let pan_to = if pan { Value::from(id) } else { Value::Null };
    Plan::publish(
        topics::VIEWER_SELECT_SHAPES,
        json!({ "args": [[id], selected, selected, pan_to, zoom, selected] }),
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
