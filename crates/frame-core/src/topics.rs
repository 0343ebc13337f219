//! Names of the viewer's internal event-bus topics.
//!
//! The bridge publishes some of these (translated host commands), listens to
//! some (viewer readiness, generated shapes) and mirrors a fixed set of them
//! to the host.  The spelling matches the viewer's own event constants, so
//! the relay can use the topic name verbatim as the outbound message name.

// ── Viewer lifecycle ──────────────────────────────────────────────────────────

/// The viewer canvas finished initializing.  Payload may carry `config_id`.
pub const VIEWER_INITIALIZED: &str = "VIEWER_INITIALIZED";
pub const VIEWER_REMOVE_INTERACTION_OR_CONTROL: &str = "VIEWER_REMOVE_INTERACTION_OR_CONTROL";
pub const VIEWER_SET_SHAPE_POPUP_VISIBILITY: &str = "VIEWER_SET_SHAPE_POPUP_VISIBILITY";
pub const VIEWER_ZOOM_TO_FIT: &str = "VIEWER_ZOOM_TO_FIT";
pub const VIEWER_SELECT_SHAPES: &str = "VIEWER_SELECT_SHAPES";
pub const VIEWER_ZOOM_TO_SHAPES: &str = "VIEWER_ZOOM_TO_SHAPES";
pub const VIEWER_SET_REGIONS_VISIBILITY: &str = "VIEWER_SET_REGIONS_VISIBILITY";
pub const VIEWER_PROJECTIONS_SYNC: &str = "VIEWER_PROJECTIONS_SYNC";
pub const VIEWER_IMAGE_SETTINGS: &str = "VIEWER_IMAGE_SETTINGS";
pub const VIEWER_SET_SYNC_GROUP: &str = "VIEWER_SET_SYNC_GROUP";

// ── Image ─────────────────────────────────────────────────────────────────────

pub const IMAGE_SETTINGS_REFRESH: &str = "IMAGE_SETTINGS_REFRESH";
pub const IMAGE_CANVAS_DATA: &str = "IMAGE_CANVAS_DATA";
pub const IMAGE_INTENSITY_QUERYING: &str = "IMAGE_INTENSITY_QUERYING";
pub const IMAGE_VIEWER_CONTROLS_VISIBILITY: &str = "IMAGE_VIEWER_CONTROLS_VISIBILITY";
pub const IMAGE_VIEWER_RESIZE: &str = "IMAGE_VIEWER_RESIZE";
pub const IMAGE_VIEWER_INTERACTION: &str = "IMAGE_VIEWER_INTERACTION";
pub const IMAGE_SETTINGS_CHANGE: &str = "IMAGE_SETTINGS_CHANGE";
pub const IMAGE_DIMENSION_CHANGE: &str = "IMAGE_DIMENSION_CHANGE";
pub const IMAGE_COMMENT_CHANGE: &str = "IMAGE_COMMENT_CHANGE";
pub const IMAGE_DIMENSION_PLAY: &str = "IMAGE_DIMENSION_PLAY";
pub const IMAGE_VIEWPORT_CAPTURE: &str = "IMAGE_VIEWPORT_CAPTURE";
pub const IMAGE_VIEWPORT_LINK: &str = "IMAGE_VIEWPORT_LINK";
pub const HISTOGRAM_RANGE_UPDATE: &str = "HISTOGRAM_RANGE_UPDATE";
pub const THUMBNAILS_UPDATE: &str = "THUMBNAILS_UPDATE";
pub const SAVE_ACTIVE_IMAGE_SETTINGS: &str = "SAVE_ACTIVE_IMAGE_SETTINGS";

// ── Regions (shapes) ──────────────────────────────────────────────────────────

pub const REGIONS_REQUEST_DATA: &str = "REGIONS_REQUEST_DATA";
/// The region list for the current image has been fetched.
pub const REGIONS_INFORMATION_RETRIEVED: &str = "REGIONS_INFORMATION_RETRIEVED";
pub const REGIONS_SET_PROPERTY: &str = "REGIONS_SET_PROPERTY";
pub const REGIONS_PROPERTY_CHANGED: &str = "REGIONS_PROPERTY_CHANGED";
pub const REGIONS_DRAW_SHAPE: &str = "REGIONS_DRAW_SHAPE";
/// A drawing interaction produced a shape.  Payload echoes `hist_id`.
pub const REGIONS_SHAPE_GENERATED: &str = "REGIONS_SHAPE_GENERATED";
pub const REGIONS_CHANGE_MODES: &str = "REGIONS_CHANGE_MODES";
pub const REGIONS_SHOW_COMMENTS: &str = "REGIONS_SHOW_COMMENTS";
pub const ENABLE_SHAPE_POPUP: &str = "ENABLE_SHAPE_POPUP";
pub const REGIONS_GENERATE_SHAPES: &str = "REGIONS_GENERATE_SHAPES";
pub const REGIONS_STORE_SHAPES: &str = "REGIONS_STORE_SHAPES";
pub const REGIONS_STORED_SHAPES: &str = "REGIONS_STORED_SHAPES";
pub const REGIONS_MODIFY_SHAPES: &str = "REGIONS_MODIFY_SHAPES";
pub const REGIONS_HISTORY_ENTRY: &str = "REGIONS_HISTORY_ENTRY";
pub const REGIONS_HISTORY_ACTION: &str = "REGIONS_HISTORY_ACTION";
pub const REGIONS_COPY_SHAPES: &str = "REGIONS_COPY_SHAPES";

// ── UI chrome ─────────────────────────────────────────────────────────────────

pub const UI_MODIFY: &str = "UI_MODIFY";

// ── Topic sets ────────────────────────────────────────────────────────────────

/// Topics mirrored to the host once it has identified itself.
pub const RELAY_TOPICS: &[&str] = &[
    IMAGE_SETTINGS_REFRESH,
    IMAGE_CANVAS_DATA,
    IMAGE_INTENSITY_QUERYING,
    IMAGE_VIEWER_CONTROLS_VISIBILITY,
    IMAGE_VIEWER_RESIZE,
    IMAGE_VIEWER_INTERACTION,
    IMAGE_SETTINGS_CHANGE,
    VIEWER_PROJECTIONS_SYNC,
    IMAGE_DIMENSION_CHANGE,
    IMAGE_COMMENT_CHANGE,
    IMAGE_DIMENSION_PLAY,
    IMAGE_VIEWPORT_CAPTURE,
    IMAGE_VIEWPORT_LINK,
    REGIONS_SET_PROPERTY,
    REGIONS_PROPERTY_CHANGED,
    REGIONS_DRAW_SHAPE,
    REGIONS_SHAPE_GENERATED,
    REGIONS_CHANGE_MODES,
    REGIONS_SHOW_COMMENTS,
    ENABLE_SHAPE_POPUP,
    REGIONS_GENERATE_SHAPES,
    REGIONS_STORE_SHAPES,
    REGIONS_STORED_SHAPES,
    REGIONS_MODIFY_SHAPES,
    VIEWER_IMAGE_SETTINGS,
    VIEWER_SET_SYNC_GROUP,
    REGIONS_HISTORY_ENTRY,
    REGIONS_HISTORY_ACTION,
    REGIONS_COPY_SHAPES,
    HISTOGRAM_RANGE_UPDATE,
    THUMBNAILS_UPDATE,
    SAVE_ACTIVE_IMAGE_SETTINGS,
];

/// Topics the bridge publishes for the viewer to act on.
///
/// A process hosting the bridge out of the viewer's address space forwards
/// exactly these to the viewer.
pub const VIEWER_COMMAND_TOPICS: &[&str] = &[
    REGIONS_REQUEST_DATA,
    REGIONS_DRAW_SHAPE,
    REGIONS_STORE_SHAPES,
    REGIONS_MODIFY_SHAPES,
    REGIONS_CHANGE_MODES,
    REGIONS_SHOW_COMMENTS,
    VIEWER_ZOOM_TO_FIT,
    VIEWER_SELECT_SHAPES,
    VIEWER_ZOOM_TO_SHAPES,
    VIEWER_SET_REGIONS_VISIBILITY,
    VIEWER_REMOVE_INTERACTION_OR_CONTROL,
    VIEWER_SET_SHAPE_POPUP_VISIBILITY,
    UI_MODIFY,
];

/// Topics whose last publication describes the viewer's current state.
///
/// A bus keeps the latest payload on each of these and hands it to anyone
/// who subscribes later, so a bridge attached after the viewer came up still
/// learns that it is ready.
pub const RETAINED_TOPICS: &[&str] = &[VIEWER_INITIALIZED];
