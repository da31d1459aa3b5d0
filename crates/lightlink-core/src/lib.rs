//! Core types for lightlink
//!
//! This crate provides the fundamental types shared by the lightlink
//! coordination engine and its host boundary: EntityId, State, StateChange,
//! and the relationship model describing what the engine keeps in sync.

mod change;
mod entity_id;
mod relationship;
mod state;

pub use change::StateChange;
pub use entity_id::{EntityId, EntityIdError};
pub use relationship::{
    RelationshipDefinition, RelationshipKind, RelationshipPayload, UnknownKindError,
};
pub use state::State;

/// State value for an entity that is on
pub const STATE_ON: &str = "on";

/// State value for an entity that is off
pub const STATE_OFF: &str = "off";

/// State value for an entity the host cannot currently reach
pub const STATE_UNAVAILABLE: &str = "unavailable";

/// Attribute under which a group entity exposes its member entity ids
pub const ATTR_GROUP_MEMBERS: &str = "entity_id";

/// Brightness attribute on light states
pub const ATTR_BRIGHTNESS: &str = "brightness";

/// Color temperature (kelvin) attribute on light states
pub const ATTR_COLOR_TEMP_KELVIN: &str = "color_temp_kelvin";

/// The only light attributes forwarded when mirroring a state
pub const SYNCED_LIGHT_ATTRIBUTES: &[&str] = &[ATTR_BRIGHTNESS, ATTR_COLOR_TEMP_KELVIN];

/// Entity domains the engine issues commands against or observes
pub mod domains {
    /// Light entities
    pub const LIGHT: &str = "light";

    /// Switch entities
    pub const SWITCH: &str = "switch";

    /// Momentary event entities (e.g. wireless switch button presses)
    pub const EVENT: &str = "event";
}
