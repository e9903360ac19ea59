//! Universal media player config rendering.
//!
//! Each zone gets one `platform: universal` list item that stitches the zone's
//! MQTT entities into a single Home Assistant media player. The rendered text
//! is meant to be included under a `media_player:` key, so every line carries
//! the two-space list indentation.
//!
//! The block refers to entities by id. The ids it needs are declared in
//! [`MEDIA_PLAYER_BINDINGS`] and checked against the entity catalog at startup
//! (see [`crate::catalog::EntityCatalog::validate`]).

use crate::catalog::EntityKind;

/// An entity the media player config refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityBinding {
    /// Platform of the referenced entity.
    pub kind: EntityKind,
    /// Entity template id; the referenced entity is `{kind}.{device_id}_{id}`.
    pub id: &'static str,
}

impl EntityBinding {
    const fn new(kind: EntityKind, id: &'static str) -> Self {
        Self { kind, id }
    }

    /// Full entity id of this binding for a device, e.g. `switch.avr_main_zone_power`.
    pub fn entity_id(&self, device_id: &str) -> String {
        format!("{}.{}_{}", self.kind, device_id, self.id)
    }
}

pub const POWER: EntityBinding = EntityBinding::new(EntityKind::Switch, "power");
pub const MUTE: EntityBinding = EntityBinding::new(EntityKind::Switch, "mute");
pub const VOLUME_UP: EntityBinding = EntityBinding::new(EntityKind::Button, "volume_up");
pub const VOLUME_DOWN: EntityBinding = EntityBinding::new(EntityKind::Button, "volume_down");
pub const MUTE_TOGGLE: EntityBinding = EntityBinding::new(EntityKind::Button, "mute_toggle");
pub const VOLUME_PERCENT: EntityBinding = EntityBinding::new(EntityKind::Sensor, "volume_percent");
pub const VOLUME: EntityBinding = EntityBinding::new(EntityKind::Fan, "volume");
pub const SOURCE: EntityBinding = EntityBinding::new(EntityKind::Select, "source");

/// Every entity referenced by [`MediaPlayerBlock::render`].
pub const MEDIA_PLAYER_BINDINGS: &[EntityBinding] = &[
    POWER,
    MUTE,
    VOLUME_UP,
    VOLUME_DOWN,
    MUTE_TOGGLE,
    VOLUME_PERCENT,
    VOLUME,
    SOURCE,
];

/// One zone's media player config entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPlayerBlock {
    /// Display name prefix; the player is named `{name} Audio`.
    pub name: String,
    /// `{receiver_id}_{zone_id}`, the prefix of every referenced entity.
    pub device_id: String,
    /// Zone the block was rendered for.
    pub zone_id: String,
}

impl MediaPlayerBlock {
    pub fn new(
        name: impl Into<String>,
        device_id: impl Into<String>,
        zone_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            device_id: device_id.into(),
            zone_id: zone_id.into(),
        }
    }

    /// Renders the YAML list item, including the trailing newline.
    pub fn render(&self) -> String {
        let id = &self.device_id;
        format!(
            r#"  - platform: universal
    name: {name} Audio
    default_entity_id: media_player.{id}_media_player
    unique_id: {id}_media_player
    commands:
      turn_on:
        action: switch.turn_on
        target:
          entity_id: {power}
      turn_off:
        action: switch.turn_off
        target:
          entity_id: {power}
      volume_up:
        action: button.press
        target:
          entity_id: {volume_up}
      volume_down:
        action: button.press
        target:
          entity_id: {volume_down}
      volume_mute:
        action: button.press
        target:
          entity_id: {mute_toggle}
      volume_set:
        action: fan.set_percentage
        target:
          entity_id: {volume}
        data:
          percentage: "{{{{ (volume_level | float)*100 }}}}"

    attributes:
      state: {power}
      is_volume_muted: {mute}
      volume_level: {volume_percent}
      source_list: {source}|options
      source: state.{source}.state
"#,
            name = self.name,
            id = id,
            power = POWER.entity_id(id),
            mute = MUTE.entity_id(id),
            volume_up = VOLUME_UP.entity_id(id),
            volume_down = VOLUME_DOWN.entity_id(id),
            mute_toggle = MUTE_TOGGLE.entity_id(id),
            volume = VOLUME.entity_id(id),
            volume_percent = VOLUME_PERCENT.entity_id(id),
            source = SOURCE.entity_id(id),
        )
    }
}

/// Renders a media player block. Shorthand for [`MediaPlayerBlock::render`].
pub fn render(name: &str, device_id: &str, zone_id: &str) -> String {
    MediaPlayerBlock::new(name, device_id, zone_id).render()
}
