//! Home Assistant device discovery payloads.
//!
//! One payload is built per zone. It describes the zone as a device and lists
//! every catalog entity as a component under `cmps`, keyed by the composite id
//! `{receiver_id}_{zone_id}_{template_id}`.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::catalog::{EntityCatalog, EntityKind, EntityTemplate};
use crate::media_player::MUTE;
use crate::model::{self, Receiver, Zone};

/// Origin name advertised in every payload.
pub const ORIGIN_NAME: &str = "denon-mqtt-ha";

/// Availability template: main-zone power, or the entity's current state when absent.
pub const AVAILABILITY_TEMPLATE: &str =
    "{{ value_json.state.main_power if value_json.state.main_power is defined else this.state }}";

/// Payload that marks the device available.
pub const PAYLOAD_AVAILABLE: &str = "ON";

/// Template id of the mute toggle button.
pub const MUTE_TOGGLE_ID: &str = "mute_toggle";

/// Template id of the refresh button.
pub const REFRESH_ID: &str = "refresh";

/// Press payload of the refresh button.
pub const REFRESH_PAYLOAD: &str = "REFRESH";

// ─────────────────────────────────────────────────────────────────────────────
// Zone Context
// ─────────────────────────────────────────────────────────────────────────────

/// Everything derived from one (receiver, zone) pair that payload assembly needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneContext {
    pub receiver_id: String,
    pub zone_id: String,
    /// `{receiver_id}_{zone_id}`.
    pub device_id: String,
    /// `{receiver_name} {zone_name}`.
    pub device_name: String,
    /// Prefix of every entity name: the zone name with short names, else the device name.
    pub comp_name: String,
    pub state_topic: String,
    pub command_topic: String,
    /// Main-zone state topic, shared by all zones of a receiver.
    pub availability_topic: String,
    /// Source codes selectable in the zone.
    pub sources: Vec<String>,
}

impl ZoneContext {
    pub fn new(receiver: &Receiver, zone: &Zone, mqtt_prefix: &str, short_names: bool) -> Self {
        let zone_id = zone.zone_id();
        let device_id = format!("{}_{}", receiver.id, zone_id);
        let device_name = format!("{} {}", receiver.name, zone.name);
        let comp_name = if short_names {
            zone.name.clone()
        } else {
            device_name.clone()
        };

        Self {
            state_topic: model::state_topic(mqtt_prefix, &receiver.id, &zone_id),
            command_topic: model::command_topic(mqtt_prefix, &receiver.id, &zone_id),
            availability_topic: model::availability_topic(mqtt_prefix, &receiver.id),
            receiver_id: receiver.id.clone(),
            zone_id,
            device_id,
            device_name,
            comp_name,
            sources: zone.sources.clone(),
        }
    }

    /// Composite entity id for a template: `{receiver_id}_{zone_id}_{template_id}`.
    pub fn entity_id(&self, template_id: &str) -> String {
        format!("{}_{}", self.device_id, template_id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Payload
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub ids: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OriginInfo {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Availability {
    pub topic: String,
    pub value_template: String,
    pub payload_available: String,
}

/// Device discovery payload for one zone.
///
/// Field order matches the wire format: `dev`, `o`, `availability`, `cmps`,
/// `state_topic`, `command_topic`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryPayload {
    pub dev: DeviceInfo,
    pub o: OriginInfo,
    pub availability: Availability,
    /// Components keyed by composite entity id, in catalog order.
    pub cmps: Map<String, Value>,
    pub state_topic: String,
    pub command_topic: String,
}

impl DiscoveryPayload {
    /// Builds the payload for a zone from the full catalog.
    pub fn build(ctx: &ZoneContext, catalog: &EntityCatalog) -> Self {
        let mut cmps = Map::new();
        for (kind, template) in catalog.iter() {
            let (id, fields) = derive_entity(kind, template, ctx);
            cmps.insert(id, Value::Object(fields));
        }

        Self {
            dev: DeviceInfo {
                ids: ctx.device_id.clone(),
                name: ctx.device_name.clone(),
            },
            o: OriginInfo {
                name: ORIGIN_NAME.to_string(),
            },
            availability: Availability {
                topic: ctx.availability_topic.clone(),
                value_template: AVAILABILITY_TEMPLATE.to_string(),
                payload_available: PAYLOAD_AVAILABLE.to_string(),
            },
            cmps,
            state_topic: ctx.state_topic.clone(),
            command_topic: ctx.command_topic.clone(),
        }
    }

    /// Serializes the payload as compact JSON text.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Entity Derivation
// ─────────────────────────────────────────────────────────────────────────────

/// Produces the composite id and final field set of one entity for a zone.
///
/// Works on a copy of the template fields. Kind-specific fields are added
/// first, then the common fields (`name`, `p`, `unique_id`,
/// `default_entity_id`) overwrite anything the template defined under those keys.
pub fn derive_entity(
    kind: EntityKind,
    template: &EntityTemplate,
    ctx: &ZoneContext,
) -> (String, Map<String, Value>) {
    let id = ctx.entity_id(&template.id);
    let mut fields = template.entity.clone();

    match kind {
        EntityKind::Fan => {
            fields.insert(
                "percentage_command_topic".into(),
                Value::String(ctx.command_topic.clone()),
            );
            fields.insert(
                "percentage_state_topic".into(),
                Value::String(ctx.state_topic.clone()),
            );
        }
        EntityKind::Select => {
            fields.insert(
                "options".into(),
                Value::Array(ctx.sources.iter().cloned().map(Value::String).collect()),
            );
        }
        _ => {}
    }

    match template.id.as_str() {
        MUTE_TOGGLE_ID => {
            fields.insert(
                "command_template".into(),
                Value::String(mute_toggle_template(ctx)),
            );
        }
        REFRESH_ID => {
            fields.insert(
                "press_payload".into(),
                Value::String(REFRESH_PAYLOAD.to_string()),
            );
        }
        _ => {}
    }

    fields.insert(
        "name".into(),
        Value::String(format!("{} {}", ctx.comp_name, template.name)),
    );
    fields.insert("p".into(), Value::String(kind.as_str().to_string()));
    fields.insert("unique_id".into(), Value::String(id.clone()));
    fields.insert(
        "default_entity_id".into(),
        Value::String(format!("{}.{}", kind, id)),
    );

    (id, fields)
}

/// Command template that flips mute based on the zone's mute switch state.
fn mute_toggle_template(ctx: &ZoneContext) -> String {
    format!(
        r#"{{ "mute": {{ "text": {{% if is_state('{}', 'off') %}}"ON"{{% else %}}"OFF"{{% endif %}} }} }}"#,
        MUTE.entity_id(&ctx.device_id)
    )
}
