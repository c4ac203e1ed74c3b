//! Toolbox descriptors and the synthesizer that builds them from editor state.

use serde::Serialize;
use thiserror::Error;

use super::extension::{extended_opcode, CategoryInfo, ExtensionRegistration};
use super::model::{ConnectedDevice, DeviceDescriptor, EditTarget, ProgramMode};

pub const MY_BLOCKS_CATEGORY: &str = "myBlocks";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolboxField {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolboxItem {
    Block {
        opcode: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        fields: Vec<ToolboxField>,
    },
    Separator,
    Button {
        text: String,
        callback_key: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolboxCategory {
    pub id: String,
    pub name: String,
    pub colour: String,
    pub secondary_colour: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<String>,
    pub items: Vec<ToolboxItem>,
}

/// One synthesized toolbox snapshot.
///
/// `revision` changes whenever the palette must be redrawn, including redraws
/// forced for structurally identical content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolboxDescriptor {
    pub revision: u64,
    pub target_id: String,
    pub is_stage: bool,
    pub mode: ProgramMode,
    pub categories: Vec<ToolboxCategory>,
}

impl ToolboxDescriptor {
    pub fn same_content(&self, other: &ToolboxDescriptor) -> bool {
        self.target_id == other.target_id
            && self.is_stage == other.is_stage
            && self.mode == other.mode
            && self.categories == other.categories
    }

    pub fn category(&self, id: &str) -> Option<&ToolboxCategory> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn category_ids(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.id.as_str())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SynthesisError {
    #[error("runtime has no stage target")]
    MissingStage,
    #[error("device {0} is not in the device catalog")]
    UnknownDevice(String),
    #[error("device {0} declares no device type")]
    MissingDeviceType(String),
}

/// Everything the synthesizer reads.
pub struct ToolboxInputs<'a> {
    pub target: Option<&'a EditTarget>,
    pub stage: Option<&'a EditTarget>,
    pub devices: &'a [ConnectedDevice],
    pub catalog: &'a [DeviceDescriptor],
    pub extensions: &'a [ExtensionRegistration],
    pub mode: ProgramMode,
}

/// Builds a descriptor with revision 0, or `None` when the state is not
/// presentable this cycle. The caller keeps its previous toolbox on `None`.
pub fn synthesize_toolbox(inputs: &ToolboxInputs<'_>) -> Option<ToolboxDescriptor> {
    match try_synthesize(inputs) {
        Ok(descriptor) => Some(descriptor),
        Err(error) => {
            tracing::warn!(error = %error, "toolbox synthesis skipped");
            None
        }
    }
}

pub fn try_synthesize(inputs: &ToolboxInputs<'_>) -> Result<ToolboxDescriptor, SynthesisError> {
    let stage = inputs.stage.ok_or(SynthesisError::MissingStage)?;
    let target = inputs.target.unwrap_or(stage);
    let interactive = inputs.mode == ProgramMode::Interactive;

    let mut categories = Vec::new();
    if interactive {
        if !target.is_stage {
            categories.push(motion(target));
        }
        categories.push(looks(target, stage));
        categories.push(sound(target));
    }
    categories.push(events());
    categories.push(control(target.is_stage));
    if interactive {
        categories.push(sensing(target.is_stage));
    }
    categories.push(operators());
    categories.push(variables());
    categories.push(my_blocks());

    for device in inputs.devices {
        let descriptor = inputs
            .catalog
            .iter()
            .find(|d| d.device_id == device.device_id)
            .ok_or_else(|| SynthesisError::UnknownDevice(device.device_id.clone()))?;
        if descriptor.device_type.is_empty() {
            return Err(SynthesisError::MissingDeviceType(device.device_id.clone()));
        }
        categories.extend(
            inputs
                .extensions
                .iter()
                .filter(|ext| ext.device_id.as_deref() == Some(device.device_id.as_str()))
                .map(|ext| extension_category(&ext.category)),
        );
    }
    categories.extend(
        inputs
            .extensions
            .iter()
            .filter(|ext| ext.device_id.is_none())
            .map(|ext| extension_category(&ext.category)),
    );

    Ok(ToolboxDescriptor {
        revision: 0,
        target_id: target.id.clone(),
        is_stage: target.is_stage,
        mode: inputs.mode,
        categories,
    })
}

fn extension_category(category: &CategoryInfo) -> ToolboxCategory {
    let items = category
        .blocks
        .iter()
        .filter_map(|entry| {
            if entry.is_separator() {
                return Some(ToolboxItem::Separator);
            }
            let info = entry.info.as_ref()?;
            Some(block(&extended_opcode(&category.id, &info.opcode)))
        })
        .collect();
    ToolboxCategory {
        id: category.id.clone(),
        name: category.name.clone(),
        colour: category.color1.clone(),
        secondary_colour: category.color2.clone(),
        custom: None,
        items,
    }
}

fn category(id: &str, name: &str, colour: &str, secondary: &str) -> ToolboxCategory {
    ToolboxCategory {
        id: id.to_string(),
        name: name.to_string(),
        colour: colour.to_string(),
        secondary_colour: secondary.to_string(),
        custom: None,
        items: Vec::new(),
    }
}

fn block(opcode: &str) -> ToolboxItem {
    ToolboxItem::Block {
        opcode: opcode.to_string(),
        fields: Vec::new(),
    }
}

fn block_with(opcode: &str, fields: &[(&str, &str, Option<&str>)]) -> ToolboxItem {
    ToolboxItem::Block {
        opcode: opcode.to_string(),
        fields: fields
            .iter()
            .map(|(name, value, id)| ToolboxField {
                name: (*name).to_string(),
                value: (*value).to_string(),
                id: id.map(str::to_string),
            })
            .collect(),
    }
}

fn button(text: &str, callback_key: &str) -> ToolboxItem {
    ToolboxItem::Button {
        text: text.to_string(),
        callback_key: callback_key.to_string(),
    }
}

fn motion(target: &EditTarget) -> ToolboxCategory {
    let (x, y) = target.rounded_position();
    let mut c = category("motion", "Motion", "#4C97FF", "#3373CC");
    c.items = vec![
        block_with("motion_movesteps", &[("STEPS", "10", None)]),
        block_with("motion_turnright", &[("DEGREES", "15", None)]),
        block_with("motion_turnleft", &[("DEGREES", "15", None)]),
        ToolboxItem::Separator,
        block_with(
            "motion_gotoxy",
            &[("X", x.as_str(), Some("movex")), ("Y", y.as_str(), Some("movey"))],
        ),
        block_with(
            "motion_glidesecstoxy",
            &[
                ("SECS", "1", None),
                ("X", x.as_str(), Some("glidex")),
                ("Y", y.as_str(), Some("glidey")),
            ],
        ),
        ToolboxItem::Separator,
        block_with("motion_setx", &[("X", x.as_str(), Some("setx"))]),
        block_with("motion_sety", &[("Y", y.as_str(), Some("sety"))]),
    ];
    c
}

fn looks(target: &EditTarget, stage: &EditTarget) -> ToolboxCategory {
    let mut c = category("looks", "Looks", "#9966FF", "#774DCB");
    if !target.is_stage {
        c.items.push(block_with(
            "looks_sayforsecs",
            &[("MESSAGE", "Hello!", None), ("SECS", "2", None)],
        ));
        c.items.push(block_with(
            "looks_switchcostumeto",
            &[("COSTUME", target.last_costume_name(), None)],
        ));
    }
    c.items.push(block_with(
        "looks_switchbackdropto",
        &[("BACKDROP", stage.last_costume_name(), None)],
    ));
    c.items.push(block_with(
        "looks_changeeffectby",
        &[("EFFECT", "COLOR", None), ("CHANGE", "25", None)],
    ));
    if !target.is_stage {
        c.items.push(ToolboxItem::Separator);
        c.items.push(block("looks_show"));
        c.items.push(block("looks_hide"));
    }
    c
}

fn sound(target: &EditTarget) -> ToolboxCategory {
    let name = target.last_sound_name();
    let mut c = category("sound", "Sound", "#CF63CF", "#C94FC9");
    c.items = vec![
        block_with("sound_playuntildone", &[("SOUND_MENU", name, None)]),
        block_with("sound_play", &[("SOUND_MENU", name, None)]),
        block("sound_stopallsounds"),
        ToolboxItem::Separator,
        block_with("sound_changevolumeby", &[("VOLUME", "-10", None)]),
    ];
    c
}

fn events() -> ToolboxCategory {
    let mut c = category("events", "Events", "#FFBF00", "#E6AC00");
    c.items = vec![
        block("event_whenflagclicked"),
        block_with("event_whenkeypressed", &[("KEY_OPTION", "space", None)]),
        block("event_whenbroadcastreceived"),
        ToolboxItem::Separator,
        block("event_broadcast"),
        block("event_broadcastandwait"),
    ];
    c
}

fn control(is_stage: bool) -> ToolboxCategory {
    let mut c = category("control", "Control", "#FFAB19", "#EC9C13");
    c.items = vec![
        block_with("control_wait", &[("DURATION", "1", None)]),
        ToolboxItem::Separator,
        block_with("control_repeat", &[("TIMES", "10", None)]),
        block("control_forever"),
        ToolboxItem::Separator,
        block("control_if"),
        block("control_if_else"),
        block("control_wait_until"),
        block("control_repeat_until"),
        ToolboxItem::Separator,
        block_with("control_stop", &[("STOP_OPTION", "all", None)]),
    ];
    if is_stage {
        c.items.push(block("control_create_clone_of"));
    } else {
        c.items.push(block("control_start_as_clone"));
        c.items.push(block("control_create_clone_of"));
        c.items.push(block("control_delete_this_clone"));
    }
    c
}

fn sensing(is_stage: bool) -> ToolboxCategory {
    let mut c = category("sensing", "Sensing", "#5CB1D6", "#47A8D1");
    if !is_stage {
        c.items.push(block("sensing_touchingobject"));
        c.items.push(block("sensing_distanceto"));
        c.items.push(ToolboxItem::Separator);
    }
    c.items.push(block_with(
        "sensing_askandwait",
        &[("QUESTION", "What's your name?", None)],
    ));
    c.items.push(block("sensing_answer"));
    c.items.push(ToolboxItem::Separator);
    c.items.push(block_with("sensing_keypressed", &[("KEY_OPTION", "space", None)]));
    c.items.push(block("sensing_mousedown"));
    c.items.push(block("sensing_timer"));
    c.items.push(block("sensing_resettimer"));
    c
}

fn operators() -> ToolboxCategory {
    let mut c = category("operators", "Operators", "#59C059", "#46B946");
    c.items = vec![
        block("operator_add"),
        block("operator_subtract"),
        block("operator_multiply"),
        block("operator_divide"),
        ToolboxItem::Separator,
        block("operator_random"),
        ToolboxItem::Separator,
        block_with("operator_gt", &[("OPERAND2", "50", None)]),
        block_with("operator_lt", &[("OPERAND2", "50", None)]),
        block_with("operator_equals", &[("OPERAND2", "50", None)]),
        ToolboxItem::Separator,
        block("operator_and"),
        block("operator_or"),
        block("operator_not"),
        ToolboxItem::Separator,
        block_with(
            "operator_join",
            &[("STRING1", "apple ", None), ("STRING2", "banana", None)],
        ),
    ];
    c
}

fn variables() -> ToolboxCategory {
    let mut c = category("variables", "Variables", "#FF8C1A", "#FF8000");
    c.custom = Some("VARIABLE".to_string());
    c.items = vec![
        button("Make a Variable", "MAKE_A_VARIABLE"),
        button("Make a List", "MAKE_A_LIST"),
    ];
    c
}

fn my_blocks() -> ToolboxCategory {
    let mut c = category(MY_BLOCKS_CATEGORY, "My Blocks", "#FF6680", "#FF4D6A");
    c.custom = Some("PROCEDURE".to_string());
    c.items = vec![button("Make a Block", "MAKE_A_PROCEDURE")];
    c
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/toolbox.rs"]
mod tests;
