use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Static metadata of one extension block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockMeta {
    pub opcode: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub is_dynamic: bool,
}

/// One entry of a category's block/menu list.
///
/// Entries carrying neither `info` nor `json` are separators (`---`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockInfo {
    #[serde(default)]
    pub info: Option<BlockMeta>,
    #[serde(default)]
    pub json: Option<Value>,
}

impl BlockInfo {
    pub fn is_separator(&self) -> bool {
        self.info.is_none() && self.json.is_none()
    }

    pub fn is_dynamic(&self) -> bool {
        self.info.as_ref().is_some_and(|info| info.is_dynamic)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomFieldType {
    pub definition: BlockInfo,
}

/// Category contributed by an extension or a device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color1: String,
    #[serde(default)]
    pub color2: String,
    #[serde(default)]
    pub blocks: Vec<BlockInfo>,
    #[serde(default)]
    pub menus: Vec<BlockInfo>,
    #[serde(default)]
    pub custom_field_types: BTreeMap<String, CustomFieldType>,
}

/// Payload of the extension-added and blocks-info-update runtime events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtensionInfo {
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub categories: Vec<CategoryInfo>,
}

/// A category registered in the session, with the device that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionRegistration {
    pub device_id: Option<String>,
    pub category: CategoryInfo,
}

impl ExtensionRegistration {
    pub fn id(&self) -> &str {
        &self.category.id
    }
}

/// Messages, generators and block packs shipped by a device extension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceExtensionPackage {
    pub extension_id: String,
    #[serde(default)]
    pub messages: BTreeMap<String, String>,
    #[serde(default)]
    pub generators: Vec<String>,
    #[serde(default)]
    pub blocks: Vec<Value>,
}

/// Category fields a dynamic block constructor needs.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRef {
    pub id: String,
    pub name: String,
    pub color1: String,
    pub color2: String,
}

impl From<&CategoryInfo> for CategoryRef {
    fn from(category: &CategoryInfo) -> Self {
        Self {
            id: category.id.clone(),
            name: category.name.clone(),
            color1: category.color1.clone(),
            color2: category.color2.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DynamicBlock {
    pub category: CategoryRef,
    pub block: BlockMeta,
    pub opcode: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockDefinition {
    Static(Value),
    Dynamic(DynamicBlock),
}

/// Definitions of one block list, split into the static batch and the dynamic rest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefinitionBatch {
    pub statics: Vec<Value>,
    pub dynamics: Vec<DynamicBlock>,
}

impl DefinitionBatch {
    pub fn is_empty(&self) -> bool {
        self.statics.is_empty() && self.dynamics.is_empty()
    }
}

pub fn extended_opcode(category_id: &str, opcode: &str) -> String {
    format!("{category_id}_{opcode}")
}

pub fn classify(category: &CategoryInfo, entry: &BlockInfo) -> Option<BlockDefinition> {
    if let Some(info) = entry.info.as_ref().filter(|info| info.is_dynamic) {
        return Some(BlockDefinition::Dynamic(DynamicBlock {
            category: CategoryRef::from(category),
            block: info.clone(),
            opcode: extended_opcode(&category.id, &info.opcode),
        }));
    }
    entry.json.clone().map(BlockDefinition::Static)
}

pub fn partition(category: &CategoryInfo, entries: &[BlockInfo]) -> DefinitionBatch {
    let mut batch = DefinitionBatch::default();
    for entry in entries {
        match classify(category, entry) {
            Some(BlockDefinition::Static(json)) => batch.statics.push(json),
            Some(BlockDefinition::Dynamic(block)) => batch.dynamics.push(block),
            None => {}
        }
    }
    batch
}

/// Batches for a category in registration order: custom field types, menus, blocks.
///
/// Field types and menus are shadow blocks the main blocks depend on.
pub fn category_batches(category: &CategoryInfo) -> [DefinitionBatch; 3] {
    let field_types: Vec<BlockInfo> = category
        .custom_field_types
        .values()
        .map(|field| field.definition.clone())
        .collect();
    [
        partition(category, &field_types),
        partition(category, &category.menus),
        partition(category, &category.blocks),
    ]
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/extension.rs"]
mod tests;
