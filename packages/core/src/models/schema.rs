//! Schema Registry
//!
//! Static, declarative description of which record types exist, which
//! structural slots each type has (in presentation order), the arity of each
//! slot, and which record types are admissible in each record slot.
//!
//! The table is loaded once from JSON and is immutable afterwards. All
//! validity questions asked by the node factory and the operations are plain
//! lookups against it.
//!
//! ## Table Format
//!
//! ```json
//! {
//!   "message": ["@root"],
//!   "type_sets": { "root": ["text", "uri"] },
//!   "record_types": [
//!     { "name": "text", "label": "Text Record",
//!       "slots": [ { "name": "text", "kind": "property" } ] },
//!     { "name": "uri", "label": "URI Record",
//!       "slots": [ { "name": "uri", "kind": "property" } ] }
//!   ]
//! }
//! ```
//!
//! Entries starting with `@` in an admissible list refer to a named type set.
//! Admissible types are always returned sorted by label using byte-wise
//! comparison, so enumeration order does not depend on the host locale.

use crate::models::Capabilities;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the message-level slot holding the top-level records
pub const MESSAGE_SLOT: &str = "records";

/// Schema lookup and loading errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Unknown record type '{record_type}'")]
    UnknownRecordType { record_type: String },

    #[error("Record type '{record_type}' has no slot '{slot}'")]
    UnknownSlot { record_type: String, slot: String },

    #[error("Unknown type set '@{name}'")]
    UnknownTypeSet { name: String },

    #[error("Record type '{record_type}' is defined more than once")]
    DuplicateRecordType { record_type: String },

    #[error("Slot '{slot}' is defined more than once on '{record_type}'")]
    DuplicateSlot { record_type: String, slot: String },

    #[error("Slot '{slot}' of '{record_type}' is a {kind:?} slot and cannot hold records")]
    NotARecordSlot {
        record_type: String,
        slot: String,
        kind: SlotKind,
    },

    #[error("Record type '{child_type}' is not admissible in slot '{slot}' of '{record_type}'")]
    NotAdmissible {
        record_type: String,
        slot: String,
        child_type: String,
    },

    #[error("Failed to parse schema table: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Built-in schema table is invalid: {0}")]
    InvalidBuiltin(String),

    #[error("Failed to read schema table at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl SchemaError {
    pub fn unknown_record_type(record_type: impl Into<String>) -> Self {
        Self::UnknownRecordType {
            record_type: record_type.into(),
        }
    }

    pub fn unknown_slot(record_type: impl Into<String>, slot: impl Into<String>) -> Self {
        Self::UnknownSlot {
            record_type: record_type.into(),
            slot: slot.into(),
        }
    }

    pub fn not_admissible(
        record_type: impl Into<String>,
        slot: impl Into<String>,
        child_type: impl Into<String>,
    ) -> Self {
        Self::NotAdmissible {
            record_type: record_type.into(),
            slot: slot.into(),
            child_type: child_type.into(),
        }
    }
}

/// What a slot holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    /// At most one child record
    Record,
    /// Ordered, repeatable child records
    RecordList,
    /// Primitive value
    Property,
    /// Opaque byte payload
    Binary,
    /// Ordered, repeatable primitive values
    PropertyList,
    /// Ordered, repeatable byte payloads
    BinaryList,
}

/// Declared arity of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arity {
    Single,
    List,
}

impl SlotKind {
    pub fn arity(self) -> Arity {
        match self {
            SlotKind::RecordList | SlotKind::PropertyList | SlotKind::BinaryList => Arity::List,
            SlotKind::Record | SlotKind::Property | SlotKind::Binary => Arity::Single,
        }
    }

    pub fn holds_records(self) -> bool {
        match self {
            SlotKind::Record | SlotKind::RecordList => true,
            _ => false,
        }
    }

    /// Leaf kind of one element, for value list slots
    pub fn element_kind(self) -> Option<SlotKind> {
        match self {
            SlotKind::PropertyList => Some(SlotKind::Property),
            SlotKind::BinaryList => Some(SlotKind::Binary),
            _ => None,
        }
    }
}

/// One structural slot of a record type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotDef {
    pub name: String,
    pub label: String,
    pub kind: SlotKind,
    /// Admissible child record types, sorted by label
    pub admissible: Vec<String>,
}

impl SlotDef {
    pub fn is_list(&self) -> bool {
        self.kind.arity() == Arity::List
    }

    pub fn admits(&self, record_type: &str) -> bool {
        self.admissible.iter().any(|t| t == record_type)
    }
}

/// Definition of one record type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordTypeDef {
    pub name: String,
    pub label: String,
    /// Optional grouping label used when enumerating types (e.g. "Handover records")
    pub group: Option<String>,
    /// Slots in presentation order
    pub slots: Vec<SlotDef>,
}

impl RecordTypeDef {
    pub fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::default();
        for slot in &self.slots {
            match slot.kind {
                SlotKind::Record => caps.has_children = true,
                SlotKind::RecordList | SlotKind::PropertyList => caps.has_list = true,
                SlotKind::BinaryList => {
                    caps.has_list = true;
                    caps.has_content = true;
                }
                SlotKind::Binary => caps.has_content = true,
                SlotKind::Property => {}
            }
        }
        caps
    }

    pub fn slot(&self, name: &str) -> Option<&SlotDef> {
        self.slots.iter().find(|s| s.name == name)
    }

    pub fn slot_index(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.name == name)
    }
}

/// One entry of a grouped enumeration of admissible types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissibleEntry<'a> {
    Type(&'a RecordTypeDef),
    Group {
        label: &'a str,
        types: Vec<&'a RecordTypeDef>,
    },
}

#[derive(Debug, Deserialize)]
struct RawTable {
    message: Vec<String>,
    #[serde(default)]
    type_sets: BTreeMap<String, Vec<String>>,
    record_types: Vec<RawRecordType>,
}

#[derive(Debug, Deserialize)]
struct RawRecordType {
    name: String,
    label: String,
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    slots: Vec<RawSlot>,
}

#[derive(Debug, Deserialize)]
struct RawSlot {
    name: String,
    #[serde(default)]
    label: Option<String>,
    kind: SlotKind,
    #[serde(default)]
    admissible: Vec<String>,
}

/// Immutable schema table
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    types: BTreeMap<String, RecordTypeDef>,
    message: SlotDef,
}

impl SchemaRegistry {
    /// Parse and validate a schema table from JSON
    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        let raw: RawTable = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    /// Read a schema table from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    fn from_raw(raw: RawTable) -> Result<Self, SchemaError> {
        let mut labels: BTreeMap<String, String> = BTreeMap::new();
        for record_type in &raw.record_types {
            if labels
                .insert(record_type.name.clone(), record_type.label.clone())
                .is_some()
            {
                return Err(SchemaError::DuplicateRecordType {
                    record_type: record_type.name.clone(),
                });
            }
        }

        let expand = |entries: &[String]| -> Result<Vec<String>, SchemaError> {
            let mut names = BTreeSet::new();
            for entry in entries {
                match entry.strip_prefix('@') {
                    Some(set) => {
                        let members = raw
                            .type_sets
                            .get(set)
                            .ok_or_else(|| SchemaError::UnknownTypeSet {
                                name: set.to_string(),
                            })?;
                        names.extend(members.iter().cloned());
                    }
                    None => {
                        names.insert(entry.clone());
                    }
                }
            }
            let mut sorted = Vec::with_capacity(names.len());
            for name in names {
                let label = labels
                    .get(&name)
                    .ok_or_else(|| SchemaError::unknown_record_type(name.clone()))?;
                sorted.push((label.clone(), name));
            }
            sorted.sort();
            Ok(sorted.into_iter().map(|(_, name)| name).collect())
        };

        let message = SlotDef {
            name: MESSAGE_SLOT.to_string(),
            label: "Records".to_string(),
            kind: SlotKind::RecordList,
            admissible: expand(&raw.message)?,
        };

        let mut types = BTreeMap::new();
        for record_type in &raw.record_types {
            let mut slots: Vec<SlotDef> = Vec::with_capacity(record_type.slots.len());
            for slot in &record_type.slots {
                if slots.iter().any(|s| s.name == slot.name) {
                    return Err(SchemaError::DuplicateSlot {
                        record_type: record_type.name.clone(),
                        slot: slot.name.clone(),
                    });
                }
                let admissible = if slot.kind.holds_records() {
                    expand(&slot.admissible)?
                } else {
                    Vec::new()
                };
                slots.push(SlotDef {
                    name: slot.name.clone(),
                    label: slot.label.clone().unwrap_or_else(|| slot.name.clone()),
                    kind: slot.kind,
                    admissible,
                });
            }
            types.insert(
                record_type.name.clone(),
                RecordTypeDef {
                    name: record_type.name.clone(),
                    label: record_type.label.clone(),
                    group: record_type.group.clone(),
                    slots,
                },
            );
        }

        tracing::debug!(
            "Loaded schema table with {} record types, {} message types",
            types.len(),
            message.admissible.len()
        );

        Ok(Self { types, message })
    }

    pub fn record_type(&self, name: &str) -> Result<&RecordTypeDef, SchemaError> {
        self.types
            .get(name)
            .ok_or_else(|| SchemaError::unknown_record_type(name))
    }

    pub fn record_types(&self) -> impl Iterator<Item = &RecordTypeDef> {
        self.types.values()
    }

    pub fn slots_of(&self, record_type: &str) -> Result<&[SlotDef], SchemaError> {
        Ok(&self.record_type(record_type)?.slots)
    }

    pub fn slot(&self, record_type: &str, slot: &str) -> Result<&SlotDef, SchemaError> {
        self.record_type(record_type)?
            .slot(slot)
            .ok_or_else(|| SchemaError::unknown_slot(record_type, slot))
    }

    /// Position of `slot` among the record type's slots (the record branch index)
    pub fn slot_index(&self, record_type: &str, slot: &str) -> Result<usize, SchemaError> {
        self.record_type(record_type)?
            .slot_index(slot)
            .ok_or_else(|| SchemaError::unknown_slot(record_type, slot))
    }

    /// The message slot holding top-level records
    pub fn message_slot(&self) -> &SlotDef {
        &self.message
    }

    /// Resolve a slot owned by a record type, or the message slot when `owner` is `None`
    pub fn resolve_slot(
        &self,
        owner: Option<&str>,
        slot: &str,
    ) -> Result<&SlotDef, SchemaError> {
        match owner {
            Some(record_type) => self.slot(record_type, slot),
            None if slot == MESSAGE_SLOT => Ok(&self.message),
            None => Err(SchemaError::unknown_slot("message", slot)),
        }
    }

    /// Record types admissible in `slot` of `record_type`, sorted by label
    pub fn admissible_types_for(
        &self,
        record_type: &str,
        slot: &str,
    ) -> Result<Vec<&RecordTypeDef>, SchemaError> {
        let slot = self.record_slot(Some(record_type), slot)?;
        Ok(self.defs(&slot.admissible))
    }

    /// Record types admissible at message level, sorted by label
    pub fn message_types(&self) -> Vec<&RecordTypeDef> {
        self.defs(&self.message.admissible)
    }

    pub fn is_list_slot(&self, record_type: &str, slot: &str) -> Result<bool, SchemaError> {
        Ok(self.slot(record_type, slot)?.is_list())
    }

    pub fn is_admissible(&self, owner: Option<&str>, slot: &str, child_type: &str) -> bool {
        self.validate(owner, slot, child_type).is_ok()
    }

    /// Check that `child_type` may be placed in `slot` of `owner` (message when `None`)
    pub fn validate(
        &self,
        owner: Option<&str>,
        slot: &str,
        child_type: &str,
    ) -> Result<&SlotDef, SchemaError> {
        self.record_type(child_type)?;
        let slot_def = self.record_slot(owner, slot)?;
        if !slot_def.admits(child_type) {
            return Err(SchemaError::not_admissible(
                owner.unwrap_or("message"),
                slot,
                child_type,
            ));
        }
        Ok(slot_def)
    }

    /// Admissible types of a slot with grouped types folded into one entry per group
    ///
    /// A group entry is positioned before the first ungrouped type whose label
    /// sorts after the group label.
    pub fn grouped_types_for(
        &self,
        owner: Option<&str>,
        slot: &str,
    ) -> Result<Vec<AdmissibleEntry<'_>>, SchemaError> {
        let slot_def = self.record_slot(owner, slot)?;
        let mut plain = Vec::new();
        let mut groups: BTreeMap<&str, Vec<&RecordTypeDef>> = BTreeMap::new();
        for def in self.defs(&slot_def.admissible) {
            match def.group.as_deref() {
                Some(group) => groups.entry(group).or_default().push(def),
                None => plain.push(def),
            }
        }

        let mut entries: Vec<AdmissibleEntry<'_>> =
            plain.into_iter().map(AdmissibleEntry::Type).collect();
        for (label, types) in groups {
            let at = entries
                .iter()
                .position(|entry| match entry {
                    AdmissibleEntry::Type(def) => def.label.as_str() > label,
                    AdmissibleEntry::Group { label: other, .. } => *other > label,
                })
                .unwrap_or(entries.len());
            entries.insert(at, AdmissibleEntry::Group { label, types });
        }
        Ok(entries)
    }

    fn record_slot(&self, owner: Option<&str>, slot: &str) -> Result<&SlotDef, SchemaError> {
        let slot_def = self.resolve_slot(owner, slot)?;
        if !slot_def.kind.holds_records() {
            return Err(SchemaError::NotARecordSlot {
                record_type: owner.unwrap_or("message").to_string(),
                slot: slot.to_string(),
                kind: slot_def.kind,
            });
        }
        Ok(slot_def)
    }

    fn defs(&self, names: &[String]) -> Vec<&RecordTypeDef> {
        names.iter().filter_map(|name| self.types.get(name)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"{
        "message": ["@root", "holder"],
        "type_sets": { "root": ["text", "uri"] },
        "record_types": [
            { "name": "uri", "label": "URI Record",
              "slots": [ { "name": "uri", "kind": "property" } ] },
            { "name": "text", "label": "Text Record",
              "slots": [ { "name": "text", "kind": "property" } ] },
            { "name": "holder", "label": "Holder Record", "group": "Containers",
              "slots": [
                { "name": "single", "kind": "record", "admissible": ["@root"] },
                { "name": "many", "kind": "record_list", "admissible": ["uri"] },
                { "name": "payload", "kind": "binary" },
                { "name": "tags", "kind": "property_list" }
              ] }
        ]
    }"#;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::from_json_str(TABLE).unwrap()
    }

    #[test]
    fn test_admissible_types_sorted_by_label() {
        let registry = registry();
        let names: Vec<&str> = registry
            .admissible_types_for("holder", "single")
            .unwrap()
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["text", "uri"]);

        let message: Vec<&str> = registry
            .message_types()
            .iter()
            .map(|d| d.label.as_str())
            .collect();
        assert_eq!(message, vec!["Holder Record", "Text Record", "URI Record"]);
    }

    #[test]
    fn test_slot_arity_and_index() {
        let registry = registry();
        assert!(!registry.is_list_slot("holder", "single").unwrap());
        assert!(registry.is_list_slot("holder", "many").unwrap());
        assert_eq!(registry.slot_index("holder", "payload").unwrap(), 2);
        assert!(registry.is_list_slot("holder", "tags").unwrap());
        assert!(matches!(
            registry.is_list_slot("holder", "missing"),
            Err(SchemaError::UnknownSlot { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_inadmissible_child() {
        let registry = registry();
        assert!(registry.validate(Some("holder"), "many", "uri").is_ok());
        let err = registry
            .validate(Some("holder"), "many", "text")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Record type 'text' is not admissible in slot 'many' of 'holder'"
        );
        assert!(matches!(
            registry.validate(Some("holder"), "payload", "uri"),
            Err(SchemaError::NotARecordSlot { .. })
        ));
        assert!(matches!(
            registry.validate(Some("holder"), "tags", "uri"),
            Err(SchemaError::NotARecordSlot { .. })
        ));
        assert!(registry.is_admissible(None, MESSAGE_SLOT, "holder"));
        assert!(!registry.is_admissible(None, "other", "holder"));
    }

    #[test]
    fn test_capabilities_follow_slots() {
        let registry = registry();
        let caps = registry.record_type("holder").unwrap().capabilities();
        assert!(caps.has_children && caps.has_list && caps.has_content);
        assert_eq!(
            registry.record_type("text").unwrap().capabilities(),
            Capabilities::default()
        );
    }

    #[test]
    fn test_value_list_kinds() {
        assert_eq!(SlotKind::PropertyList.arity(), Arity::List);
        assert!(!SlotKind::BinaryList.holds_records());
        assert_eq!(SlotKind::BinaryList.element_kind(), Some(SlotKind::Binary));
        assert_eq!(SlotKind::Record.element_kind(), None);

        let table = r#"{ "message": [], "record_types": [
            { "name": "a", "label": "A", "slots": [
                { "name": "certs", "kind": "binary_list" } ] } ] }"#;
        let registry = SchemaRegistry::from_json_str(table).unwrap();
        let caps = registry.record_type("a").unwrap().capabilities();
        assert!(caps.has_list && caps.has_content && !caps.has_children);
    }

    #[test]
    fn test_grouped_types_insert_group_by_label() {
        let registry = registry();
        let entries = registry.grouped_types_for(None, MESSAGE_SLOT).unwrap();
        assert_eq!(entries.len(), 3);
        match &entries[0] {
            AdmissibleEntry::Group { label, types } => {
                assert_eq!(*label, "Containers");
                assert_eq!(types.len(), 1);
            }
            other => panic!("expected group first, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_set_is_load_error() {
        let table = r#"{ "message": ["@nope"], "record_types": [] }"#;
        assert!(matches!(
            SchemaRegistry::from_json_str(table),
            Err(SchemaError::UnknownTypeSet { .. })
        ));
    }

    #[test]
    fn test_duplicate_definitions_are_load_errors() {
        let table = r#"{ "message": [], "record_types": [
            { "name": "a", "label": "A" }, { "name": "a", "label": "A" } ] }"#;
        assert!(matches!(
            SchemaRegistry::from_json_str(table),
            Err(SchemaError::DuplicateRecordType { .. })
        ));

        let table = r#"{ "message": [], "record_types": [
            { "name": "a", "label": "A", "slots": [
                { "name": "x", "kind": "property" },
                { "name": "x", "kind": "binary" } ] } ] }"#;
        assert!(matches!(
            SchemaRegistry::from_json_str(table),
            Err(SchemaError::DuplicateSlot { .. })
        ));
    }

    #[test]
    fn test_unknown_admissible_type_is_load_error() {
        let table = r#"{ "message": ["ghost"], "record_types": [] }"#;
        assert!(matches!(
            SchemaRegistry::from_json_str(table),
            Err(SchemaError::UnknownRecordType { .. })
        ));
    }
}
