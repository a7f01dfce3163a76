//! Built-in NDEF Schema Table
//!
//! The record types offered by the editor and the slots they expose:
//!
//! - **Message level** - all plain record types plus the handover records
//! - **Generic Control** - `target`, `action` and `data` sub-records
//! - **Handover Select / Request** - ordered `alternative_carriers` lists
//! - **Handover Carrier** - a `carrier_type` record of a well-known or external type
//! - **Signature** - a binary list of `certificates`
//! - **Alternative Carrier** - a property list of `auxiliary_data_references`
//!
//! The table lives in `schema/ndef.json` and is parsed once per process.

use crate::models::schema::{SchemaError, SchemaRegistry};
use std::sync::{Arc, OnceLock};

/// Raw JSON of the built-in table
pub const NDEF_SCHEMA_JSON: &str = include_str!("../../schema/ndef.json");

static NDEF_SCHEMA: OnceLock<Result<Arc<SchemaRegistry>, String>> = OnceLock::new();

impl SchemaRegistry {
    /// The built-in NDEF schema, shared across the process
    pub fn ndef() -> Result<Arc<SchemaRegistry>, SchemaError> {
        NDEF_SCHEMA
            .get_or_init(|| {
                SchemaRegistry::from_json_str(NDEF_SCHEMA_JSON)
                    .map(Arc::new)
                    .map_err(|e| e.to_string())
            })
            .clone()
            .map_err(SchemaError::InvalidBuiltin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schema::{AdmissibleEntry, SlotKind, MESSAGE_SLOT};

    #[test]
    fn test_builtin_table_loads() {
        let registry = SchemaRegistry::ndef().unwrap();
        assert_eq!(registry.record_types().count(), 19);
        assert_eq!(registry.message_types().len(), 15);
    }

    #[test]
    fn test_generic_control_slots() {
        let registry = SchemaRegistry::ndef().unwrap();
        let slots: Vec<&str> = registry
            .slots_of("generic_control")
            .unwrap()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(slots, vec!["configuration_byte", "target", "action", "data"]);

        let targets: Vec<&str> = registry
            .admissible_types_for("gc_target", "target_identifier")
            .unwrap()
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(targets, vec!["text", "uri"]);
    }

    #[test]
    fn test_alternative_carrier_lists() {
        let registry = SchemaRegistry::ndef().unwrap();
        assert!(registry
            .is_list_slot("handover_request", "alternative_carriers")
            .unwrap());
        assert_eq!(
            registry
                .slot_index("handover_request", "alternative_carriers")
                .unwrap(),
            3
        );
        assert_eq!(
            registry
                .slot_index("handover_select", "alternative_carriers")
                .unwrap(),
            2
        );
    }

    #[test]
    fn test_value_list_slots() {
        let registry = SchemaRegistry::ndef().unwrap();
        let certificates = registry.slot("signature", "certificates").unwrap();
        assert_eq!(certificates.kind, SlotKind::BinaryList);
        assert_eq!(registry.slot_index("signature", "certificates").unwrap(), 4);

        let references = registry
            .slot("alternative_carrier", "auxiliary_data_references")
            .unwrap();
        assert_eq!(references.kind, SlotKind::PropertyList);
        assert!(references.admissible.is_empty());
    }

    #[test]
    fn test_message_menu_groups_handover_records() {
        let registry = SchemaRegistry::ndef().unwrap();
        let entries = registry.grouped_types_for(None, MESSAGE_SLOT).unwrap();
        let labels: Vec<&str> = entries
            .iter()
            .map(|entry| match entry {
                AdmissibleEntry::Type(def) => def.label.as_str(),
                AdmissibleEntry::Group { label, .. } => *label,
            })
            .collect();
        assert_eq!(
            labels,
            vec![
                "Absolute URI Record",
                "Action Record",
                "Android Application Record",
                "Empty Record",
                "External Type Record",
                "Generic Control Record",
                "Handover records",
                "Mime Record",
                "Signature Record",
                "Smart Poster Record",
                "Text Record",
                "URI Record",
                "Unknown Record",
            ]
        );
    }
}
