//! Structural snapshot of the reachable record graph
//!
//! Captures every record reachable from the message, with its slots in schema
//! order. Unattached records are not part of the snapshot, so two graphs that
//! differ only in orphaned records compare equal.

use crate::graph::{GraphError, RecordGraph, SlotRef};
use crate::models::{ListValue, PropertyValue, RecordId, SchemaRegistry, SlotKind};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphSnapshot {
    pub records: Vec<RecordSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSnapshot {
    pub id: RecordId,
    pub record_type: String,
    pub slots: Vec<SlotSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlotSnapshot {
    Records {
        slot: String,
        records: Vec<RecordSnapshot>,
    },
    Property {
        slot: String,
        value: Option<PropertyValue>,
    },
    Content {
        slot: String,
        bytes: Option<Vec<u8>>,
    },
    Values {
        slot: String,
        values: Vec<ListValue>,
    },
}

impl GraphSnapshot {
    pub fn capture<G: RecordGraph + ?Sized>(
        graph: &G,
        schema: &SchemaRegistry,
    ) -> Result<Self, GraphError> {
        let records = graph
            .children(&SlotRef::message())?
            .iter()
            .map(|record| RecordSnapshot::capture(graph, schema, *record))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { records })
    }

    /// Ids of the top-level records, in message order
    pub fn message_records(&self) -> Vec<RecordId> {
        self.records.iter().map(|r| r.id).collect()
    }
}

impl RecordSnapshot {
    fn capture<G: RecordGraph + ?Sized>(
        graph: &G,
        schema: &SchemaRegistry,
        record: RecordId,
    ) -> Result<Self, GraphError> {
        let record_type = graph
            .record_type(record)
            .ok_or_else(|| GraphError::unknown_record(record))?;
        let def = schema.record_type(record_type)?;

        let mut slots = Vec::with_capacity(def.slots.len());
        for slot in &def.slots {
            let snapshot = match slot.kind {
                SlotKind::Record | SlotKind::RecordList => SlotSnapshot::Records {
                    slot: slot.name.clone(),
                    records: graph
                        .children(&SlotRef::record(record, &slot.name))?
                        .iter()
                        .map(|child| RecordSnapshot::capture(graph, schema, *child))
                        .collect::<Result<Vec<_>, _>>()?,
                },
                SlotKind::Property => SlotSnapshot::Property {
                    slot: slot.name.clone(),
                    value: graph.property(record, &slot.name)?.cloned(),
                },
                SlotKind::Binary => SlotSnapshot::Content {
                    slot: slot.name.clone(),
                    bytes: graph.content(record, &slot.name)?.map(<[u8]>::to_vec),
                },
                SlotKind::PropertyList | SlotKind::BinaryList => SlotSnapshot::Values {
                    slot: slot.name.clone(),
                    values: graph.values(record, &slot.name)?.to_vec(),
                },
            };
            slots.push(snapshot);
        }

        Ok(Self {
            id: record,
            record_type: record_type.to_string(),
            slots,
        })
    }
}
