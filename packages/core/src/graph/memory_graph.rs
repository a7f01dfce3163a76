//! In-memory record graph
//!
//! Records are kept in an ordered map keyed by `RecordId`; ids are allocated
//! sequentially starting at 1. Every connect is checked against the schema
//! (slot exists, holds records, admits the child type, arity) and against
//! cycles before anything is changed. Value list elements are checked against
//! the slot kind and the list bounds the same way.

use crate::graph::{GraphError, RecordGraph, SlotOwner, SlotRef};
use crate::models::{
    Capabilities, ListValue, PropertyValue, Record, RecordId, SchemaRegistry, SlotDef, SlotKind,
};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct MemoryRecordGraph {
    schema: Arc<SchemaRegistry>,
    records: BTreeMap<RecordId, Record>,
    owners: BTreeMap<RecordId, SlotRef>,
    message: Vec<RecordId>,
    next_id: u64,
}

impl MemoryRecordGraph {
    pub fn new(schema: Arc<SchemaRegistry>) -> Self {
        Self {
            schema,
            records: BTreeMap::new(),
            owners: BTreeMap::new(),
            message: Vec::new(),
            next_id: 1,
        }
    }

    pub fn schema(&self) -> &Arc<SchemaRegistry> {
        &self.schema
    }

    pub fn record(&self, record: RecordId) -> Option<&Record> {
        self.records.get(&record)
    }

    /// Number of records held, connected or not
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn slot_def(&self, slot: &SlotRef) -> Result<&SlotDef, GraphError> {
        let owner_type = match slot.owner {
            SlotOwner::Message => None,
            SlotOwner::Record(record) => Some(
                self.record_type(record)
                    .ok_or_else(|| GraphError::unknown_record(record))?,
            ),
        };
        Ok(self.schema.resolve_slot(owner_type, &slot.slot)?)
    }

    fn value_slot(
        &self,
        record: RecordId,
        slot: &str,
        expected: SlotKind,
    ) -> Result<(), GraphError> {
        let slot_ref = SlotRef::record(record, slot);
        let def = self.slot_def(&slot_ref)?;
        if def.kind != expected {
            return Err(GraphError::WrongSlotKind {
                slot: slot_ref,
                kind: def.kind,
            });
        }
        Ok(())
    }

    /// Kind of a value list slot, rejecting every other slot kind
    fn list_kind(&self, record: RecordId, slot: &str) -> Result<SlotKind, GraphError> {
        let slot_ref = SlotRef::record(record, slot);
        let kind = self.slot_def(&slot_ref)?.kind;
        match kind.element_kind() {
            Some(_) => Ok(kind),
            None => Err(GraphError::WrongSlotKind {
                slot: slot_ref,
                kind,
            }),
        }
    }

    /// Check that `value` fits the value list `slot`
    fn check_value(
        &self,
        record: RecordId,
        slot: &str,
        value: &ListValue,
    ) -> Result<(), GraphError> {
        let kind = self.list_kind(record, slot)?;
        match (kind, value) {
            (SlotKind::PropertyList, ListValue::Property(_))
            | (SlotKind::BinaryList, ListValue::Binary(_)) => Ok(()),
            _ => Err(GraphError::ValueMismatch {
                slot: SlotRef::record(record, slot),
                kind,
            }),
        }
    }

    fn element_index(
        &self,
        record: RecordId,
        slot: &str,
        index: usize,
    ) -> Result<(), GraphError> {
        let len = self.values(record, slot)?.len();
        if index >= len {
            return Err(GraphError::IndexOutOfRange {
                slot: SlotRef::record(record, slot),
                index,
                len,
            });
        }
        Ok(())
    }

    fn record_mut(&mut self, record: RecordId) -> Result<&mut Record, GraphError> {
        self.records
            .get_mut(&record)
            .ok_or_else(|| GraphError::unknown_record(record))
    }

    fn children_mut(&mut self, slot: &SlotRef) -> Result<&mut Vec<RecordId>, GraphError> {
        match slot.owner {
            SlotOwner::Message => Ok(&mut self.message),
            SlotOwner::Record(record) => Ok(self.record_mut(record)?.children_mut(&slot.slot)),
        }
    }

    fn check_acyclic(&self, slot: &SlotRef, child: RecordId) -> Result<(), GraphError> {
        let mut current = slot.owner_record();
        while let Some(record) = current {
            if record == child {
                return Err(GraphError::Cycle {
                    record: child,
                    slot: slot.clone(),
                });
            }
            current = self.owners.get(&record).and_then(SlotRef::owner_record);
        }
        Ok(())
    }
}

impl RecordGraph for MemoryRecordGraph {
    fn create_record(&mut self, record_type: &str) -> Result<RecordId, GraphError> {
        self.schema.record_type(record_type)?;
        let id = RecordId::new(self.next_id);
        self.next_id += 1;
        self.records
            .insert(id, Record::new(id, record_type.to_string()));
        tracing::trace!("Created {} of type '{}'", id, record_type);
        Ok(id)
    }

    fn record_type(&self, record: RecordId) -> Option<&str> {
        self.records.get(&record).map(Record::record_type)
    }

    fn capabilities_of(&self, record: RecordId) -> Result<Capabilities, GraphError> {
        let record_type = self
            .record_type(record)
            .ok_or_else(|| GraphError::unknown_record(record))?;
        Ok(self.schema.record_type(record_type)?.capabilities())
    }

    fn owner_of(&self, record: RecordId) -> Option<&SlotRef> {
        self.owners.get(&record)
    }

    fn children(&self, slot: &SlotRef) -> Result<&[RecordId], GraphError> {
        let def = self.slot_def(slot)?;
        if !def.kind.holds_records() {
            return Err(GraphError::WrongSlotKind {
                slot: slot.clone(),
                kind: def.kind,
            });
        }
        match slot.owner {
            SlotOwner::Message => Ok(&self.message),
            SlotOwner::Record(record) => Ok(self
                .records
                .get(&record)
                .map(|r| r.children(&slot.slot))
                .unwrap_or(&[])),
        }
    }

    fn child_count(&self, record: RecordId) -> usize {
        self.records.get(&record).map(Record::child_count).unwrap_or(0)
    }

    fn connect(
        &mut self,
        slot: &SlotRef,
        child: RecordId,
        index: usize,
    ) -> Result<(), GraphError> {
        let child_type = self
            .record_type(child)
            .ok_or_else(|| GraphError::unknown_record(child))?
            .to_string();
        if let Some(owner) = self.owners.get(&child) {
            return Err(GraphError::AlreadyConnected {
                record: child,
                owner: owner.clone(),
            });
        }
        let owner_type = match slot.owner {
            SlotOwner::Message => None,
            SlotOwner::Record(record) => Some(
                self.record_type(record)
                    .ok_or_else(|| GraphError::unknown_record(record))?
                    .to_string(),
            ),
        };
        let kind = self
            .schema
            .validate(owner_type.as_deref(), &slot.slot, &child_type)?
            .kind;
        self.check_acyclic(slot, child)?;

        let len = self.children(slot)?.len();
        if kind == SlotKind::Record && len > 0 {
            return Err(GraphError::SlotOccupied { slot: slot.clone() });
        }
        if index > len {
            return Err(GraphError::IndexOutOfRange {
                slot: slot.clone(),
                index,
                len,
            });
        }

        self.children_mut(slot)?.insert(index, child);
        self.owners.insert(child, slot.clone());
        tracing::trace!("Connected {} to {} at {}", child, slot, index);
        Ok(())
    }

    fn disconnect(&mut self, slot: &SlotRef, child: RecordId) -> Result<usize, GraphError> {
        let index = self
            .children(slot)?
            .iter()
            .position(|c| *c == child)
            .ok_or_else(|| GraphError::NotConnected {
                record: child,
                slot: slot.clone(),
            })?;
        self.children_mut(slot)?.remove(index);
        self.owners.remove(&child);
        tracing::trace!("Disconnected {} from {} at {}", child, slot, index);
        Ok(index)
    }

    fn content(&self, record: RecordId, slot: &str) -> Result<Option<&[u8]>, GraphError> {
        self.value_slot(record, slot, SlotKind::Binary)?;
        Ok(self.records.get(&record).and_then(|r| r.content(slot)))
    }

    fn set_content(
        &mut self,
        record: RecordId,
        slot: &str,
        bytes: Option<Vec<u8>>,
    ) -> Result<Option<Vec<u8>>, GraphError> {
        self.value_slot(record, slot, SlotKind::Binary)?;
        Ok(self.record_mut(record)?.set_content(slot, bytes))
    }

    fn property(
        &self,
        record: RecordId,
        slot: &str,
    ) -> Result<Option<&PropertyValue>, GraphError> {
        self.value_slot(record, slot, SlotKind::Property)?;
        Ok(self.records.get(&record).and_then(|r| r.property(slot)))
    }

    fn set_property(
        &mut self,
        record: RecordId,
        slot: &str,
        value: Option<PropertyValue>,
    ) -> Result<Option<PropertyValue>, GraphError> {
        self.value_slot(record, slot, SlotKind::Property)?;
        Ok(self.record_mut(record)?.set_property(slot, value))
    }

    fn values(&self, record: RecordId, slot: &str) -> Result<&[ListValue], GraphError> {
        self.list_kind(record, slot)?;
        Ok(self
            .records
            .get(&record)
            .map(|r| r.values(slot))
            .unwrap_or(&[]))
    }

    fn insert_value(
        &mut self,
        record: RecordId,
        slot: &str,
        index: usize,
        value: ListValue,
    ) -> Result<(), GraphError> {
        self.check_value(record, slot, &value)?;
        let len = self.values(record, slot)?.len();
        if index > len {
            return Err(GraphError::IndexOutOfRange {
                slot: SlotRef::record(record, slot),
                index,
                len,
            });
        }
        self.record_mut(record)?.values_mut(slot).insert(index, value);
        tracing::trace!("Inserted value into {}.{} at {}", record, slot, index);
        Ok(())
    }

    fn remove_value(
        &mut self,
        record: RecordId,
        slot: &str,
        index: usize,
    ) -> Result<ListValue, GraphError> {
        self.element_index(record, slot, index)?;
        let value = self.record_mut(record)?.values_mut(slot).remove(index);
        tracing::trace!("Removed value from {}.{} at {}", record, slot, index);
        Ok(value)
    }

    fn replace_value(
        &mut self,
        record: RecordId,
        slot: &str,
        index: usize,
        value: ListValue,
    ) -> Result<ListValue, GraphError> {
        self.check_value(record, slot, &value)?;
        self.element_index(record, slot, index)?;
        let values = self.record_mut(record)?.values_mut(slot);
        Ok(std::mem::replace(&mut values[index], value))
    }
}
