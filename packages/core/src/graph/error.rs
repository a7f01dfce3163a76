//! Record Graph Error Types

use crate::graph::SlotRef;
use crate::models::{RecordId, SchemaError, SlotKind};
use thiserror::Error;

/// Errors raised by record graph calls
#[derive(Error, Debug)]
pub enum GraphError {
    /// Referenced record does not exist in this graph
    #[error("Record {record} does not exist")]
    UnknownRecord { record: RecordId },

    /// Record is already connected somewhere else
    #[error("Record {record} is already connected to {owner}")]
    AlreadyConnected { record: RecordId, owner: SlotRef },

    /// Record is not connected to the given slot
    #[error("Record {record} is not connected to {slot}")]
    NotConnected { record: RecordId, slot: SlotRef },

    /// Single-valued slot already holds a record
    #[error("Slot {slot} is already occupied")]
    SlotOccupied { slot: SlotRef },

    #[error("Index {index} is out of range for {slot} with {len} records")]
    IndexOutOfRange {
        slot: SlotRef,
        index: usize,
        len: usize,
    },

    /// Slot exists but holds a different kind of value
    #[error("Slot {slot} is a {kind:?} slot")]
    WrongSlotKind { slot: SlotRef, kind: SlotKind },

    /// Value list element of the wrong variant for the slot
    #[error("Value does not fit {kind:?} slot {slot}")]
    ValueMismatch { slot: SlotRef, kind: SlotKind },

    /// Connecting would make a record its own ancestor
    #[error("Connecting {record} to {slot} would create a cycle")]
    Cycle { record: RecordId, slot: SlotRef },

    /// Schema lookup failed
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Backend refused the call
    #[error("Record graph rejected the call: {reason}")]
    Rejected { reason: String },
}

impl GraphError {
    pub fn unknown_record(record: RecordId) -> Self {
        Self::UnknownRecord { record }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_slot() {
        let err = GraphError::SlotOccupied {
            slot: SlotRef::record(RecordId::new(3), "target"),
        };
        assert_eq!(err.to_string(), "Slot record#3.target is already occupied");

        let err = GraphError::NotConnected {
            record: RecordId::new(4),
            slot: SlotRef::message(),
        };
        assert_eq!(
            err.to_string(),
            "Record record#4 is not connected to message.records"
        );
    }

    #[test]
    fn test_rejected_helper() {
        let err = GraphError::rejected("backend offline");
        assert!(matches!(err, GraphError::Rejected { .. }));
        assert_eq!(
            err.to_string(),
            "Record graph rejected the call: backend offline"
        );
    }
}
