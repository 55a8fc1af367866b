//! Event forwarders.

use crate::domain::TxRecord;
use crate::ports::outbound::{EventForwarder, ForwardError};
use parking_lot::Mutex;
use tracing::info;

/// Logs every committed transition.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingForwarder;

impl EventForwarder for TracingForwarder {
    fn name(&self) -> &str {
        "tracing"
    }

    fn forward(&self, record: &TxRecord) -> Result<(), ForwardError> {
        info!(
            tx_id = record.tx_id,
            status = %record.status,
            selector = %hex::encode(record.params.execution_selector),
            target = %hex::encode(record.params.target),
            "transaction event"
        );
        Ok(())
    }
}

/// In-memory forwarder for testing that stores records.
#[derive(Debug, Default)]
pub struct RecordingForwarder {
    records: Mutex<Vec<TxRecord>>,
    reject: bool,
}

impl RecordingForwarder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A forwarder that records and then reports every event as rejected.
    pub fn rejecting() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            reject: true,
        }
    }

    pub fn records(&self) -> Vec<TxRecord> {
        self.records.lock().clone()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl EventForwarder for RecordingForwarder {
    fn name(&self) -> &str {
        "recording"
    }

    fn forward(&self, record: &TxRecord) -> Result<(), ForwardError> {
        self.records.lock().push(record.clone());
        if self.reject {
            return Err(ForwardError::Rejected(format!("transaction {}", record.tx_id)));
        }
        Ok(())
    }
}
