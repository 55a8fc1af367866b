//! # Status Terminality
//!
//! COMPLETED, FAILED and CANCELLED are final.
//!
//! ## Attack Vectors
//!
//! - Approving a record twice to run its call twice
//! - Cancelling a record that already ran, to rewrite history
//! - Reviving a failed or cancelled record through a meta envelope
//! - Re-entering approval from inside the guarded call
//!
//! ## Expected Defense
//!
//! Every transition out of a terminal status fails with `StatusMismatch` and
//! leaves the record, the callee and the signer nonce untouched. `EXECUTING`
//! is visible to the callee while it runs.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use guardian_core::adapters::CalleeBehavior;
    use guardian_core::{
        CallFailure, GuardApi, GuardError, GuardedCall, MetaEntryPoint, SystemOperation, TxId,
        TxRecord, TxStatus,
    };
    use std::sync::{Arc, Mutex, Weak};

    fn terminal_records(h: &Harness) -> Vec<TxRecord> {
        h.register_transfer();

        let completed = h
            .engine
            .request(h.as_owner(), h.transfer_request(1))
            .unwrap();
        let failed = h
            .engine
            .request(h.as_owner(), h.transfer_request(5_000_000))
            .unwrap();
        let cancelled = h
            .engine
            .request(h.as_owner(), h.transfer_request(1))
            .unwrap();
        h.engine.cancel(h.as_owner(), cancelled.tx_id).unwrap();
        h.elapse_time_lock();
        h.engine.approve(h.as_owner(), completed.tx_id).unwrap();
        h.engine.approve(h.as_owner(), failed.tx_id).unwrap();

        let records: Vec<TxRecord> = [completed.tx_id, failed.tx_id, cancelled.tx_id]
            .into_iter()
            .map(|id| h.engine.get_transaction(id).unwrap())
            .collect();
        let statuses: Vec<TxStatus> = records.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![TxStatus::Completed, TxStatus::Failed, TxStatus::Cancelled]
        );
        records
    }

    #[test]
    fn test_terminal_records_reject_time_delay_transitions() {
        let h = Harness::new();
        let records = terminal_records(&h);
        let calls = h.callee.call_count();

        for record in &records {
            let mismatch = Err(GuardError::StatusMismatch {
                expected: TxStatus::Pending,
                actual: record.status,
            });
            assert_eq!(h.engine.approve(h.as_owner(), record.tx_id), mismatch);
            assert_eq!(h.engine.cancel(h.as_owner(), record.tx_id), mismatch);
            assert_eq!(&h.engine.get_transaction(record.tx_id).unwrap(), record);
        }
        assert_eq!(h.callee.call_count(), calls);
    }

    #[test]
    fn test_terminal_records_reject_meta_transitions() {
        let h = Harness::new();
        let records = terminal_records(&h);

        // The owner's meta grants cover engine operations only, so drive a
        // terminal engine-operation record as well.
        let op = h.run_as_owner(SystemOperation::UpdateTimeLockPeriod(60));
        assert_eq!(op.status, TxStatus::Completed);

        for tx_id in records.iter().map(|r| r.tx_id).chain([op.tx_id]) {
            let status = h.engine.get_transaction(tx_id).unwrap().status;
            for entry in [MetaEntryPoint::Approve, MetaEntryPoint::Cancel] {
                let meta = h.sign_existing(tx_id, entry, &h.owner);
                let outcome = match entry {
                    MetaEntryPoint::Cancel => h.engine.cancel_meta(h.as_broadcaster(), &meta),
                    _ => h.engine.approve_meta(h.as_broadcaster(), &meta),
                };
                assert_eq!(
                    outcome,
                    Err(GuardError::StatusMismatch {
                        expected: TxStatus::Pending,
                        actual: status,
                    }),
                    "tx {tx_id} via {entry:?}"
                );
            }
        }
        assert_eq!(h.engine.get_signer_nonce(&h.owner_address()), 0);
    }

    #[test]
    fn test_callee_observes_executing_and_cannot_reenter() {
        let h = Harness::new();
        let selector = h.register_transfer();

        let engine: Weak<TestEngine> = Arc::downgrade(&h.engine);
        let owner = h.as_owner();
        let seen: Arc<Mutex<Vec<(TxStatus, Result<TxRecord, GuardError>)>>> = Arc::default();
        let log = seen.clone();
        h.callee.on(
            TARGET,
            selector,
            CalleeBehavior::Hook(Arc::new(move |call: &GuardedCall| -> Result<Vec<u8>, CallFailure> {
                let engine = engine.upgrade().ok_or(CallFailure::Reverted {
                    reason: "engine dropped".into(),
                })?;
                let tx_id: TxId = call.tx_id;
                let status = engine.get_transaction(tx_id).map(|r| r.status);
                let again = engine.approve(owner, tx_id);
                log.lock().unwrap().push((status.unwrap_or(TxStatus::Pending), again));
                Ok(vec![1])
            })),
        );

        let pending = h
            .engine
            .request(h.as_owner(), h.transfer_request(3))
            .unwrap();
        h.elapse_time_lock();
        let done = h.engine.approve(h.as_owner(), pending.tx_id).unwrap();

        assert_eq!(done.status, TxStatus::Completed);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, TxStatus::Executing);
        assert_eq!(seen[0].1, Err(GuardError::ReentrantCall));
        assert_eq!(h.callee.call_count(), 1);
    }
}
