//! # Concurrent Submission Races
//!
//! Parallel callers fighting over the same record or the same nonce.
//!
//! ## Attack Vectors
//!
//! - Several approvers approving one record at once, hoping for a double call
//! - Two envelopes signed with the same nonce relayed simultaneously
//! - Parallel requests hoping to collide on a transaction id
//!
//! ## Expected Defense
//!
//! Status transitions and nonce consumption happen under one lock, so
//! exactly one contender wins and the rest see a clean rejection.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use guardian_core::{GuardApi, GuardError, SystemOperation, TxStatus};
    use std::collections::BTreeSet;
    use std::thread;

    const CONTENDERS: usize = 8;

    #[test]
    fn test_parallel_approvals_run_once() {
        let h = Harness::new();
        h.register_transfer();
        let pending = h
            .engine
            .request(h.as_owner(), h.transfer_request(7))
            .unwrap();
        h.elapse_time_lock();

        let outcomes: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = (0..CONTENDERS)
                .map(|_| s.spawn(|| h.engine.approve(h.as_owner(), pending.tx_id)))
                .collect();
            handles.into_iter().map(|j| j.join().unwrap()).collect()
        });

        let winners = outcomes.iter().filter(|o| o.is_ok()).count();
        assert_eq!(winners, 1);
        for outcome in outcomes.iter().filter(|o| o.is_err()) {
            assert!(matches!(
                outcome,
                Err(GuardError::StatusMismatch {
                    expected: TxStatus::Pending,
                    ..
                })
            ));
        }
        assert_eq!(h.callee.call_count(), 1);
        assert_eq!(
            h.engine.get_transaction(pending.tx_id).unwrap().status,
            TxStatus::Completed
        );
    }

    #[test]
    fn test_same_nonce_envelopes_consume_once() {
        let h = Harness::new();
        let envelopes: Vec<_> = [120u64, 240]
            .iter()
            .map(|secs| h.sign_operation(&SystemOperation::UpdateTimeLockPeriod(*secs)))
            .collect();
        assert_eq!(envelopes[0].params.nonce, envelopes[1].params.nonce);

        let outcomes: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = envelopes
                .iter()
                .map(|meta| s.spawn(|| h.engine.request_and_approve_meta(h.as_broadcaster(), meta)))
                .collect();
            handles.into_iter().map(|j| j.join().unwrap()).collect()
        });

        assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
        assert!(outcomes.iter().any(|o| *o
            == Err(GuardError::InvalidNonce {
                supplied: 0,
                expected: 1
            })));
        assert_eq!(h.engine.get_signer_nonce(&h.owner_address()), 1);
        assert!([120, 240].contains(&h.engine.time_lock_period()));
    }

    #[test]
    fn test_parallel_requests_get_distinct_ids() {
        let h = Harness::new();
        h.register_transfer();

        let ids: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = (0..CONTENDERS)
                .map(|i| {
                    let h = &h;
                    s.spawn(move || {
                        h.engine
                            .request(h.as_owner(), h.transfer_request(i as u64 + 1))
                            .map(|record| record.tx_id)
                    })
                })
                .collect();
            handles.into_iter().map(|j| j.join().unwrap().unwrap()).collect()
        });

        let distinct: BTreeSet<_> = ids.iter().copied().collect();
        assert_eq!(distinct.len(), CONTENDERS);
        assert_eq!(
            h.engine.pending_transactions(),
            distinct.into_iter().collect::<Vec<_>>()
        );
    }
}
