//! # Whitelist Bypass
//!
//! External calls may only reach targets whitelisted for their selector.
//!
//! ## Attack Vectors
//!
//! - Requesting a call to an unlisted target
//! - Requesting while the target is listed, then relying on approval after it
//!   has been removed
//!
//! ## Expected Defense
//!
//! The whitelist is checked at request time and again at execution time. A
//! record whose target was delisted in between ends FAILED without the
//! callee ever being invoked.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use guardian_core::{
        ExecutionFailure, GuardApi, GuardConfigAction, GuardError, MetaEntryPoint, TxStatus,
    };

    #[test]
    fn test_unlisted_target_rejected_at_request() {
        let h = Harness::new();
        let selector = h.register_transfer();
        let mut request = h.transfer_request(1);
        request.target = [0x78; 20];

        assert_eq!(
            h.engine.request(h.as_owner(), request),
            Err(GuardError::NotWhitelisted {
                selector,
                target: [0x78; 20]
            })
        );
        assert!(h.engine.pending_transactions().is_empty());
    }

    #[test]
    fn test_delisted_target_fails_at_execution() {
        let h = Harness::new();
        let selector = h.register_transfer();
        let pending = h
            .engine
            .request(h.as_owner(), h.transfer_request(10))
            .unwrap();

        let done = h.guard_batch(vec![GuardConfigAction::RemoveTargetFromWhitelist {
            selector,
            target: TARGET,
        }]);
        assert_eq!(done.status, TxStatus::Completed);

        let failed = h.engine.approve(h.as_owner(), pending.tx_id).unwrap();
        assert_eq!(failed.status, TxStatus::Failed);
        assert_eq!(
            failed.failure(),
            Some(ExecutionFailure::Engine(GuardError::NotWhitelisted {
                selector,
                target: TARGET
            }))
        );
        assert_eq!(h.callee.call_count(), 0);
        assert_eq!(h.engine.get_transaction(pending.tx_id).unwrap(), failed);
    }

    #[test]
    fn test_relisted_target_executes() {
        let h = Harness::new();
        let selector = h.register_transfer();
        let pending = h
            .engine
            .request(h.as_owner(), h.transfer_request(10))
            .unwrap();

        h.guard_batch(vec![
            GuardConfigAction::RemoveTargetFromWhitelist {
                selector,
                target: TARGET,
            },
            GuardConfigAction::AddTargetToWhitelist {
                selector,
                target: TARGET,
            },
        ]);
        let done = h.engine.approve(h.as_owner(), pending.tx_id).unwrap();
        assert_eq!(done.status, TxStatus::Completed);
        assert_eq!(h.callee.call_count(), 1);
    }

    #[test]
    fn test_meta_path_checks_whitelist_too() {
        let h = Harness::new();
        let raa = MetaEntryPoint::RequestAndApprove.handler();
        let selector = h.register_transfer_with(
            guardian_core::FunctionRegistration::new(
                TRANSFER_SIG,
                TRANSFER_OP,
                guardian_core::ActionBitmap::ALL_TIME_DELAY,
            )
            .with_handlers([raa]),
        );
        let mut request = h.transfer_request(1);
        request.target = [0x78; 20];

        let meta = h.sign_new(request, &h.owner);
        assert_eq!(
            h.engine.request_and_approve_meta(h.as_broadcaster(), &meta),
            Err(GuardError::NotWhitelisted {
                selector,
                target: [0x78; 20]
            })
        );
        assert_eq!(h.engine.get_signer_nonce(&h.owner_address()), 0);
    }

    /// A force-unregistered function has no schema, so no whitelist applies
    /// when a record created before the removal is approved.
    #[test]
    fn test_force_unregistered_function_skips_whitelist() {
        let h = Harness::new();
        let selector = h.register_transfer();
        let pending = h
            .engine
            .request(h.as_owner(), h.transfer_request(10))
            .unwrap();

        let done = h.guard_batch(vec![GuardConfigAction::UnregisterFunction {
            selector,
            safe: false,
        }]);
        assert_eq!(done.status, TxStatus::Completed);
        assert!(h.engine.get_function_whitelist(&selector).is_empty());

        let done = h.engine.approve(h.as_owner(), pending.tx_id).unwrap();
        assert_eq!(done.status, TxStatus::Completed);
        assert_eq!(h.callee.call_count(), 1);
    }
}
