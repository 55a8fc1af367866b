//! # Meta-Transaction Flows
//!
//! Signed envelopes submitted by a broadcaster:
//!
//! ```text
//! signer ──sign──→ envelope ──broadcaster──→ [request_and_approve_meta] ──→ COMPLETED | FAILED
//!                                        └─→ [approve_meta | cancel_meta] on a PENDING record
//! ```

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use guardian_core::domain::system::BROADCASTER_ROLE;
    use guardian_core::{
        role_id, ActionBitmap, CallContext, FunctionPermission, FunctionRegistration, GuardApi,
        GuardError, MetaEntryPoint, RoleConfigAction, SystemOperation, TimeSource, TxAction,
        TxStatus, U256,
    };
    use guardian_telemetry::NONCES_CONSUMED;
    use k256::ecdsa::SigningKey;

    const SIGNER_ROLE: &str = "SIGNER";
    const RELAYER_ROLE: &str = "RELAYER";

    /// Open `transfer` to the request-and-approve and approve meta paths.
    /// Returns a key holding the signing rights; the broadcaster relays.
    fn open_meta_transfer(h: &Harness) -> SigningKey {
        let raa = MetaEntryPoint::RequestAndApprove.handler();
        let approve = MetaEntryPoint::Approve.handler();
        let transfer = h.register_transfer_with(
            FunctionRegistration::new(TRANSFER_SIG, TRANSFER_OP, ActionBitmap::ALL_TIME_DELAY)
                .with_handlers([raa, approve]),
        );

        let signer = random_key();
        let done = h.role_batch(vec![
            RoleConfigAction::CreateRole {
                name: SIGNER_ROLE.into(),
                max_wallets: 2,
                permissions: vec![
                    FunctionPermission::new(raa, ActionBitmap::SIGN_META_REQUEST_AND_APPROVE, [transfer]),
                    FunctionPermission::new(approve, ActionBitmap::SIGN_META_APPROVE, [transfer]),
                ],
            },
            RoleConfigAction::AddWallet {
                role_id: role_id(SIGNER_ROLE),
                wallet: address(&signer),
            },
            RoleConfigAction::CreateRole {
                name: RELAYER_ROLE.into(),
                max_wallets: 2,
                permissions: vec![
                    FunctionPermission::new(raa, ActionBitmap::EXECUTE_META_REQUEST_AND_APPROVE, [transfer]),
                    FunctionPermission::new(approve, ActionBitmap::EXECUTE_META_APPROVE, [transfer]),
                ],
            },
            RoleConfigAction::AddWallet {
                role_id: role_id(RELAYER_ROLE),
                wallet: h.broadcaster_address(),
            },
        ]);
        assert_eq!(done.status, TxStatus::Completed, "{:?}", done.failure());
        signer
    }

    // =========================================================================
    // REQUEST AND APPROVE
    // =========================================================================

    #[test]
    fn test_meta_transfer_runs_in_one_step() {
        let h = Harness::new();
        let signer = open_meta_transfer(&h);
        let consumed_before = NONCES_CONSUMED.get();

        let params = h.meta_params(MetaEntryPoint::RequestAndApprove, &signer);
        let meta = h.sign_new_with(h.transfer_request(400), params, &signer);
        let done = h
            .engine
            .request_and_approve_meta(h.as_broadcaster(), &meta)
            .unwrap();

        assert_eq!(done.status, TxStatus::Completed);
        assert_eq!(done.params.requester, address(&signer));
        assert_eq!(done.approver, Some(address(&signer)));
        assert_eq!(done.release_time, h.clock.now());
        assert_eq!(done.result, TRANSFER_OK.to_vec());
        assert_eq!(h.callee.call_count(), 1);
        assert_eq!(h.engine.get_signer_nonce(&address(&signer)), 1);
        assert!(NONCES_CONSUMED.get() > consumed_before);
    }

    #[test]
    fn test_owner_runs_engine_operation_through_broadcaster() {
        let h = Harness::new();
        let meta = h.sign_operation(&SystemOperation::UpdateTimeLockPeriod(900));

        let done = h
            .engine
            .request_and_approve_meta(h.as_broadcaster(), &meta)
            .unwrap();
        assert_eq!(done.status, TxStatus::Completed);
        assert_eq!(h.engine.time_lock_period(), 900);
        assert_eq!(h.engine.get_signer_nonce(&h.owner_address()), 1);
        assert_eq!(h.forwarder.records().last(), Some(&done));
    }

    #[test]
    fn test_signer_cannot_relay_own_envelope() {
        let h = Harness::new();
        let meta = h.sign_operation(&SystemOperation::UpdateTimeLockPeriod(900));

        assert_eq!(
            h.engine.request_and_approve_meta(h.as_owner(), &meta),
            Err(GuardError::NoPermission {
                wallet: h.owner_address(),
                action: TxAction::ExecuteMetaRequestAndApprove,
                selector: MetaEntryPoint::RequestAndApprove.handler(),
            })
        );
        assert_eq!(h.engine.get_signer_nonce(&h.owner_address()), 0);
        assert_eq!(h.engine.time_lock_period(), 3_600);
    }

    #[test]
    fn test_requester_must_be_signer() {
        let h = Harness::new();
        let request = SystemOperation::UpdateTimeLockPeriod(900)
            .to_request(h.engine.address())
            .unwrap();
        let mut meta = h.sign_new(request, &h.owner);
        meta.tx.requester = h.recovery_address();

        // The signature no longer covers the envelope.
        assert_eq!(
            h.engine.request_and_approve_meta(h.as_broadcaster(), &meta),
            Err(GuardError::InvalidSignature)
        );
        assert_eq!(h.engine.get_signer_nonce(&h.owner_address()), 0);
    }

    #[test]
    fn test_gas_price_cap() {
        let h = Harness::new();
        let request = SystemOperation::UpdateTimeLockPeriod(900)
            .to_request(h.engine.address())
            .unwrap();
        let mut params = h.meta_params(MetaEntryPoint::RequestAndApprove, &h.owner);
        params.max_gas_price = U256::from(50u64);
        let meta = h.sign_new_with(request, params, &h.owner);

        let pricey = h.as_broadcaster().with_gas_price(U256::from(51u64));
        assert_eq!(
            h.engine.request_and_approve_meta(pricey, &meta),
            Err(GuardError::GasPriceExceedsMax {
                actual: U256::from(51u64),
                max: U256::from(50u64)
            })
        );

        let fair = h.as_broadcaster().with_gas_price(U256::from(50u64));
        let done = h.engine.request_and_approve_meta(fair, &meta).unwrap();
        assert_eq!(done.status, TxStatus::Completed);
    }

    #[test]
    fn test_deadline_is_inclusive() {
        let h = Harness::new();
        let request = SystemOperation::UpdateTimeLockPeriod(900)
            .to_request(h.engine.address())
            .unwrap();
        let mut params = h.meta_params(MetaEntryPoint::RequestAndApprove, &h.owner);
        params.deadline = h.clock.now() + 10;
        let meta = h.sign_new_with(request, params, &h.owner);

        h.clock.advance(10);
        let done = h
            .engine
            .request_and_approve_meta(h.as_broadcaster(), &meta)
            .unwrap();
        assert_eq!(done.status, TxStatus::Completed);
    }

    #[test]
    fn test_unsigned_generation_rejects_foreign_chain() {
        let h = Harness::new();
        let mut params = h.meta_params(MetaEntryPoint::RequestAndApprove, &h.owner);
        params.chain_id += 1;
        let request = SystemOperation::UpdateTimeLockPeriod(900)
            .to_request(h.engine.address())
            .unwrap();

        assert_eq!(
            h.engine.generate_unsigned_meta_tx_for_new(request, params),
            Err(GuardError::ChainIdMismatch {
                expected: 31337,
                actual: 31338
            })
        );
    }

    // =========================================================================
    // APPROVE & CANCEL EXISTING RECORDS
    // =========================================================================

    #[test]
    fn test_meta_approve_skips_time_lock() {
        let h = Harness::new();
        let signer = open_meta_transfer(&h);

        let pending = h
            .engine
            .request(h.as_owner(), h.transfer_request(10))
            .unwrap();
        let meta = h.sign_existing(pending.tx_id, MetaEntryPoint::Approve, &signer);
        let done = h.engine.approve_meta(h.as_broadcaster(), &meta).unwrap();

        assert_eq!(done.tx_id, pending.tx_id);
        assert_eq!(done.status, TxStatus::Completed);
        assert_eq!(done.approver, Some(address(&signer)));
        assert!(h.clock.now() < done.release_time);
    }

    #[test]
    fn test_meta_update_broadcaster_moves_relay_rights() {
        let h = Harness::new();
        let next = random_key();
        let request = SystemOperation::UpdateBroadcaster(address(&next))
            .to_request(h.engine.address())
            .unwrap();
        let pending = h.engine.request(h.as_owner(), request).unwrap();

        let meta = h.sign_existing(pending.tx_id, MetaEntryPoint::Approve, &h.owner);
        let done = h.engine.approve_meta(h.as_broadcaster(), &meta).unwrap();
        assert_eq!(done.status, TxStatus::Completed);
        assert_eq!(h.engine.broadcasters(), vec![address(&next)]);
        assert_eq!(
            h.engine.wallets_in_role(&role_id(BROADCASTER_ROLE)).unwrap(),
            vec![address(&next)]
        );

        let meta = h.sign_operation(&SystemOperation::UpdateTimeLockPeriod(120));
        assert!(matches!(
            h.engine.request_and_approve_meta(h.as_broadcaster(), &meta),
            Err(GuardError::NoPermission { action: TxAction::ExecuteMetaRequestAndApprove, .. })
        ));
        let done = h
            .engine
            .request_and_approve_meta(CallContext::new(address(&next)), &meta)
            .unwrap();
        assert_eq!(done.status, TxStatus::Completed);
        assert_eq!(h.engine.time_lock_period(), 120);
    }

    #[test]
    fn test_recovery_approves_ownership_transfer_by_envelope() {
        let h = Harness::new();
        let heir = [0x4D; 20];
        let request = SystemOperation::TransferOwnership(heir)
            .to_request(h.engine.address())
            .unwrap();
        let pending = h.engine.request(h.as_recovery(), request).unwrap();

        let meta = h.sign_existing(pending.tx_id, MetaEntryPoint::Approve, &h.recovery);
        let done = h.engine.approve_meta(h.as_broadcaster(), &meta).unwrap();
        assert_eq!(done.status, TxStatus::Completed);
        assert_eq!(h.engine.owner().unwrap(), heir);
    }

    #[test]
    fn test_owner_cannot_sign_ownership_transfer_request() {
        let h = Harness::new();
        let meta = h.sign_operation(&SystemOperation::TransferOwnership([0x4D; 20]));
        assert!(matches!(
            h.engine.request_and_approve_meta(h.as_broadcaster(), &meta),
            Err(GuardError::NoPermission { action: TxAction::SignMetaRequestAndApprove, .. })
        ));
        assert_eq!(h.engine.owner().unwrap(), h.owner_address());
    }

    #[test]
    fn test_meta_cancel_after_release_time() {
        let h = Harness::new();
        let request = SystemOperation::UpdateTimeLockPeriod(60)
            .to_request(h.engine.address())
            .unwrap();
        let pending = h.engine.request(h.as_owner(), request).unwrap();
        h.elapse_time_lock();

        let meta = h.sign_existing(pending.tx_id, MetaEntryPoint::Cancel, &h.owner);
        let cancelled = h.engine.cancel_meta(h.as_broadcaster(), &meta).unwrap();
        assert_eq!(cancelled.status, TxStatus::Cancelled);
        assert_eq!(cancelled.approver, Some(h.owner_address()));
        assert_eq!(h.engine.time_lock_period(), 3_600);
        assert!(h.engine.pending_transactions().is_empty());
    }

    #[test]
    fn test_existing_envelope_must_match_record() {
        let h = Harness::new();
        let request = SystemOperation::UpdateTimeLockPeriod(60)
            .to_request(h.engine.address())
            .unwrap();
        let first = h.engine.request(h.as_owner(), request.clone()).unwrap();
        let second = h.engine.request(h.as_owner(), request).unwrap();

        // Signed for the first record, replayed against the second.
        let mut meta = h.sign_existing(first.tx_id, MetaEntryPoint::Approve, &h.owner);
        meta.tx_id = second.tx_id;
        assert_eq!(
            h.engine.approve_meta(h.as_broadcaster(), &meta),
            Err(GuardError::InvalidSignature)
        );
        assert!(h.engine.get_transaction(first.tx_id).unwrap().is_pending());
        assert!(h.engine.get_transaction(second.tx_id).unwrap().is_pending());
    }
}
