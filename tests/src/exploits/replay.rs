//! # Envelope Replay & Forgery
//!
//! Attacks on the signed meta-transaction path.
//!
//! ## Attack Vectors
//!
//! - Resubmitting an accepted envelope
//! - Resubmitting an envelope whose execution failed
//! - Submitting an envelope signed for another chain or another engine
//! - Editing any signed field after signing
//! - Relaying after the deadline or above the signed gas price cap
//! - Malleated (high-S), wrong-`v` and truncated signatures
//!
//! ## Expected Defense
//!
//! A verified envelope burns the signer's nonce exactly once, whatever the
//! execution outcome. Everything else is rejected before the nonce moves.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use guardian_core::domain::{invert_s, prepare_meta_tx, sign_meta_tx};
    use guardian_core::{
        ExecutionFailure, GuardApi, GuardError, MetaEntryPoint, MetaTransaction, SystemOperation,
        TimeSource, TxStatus,
    };
    use guardian_telemetry::META_TX_REJECTED;
    use proptest::prelude::*;

    fn timelock_envelope(h: &Harness, secs: u64) -> MetaTransaction {
        h.sign_operation(&SystemOperation::UpdateTimeLockPeriod(secs))
    }

    fn assert_nonce_untouched(h: &Harness) {
        assert_eq!(h.engine.get_signer_nonce(&h.owner_address()), 0);
        assert_eq!(h.engine.time_lock_period(), 3_600);
    }

    // =========================================================================
    // NONCES
    // =========================================================================

    #[test]
    fn test_accepted_envelope_cannot_be_replayed() {
        let h = Harness::new();
        let meta = timelock_envelope(&h, 120);
        h.engine
            .request_and_approve_meta(h.as_broadcaster(), &meta)
            .unwrap();

        let rejected_before = META_TX_REJECTED
            .with_label_values(&["replay_integrity"])
            .get();
        assert_eq!(
            h.engine.request_and_approve_meta(h.as_broadcaster(), &meta),
            Err(GuardError::InvalidNonce {
                supplied: 0,
                expected: 1
            })
        );
        assert!(
            META_TX_REJECTED
                .with_label_values(&["replay_integrity"])
                .get()
                > rejected_before
        );
        assert_eq!(h.engine.get_signer_nonce(&h.owner_address()), 1);
    }

    #[test]
    fn test_failed_execution_still_burns_nonce() {
        let h = Harness::new();
        let meta = timelock_envelope(&h, 0);

        let done = h
            .engine
            .request_and_approve_meta(h.as_broadcaster(), &meta)
            .unwrap();
        assert_eq!(done.status, TxStatus::Failed);
        assert!(matches!(
            done.failure(),
            Some(ExecutionFailure::Engine(GuardError::InvalidArgument(_)))
        ));
        assert_eq!(h.engine.get_signer_nonce(&h.owner_address()), 1);
        assert!(matches!(
            h.engine.request_and_approve_meta(h.as_broadcaster(), &meta),
            Err(GuardError::InvalidNonce { .. })
        ));
    }

    #[test]
    fn test_future_nonce_rejected() {
        let h = Harness::new();
        let request = SystemOperation::UpdateTimeLockPeriod(120)
            .to_request(h.engine.address())
            .unwrap();
        let mut params = h.meta_params(MetaEntryPoint::RequestAndApprove, &h.owner);
        params.nonce = 1;
        let meta = h.sign_new_with(request, params, &h.owner);

        assert_eq!(
            h.engine.request_and_approve_meta(h.as_broadcaster(), &meta),
            Err(GuardError::InvalidNonce {
                supplied: 1,
                expected: 0
            })
        );
        assert_nonce_untouched(&h);
    }

    // =========================================================================
    // BINDING
    // =========================================================================

    #[test]
    fn test_foreign_chain_envelope_rejected() {
        let h = Harness::new();
        let request = SystemOperation::UpdateTimeLockPeriod(120)
            .to_request(h.engine.address())
            .unwrap();
        let mut params = h.meta_params(MetaEntryPoint::RequestAndApprove, &h.owner);
        params.chain_id = 1;
        let unsigned = prepare_meta_tx(
            &h.engine.address(),
            1,
            0,
            request.into_params(h.owner_address()),
            params,
        )
        .unwrap();
        let meta = sign_meta_tx(unsigned, &h.owner).unwrap();

        assert_eq!(
            h.engine.request_and_approve_meta(h.as_broadcaster(), &meta),
            Err(GuardError::ChainIdMismatch {
                expected: 31337,
                actual: 1
            })
        );
        assert_nonce_untouched(&h);
    }

    #[test]
    fn test_envelope_for_other_engine_rejected() {
        let h = Harness::new();
        let request = SystemOperation::UpdateTimeLockPeriod(120)
            .to_request(h.engine.address())
            .unwrap();
        let params = h.meta_params(MetaEntryPoint::RequestAndApprove, &h.owner);
        let unsigned = prepare_meta_tx(
            &[0x11; 20],
            31337,
            0,
            request.into_params(h.owner_address()),
            params,
        )
        .unwrap();
        let meta = sign_meta_tx(unsigned, &h.owner).unwrap();

        assert_eq!(
            h.engine.request_and_approve_meta(h.as_broadcaster(), &meta),
            Err(GuardError::InvalidSignature)
        );
        assert_nonce_untouched(&h);
    }

    #[test]
    fn test_tampered_fields_rejected() {
        let h = Harness::new();
        let meta = timelock_envelope(&h, 120);
        let longer = SystemOperation::UpdateTimeLockPeriod(1).encode_params().unwrap();

        let tampered: Vec<(&str, MetaTransaction)> = vec![
            ("params", {
                let mut m = meta.clone();
                m.tx.execution_params = longer;
                m
            }),
            ("gas_limit", {
                let mut m = meta.clone();
                m.tx.gas_limit = 1;
                m
            }),
            ("deadline", {
                let mut m = meta.clone();
                m.params.deadline += 1;
                m
            }),
            ("signer", {
                let mut m = meta.clone();
                m.params.signer = h.recovery_address();
                m
            }),
        ];

        for (field, envelope) in tampered {
            assert_eq!(
                h.engine.request_and_approve_meta(h.as_broadcaster(), &envelope),
                Err(GuardError::InvalidSignature),
                "{field}"
            );
        }
        assert_nonce_untouched(&h);
    }

    #[test]
    fn test_signature_by_other_key_rejected() {
        let h = Harness::new();
        let request = SystemOperation::UpdateTimeLockPeriod(120)
            .to_request(h.engine.address())
            .unwrap();
        let params = h.meta_params(MetaEntryPoint::RequestAndApprove, &h.owner);
        let meta = h.sign_new_with(request, params, &random_key());

        assert_eq!(
            h.engine.request_and_approve_meta(h.as_broadcaster(), &meta),
            Err(GuardError::InvalidSignature)
        );
        assert_nonce_untouched(&h);
    }

    // =========================================================================
    // FRESHNESS
    // =========================================================================

    #[test]
    fn test_expired_deadline_keeps_nonce() {
        let h = Harness::new();
        let request = SystemOperation::UpdateTimeLockPeriod(120)
            .to_request(h.engine.address())
            .unwrap();
        let mut params = h.meta_params(MetaEntryPoint::RequestAndApprove, &h.owner);
        params.deadline = h.clock.now() + 5;
        let meta = h.sign_new_with(request, params, &h.owner);

        h.clock.advance(6);
        assert_eq!(
            h.engine.request_and_approve_meta(h.as_broadcaster(), &meta),
            Err(GuardError::DeadlineInPast {
                deadline: START + 5,
                now: START + 6
            })
        );
        assert_nonce_untouched(&h);
    }

    #[test]
    fn test_gas_price_over_cap_keeps_nonce() {
        let h = Harness::new();
        let request = SystemOperation::UpdateTimeLockPeriod(120)
            .to_request(h.engine.address())
            .unwrap();
        let mut params = h.meta_params(MetaEntryPoint::RequestAndApprove, &h.owner);
        params.max_gas_price = 7u64.into();
        let meta = h.sign_new_with(request, params, &h.owner);

        let ctx = h.as_broadcaster().with_gas_price(8u64.into());
        assert!(matches!(
            h.engine.request_and_approve_meta(ctx, &meta),
            Err(GuardError::GasPriceExceedsMax { .. })
        ));
        assert_nonce_untouched(&h);
    }

    // =========================================================================
    // SIGNATURE ENCODING
    // =========================================================================

    #[test]
    fn test_high_s_twin_rejected() {
        let h = Harness::new();
        let mut meta = timelock_envelope(&h, 120);

        let mut s = [0u8; 32];
        s.copy_from_slice(&meta.signature[32..64]);
        meta.signature[32..64].copy_from_slice(&invert_s(&s));
        meta.signature[64] = if meta.signature[64] == 27 { 28 } else { 27 };

        assert_eq!(
            h.engine.request_and_approve_meta(h.as_broadcaster(), &meta),
            Err(GuardError::InvalidSValue)
        );
        assert_nonce_untouched(&h);
    }

    #[test]
    fn test_bad_v_rejected() {
        let h = Harness::new();
        for v in [0u8, 1, 29, 255] {
            let mut meta = timelock_envelope(&h, 120);
            meta.signature[64] = v;
            assert_eq!(
                h.engine.request_and_approve_meta(h.as_broadcaster(), &meta),
                Err(GuardError::InvalidVValue(v))
            );
        }
        assert_nonce_untouched(&h);
    }

    #[test]
    fn test_wrong_signature_length_rejected() {
        let h = Harness::new();
        let mut meta = timelock_envelope(&h, 120);
        meta.signature.truncate(64);
        assert_eq!(
            h.engine.request_and_approve_meta(h.as_broadcaster(), &meta),
            Err(GuardError::InvalidSignatureLength {
                actual: 64,
                expected: 65
            })
        );

        meta.signature.extend_from_slice(&[27, 0]);
        assert_eq!(
            h.engine.request_and_approve_meta(h.as_broadcaster(), &meta),
            Err(GuardError::InvalidSignatureLength {
                actual: 66,
                expected: 65
            })
        );
        assert_nonce_untouched(&h);
    }

    // =========================================================================
    // PROPERTIES
    // =========================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        /// Only the expected nonce is accepted and each acceptance advances
        /// the counter by exactly one.
        #[test]
        fn prop_nonce_advances_by_one(offsets in proptest::collection::vec(0u64..3, 1..8)) {
            let h = Harness::new();
            let mut expected = 0u64;

            for (i, offset) in offsets.into_iter().enumerate() {
                let request = SystemOperation::UpdateTimeLockPeriod(60 + i as u64)
                    .to_request(h.engine.address())
                    .unwrap();
                let mut params = h.meta_params(MetaEntryPoint::RequestAndApprove, &h.owner);
                params.nonce = expected + offset;
                let meta = h.sign_new_with(request, params, &h.owner);

                let outcome = h.engine.request_and_approve_meta(h.as_broadcaster(), &meta);
                if offset == 0 {
                    prop_assert!(outcome.is_ok());
                    expected += 1;
                } else {
                    prop_assert_eq!(
                        outcome,
                        Err(GuardError::InvalidNonce { supplied: expected + offset, expected })
                    );
                }
                prop_assert_eq!(h.engine.get_signer_nonce(&h.owner_address()), expected);
            }
        }
    }
}
