//! End-to-end tests over the in-memory chain
//!
//! Each test funds a wallet, runs a full sender/receiver exchange and checks
//! what landed on the chain.

#[cfg(test)]
mod e2e_tests {
    use crate::chain::{ChainClient, MemoryChain};
    use crate::covenant::{
        parse_covenant_header, parse_covenant_unlocking, CovenantTemplate, P2shKind,
    };
    use crate::crypto::{PaycodeKeys, SecretScalar};
    use crate::envelope::{parse_envelope, verify_amount_proof_envelope};
    use crate::error::{Error, ErrorCategory};
    use crate::flow::{
        lock_confidential, lock_vault, pay_stealth, recover_payment, recover_stealth,
        unlock_confidential, unlock_vault, wallet_script, FlowParams,
    };
    use crate::hash::hash160;
    use crate::tx::{sign_p2pkh_input, Capability, Transaction, TxInput, TxOutput};
    use crate::zk::verify_proof_bytes;

    fn funded_wallet(chain: &MemoryChain, value: u64) -> SecretScalar {
        let wallet = SecretScalar::random();
        chain.fund(wallet_script(&wallet), value).unwrap();
        wallet
    }

    // ==================== Confidential Flow Tests ====================

    #[tokio::test]
    async fn test_full_confidential_loop() {
        let chain = MemoryChain::default();
        let sender_wallet = funded_wallet(&chain, 1_000_000);
        let sender_keys = PaycodeKeys::generate();
        let receiver = PaycodeKeys::generate();
        let params = FlowParams::default();

        let lock = lock_confidential(
            &chain,
            &sender_wallet,
            &receiver.paycode(),
            100_000,
            b"invoice 42",
            &params,
        )
        .await
        .unwrap();

        // Receiver verifies and pays the amount back to the sender's paycode
        let unlock = unlock_confidential(
            &chain,
            &receiver,
            &lock.txid,
            &sender_keys.paycode(),
            &params,
        )
        .await
        .unwrap();
        assert_eq!(unlock.amount, 100_000);
        assert_eq!(unlock.memo, b"invoice 42");
        assert_eq!(unlock.proof_hash, lock.covenant.proof_hash);
        assert!(!chain.is_unspent(&lock.covenant_outpoint).unwrap());

        // The unlock spends the covenant with sig, key, amount and redeem script
        let unlock_tx = chain.get_transaction(&unlock.txid).await.unwrap();
        let witness = parse_covenant_unlocking(&unlock_tx.inputs[0].unlocking_script).unwrap();
        assert_eq!(witness.amount, 100_000);
        assert_eq!(witness.redeem_script, lock.covenant.redeem_script);
        assert_eq!(
            hash160(&witness.pubkey),
            parse_covenant_header(&witness.redeem_script).unwrap().guard_hash
        );

        // The token moves with the value
        let payout = &unlock_tx.outputs[0];
        assert_eq!(payout.value, 100_000);
        let token = payout.token.as_ref().unwrap();
        assert_eq!(token.category, lock.category);
        assert_eq!(token.nft.as_ref().unwrap().capability, Capability::Mutable);
        assert_eq!(token.commitment(), lock.commitment.as_ref().map(|c| &c[..]));

        // The original sender finds the payout under their own paycode
        let recovered = recover_payment(&chain, &sender_keys, &unlock.txid, 0)
            .await
            .unwrap();
        assert_eq!(hash160(&recovered.pubkey), unlock.payout_hash);
        assert_eq!(recovered.outpoint, unlock.payout);
        assert_eq!(recovered.value, 100_000);
        assert_eq!(
            recovered.token.as_ref().map(|t| t.category),
            Some(lock.category)
        );
    }

    #[tokio::test]
    async fn test_envelope_on_record_verifies() {
        let chain = MemoryChain::default();
        let wallet = funded_wallet(&chain, 500_000);
        let receiver = PaycodeKeys::generate();
        let params = FlowParams::default();

        let lock = lock_confidential(&chain, &wallet, &receiver.paycode(), 100_000, b"", &params)
            .await
            .unwrap();
        let envelope = lock.envelope.clone().unwrap();
        let commitment = lock.commitment.unwrap();

        assert!(verify_amount_proof_envelope(&envelope, Some(&commitment)));
        let parsed = parse_envelope(&envelope).unwrap();
        assert_eq!(parsed.header.asset_id, Some(lock.category));
        assert!(verify_proof_bytes(&parsed.core));

        let mut tampered = envelope;
        let last = tampered.len() - 1;
        tampered[last] ^= 1;
        assert!(!verify_amount_proof_envelope(&tampered, Some(&commitment)));
    }

    #[tokio::test]
    async fn test_second_unlock_is_rejected_by_chain() {
        let chain = MemoryChain::default();
        let wallet = funded_wallet(&chain, 500_000);
        let receiver = PaycodeKeys::generate();
        let params = FlowParams::default();

        let lock = lock_confidential(&chain, &wallet, &receiver.paycode(), 20_000, b"", &params)
            .await
            .unwrap();
        unlock_confidential(&chain, &receiver, &lock.txid, &receiver.paycode(), &params)
            .await
            .unwrap();

        let err = unlock_confidential(&chain, &receiver, &lock.txid, &receiver.paycode(), &params)
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::External);
    }

    // ==================== Abort Tests ====================

    #[tokio::test]
    async fn test_wrong_receiver_aborts_before_broadcast() {
        let chain = MemoryChain::default();
        let wallet = funded_wallet(&chain, 500_000);
        let receiver = PaycodeKeys::generate();
        let intruder = PaycodeKeys::generate();
        let params = FlowParams::default();

        let lock = lock_confidential(&chain, &wallet, &receiver.paycode(), 30_000, b"", &params)
            .await
            .unwrap();
        let err = unlock_confidential(&chain, &intruder, &lock.txid, &intruder.paycode(), &params)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CommitmentMismatch));
        assert!(chain.is_unspent(&lock.covenant_outpoint).unwrap());

        // The real receiver can still unlock
        unlock_confidential(&chain, &receiver, &lock.txid, &receiver.paycode(), &params)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_template_disagreement_aborts() {
        let chain = MemoryChain::default();
        let wallet = funded_wallet(&chain, 500_000);
        let receiver = PaycodeKeys::generate();
        let sender_params = FlowParams {
            template: CovenantTemplate::from_hex("51ac").unwrap(),
            ..FlowParams::default()
        };

        let lock = lock_confidential(
            &chain,
            &wallet,
            &receiver.paycode(),
            30_000,
            b"",
            &sender_params,
        )
        .await
        .unwrap();
        let err = unlock_confidential(
            &chain,
            &receiver,
            &lock.txid,
            &receiver.paycode(),
            &FlowParams::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::ProofHashMismatch));
        assert!(chain.is_unspent(&lock.covenant_outpoint).unwrap());

        // Agreeing on the template unlocks it
        let unlock = unlock_confidential(
            &chain,
            &receiver,
            &lock.txid,
            &receiver.paycode(),
            &sender_params,
        )
        .await
        .unwrap();
        assert_eq!(unlock.amount, 30_000);
    }

    // ==================== Variant Tests ====================

    #[tokio::test]
    async fn test_p2sh20_covenant() {
        let chain = MemoryChain::default();
        let wallet = funded_wallet(&chain, 500_000);
        let receiver = PaycodeKeys::generate();
        let params = FlowParams {
            p2sh_kind: P2shKind::P2sh20,
            ..FlowParams::default()
        };

        let lock = lock_confidential(&chain, &wallet, &receiver.paycode(), 40_000, b"", &params)
            .await
            .unwrap();
        let script = &lock.covenant.locking_script;
        assert_eq!(script.len(), 23);
        assert_eq!(&script[..2], &[0xa9, 0x14]);

        let unlock = unlock_confidential(&chain, &receiver, &lock.txid, &receiver.paycode(), &params)
            .await
            .unwrap();
        assert_eq!(unlock.amount, 40_000);
    }

    #[tokio::test]
    async fn test_vault_flow() {
        let chain = MemoryChain::default();
        let wallet = funded_wallet(&chain, 500_000);
        let receiver = PaycodeKeys::generate();
        let params = FlowParams::default();

        let lock = lock_vault(&chain, &wallet, &receiver.paycode(), 60_000, b"rent", &params)
            .await
            .unwrap();
        assert!(lock.envelope.is_none());
        assert!(lock.covenant.proof_hash.is_none());

        let intruder = PaycodeKeys::generate();
        let err = unlock_vault(&chain, &intruder, &lock.txid, &intruder.paycode(), &params)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CovenantMismatch));

        let unlock = unlock_vault(&chain, &receiver, &lock.txid, &receiver.paycode(), &params)
            .await
            .unwrap();
        assert_eq!(unlock.amount, 60_000);
        assert_eq!(unlock.memo, b"rent");
        assert!(unlock.proof_hash.is_none());

        let found = recover_stealth(&chain, &receiver, &unlock.txid).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, 60_000);
    }

    // ==================== Stealth Payment Tests ====================

    #[tokio::test]
    async fn test_stealth_payment_is_spendable() {
        let chain = MemoryChain::default();
        let wallet = funded_wallet(&chain, 300_000);
        let receiver = PaycodeKeys::generate();
        let params = FlowParams::default();

        let sent = pay_stealth(&chain, &wallet, &receiver.paycode(), 75_000, &params)
            .await
            .unwrap();
        assert!(sent.change.is_some());

        let recovered = recover_payment(&chain, &receiver, &sent.txid, 0).await.unwrap();
        assert_eq!(hash160(&recovered.pubkey), sent.child_hash);

        // Spend the one-time output with the recovered key
        let spent = chain.get_transaction(&sent.txid).await.unwrap().outputs[0].clone();
        let destination = SecretScalar::random();
        let mut tx = Transaction {
            inputs: vec![TxInput::new(recovered.outpoint)],
            outputs: vec![TxOutput::new(74_000, wallet_script(&destination))],
            ..Transaction::default()
        };
        sign_p2pkh_input(&mut tx, 0, &spent, &recovered.secret.to_scalar()).unwrap();
        chain.broadcast(&tx.serialize().unwrap()).await.unwrap();

        assert!(!chain.is_unspent(&recovered.outpoint).unwrap());
        assert!(chain.get_utxo(&wallet_script(&destination)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_change_output_is_not_a_stealth_hit() {
        let chain = MemoryChain::default();
        let wallet = funded_wallet(&chain, 300_000);
        let receiver = PaycodeKeys::generate();

        let sent = pay_stealth(&chain, &wallet, &receiver.paycode(), 10_000, &FlowParams::default())
            .await
            .unwrap();
        let change = sent.change.unwrap();

        let found = recover_stealth(&chain, &receiver, &sent.txid).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_ne!(found[0].outpoint, change);
        assert!(matches!(
            recover_payment(&chain, &receiver, &sent.txid, change.vout).await,
            Err(Error::DerivationMismatch { .. })
        ));
    }
}
