//! Wire-format test vectors
//!
//! Fixed inputs with known outputs for the encodings that must be bit-exact
//! across implementations: hashes, points, scripts, token prefixes, the
//! envelope framing and the signature preimage layout.

#[cfg(test)]
#[allow(non_snake_case)] // Curve notation uses G, H, P
mod wire_test_vectors {
    use k256::Scalar;

    use crate::covenant::{build_covenant, p2pkh_script, CovenantTemplate, GuardKey, P2shKind};
    use crate::crypto::{compress, generator_h_bytes, public_from_scalar, schnorr};
    use crate::encoding::{compactsize, push_data, script_number};
    use crate::envelope::{build_envelope, EnvelopeHeader, ENVELOPE_MAGIC};
    use crate::hash::{hash160, sha256, tagged};
    use crate::tx::{
        sighash_preimage, Capability, Outpoint, TokenData, Transaction, TxInput, TxOutput,
        SIGHASH_ALL_FORKID,
    };
    use crate::zk::{BIT_PROOF_LEN, PROOF_LEN};

    fn scalar(n: u64) -> Scalar {
        Scalar::from(n)
    }

    /// Vector 1: small multiples of G
    #[test]
    fn test_vector_1_generator_multiples() {
        assert_eq!(
            hex::encode(public_from_scalar(&scalar(1))),
            "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
        );
        assert_eq!(
            hex::encode(public_from_scalar(&scalar(2))),
            "02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5"
        );
        assert_eq!(
            hex::encode(public_from_scalar(&scalar(3))),
            "02f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9"
        );
    }

    /// Vector 2: hashes
    #[test]
    fn test_vector_2_hashes() {
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        let G = public_from_scalar(&scalar(1));
        assert_eq!(hex::encode(hash160(&G)), "751e76e8199196d454941c45d1b3a323f1433bd6");

        // tagged = sha256(len(label) || label || parts)
        assert_eq!(tagged(b"a", &[b"bc"]), sha256(&[0x01, b'a', b'b', b'c']));
    }

    /// Vector 3: pay-to-key-hash script for G
    #[test]
    fn test_vector_3_p2pkh() {
        let G = public_from_scalar(&scalar(1));
        assert_eq!(
            hex::encode(p2pkh_script(&hash160(&G))),
            "76a914751e76e8199196d454941c45d1b3a323f1433bd688ac"
        );
    }

    /// Vector 4: CompactSize, pushes and script numbers
    #[test]
    fn test_vector_4_encodings() {
        assert_eq!(hex::encode(compactsize(252)), "fc");
        assert_eq!(hex::encode(compactsize(253)), "fdfd00");
        assert_eq!(hex::encode(compactsize(65_536)), "fe00000100");
        // 2^32 needs the 0xff + u64 LE form
        assert_eq!(hex::encode(compactsize(1 << 32)), "ff0000000001000000");

        assert_eq!(hex::encode(push_data(&[0xab; 3])), "03ababab");
        assert_eq!(hex::encode(script_number(100_000)), "a08601");
        assert_eq!(hex::encode(script_number(-100_000)), "a08681");
        assert_eq!(hex::encode(script_number(255)), "ff00");
    }

    /// Vector 5: covenant header bytes
    #[test]
    fn test_vector_5_covenant_header() {
        let template = CovenantTemplate::from_hex("ac").unwrap();
        let covenant = build_covenant(
            GuardKey::Hash([0x11; 20]),
            Some(&[0x22; 32]),
            &template,
            P2shKind::P2sh32,
        )
        .unwrap();

        let expected = format!("20{}7514{}ac", "22".repeat(32), "11".repeat(20));
        assert_eq!(hex::encode(&covenant.redeem_script), expected);
        assert_eq!(covenant.redeem_script.len(), 33 + 1 + 21 + 1);

        let unanchored =
            build_covenant(GuardKey::Hash([0x11; 20]), None, &template, P2shKind::P2sh20).unwrap();
        assert_eq!(
            hex::encode(&unanchored.redeem_script),
            format!("14{}ac", "11".repeat(20))
        );
        assert_eq!(
            hex::encode(&unanchored.locking_script),
            format!("a914{}87", hex::encode(hash160(&unanchored.redeem_script)))
        );
    }

    /// Vector 6: token prefix for a mutable NFT
    #[test]
    fn test_vector_6_token_prefix() {
        let token = TokenData::nft([0xcc; 32], Capability::Mutable, vec![0xdd; 2]);
        assert_eq!(
            hex::encode(token.encode().unwrap()),
            format!("ef{}6102dddd", "cc".repeat(32))
        );

        let fungible = TokenData {
            category: [0x01; 32],
            nft: Some(crate::tx::Nft {
                capability: Capability::Minting,
                commitment: Vec::new(),
            }),
            amount: Some(5),
        };
        assert_eq!(
            hex::encode(fungible.encode().unwrap()),
            format!("ef{}3205", "01".repeat(32))
        );
    }

    /// Vector 7: envelope framing
    #[test]
    fn test_vector_7_envelope_framing() {
        let header = EnvelopeHeader {
            protocol_tag: b"t".to_vec(),
            range_bits: 64,
            ephemeral_pubkey: compress(&k256::ProjectivePoint::GENERATOR),
            generator_h: generator_h_bytes(),
            asset_id: None,
            output_index: 1,
            extra: Vec::new(),
        };
        let envelope = build_envelope(&header, &[0xee]);

        let mut expected = ENVELOPE_MAGIC.to_vec();
        let mut body = vec![0x01, b't', 0x01, 64, 33];
        body.extend_from_slice(&header.ephemeral_pubkey);
        body.push(33);
        body.extend_from_slice(&header.generator_h);
        body.extend_from_slice(&[0x00, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00]);
        expected.push(body.len() as u8);
        expected.extend_from_slice(&body);
        expected.extend_from_slice(&[0x01, 0xee]);

        assert_eq!(envelope, expected);
    }

    /// Vector 8: proof size
    #[test]
    fn test_vector_8_proof_size() {
        assert_eq!(BIT_PROOF_LEN, 33 + 33 + 4 * 32);
        assert_eq!(PROOF_LEN, 33 + 64 * 33 + 64 * 194);
        assert_eq!(PROOF_LEN, 14_561);
    }

    /// Vector 9: sighash preimage with a spent token
    #[test]
    fn test_vector_9_preimage_with_token() {
        let token = TokenData::nft([0xcc; 32], Capability::None, Vec::new());
        let spent = TxOutput::new(1_000, vec![0x51]).with_token(token.clone());
        let tx = Transaction {
            inputs: vec![TxInput::new(Outpoint::new([0xaa; 32], 2))],
            outputs: vec![TxOutput::new(900, vec![0x51])],
            ..Transaction::default()
        };
        let preimage = sighash_preimage(&tx, 0, &[0x51], &spent, SIGHASH_ALL_FORKID).unwrap();

        let prefix = token.encode().unwrap();
        let at = 4 + 32 + 32 + 36;
        assert_eq!(&preimage[at..at + prefix.len()], prefix.as_slice());
        assert_eq!(&preimage[at + prefix.len()..at + prefix.len() + 2], &[0x01, 0x51]);
    }

    /// Vector 10: Schnorr signatures are 64 bytes and deterministic
    #[test]
    fn test_vector_10_schnorr_shape() {
        let msg = sha256(b"vector");
        let sig = schnorr::sign(&scalar(1), &msg).unwrap();
        assert_eq!(sig, schnorr::sign(&scalar(1), &msg).unwrap());
        assert!(schnorr::verify(&public_from_scalar(&scalar(1)), &msg, &sig));
    }
}
