//! Property-based tests for CLI input handling
//!
//! Properties tested:
//! - Config files survive a save/load cycle for any valid settings
//! - Hex and paycode arguments never panic on arbitrary text
//! - Covenant inspection rejects arbitrary bytes cleanly

#[cfg(test)]
mod property_tests {
    use proptest::prelude::*;
    use tempfile::tempdir;

    use crate::commands::covenant::inspect;
    use crate::commands::paycode::{resolve, PaycodeSource};
    use crate::commands::{decode_hex, decode_hex_array};
    use crate::config::{CliConfig, Network};

    fn network() -> impl Strategy<Value = Network> {
        prop_oneof![Just(Network::Mainnet), Just(Network::Chipnet)]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Any valid config reads back unchanged
        #[test]
        fn prop_config_save_load(
            network in network(),
            fee_rate in 1u64..10_000,
            dust_limit in any::<u64>(),
            p2sh20 in any::<bool>(),
        ) {
            let dir = tempdir().unwrap();
            let path = dir.path().join("config.json");
            let config = CliConfig {
                network,
                fee_rate,
                dust_limit,
                template_path: None,
                p2sh_kind: if p2sh20 { "p2sh20" } else { "p2sh32" }.into(),
            };
            config.save(&path).unwrap();
            prop_assert_eq!(CliConfig::load(&path).unwrap(), config);
        }

        /// Hex decoding matches the encoder and only accepts the exact length
        #[test]
        fn prop_hex_array_length(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
            let text = hex::encode(&bytes);
            prop_assert_eq!(decode_hex("x", &text).unwrap(), bytes.clone());
            let fixed = decode_hex_array::<32>("x", &text);
            prop_assert_eq!(fixed.is_ok(), bytes.len() == 32);
        }

        /// Arbitrary paycode text is an error, never a panic
        #[test]
        fn prop_paycode_text_never_panics(text in "\\PC{0,120}") {
            let _ = resolve(&PaycodeSource::Encoded(text));
        }

        /// Arbitrary redeem bytes either parse or fail cleanly
        #[test]
        fn prop_covenant_inspect_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..80)) {
            if let Ok(report) = inspect(&bytes) {
                prop_assert_eq!(report.guard_hash.len(), 40);
            }
        }
    }
}
