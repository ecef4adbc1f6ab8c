//! CLI output test vectors
//!
//! Fixed inputs for the formats the CLI writes or reports: the config file
//! layout and the covenant inspection fields.

#[cfg(test)]
mod cli_test_vectors {
    use stealthcash::hash::{hash160, hash256};

    use crate::commands::covenant::inspect;
    use crate::commands::demo::DemoMode;
    use crate::config::CliConfig;

    /// Vector 1: default config file contents
    #[test]
    fn test_vector_1_default_config_json() {
        let json = serde_json::to_string_pretty(&CliConfig::default()).unwrap();
        let expected = r#"{
  "network": "mainnet",
  "fee_rate": 1,
  "dust_limit": 1000,
  "template_path": null,
  "p2sh_kind": "p2sh32"
}"#;
        assert_eq!(json, expected);
    }

    /// Vector 2: anchored redeem script
    #[test]
    fn test_vector_2_anchored_covenant() {
        let redeem = hex::decode(format!("20{}7514{}ac", "22".repeat(32), "11".repeat(20))).unwrap();
        let report = inspect(&redeem).unwrap();

        assert_eq!(report.proof_hash, Some("22".repeat(32)));
        assert_eq!(report.guard_hash, "11".repeat(20));
        assert_eq!(report.template_len, 1);
        assert_eq!(
            report.p2sh20,
            format!("a914{}87", hex::encode(hash160(&redeem)))
        );
        assert_eq!(
            report.p2sh32,
            format!("aa20{}87", hex::encode(hash256(&redeem)))
        );
    }

    /// Vector 3: vault redeem script without anchor
    #[test]
    fn test_vector_3_vault_covenant() {
        let redeem = hex::decode(format!("14{}51ac", "33".repeat(20))).unwrap();
        let report = inspect(&redeem).unwrap();
        assert_eq!(report.proof_hash, None);
        assert_eq!(report.guard_hash, "33".repeat(20));
        assert_eq!(report.template_len, 2);
    }

    /// Vector 4: demo mode names in JSON reports
    #[test]
    fn test_vector_4_demo_mode_names() {
        assert_eq!(
            serde_json::to_string(&DemoMode::Confidential).unwrap(),
            r#""confidential""#
        );
        assert_eq!(serde_json::to_string(&DemoMode::Vault).unwrap(), r#""vault""#);
    }
}
