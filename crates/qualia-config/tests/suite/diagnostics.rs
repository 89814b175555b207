use pretty_assertions::assert_eq;
use qualia_config::{ConfigWarning, QualiaConfig};

#[test]
fn reports_unknown_keys_with_full_paths() {
    let text = r#"
typo = 1

[checking]
paralel_flow = false

[checker.nullness]
covariance = "invariant"
"#;
    let (_config, diagnostics) = QualiaConfig::load_from_str_with_diagnostics(text).unwrap();
    assert_eq!(
        diagnostics.unknown_keys,
        vec!["checker.nullness.covariance", "checking.paralel_flow", "typo"]
    );
}

#[test]
fn warns_about_settings_that_cannot_take_effect() {
    let text = r#"
[checking]
checkers = ["nullness", "units"]
max_block_visits = 0

[checker.ownership]
default_precedence = "declaration"
"#;
    let (_config, diagnostics) = QualiaConfig::load_from_str_with_diagnostics(text).unwrap();
    assert!(diagnostics.unknown_keys.is_empty());
    assert_eq!(
        diagnostics.warnings,
        vec![
            ConfigWarning::UnknownChecker {
                name: "units".to_owned()
            },
            ConfigWarning::InactiveOverride {
                name: "ownership".to_owned()
            },
            ConfigWarning::InvalidValue {
                toml_path: "checking.max_block_visits".to_owned(),
                message: "must be at least 1; every routine would stop before its first block".to_owned(),
            },
        ]
    );
}

#[test]
fn clean_configs_have_no_diagnostics() {
    let (_config, diagnostics) =
        QualiaConfig::load_from_str_with_diagnostics("[checking]\ncheckers = [\"guieffect\"]\n").unwrap();
    assert!(diagnostics.is_empty());
}
