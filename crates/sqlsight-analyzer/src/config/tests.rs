//! Tests for configuration loading

use super::*;
use indoc::indoc;
use pretty_assertions::assert_eq;
use std::io::Write;

mod config_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.row_threshold, 10_000);
        assert_eq!(config.informational_row_threshold, 10_000);
        assert_eq!(config.large_values_threshold, 50);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AnalyzerConfig::from_toml_str("row_threshold = 250000").unwrap();
        assert_eq!(config.row_threshold, 250_000);
        assert_eq!(config.large_values_threshold, 50);
    }

    #[test]
    fn test_full_toml() {
        let config = AnalyzerConfig::from_toml_str(indoc! {"
            row_threshold = 5000
            informational_row_threshold = 1000
            large_values_threshold = 200
        "})
        .unwrap();
        assert_eq!(
            config,
            AnalyzerConfig::default()
                .with_row_threshold(5000)
                .with_informational_row_threshold(1000)
                .with_large_values_threshold(200)
        );
    }

    #[test]
    fn test_rejects_zero_threshold() {
        let error = AnalyzerConfig::from_toml_str("row_threshold = 0").unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn test_rejects_wrong_type() {
        let error = AnalyzerConfig::from_toml_str("row_threshold = \"many\"").unwrap_err();
        assert!(matches!(error, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "large_values_threshold = 10").unwrap();
        let config = AnalyzerConfig::load(file.path()).unwrap();
        assert_eq!(config.large_values_threshold, 10);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let error = AnalyzerConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(error, ConfigError::Read { .. }));
        assert!(error.to_string().contains("absent.toml"));
    }
}
