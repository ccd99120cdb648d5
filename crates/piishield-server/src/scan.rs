//! `piishield scan`: mask a file or stdin from the command line

use anyhow::{Context, bail};
use piishield_pii::{Configuration, PIIShield, PIIType};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;

use crate::api::{MatchSummary, scan};

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Read from this file instead of stdin
    pub file: Option<PathBuf>,
    pub threshold: Option<f32>,
    /// `TYPE=STRATEGY` overrides
    pub strategies: Vec<String>,
    /// Print a JSON report instead of the masked text
    pub json: bool,
}

/// JSON report; holds masked output only
#[derive(Debug, Serialize)]
struct ScanReport {
    pii_found: bool,
    pii_count: usize,
    counts: BTreeMap<PIIType, usize>,
    matches: Vec<MatchSummary>,
    masked_text: String,
}

/// Apply CLI overrides to the configured detection settings
pub fn scan_config(base: Configuration, options: &ScanOptions) -> anyhow::Result<Configuration> {
    let mut config = base;

    if let Some(threshold) = options.threshold {
        config = config.with_threshold(threshold);
    }

    for flag in &options.strategies {
        let Some((pii_type, strategy)) = flag.split_once('=') else {
            bail!("Invalid --strategy '{}', expected TYPE=STRATEGY", flag);
        };
        config = config.with_named_strategy(pii_type, strategy)?;
    }

    config.validate()?;
    Ok(config)
}

/// Render the output for one text: masked text, or the JSON report
pub fn render(
    shield: &PIIShield,
    text: &str,
    config: &Configuration,
    json: bool,
) -> anyhow::Result<String> {
    let (matches, masked_text) = scan(shield, text, config)?;

    if !json {
        return Ok(masked_text);
    }

    let mut counts = BTreeMap::new();
    for m in &matches {
        *counts.entry(m.pii_type).or_insert(0) += 1;
    }

    let report = ScanReport {
        pii_found: !matches.is_empty(),
        pii_count: matches.len(),
        counts,
        matches,
        masked_text,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

fn read_input(file: Option<&PathBuf>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read stdin")?;
            Ok(input)
        }
    }
}

pub fn run(shield: &PIIShield, base: Configuration, options: &ScanOptions) -> anyhow::Result<()> {
    let config = scan_config(base, options)?;
    let text = read_input(options.file.as_ref())?;
    let output = render(shield, &text, &config, options.json)?;

    if options.json {
        println!("{}", output);
    } else {
        print!("{}", output);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use piishield_pii::MaskingStrategy;
    use std::io::Write;

    const EXAMPLE: &str = "My SSN is 123-45-6789, email j@x.com";

    #[test]
    fn test_strategy_flags() {
        let options = ScanOptions {
            strategies: vec!["email=full".to_string(), "SSN=REDACT".to_string()],
            threshold: Some(0.9),
            ..ScanOptions::default()
        };
        let config = scan_config(Configuration::default(), &options).unwrap();

        assert_eq!(config.confidence_threshold, 0.9);
        assert_eq!(config.strategy_override(PIIType::Email), Some(MaskingStrategy::Full));
        assert_eq!(config.strategy_override(PIIType::SSN), Some(MaskingStrategy::Redact));
    }

    #[test]
    fn test_bad_flags_rejected() {
        let options = ScanOptions {
            strategies: vec!["EMAIL".to_string()],
            ..ScanOptions::default()
        };
        let err = scan_config(Configuration::default(), &options).unwrap_err();
        assert!(err.to_string().contains("TYPE=STRATEGY"));

        let options = ScanOptions {
            threshold: Some(7.0),
            ..ScanOptions::default()
        };
        assert!(scan_config(Configuration::default(), &options).is_err());
    }

    #[test]
    fn test_render_masked_text() {
        let shield = PIIShield::new().unwrap();
        let config = Configuration::default().with_strategy(PIIType::Email, MaskingStrategy::Full);

        let output = render(&shield, EXAMPLE, &config, false).unwrap();
        assert_eq!(output, "My SSN is ***-**-6789, email [EMAIL]");
    }

    #[test]
    fn test_render_json_report() {
        let shield = PIIShield::new().unwrap();
        let output = render(&shield, EXAMPLE, &Configuration::default(), true).unwrap();

        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["pii_count"], 2);
        assert_eq!(json["counts"]["SSN"], 1);
        assert_eq!(json["counts"]["EMAIL"], 1);
        assert!(!output.contains("123-45-6789"));
        assert!(!output.contains("j@x.com"));
    }

    #[test]
    fn test_read_input_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", EXAMPLE).unwrap();

        let text = read_input(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(text, EXAMPLE);

        let missing = PathBuf::from("/nonexistent/input.txt");
        assert!(read_input(Some(&missing)).is_err());
    }
}
