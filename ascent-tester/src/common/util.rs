use anyhow::{Context, Result};
use ascent_game::Rules;
use chrono::Utc;
use std::{fs, path::Path};

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Load and validate a rules file, or the built-in rules when no path is given.
pub fn load_rules(path: Option<&Path>) -> Result<Rules> {
    let Some(path) = path else {
        return Ok(Rules::default_config());
    };
    let raw =
        fs::read_to_string(path).with_context(|| format!("reading rules {}", path.display()))?;
    Rules::from_json(&raw).with_context(|| format!("parsing rules {}", path.display()))
}

/// UTC timestamp stamped on generated reports.
pub fn report_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(label: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "ascent-rules-{label}-{}.json",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        fs::write(&path, contents).expect("write rules");
        path
    }

    #[test]
    fn split_csv_trims_and_filters() {
        let parts = split_csv(" alpha, ,beta,  gamma ");
        assert_eq!(parts, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn missing_path_uses_defaults() {
        assert_eq!(load_rules(None).unwrap(), Rules::default_config());
    }

    #[test]
    fn rules_file_overrides_fields() {
        let path = temp_file("ok", r#"{ "max_level": 30, "cost_table": [0, 2, 5] }"#);
        let rules = load_rules(Some(&path)).unwrap();
        assert_eq!(rules.max_level, 30);
        assert_eq!(rules.failure_cost(7), 5);
    }

    #[test]
    fn invalid_rules_are_rejected_with_path() {
        let path = temp_file("bad", r#"{ "cost_table": [4, 1] }"#);
        let err = load_rules(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("ascent-rules-bad"));
    }

    #[test]
    fn timestamp_is_utc() {
        assert!(report_timestamp().ends_with('Z'));
    }
}
