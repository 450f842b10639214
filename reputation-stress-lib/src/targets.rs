//! Loading target domains from disk.
//!
//! Two formats are accepted: a JSON document of the form
//! `{"domains": ["a.com", "b.com"]}` and a plain text file with one domain
//! per line.

use crate::error::StressError;
use crate::utils::is_valid_domain;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct DomainsFile {
    #[serde(default)]
    domains: Vec<String>,
}

/// Load targets, picking the format from the file extension.
///
/// `.json` files are parsed as JSON, anything else as a line-based list.
pub fn load_targets<P: AsRef<Path>>(path: P) -> Result<Vec<String>, StressError> {
    let path = path.as_ref();
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        load_targets_from_json(path)
    } else {
        load_targets_from_text(path)
    }
}

/// Load targets from a `{"domains": [...]}` JSON document.
///
/// A document without a `domains` key yields an empty list; the caller
/// decides whether that is fatal.
pub fn load_targets_from_json<P: AsRef<Path>>(path: P) -> Result<Vec<String>, StressError> {
    let path = path.as_ref();
    let content = read_file(path)?;

    let parsed: DomainsFile = serde_json::from_str(&content).map_err(|e| {
        StressError::parse(format!(
            "Error loading domains from JSON '{}': {}",
            path.display(),
            e
        ))
    })?;

    Ok(keep_valid(parsed.domains))
}

/// Load targets from a text file with one domain per line.
///
/// Blank lines and `#` comments (whole-line or trailing) are skipped.
pub fn load_targets_from_text<P: AsRef<Path>>(path: P) -> Result<Vec<String>, StressError> {
    let content = read_file(path.as_ref())?;

    let domains = content
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();

    Ok(keep_valid(domains))
}

fn read_file(path: &Path) -> Result<String, StressError> {
    if !path.exists() {
        return Err(StressError::file_error(
            path.to_string_lossy(),
            "File not found",
        ));
    }

    fs::read_to_string(path).map_err(|e| {
        StressError::file_error(path.to_string_lossy(), format!("Failed to read file: {}", e))
    })
}

/// Drop entries that are not domain names, warning about each one.
fn keep_valid(domains: Vec<String>) -> Vec<String> {
    domains
        .into_iter()
        .map(|d| d.trim().to_string())
        .filter(|d| {
            let valid = is_valid_domain(d);
            if !valid && !d.is_empty() {
                warn!(domain = %d, "skipping invalid domain");
            }
            valid
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_json_targets() {
        let file = temp_file(".json", r#"{"domains": ["google.com", "example.org"]}"#);
        let targets = load_targets(file.path()).unwrap();
        assert_eq!(targets, vec!["google.com", "example.org"]);
    }

    #[test]
    fn test_load_json_without_domains_key() {
        let file = temp_file(".json", r#"{"hosts": ["google.com"]}"#);
        assert!(load_targets_from_json(file.path()).unwrap().is_empty());
    }

    #[test]
    fn test_load_json_invalid_document() {
        let file = temp_file(".json", "{not json");
        let err = load_targets_from_json(file.path()).unwrap_err();
        assert!(matches!(err, StressError::Parse { .. }));
    }

    #[test]
    fn test_load_text_targets() {
        let file = temp_file(
            ".txt",
            "# reputation targets\ngoogle.com\n\nexample.org  # trailing comment\nnot a domain\n",
        );
        let targets = load_targets(file.path()).unwrap();
        assert_eq!(targets, vec!["google.com", "example.org"]);
    }

    #[test]
    fn test_missing_file() {
        let err = load_targets("/definitely/not/here/domains.json").unwrap_err();
        assert!(matches!(err, StressError::File { .. }));
        assert!(err.is_fatal());
    }
}
