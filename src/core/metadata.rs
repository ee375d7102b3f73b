//! Display metadata for fiat and crypto currencies

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Display metadata for a single currency, crypto or fiat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyMetadata {
    /// Crypto id (lowercase) or fiat code (uppercase).
    pub code: String,
    pub name: String,
    pub icon: Option<String>,
}

/// Shape of one entry in the fiat metadata file. Entries are either a bare
/// display name or an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FiatEntry {
    Name(String),
    Detailed {
        name: String,
        #[serde(default, alias = "flag", alias = "image")]
        icon: Option<String>,
    },
}

/// Fiat code to metadata table. Loaded once at startup and never mutated.
#[derive(Debug, Clone, Default)]
pub struct FiatTable {
    entries: HashMap<String, CurrencyMetadata>,
}

impl FiatTable {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Fiat metadata file missing: {}", path.display()))?;
        let table = Self::from_json(&raw)
            .with_context(|| format!("Failed to parse fiat metadata: {}", path.display()))?;
        info!(count = table.len(), path = %path.display(), "Loaded fiat metadata");
        Ok(table)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let parsed: HashMap<String, FiatEntry> = serde_json::from_str(raw)?;
        let entries = parsed
            .into_iter()
            .map(|(code, entry)| {
                let code = code.trim().to_uppercase();
                let (name, icon) = match entry {
                    FiatEntry::Name(name) => (name, None),
                    FiatEntry::Detailed { name, icon } => (name, icon),
                };
                debug!("Fiat metadata entry {}", code);
                (code.clone(), CurrencyMetadata { code, name, icon })
            })
            .collect();
        Ok(Self { entries })
    }

    /// Case-insensitive membership test.
    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(&code.to_uppercase())
    }

    pub fn get(&self, code: &str) -> Option<&CurrencyMetadata> {
        self.entries.get(&code.to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by code.
    pub fn sorted(&self) -> Vec<&CurrencyMetadata> {
        let mut all: Vec<_> = self.entries.values().collect();
        all.sort_by(|a, b| a.code.cmp(&b.code));
        all
    }
}

impl FromIterator<CurrencyMetadata> for FiatTable {
    fn from_iter<I: IntoIterator<Item = CurrencyMetadata>>(iter: I) -> Self {
        let entries = iter
            .into_iter()
            .map(|mut meta| {
                meta.code = meta.code.to_uppercase();
                (meta.code.clone(), meta)
            })
            .collect();
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const METADATA_JSON: &str = r#"{
        "usd": {"name": "US Dollar", "flag": "🇺🇸"},
        "EUR": {"name": "Euro"},
        "INR": "Indian Rupee"
    }"#;

    #[test]
    fn test_from_json_normalizes_codes() {
        let table = FiatTable::from_json(METADATA_JSON).unwrap();
        assert_eq!(table.len(), 3);
        assert!(table.contains("usd"));
        assert!(table.contains("USD"));
        assert!(table.contains("eur"));
        assert!(!table.contains("bitcoin"));

        let usd = table.get("usd").unwrap();
        assert_eq!(usd.code, "USD");
        assert_eq!(usd.name, "US Dollar");
        assert_eq!(usd.icon.as_deref(), Some("🇺🇸"));

        let inr = table.get("inr").unwrap();
        assert_eq!(inr.name, "Indian Rupee");
        assert!(inr.icon.is_none());
    }

    #[test]
    fn test_sorted_orders_by_code() {
        let table = FiatTable::from_json(METADATA_JSON).unwrap();
        let codes: Vec<_> = table.sorted().iter().map(|m| m.code.as_str()).collect();
        assert_eq!(codes, vec!["EUR", "INR", "USD"]);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = FiatTable::load("/definitely/not/here/currency_metadata.json");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Fiat metadata file missing")
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(METADATA_JSON.as_bytes()).unwrap();

        let table = FiatTable::load(file.path()).unwrap();
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_load_malformed_file_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[1, 2, 3]").unwrap();

        let result = FiatTable::load(file.path());
        assert!(result.is_err());
    }
}
