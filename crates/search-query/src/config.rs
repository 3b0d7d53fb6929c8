use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{QueryError, Result};

pub const SEARCH_CONFIG_FILENAME: &str = "search-query.json";
pub const SEARCH_CONFIG_VERSION: &str = "1.0.0";

const PORTAL_ALLOWED_FIELDS: &[&str] = &[
    "access",
    "bbox",
    "categories",
    "categoryFilter",
    "created",
    "culture",
    "description",
    "group",
    "id",
    "isopendata",
    "isviewonly",
    "modified",
    "name",
    "orgid",
    "owner",
    "searchUserAccess",
    "searchUserName",
    "snippet",
    "tags",
    "term",
    "title",
    "type",
    "typekeywords",
];

const PORTAL_FILTERABLE_FIELDS: &[&str] = &["name", "owner", "tags", "title", "type", "typekeywords"];

const PORTAL_PARAM_FIELDS: &[&str] = &["bbox", "searchUserAccess", "searchUserName"];

const OGC_RESERVED_FIELDS: &[&str] = &[
    "term",
    "bbox",
    "fields",
    "flatten",
    "limit",
    "startindex",
    "sortBy",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub version: String,
    pub portal: PortalSettings,
    pub ogc: OgcSettings,
}

/// Settings for the key/value search-parameter backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalSettings {
    /// Fields rendered at all; everything else is dropped at compile time.
    pub allowed_fields: Vec<String>,
    /// Fields whose `exact` values go to the separate `filter` component.
    pub filterable_fields: Vec<String>,
    /// Fields sent as request parameters instead of query text.
    pub param_fields: Vec<String>,
}

/// Settings for the boolean filter-expression backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OgcSettings {
    /// Fields handled by other request components and never put in `filter`.
    pub reserved_fields: Vec<String>,
    pub default_limit: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::default_new()
    }
}

impl SearchConfig {
    pub fn default_new() -> Self {
        Self {
            version: SEARCH_CONFIG_VERSION.to_string(),
            portal: PortalSettings {
                allowed_fields: to_strings(PORTAL_ALLOWED_FIELDS),
                filterable_fields: to_strings(PORTAL_FILTERABLE_FIELDS),
                param_fields: to_strings(PORTAL_PARAM_FIELDS),
            },
            ogc: OgcSettings {
                reserved_fields: to_strings(OGC_RESERVED_FIELDS),
                default_limit: 10,
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(QueryError::Config("version must not be empty".to_string()));
        }
        if self.portal.allowed_fields.is_empty() {
            return Err(QueryError::Config(
                "portal.allowed_fields must not be empty".to_string(),
            ));
        }
        if self.ogc.default_limit == 0 {
            return Err(QueryError::Config(
                "ogc.default_limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl PortalSettings {
    pub fn allows(&self, field: &str) -> bool {
        self.allowed_fields.iter().any(|allowed| allowed == field)
    }

    pub fn is_filterable(&self, field: &str) -> bool {
        self.filterable_fields.iter().any(|allowed| allowed == field)
    }

    pub fn is_param(&self, field: &str) -> bool {
        self.param_fields.iter().any(|param| param == field)
    }
}

impl OgcSettings {
    pub fn is_reserved(&self, field: &str) -> bool {
        self.reserved_fields.iter().any(|reserved| reserved == field)
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// Loads the config from `dir`, writing the defaults when none exists yet.
pub fn load_search_config(dir: &Path) -> Result<SearchConfig> {
    std::fs::create_dir_all(dir).map_err(|error| {
        QueryError::Config(format!(
            "failed to create config directory {}: {error}",
            dir.display()
        ))
    })?;

    let path = search_config_path(dir);
    if !path.exists() {
        let config = SearchConfig::default_new();
        write_search_config(&path, &config)?;
        return Ok(config);
    }

    read_search_config(&path)
}

pub fn read_search_config(path: &Path) -> Result<SearchConfig> {
    let data = std::fs::read_to_string(path)?;
    let config: SearchConfig = serde_json::from_str(&data).map_err(|error| {
        QueryError::Config(format!(
            "failed to parse search config {}: {error}",
            path.display()
        ))
    })?;
    if config.version != SEARCH_CONFIG_VERSION {
        return Err(QueryError::Config(format!(
            "unsupported search config version {}",
            config.version
        )));
    }
    config.validate()?;
    Ok(config)
}

pub fn write_search_config(path: &Path, config: &SearchConfig) -> Result<()> {
    config.validate()?;
    let data = serde_json::to_string_pretty(config)
        .map_err(|error| QueryError::Serialization(error.to_string()))?;
    std::fs::write(path, data)?;
    Ok(())
}

pub fn search_config_path(dir: &Path) -> PathBuf {
    dir.join(SEARCH_CONFIG_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_config_is_valid() {
        let config = SearchConfig::default_new();
        assert!(config.validate().is_ok());
        assert!(config.portal.allows("tags"));
        assert!(!config.portal.allows("customField"));
        assert!(config.portal.is_filterable("title"));
        assert!(config.ogc.is_reserved("flatten"));
    }

    #[test]
    fn load_creates_defaults_then_reads_them_back() {
        let dir = tempdir().expect("tempdir");
        let created = load_search_config(dir.path()).expect("create");
        assert!(search_config_path(dir.path()).exists());

        let mut changed = created.clone();
        changed.ogc.default_limit = 50;
        write_search_config(&search_config_path(dir.path()), &changed).expect("write");

        let loaded = load_search_config(dir.path()).expect("load");
        assert_eq!(loaded.ogc.default_limit, 50);
    }

    #[test]
    fn rejects_invalid_settings() {
        let mut config = SearchConfig::default_new();
        config.ogc.default_limit = 0;
        assert!(matches!(config.validate(), Err(QueryError::Config(_))));

        let dir = tempdir().expect("tempdir");
        let path = search_config_path(dir.path());
        std::fs::write(&path, "{\"version\": \"9.9.9\"}").expect("write");
        assert!(read_search_config(&path).is_err());
    }
}
