//! Ghost catalog store
//!
//! The catalog is fetched from a remote JSON endpoint, validated record by
//! record, and cached locally so the app works offline. A refresh either
//! replaces the whole catalog or leaves the previous one untouched.

use crate::constants::{
    APP_DIR_NAME, CATALOG_CACHE_FILE_NAME, CATALOG_FETCH_TIMEOUT_SECS,
};
use crate::error::CompanionError;
use crate::ghost::model::Ghost;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where raw catalog JSON comes from
pub trait CatalogSource: Send {
    /// Fetch the raw JSON array of ghost records
    fn fetch(&self) -> Result<String>;
}

/// Blocking HTTP GET against the catalog endpoint
pub struct HttpCatalogSource {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpCatalogSource {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(CATALOG_FETCH_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl CatalogSource for HttpCatalogSource {
    fn fetch(&self) -> Result<String> {
        debug!("Fetching ghost catalog from {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .send()
            .with_context(|| format!("Failed to reach ghost catalog at {}", self.url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Ghost catalog request failed with HTTP {}", status);
        }

        response
            .text()
            .context("Failed to read ghost catalog response body")
    }
}

/// Validated ghosts indexed by id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GhostCatalog {
    pub ghosts: BTreeMap<String, Ghost>,
    pub last_update: Option<DateTime<Utc>>,
}

impl GhostCatalog {
    pub fn is_empty(&self) -> bool {
        self.ghosts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ghosts.len()
    }

    pub fn get(&self, id: &str) -> Option<&Ghost> {
        self.ghosts.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ghost> {
        self.ghosts.values()
    }
}

/// On-disk cache layout
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedCatalog {
    ghosts: Vec<Ghost>,
    last_update: Option<DateTime<Utc>>,
}

/// Parse and validate a catalog document
///
/// Any invalid record or duplicate id rejects the whole document.
pub fn parse_catalog(json: &str) -> Result<BTreeMap<String, Ghost>> {
    let records: Vec<Ghost> =
        serde_json::from_str(json).context("Ghost catalog is not a valid ghost array")?;
    index_ghosts(records)
}

fn index_ghosts(records: Vec<Ghost>) -> Result<BTreeMap<String, Ghost>> {
    let mut ghosts = BTreeMap::new();
    for ghost in records {
        ghost.validate()?;
        if ghosts.contains_key(&ghost.id) {
            return Err(CompanionError::DuplicateGhostId(ghost.id).into());
        }
        ghosts.insert(ghost.id.clone(), ghost);
    }
    Ok(ghosts)
}

/// Holds the current catalog and keeps its local cache in sync
pub struct CatalogStore {
    source: Box<dyn CatalogSource>,
    cache_path: Option<PathBuf>,
    catalog: GhostCatalog,
}

impl CatalogStore {
    pub fn new(source: Box<dyn CatalogSource>, cache_path: Option<PathBuf>) -> Self {
        Self {
            source,
            cache_path,
            catalog: GhostCatalog::default(),
        }
    }

    /// Default cache location: `<data dir>/phasmo-companion/ghosts.json`
    pub fn default_cache_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir().context("Could not determine data directory")?;
        Ok(data_dir.join(APP_DIR_NAME).join(CATALOG_CACHE_FILE_NAME))
    }

    /// Load the local cache, if any
    ///
    /// A missing file leaves the catalog empty. A corrupt or invalid cache is
    /// logged and ignored.
    pub fn load_cached(&mut self) -> Result<()> {
        let Some(path) = self.cache_path.clone() else {
            return Ok(());
        };
        if !path.exists() {
            debug!("No ghost catalog cache at {:?}", path);
            return Ok(());
        }

        match read_cache(&path) {
            Ok(catalog) => {
                info!("Loaded {} ghosts from cache {:?}", catalog.len(), path);
                self.catalog = catalog;
            }
            Err(e) => {
                warn!("Ignoring unreadable ghost catalog cache {:?}: {:#}", path, e);
            }
        }
        Ok(())
    }

    /// Fetch, validate and replace the catalog wholesale
    ///
    /// On any failure the previous catalog is kept and the error returned.
    pub fn refresh(&mut self) -> Result<usize> {
        let json = self.source.fetch()?;
        let ghosts = parse_catalog(&json)?;

        let catalog = GhostCatalog {
            ghosts,
            last_update: Some(Utc::now()),
        };

        if let Some(path) = &self.cache_path {
            if let Err(e) = write_cache(path, &catalog) {
                warn!("Failed to write ghost catalog cache: {:#}", e);
            }
        }

        let count = catalog.len();
        self.catalog = catalog;
        info!("Ghost catalog refreshed ({} ghosts)", count);
        Ok(count)
    }

    /// Replace the catalog from already-fetched JSON (same validation as refresh)
    pub fn load_json(&mut self, json: &str) -> Result<usize> {
        let ghosts = parse_catalog(json)?;
        self.catalog = GhostCatalog {
            ghosts,
            last_update: Some(Utc::now()),
        };
        Ok(self.catalog.len())
    }

    pub fn snapshot(&self) -> GhostCatalog {
        self.catalog.clone()
    }

    pub fn catalog(&self) -> &GhostCatalog {
        &self.catalog
    }

    pub fn get(&self, id: &str) -> Option<&Ghost> {
        self.catalog.get(id)
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.catalog.last_update
    }
}

fn read_cache(path: &Path) -> Result<GhostCatalog> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let cached: CachedCatalog =
        serde_json::from_str(&contents).context("Failed to parse catalog cache")?;
    Ok(GhostCatalog {
        ghosts: index_ghosts(cached.ghosts)?,
        last_update: cached.last_update,
    })
}

fn write_cache(path: &Path, catalog: &GhostCatalog) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create cache directory: {:?}", parent))?;
    }
    let cached = CachedCatalog {
        ghosts: catalog.ghosts.values().cloned().collect(),
        last_update: catalog.last_update,
    };
    let json = serde_json::to_string_pretty(&cached).context("Failed to serialize catalog")?;
    fs::write(path, json).with_context(|| format!("Failed to write catalog cache: {:?}", path))?;
    debug!("Ghost catalog cache written to {:?}", path);
    Ok(())
}
