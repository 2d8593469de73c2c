//! Purpose: Resolve component ids into catalog items for model placement.
//! Exports: `Catalog`, `CatalogItem`, `MemoryCatalog`.
//! Role: Boundary to the remote catalog; the bridge only sees this trait.
//! Invariants: A lookup miss is `Ok(None)`, never an error.
//! Invariants: `CatalogItem` JSON uses the camelCase catalog field names.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    #[serde(default)]
    pub generic_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub product_number: String,
    #[serde(default)]
    pub product_link: String,
    #[serde(default)]
    pub is_floating: bool,
    #[serde(default)]
    pub thumbnail_file_url: String,
    #[serde(default)]
    pub total_size: u64,
    #[serde(default = "default_visible")]
    pub is_visible: bool,
}

fn default_visible() -> bool {
    true
}

impl CatalogItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_visible: true,
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.generic_name = name.into();
        self
    }
}

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn component(&self, id: &str) -> Result<Option<CatalogItem>, Error>;
}

#[derive(Clone, Debug, Default)]
pub struct MemoryCatalog {
    items: BTreeMap<String, CatalogItem>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(mut self, item: CatalogItem) -> Self {
        self.items.insert(item.id.clone(), item);
        self
    }

    pub fn from_items(items: impl IntoIterator<Item = CatalogItem>) -> Self {
        items.into_iter().fold(Self::new(), Self::with_item)
    }

    /// Loads a JSON array of catalog items.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            Error::new(ErrorKind::InvalidArgument)
                .with_message(format!("failed to read catalog {}", path.display()))
                .with_source(err)
        })?;
        let items: Vec<CatalogItem> = serde_json::from_str(&text).map_err(|err| {
            Error::new(ErrorKind::InvalidArgument)
                .with_message(format!("catalog {} is not a JSON item array", path.display()))
                .with_source(err)
        })?;
        Ok(Self::from_items(items))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn component(&self, id: &str) -> Result<Option<CatalogItem>, Error> {
        Ok(self.items.get(id).filter(|item| item.is_visible).cloned())
    }
}
