//! Minimal STAC item model for the managed-service interface.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Key of the browse asset in result items
pub const BROWSE_ASSET_KEY: &str = "rgb_browse";
pub const BROWSE_MEDIA_TYPE: &str = "image/tiff";
pub const BROWSE_ROLE: &str = "visual";

/// A STAC asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StacAsset {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

impl StacAsset {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            title: None,
            media_type: None,
            roles: Vec::new(),
        }
    }

    /// The browse asset pointing at a staged product
    pub fn browse(href: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            title: Some(title.into()),
            media_type: Some(BROWSE_MEDIA_TYPE.to_string()),
            roles: vec![BROWSE_ROLE.to_string()],
        }
    }
}

/// A STAC item; fields this crate does not interpret are carried through
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StacItem {
    #[serde(rename = "type", default = "feature_type")]
    pub item_type: String,
    #[serde(default = "stac_version")]
    pub stac_version: String,
    pub id: String,
    #[serde(default)]
    pub geometry: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub links: Vec<Value>,
    #[serde(default)]
    pub assets: BTreeMap<String, StacAsset>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn feature_type() -> String {
    "Feature".to_string()
}

fn stac_version() -> String {
    "1.0.0".to_string()
}

impl StacItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            item_type: feature_type(),
            stac_version: stac_version(),
            id: id.into(),
            geometry: None,
            bbox: None,
            properties: Map::new(),
            links: Vec::new(),
            assets: BTreeMap::new(),
            extra: Map::new(),
        }
    }

    pub fn with_asset(mut self, key: impl Into<String>, asset: StacAsset) -> Self {
        self.assets.insert(key.into(), asset);
        self
    }

    /// Asset hrefs in key order
    pub fn hrefs(&self) -> Vec<&str> {
        self.assets.values().map(|asset| asset.href.as_str()).collect()
    }

    /// Copy of this item with its assets replaced
    pub fn clone_with_assets(&self, assets: BTreeMap<String, StacAsset>) -> Self {
        Self {
            assets,
            ..self.clone()
        }
    }

    /// Copy of this item carrying only the browse asset
    pub fn with_browse_asset(&self, href: impl Into<String>, title: impl Into<String>) -> Self {
        let mut assets = BTreeMap::new();
        assets.insert(BROWSE_ASSET_KEY.to_string(), StacAsset::browse(href, title));
        self.clone_with_assets(assets)
    }
}
