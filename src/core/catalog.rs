use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::Unit;

const BUILTIN_UNITS_JSON: &str = include_str!("../../data/units.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("catalog unit {0:?} is listed more than once")]
    DuplicateUnit(String),
    #[error("catalog unit {unit_id:?} has unusable price {price}")]
    InvalidPrice { unit_id: String, price: f64 },
}

/// A unit as shown on the site map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub unit_id: String,
    #[serde(default)]
    pub plan_type: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub floor_plan_image_url: String,
    #[serde(default)]
    pub map_x: String,
    #[serde(default)]
    pub map_y: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<f64>,
}

impl Listing {
    pub fn to_unit(&self) -> Unit {
        Unit {
            price: self.price,
            tax_rate: self.tax_rate,
            unit_id: self.unit_id.clone(),
            plan: self.plan_type.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    listings: Vec<Listing>,
}

impl Catalog {
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_UNITS_JSON)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let listings: Vec<Listing> = serde_json::from_str(raw)?;
        Self::from_listings(listings)
    }

    pub fn from_listings(listings: Vec<Listing>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for listing in &listings {
            if !listing.to_unit().is_usable() {
                return Err(CatalogError::InvalidPrice {
                    unit_id: listing.unit_id.clone(),
                    price: listing.price,
                });
            }
            if !seen.insert(listing.unit_id.as_str()) {
                return Err(CatalogError::DuplicateUnit(listing.unit_id.clone()));
            }
        }
        Ok(Self { listings })
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn find(&self, unit_id: &str) -> Option<&Listing> {
        self.listings.iter().find(|l| l.unit_id == unit_id)
    }
}
