//! RON block catalogs: a data-driven way to fill a [`BlockRegistryBuilder`].
//!
//! ```ron
//! (
//!     blocks: [
//!         (name: "core:stone"),
//!         (
//!             name: "core:grass",
//!             properties: [(name: "snowy", kind: Boolean)],
//!             defaults: {"snowy": "false"},
//!         ),
//!     ],
//! )
//! ```
//!
//! A property without an entry in `defaults` defaults to its first value.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identifier::Identifier;
use crate::property::{BlockProperty, PropertyParseError};
use crate::registry::{BlockRegistryBuilder, RegistryError};

/// Errors that can occur while loading or registering a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Failed to read the catalog file.
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    /// The catalog is not valid RON.
    #[error("failed to parse catalog: {0}")]
    Ron(#[from] ron::error::SpannedError),
    /// A default value is outside its property's domain.
    #[error("block {block}: {source}")]
    Parse {
        /// Block the default belongs to.
        block: Identifier,
        /// Underlying parse failure.
        #[source]
        source: PropertyParseError,
    },
    /// A default names a property the block does not declare.
    #[error("block {block}: default given for unknown property {property:?}")]
    UnknownDefault {
        /// Block the default belongs to.
        block: Identifier,
        /// The unknown property name.
        property: String,
    },
    /// The registry rejected an entry.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// One block entry of a catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogBlock {
    /// Namespaced block name.
    pub name: Identifier,
    /// Properties in significance order (first = most significant digit).
    #[serde(default)]
    pub properties: Vec<BlockProperty>,
    /// Textual default values keyed by property name.
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
}

/// An ordered list of block definitions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockCatalog {
    /// Blocks in registration order.
    #[serde(default)]
    pub blocks: Vec<CatalogBlock>,
}

impl BlockCatalog {
    /// Parses a catalog from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self, CatalogError> {
        Ok(ron::from_str(text)?)
    }

    /// Reads and parses a catalog file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        let catalog = Self::from_ron_str(&text)?;
        tracing::debug!(
            "Loaded block catalog {} ({} blocks)",
            path.display(),
            catalog.blocks.len()
        );
        Ok(catalog)
    }

    /// Registers every block, in order.
    ///
    /// Stops at the first failure; blocks registered before it stay in the
    /// builder.
    pub fn register_into(&self, builder: &mut BlockRegistryBuilder) -> Result<(), CatalogError> {
        for entry in &self.blocks {
            if let Some(property) = entry
                .defaults
                .keys()
                .find(|key| !entry.properties.iter().any(|p| p.name() == key.as_str()))
            {
                return Err(CatalogError::UnknownDefault {
                    block: entry.name.clone(),
                    property: property.clone(),
                });
            }

            let mut defaults = Vec::with_capacity(entry.properties.len());
            for property in &entry.properties {
                let value = match entry.defaults.get(property.name()) {
                    Some(text) => property.parse(text).map_err(|source| CatalogError::Parse {
                        block: entry.name.clone(),
                        source,
                    })?,
                    None => property.value(0).ok_or_else(|| RegistryError::EmptyProperty {
                        block: entry.name.clone(),
                        property: property.name().to_string(),
                    })?,
                };
                defaults.push(value);
            }

            builder.register(entry.name.clone(), entry.properties.clone(), defaults)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
