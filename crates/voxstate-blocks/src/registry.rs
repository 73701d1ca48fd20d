//! Block registry: enumerates every block definition and every block state.
//!
//! State IDs follow a mixed-radix layout. Each block owns the contiguous range
//! `id..id + state_count`, where `state_count` is the product of its
//! properties' value counts, and a state's offset inside that range is its
//! property indices read as digits with property 0 most significant.
//!
//! The registry is populated through a [`BlockRegistryBuilder`] and frozen with
//! [`BlockRegistryBuilder::build`]. The frozen [`BlockRegistry`] is immutable
//! and meant to be shared (`Arc`) by every block storage.

use std::collections::HashMap;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::block::{BlockDefinition, BlockState, BlockStateId};
use crate::identifier::{Identifier, IdentifierError};
use crate::palette::GlobalPalette;
use crate::property::{BlockProperty, PropertyParseError, PropertyValue};

/// Smallest palette width a storage or the registry ever uses.
pub const MIN_BITS_PER_BLOCK: u8 = 4;

/// Widest supported palette width.
pub const MAX_BITS_PER_BLOCK: u8 = 32;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How the registry-wide (global palette) bit width is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GlobalBits {
    /// Smallest width able to address every registered state (at least
    /// [`MIN_BITS_PER_BLOCK`]).
    #[default]
    Computed,
    /// A fixed upper bound. Registrations that would not fit are rejected.
    Fixed(u8),
}

/// Errors returned by registry construction and lookups.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No block is registered under this name.
    #[error("unknown block: {0}")]
    UnknownBlock(Identifier),
    /// No state has this ID.
    #[error("unknown block state: {0}")]
    UnknownState(BlockStateId),
    /// A block with the same name has already been registered.
    #[error("duplicate block name: {0}")]
    DuplicateName(Identifier),
    /// The number of default values differs from the number of properties.
    #[error("block {block}: {properties} properties but {defaults} default values")]
    DefaultsMismatch {
        /// Block being registered.
        block: Identifier,
        /// Number of properties.
        properties: usize,
        /// Number of default values.
        defaults: usize,
    },
    /// A value is not part of its property's domain.
    #[error("block {block}: {value:?} is not a valid value of property {property:?}")]
    InvalidValue {
        /// Block the value belongs to.
        block: Identifier,
        /// Property name.
        property: String,
        /// Offending value.
        value: PropertyValue,
    },
    /// A property has an empty or duplicated value domain.
    #[error("block {block}: property {property:?} has an invalid value domain")]
    EmptyProperty {
        /// Block being registered.
        block: Identifier,
        /// Property name.
        property: String,
    },
    /// Two properties of one block share a name.
    #[error("block {block}: property {property:?} is declared twice")]
    DuplicateProperty {
        /// Block being registered.
        block: Identifier,
        /// Property name.
        property: String,
    },
    /// The state count no longer fits in a `u32`.
    #[error("block {0}: too many block states")]
    TooManyStates(Identifier),
    /// The fixed global width cannot address the registered states.
    #[error("global palette of {bits} bits cannot address {required} block states")]
    GlobalPaletteOverflow {
        /// Configured global width.
        bits: u8,
        /// Number of states that would be registered.
        required: u32,
    },
    /// A block-state string is not of the form `name[key=value,...]`.
    #[error("invalid block state syntax: {0:?}")]
    InvalidStateSyntax(String),
    /// The block name in a block-state string is malformed.
    #[error(transparent)]
    InvalidIdentifier(#[from] IdentifierError),
    /// A property override could not be parsed.
    #[error(transparent)]
    Parse(#[from] PropertyParseError),
}

// ---------------------------------------------------------------------------
// Mixed-radix encoding
// ---------------------------------------------------------------------------

/// Folds property indices into an offset, property 0 being the most significant digit.
fn encode_indices(properties: &[BlockProperty], indices: &[usize]) -> u32 {
    properties
        .iter()
        .zip(indices)
        .fold(0u32, |acc, (property, &index)| {
            acc * property.value_count() as u32 + index as u32
        })
}

/// Inverse of [`encode_indices`].
fn decode_offset(properties: &[BlockProperty], mut offset: u32) -> Vec<usize> {
    let mut indices = vec![0usize; properties.len()];
    for (slot, property) in indices.iter_mut().zip(properties).rev() {
        let count = property.value_count() as u32;
        *slot = (offset % count) as usize;
        offset /= count;
    }
    indices
}

fn bit_length(value: u32) -> u8 {
    (u32::BITS - value.leading_zeros()) as u8
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Mutable registry under construction.
#[derive(Debug, Default)]
pub struct BlockRegistryBuilder {
    blocks: Vec<Arc<BlockDefinition>>,
    by_name: FxHashMap<Identifier, usize>,
    states: Vec<BlockState>,
    global_bits: GlobalBits,
}

impl BlockRegistryBuilder {
    /// Creates an empty builder with a computed global width.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects how the global palette width is chosen.
    pub fn with_global_bits(mut self, global_bits: GlobalBits) -> Self {
        self.global_bits = global_bits;
        self
    }

    /// Number of states registered so far (also the ID the next block gets).
    pub fn state_count(&self) -> u32 {
        self.states.len() as u32
    }

    /// Registers a block and materialises all of its states.
    ///
    /// Returns the block's ID, i.e. the ID of its first state.
    ///
    /// # Errors
    ///
    /// Fails if the name is taken, the defaults do not line up with the
    /// properties, a property domain is empty or duplicated, or the new states
    /// cannot be addressed.
    pub fn register(
        &mut self,
        name: Identifier,
        properties: Vec<BlockProperty>,
        default_values: Vec<PropertyValue>,
    ) -> Result<BlockStateId, RegistryError> {
        if self.by_name.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }
        if default_values.len() != properties.len() {
            return Err(RegistryError::DefaultsMismatch {
                block: name,
                properties: properties.len(),
                defaults: default_values.len(),
            });
        }
        for (i, property) in properties.iter().enumerate() {
            if !property.is_valid() {
                return Err(RegistryError::EmptyProperty {
                    block: name,
                    property: property.name().to_string(),
                });
            }
            if properties[..i].iter().any(|p| p.name() == property.name()) {
                return Err(RegistryError::DuplicateProperty {
                    block: name,
                    property: property.name().to_string(),
                });
            }
        }

        let state_count = properties.iter().try_fold(1u32, |acc, property| {
            u32::try_from(property.value_count())
                .ok()
                .and_then(|count| acc.checked_mul(count))
        });
        let Some(state_count) = state_count else {
            return Err(RegistryError::TooManyStates(name));
        };
        for (property, value) in properties.iter().zip(&default_values) {
            if property.index_of(value).is_none() {
                return Err(RegistryError::InvalidValue {
                    block: name,
                    property: property.name().to_string(),
                    value: value.clone(),
                });
            }
        }

        let block_id = self.state_count();
        let Some(total) = block_id.checked_add(state_count) else {
            return Err(RegistryError::TooManyStates(name));
        };
        if let GlobalBits::Fixed(bits) = self.global_bits {
            let bits = bits.clamp(MIN_BITS_PER_BLOCK, MAX_BITS_PER_BLOCK);
            // Global codes are `id + 1`, so the largest code equals the state count.
            if u64::from(total) > (1u64 << bits) - 1 {
                return Err(RegistryError::GlobalPaletteOverflow {
                    bits,
                    required: total,
                });
            }
        }

        let block_id = BlockStateId(block_id);
        let block = Arc::new(BlockDefinition::new(
            block_id,
            name,
            properties,
            default_values,
            state_count,
        ));
        tracing::debug!(
            "Registering block {} as {} ({} states)",
            block,
            block_id,
            state_count
        );

        self.states.reserve(state_count as usize);
        for offset in 0..state_count {
            let values = decode_offset(block.properties(), offset)
                .into_iter()
                .zip(block.properties())
                .filter_map(|(index, property)| property.value(index))
                .collect();
            let state =
                BlockState::new(BlockStateId(block_id.0 + offset), Arc::clone(&block), values);
            tracing::trace!("Registering block state {}: {}", state.id(), state);
            self.states.push(state);
        }

        self.by_name.insert(block.name().clone(), self.blocks.len());
        self.blocks.push(block);
        Ok(block_id)
    }

    /// Freezes the registry and fixes the global palette width.
    pub fn build(self) -> BlockRegistry {
        let state_count = self.states.len() as u32;
        let bits_per_block = match self.global_bits {
            GlobalBits::Computed => bit_length(state_count).max(MIN_BITS_PER_BLOCK),
            GlobalBits::Fixed(bits) => bits.clamp(MIN_BITS_PER_BLOCK, MAX_BITS_PER_BLOCK),
        };
        tracing::debug!(
            "Block registry frozen: {} blocks, {} states, {} bits per block",
            self.blocks.len(),
            state_count,
            bits_per_block
        );
        BlockRegistry {
            blocks: self.blocks,
            by_name: self.by_name,
            states: self.states,
            bits_per_block,
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Frozen registry of block definitions and states.
#[derive(Debug)]
pub struct BlockRegistry {
    blocks: Vec<Arc<BlockDefinition>>,
    by_name: FxHashMap<Identifier, usize>,
    /// Dense array where `index == BlockStateId.0`.
    states: Vec<BlockState>,
    bits_per_block: u8,
}

impl BlockRegistry {
    /// Returns a builder for a new registry.
    pub fn builder() -> BlockRegistryBuilder {
        BlockRegistryBuilder::new()
    }

    /// Returns the state with the given ID.
    pub fn by_id(&self, id: BlockStateId) -> Result<&BlockState, RegistryError> {
        self.states
            .get(id.0 as usize)
            .ok_or(RegistryError::UnknownState(id))
    }

    /// Returns the block registered under `name`.
    pub fn by_name(&self, name: &Identifier) -> Result<&Arc<BlockDefinition>, RegistryError> {
        self.by_name
            .get(name)
            .map(|&index| &self.blocks[index])
            .ok_or_else(|| RegistryError::UnknownBlock(name.clone()))
    }

    /// Returns the first state of the block registered under `name`.
    pub fn default_state(&self, name: &Identifier) -> Result<&BlockState, RegistryError> {
        let block = self.by_name(name)?;
        self.by_id(block.id())
    }

    /// Resolves a block state from a name and textual property overrides.
    ///
    /// Properties missing from `overrides` take the block's default value.
    /// Keys that name no property of the block are ignored.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownBlock`] if the name is not registered, and
    /// [`RegistryError::Parse`] if an override value does not parse.
    pub fn create_state(
        &self,
        name: &Identifier,
        overrides: &HashMap<String, String>,
    ) -> Result<&BlockState, RegistryError> {
        let block = self.by_name(name)?;
        if overrides.is_empty() || block.properties().is_empty() {
            return self.by_id(block.id());
        }

        let mut values = Vec::with_capacity(block.properties().len());
        for (property, default) in block.properties().iter().zip(block.default_values()) {
            match overrides.get(property.name()) {
                Some(input) => values.push(property.parse(input)?),
                None => values.push(default.clone()),
            }
        }
        let id = self.state_id_for_values(block, &values)?;
        self.by_id(id)
    }

    /// Resolves a state written as `namespace:path[key=value,...]`.
    pub fn parse_state(&self, input: &str) -> Result<&BlockState, RegistryError> {
        let input = input.trim();
        let (name, overrides) = match input.split_once('[') {
            None => (input, HashMap::new()),
            Some((name, rest)) => {
                let body = rest
                    .strip_suffix(']')
                    .ok_or_else(|| RegistryError::InvalidStateSyntax(input.to_string()))?;
                let mut overrides = HashMap::new();
                for pair in body.split(',').filter(|pair| !pair.trim().is_empty()) {
                    let (key, value) = pair
                        .split_once('=')
                        .ok_or_else(|| RegistryError::InvalidStateSyntax(input.to_string()))?;
                    overrides.insert(key.trim().to_string(), value.trim().to_string());
                }
                (name, overrides)
            }
        };
        let name: Identifier = name.parse()?;
        self.create_state(&name, &overrides)
    }

    /// Computes the state ID for a full list of property values.
    pub fn state_id_for_values(
        &self,
        block: &BlockDefinition,
        values: &[PropertyValue],
    ) -> Result<BlockStateId, RegistryError> {
        if values.len() != block.properties().len() {
            return Err(RegistryError::DefaultsMismatch {
                block: block.name().clone(),
                properties: block.properties().len(),
                defaults: values.len(),
            });
        }
        let mut indices = Vec::with_capacity(values.len());
        for (property, value) in block.properties().iter().zip(values) {
            let index = property
                .index_of(value)
                .ok_or_else(|| RegistryError::InvalidValue {
                    block: block.name().clone(),
                    property: property.name().to_string(),
                    value: value.clone(),
                })?;
            indices.push(index);
        }
        Ok(BlockStateId(block.id().0 + encode_indices(block.properties(), &indices)))
    }

    /// Computes the state ID for a list of property indices.
    ///
    /// Returns `None` if the list has the wrong length or an index is out of range.
    pub fn state_id_for_indices(
        &self,
        block: &BlockDefinition,
        indices: &[usize],
    ) -> Option<BlockStateId> {
        let properties = block.properties();
        if indices.len() != properties.len()
            || properties
                .iter()
                .zip(indices)
                .any(|(property, &index)| index >= property.value_count())
        {
            return None;
        }
        Some(BlockStateId(block.id().0 + encode_indices(properties, indices)))
    }

    /// Decodes a state ID back into its property indices.
    pub fn property_indices(&self, id: BlockStateId) -> Result<Vec<usize>, RegistryError> {
        let block = self.by_id(id)?.block();
        Ok(decode_offset(block.properties(), id.0 - block.id().0))
    }

    /// Returns `true` if `state` is one of this registry's states.
    pub fn contains(&self, state: &BlockState) -> bool {
        self.by_id(state.id()).is_ok_and(|own| own == state)
    }

    /// Iterates the blocks in registration order.
    pub fn blocks(&self) -> impl ExactSizeIterator<Item = &Arc<BlockDefinition>> {
        self.blocks.iter()
    }

    /// All states, indexed by ID.
    pub fn states(&self) -> &[BlockState] {
        &self.states
    }

    /// Total number of states.
    pub fn state_count(&self) -> u32 {
        self.states.len() as u32
    }

    /// Number of registered blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Width of the global palette.
    pub fn bits_per_block(&self) -> u8 {
        self.bits_per_block
    }

    /// Returns the registry-wide palette.
    pub fn global_palette(&self) -> GlobalPalette {
        GlobalPalette::new(self.bits_per_block, self.state_count())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
