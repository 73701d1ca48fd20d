//! Block definitions and their concrete states.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::identifier::Identifier;
use crate::property::{BlockProperty, PropertyValue};

/// Registry-wide identifier of a [`BlockState`].
///
/// State IDs are dense: a registry with `n` states uses exactly `0..n`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockStateId(pub u32);

impl fmt::Display for BlockStateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An immutable catalog entry: a name plus its ordered properties and defaults.
///
/// The definition's [`id`](Self::id) is the ID of its first state (all
/// property indices zero); its states occupy `id..id + state_count`.
#[derive(Debug)]
pub struct BlockDefinition {
    id: BlockStateId,
    name: Identifier,
    properties: Vec<BlockProperty>,
    default_values: Vec<PropertyValue>,
    state_count: u32,
}

impl BlockDefinition {
    pub(crate) fn new(
        id: BlockStateId,
        name: Identifier,
        properties: Vec<BlockProperty>,
        default_values: Vec<PropertyValue>,
        state_count: u32,
    ) -> Self {
        Self {
            id,
            name,
            properties,
            default_values,
            state_count,
        }
    }

    /// ID of the first state of this block.
    pub fn id(&self) -> BlockStateId {
        self.id
    }

    /// Registered name.
    pub fn name(&self) -> &Identifier {
        &self.name
    }

    /// Properties in mixed-radix order (index 0 is the most significant digit).
    pub fn properties(&self) -> &[BlockProperty] {
        &self.properties
    }

    /// Default value of each property, aligned with [`properties`](Self::properties).
    pub fn default_values(&self) -> &[PropertyValue] {
        &self.default_values
    }

    /// Number of states (product of the property value counts).
    pub fn state_count(&self) -> u32 {
        self.state_count
    }

    /// Returns the position of the named property.
    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name() == name)
    }

    /// Returns `true` if `id` falls inside this block's state range.
    pub fn contains_state(&self, id: BlockStateId) -> bool {
        id.0 >= self.id.0 && id.0 - self.id.0 < self.state_count
    }
}

impl PartialEq for BlockDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for BlockDefinition {}

impl Hash for BlockDefinition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for BlockDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.name, f)
    }
}

/// One fully specified variant of a [`BlockDefinition`].
#[derive(Clone, Debug)]
pub struct BlockState {
    id: BlockStateId,
    block: Arc<BlockDefinition>,
    values: Vec<PropertyValue>,
}

impl BlockState {
    pub(crate) fn new(
        id: BlockStateId,
        block: Arc<BlockDefinition>,
        values: Vec<PropertyValue>,
    ) -> Self {
        Self { id, block, values }
    }

    /// Registry-wide state ID.
    pub fn id(&self) -> BlockStateId {
        self.id
    }

    /// The block this state belongs to.
    pub fn block(&self) -> &Arc<BlockDefinition> {
        &self.block
    }

    /// Property values, aligned with the block's properties.
    pub fn values(&self) -> &[PropertyValue] {
        &self.values
    }

    /// Looks up the value of a property by name.
    pub fn value(&self, property: &str) -> Option<&PropertyValue> {
        self.block
            .property_index(property)
            .map(|index| &self.values[index])
    }

    /// Returns `true` if this is the block's default-index-0 state.
    pub fn is_first_state(&self) -> bool {
        self.id == self.block.id
    }
}

impl PartialEq for BlockState {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.block.name == other.block.name && self.values == other.values
    }
}

impl Eq for BlockState {}

impl Hash for BlockState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.block.name)?;
        if self.values.is_empty() {
            return Ok(());
        }
        f.write_str("[")?;
        for (i, (property, value)) in self.block.properties.iter().zip(&self.values).enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={}", property.name(), value)?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grass() -> Arc<BlockDefinition> {
        Arc::new(BlockDefinition::new(
            BlockStateId(1),
            "core:grass".parse().unwrap(),
            vec![BlockProperty::boolean("snowy")],
            vec![PropertyValue::Bool(false)],
            2,
        ))
    }

    #[test]
    fn test_state_display() {
        let block = grass();
        let state = BlockState::new(BlockStateId(2), block, vec![PropertyValue::Bool(true)]);
        assert_eq!(state.to_string(), "core:grass[snowy=true]");
    }

    #[test]
    fn test_state_without_properties_has_no_brackets() {
        let stone = Arc::new(BlockDefinition::new(
            BlockStateId(0),
            "core:stone".parse().unwrap(),
            Vec::new(),
            Vec::new(),
            1,
        ));
        let state = BlockState::new(BlockStateId(0), stone, Vec::new());
        assert_eq!(state.to_string(), "core:stone");
        assert!(state.is_first_state());
    }

    #[test]
    fn test_value_lookup_by_name() {
        let state = BlockState::new(BlockStateId(2), grass(), vec![PropertyValue::Bool(true)]);
        assert_eq!(state.value("snowy"), Some(&PropertyValue::Bool(true)));
        assert_eq!(state.value("lit"), None);
    }

    #[test]
    fn test_contains_state_range() {
        let block = grass();
        assert!(!block.contains_state(BlockStateId(0)));
        assert!(block.contains_state(BlockStateId(1)));
        assert!(block.contains_state(BlockStateId(2)));
        assert!(!block.contains_state(BlockStateId(3)));
    }
}
