use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tutela_core::{AppError, ItemId};

/// Kind of training item a requirement or assignment points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// A training module.
    Module,
    /// A controlled document that must be read and acknowledged.
    Document,
}

impl ItemType {
    /// Returns a stable storage value for this item type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Document => "document",
        }
    }

    /// Parses a transport value into an item type.
    pub fn from_transport(value: &str) -> Result<Self, AppError> {
        Self::from_str(value)
    }
}

impl FromStr for ItemType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "module" => Ok(Self::Module),
            "document" => Ok(Self::Document),
            _ => Err(AppError::Validation(format!(
                "unknown item type value '{value}'"
            ))),
        }
    }
}

/// Typed reference to one training item.
///
/// Ordering is by type, then id, so sets of references iterate deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    /// Item kind.
    pub item_type: ItemType,
    /// Item identifier within its kind.
    pub item_id: ItemId,
}

impl ItemRef {
    /// Creates a reference from its parts.
    #[must_use]
    pub fn new(item_type: ItemType, item_id: ItemId) -> Self {
        Self { item_type, item_id }
    }

    /// Reference to a training module.
    #[must_use]
    pub fn module(item_id: ItemId) -> Self {
        Self::new(ItemType::Module, item_id)
    }

    /// Reference to a document.
    #[must_use]
    pub fn document(item_id: ItemId) -> Self {
        Self::new(ItemType::Document, item_id)
    }
}

impl Display for ItemRef {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}:{}", self.item_type.as_str(), self.item_id)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use tutela_core::ItemId;

    use super::{ItemRef, ItemType};

    #[test]
    fn item_type_roundtrip_storage_value() {
        let restored = ItemType::from_str(ItemType::Document.as_str());
        assert!(matches!(restored, Ok(ItemType::Document)));
    }

    #[test]
    fn unknown_item_type_is_rejected() {
        assert!(ItemType::from_str("quiz").is_err());
    }

    #[test]
    fn same_id_with_different_type_is_a_different_item() {
        let item_id = ItemId::new();
        assert_ne!(ItemRef::module(item_id), ItemRef::document(item_id));
    }

    #[test]
    fn item_ref_serializes_with_snake_case_type() {
        let item_id = ItemId::new();
        let encoded = serde_json::to_value(ItemRef::module(item_id)).unwrap_or_default();

        assert_eq!(encoded["item_type"], "module");
        assert_eq!(encoded["item_id"], item_id.to_string());
    }
}
