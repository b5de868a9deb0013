//! Label name to category id allocation.

use std::collections::HashMap;

use crate::ir::{Category, CategoryId};

/// Allocates category ids from label names in first-seen order.
///
/// Ids start at 1 and are contiguous. A registry lives for one conversion
/// call; two calls over the same labels in the same order produce the same
/// ids.
#[derive(Debug, Default, Clone)]
pub struct CategoryRegistry {
    names: Vec<String>,
    ids: HashMap<String, CategoryId>,
}

impl CategoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `label`, allocating `len + 1` if it is new.
    pub fn id_for(&mut self, label: &str) -> CategoryId {
        if let Some(&id) = self.ids.get(label) {
            return id;
        }
        self.names.push(label.to_owned());
        let id = CategoryId::new(self.names.len() as u64);
        self.ids.insert(label.to_owned(), id);
        id
    }

    /// Looks up a label without allocating.
    pub fn get(&self, label: &str) -> Option<CategoryId> {
        self.ids.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Category records in id order, with `supercategory` set to the name.
    pub fn categories(&self) -> Vec<Category> {
        self.names
            .iter()
            .enumerate()
            .map(|(idx, name)| Category::new(idx as u64 + 1, name.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_seen_order_is_preserved() {
        let mut registry = CategoryRegistry::new();
        let ids: Vec<_> = ["leaf", "stem", "leaf"]
            .iter()
            .map(|label| registry.id_for(label))
            .collect();
        assert_eq!(ids, vec![CategoryId(1), CategoryId(2), CategoryId(1)]);

        let categories = registry.categories();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].name, "leaf");
        assert_eq!(categories[1].id, CategoryId(2));
        assert_eq!(categories[1].supercategory, "stem");
    }

    #[test]
    fn get_does_not_allocate() {
        let mut registry = CategoryRegistry::new();
        assert_eq!(registry.get("cell"), None);
        assert!(registry.is_empty());
        registry.id_for("cell");
        assert_eq!(registry.get("cell"), Some(CategoryId(1)));
        assert_eq!(registry.len(), 1);
    }
}
