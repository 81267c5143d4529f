//! Node registry for managing available node types.

use crate::core::node::{Category, FilterNode, NodeMetadata};
use crate::dashscope::ApiClient;
use indexmap::IndexMap;
use std::sync::Arc;

/// Factory function for creating node instances.
pub type FilterFactory = Arc<dyn Fn() -> Box<dyn FilterNode> + Send + Sync>;

/// Registry entry containing metadata and factory.
#[derive(Clone)]
pub struct RegistryEntry {
    /// Factory function to create instances.
    pub factory: FilterFactory,
    /// Cached metadata (avoids creating instance just to get metadata).
    pub metadata: NodeMetadata,
}

/// Registry for all available node types, in registration order.
pub struct FilterRegistry {
    /// Nodes indexed by their unique ID.
    filters: IndexMap<String, RegistryEntry>,
    /// Node IDs grouped by category.
    categories: IndexMap<Category, Vec<String>>,
}

impl FilterRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            filters: IndexMap::new(),
            categories: IndexMap::new(),
        }
    }

    /// Create a registry with the Qwen nodes bound to `client`.
    pub fn with_builtins(client: Arc<ApiClient>) -> Self {
        let mut registry = Self::new();
        crate::filters::builtin::register_all(&mut registry, client);
        registry
    }

    /// Register a node type. Re-registering an ID replaces the old entry.
    pub fn register<F>(&mut self, factory: F)
    where
        F: Fn() -> Box<dyn FilterNode> + Send + Sync + 'static,
    {
        // Create a temporary instance to get metadata
        let metadata = factory().metadata();
        let id = metadata.id.clone();
        let category = metadata.category;

        let entry = RegistryEntry {
            factory: Arc::new(factory),
            metadata,
        };

        if let Some(previous) = self.filters.insert(id.clone(), entry) {
            log::warn!("Replacing registered node '{}'", id);
            if let Some(ids) = self.categories.get_mut(&previous.metadata.category) {
                ids.retain(|existing| existing != &id);
            }
        }

        self.categories.entry(category).or_default().push(id);
    }

    /// Create a new instance of a node by ID.
    pub fn create(&self, id: &str) -> Option<Box<dyn FilterNode>> {
        self.filters.get(id).map(|e| (e.factory)())
    }

    /// Get metadata for a node without creating an instance.
    pub fn get_metadata(&self, id: &str) -> Option<&NodeMetadata> {
        self.filters.get(id).map(|e| &e.metadata)
    }

    /// Check if a node is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.filters.contains_key(id)
    }

    /// Get all registered node IDs.
    pub fn filter_ids(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(|s| s.as_str())
    }

    /// Get nodes by category.
    pub fn filters_by_category(&self, category: &Category) -> Vec<&str> {
        self.categories
            .get(category)
            .map(|ids| ids.iter().map(|s| s.as_str()).collect())
            .unwrap_or_default()
    }

    /// Search nodes by ID, name, description or tag.
    pub fn search(&self, query: &str) -> Vec<&str> {
        let query = query.to_lowercase();

        self.filters
            .iter()
            .filter(|(_, entry)| {
                let metadata = &entry.metadata;
                metadata.id.to_lowercase().contains(&query)
                    || metadata.name.to_lowercase().contains(&query)
                    || metadata.description.to_lowercase().contains(&query)
                    || metadata.tags.iter().any(|t| t.to_lowercase().contains(&query))
            })
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Get the total number of registered nodes.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Get nodes grouped by category in display order, sorted by name.
    /// Empty categories are left out.
    pub fn grouped_by_category(&self) -> IndexMap<Category, Vec<&NodeMetadata>> {
        let mut grouped = IndexMap::new();

        for &category in Category::all() {
            let mut nodes: Vec<&NodeMetadata> = self
                .filters
                .values()
                .map(|e| &e.metadata)
                .filter(|m| m.category == category)
                .collect();

            if !nodes.is_empty() {
                nodes.sort_by(|a, b| a.name.cmp(&b.name));
                grouped.insert(category, nodes);
            }
        }

        grouped
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::builtin::testing::mock_client;
    use crate::filters::builtin::QwenVisionDescribe;

    fn builtins() -> FilterRegistry {
        let (client, _) = mock_client();
        FilterRegistry::with_builtins(client)
    }

    #[test]
    fn test_register_and_create() {
        let registry = builtins();

        assert_eq!(registry.len(), 3);
        assert!(registry.contains("qwen_text_to_image"));
        assert!(registry.create("qwen_image_edit").is_some());
        assert!(registry.create("gaussian_blur").is_none());
    }

    #[test]
    fn test_metadata_lookup() {
        let registry = builtins();

        let metadata = registry.get_metadata("qwen_vision_describe").unwrap();
        assert_eq!(metadata.name, "Qwen Vision Describe");
        assert_eq!(metadata.output_names(), vec!["description"]);
    }

    #[test]
    fn test_category_grouping() {
        let registry = builtins();

        assert_eq!(registry.filters_by_category(&Category::Edit), vec!["qwen_image_edit"]);
        assert!(registry.filters_by_category(&Category::Custom).is_empty());

        let grouped = registry.grouped_by_category();
        assert_eq!(
            grouped.keys().copied().collect::<Vec<_>>(),
            vec![Category::Generate, Category::Edit, Category::Vision]
        );
    }

    #[test]
    fn test_search() {
        let registry = builtins();

        assert_eq!(registry.search("caption"), vec!["qwen_vision_describe"]);
        assert_eq!(registry.search("QWEN").len(), 3);
        assert!(registry.search("nonexistent").is_empty());
    }

    #[test]
    fn test_reregister_replaces_entry() {
        let (client, _) = mock_client();
        let mut registry = FilterRegistry::with_builtins(Arc::clone(&client));
        registry.register(move || Box::new(QwenVisionDescribe::new(Arc::clone(&client))));

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.filters_by_category(&Category::Vision), vec!["qwen_vision_describe"]);
    }
}
