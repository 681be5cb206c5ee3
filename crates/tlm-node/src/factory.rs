//! Name-keyed registry of node types.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::node_type::{NodeType, builtin_node_types};

/// Outcome of a registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterStatus {
    Registered,
    /// The name was taken; the earlier entry is kept.
    AlreadyRegistered,
}

#[derive(Debug, Clone, Default)]
pub struct NodeFactory {
    types: BTreeMap<String, Arc<NodeType>>,
}

impl NodeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut factory = Self::new();
        for node_type in builtin_node_types() {
            factory.register(node_type);
        }
        factory
    }

    pub fn register(&mut self, node_type: NodeType) -> RegisterStatus {
        if self.types.contains_key(node_type.name()) {
            tracing::debug!(node_type = node_type.name(), "node type already registered");
            return RegisterStatus::AlreadyRegistered;
        }
        self.types
            .insert(node_type.name().to_owned(), Arc::new(node_type));
        RegisterStatus::Registered
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.types.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<Arc<NodeType>> {
        self.types.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_type::{SlotKind, hydraulic};

    #[test]
    fn builtins_are_present() {
        let factory = NodeFactory::with_builtins();
        assert!(factory.contains(hydraulic::NAME));
        assert_eq!(factory.names().count(), 5);
    }

    #[test]
    fn duplicate_keeps_first() {
        let mut factory = NodeFactory::new();
        let first = NodeType::new("thermal").with_slot("T", "K", SlotKind::Effort, 300.0);
        let second = NodeType::new("thermal");
        assert_eq!(factory.register(first), RegisterStatus::Registered);
        assert_eq!(factory.register(second), RegisterStatus::AlreadyRegistered);
        assert_eq!(factory.get("thermal").unwrap().len(), 1);

        assert!(factory.unregister("thermal"));
        assert!(!factory.unregister("thermal"));
    }
}
