//! Type-name keyed component creation.

use std::collections::BTreeMap;
use std::sync::Arc;

use tlm_core::MessageHandler;
use tlm_node::RegisterStatus;

use crate::traits::Component;

pub type Creator = Arc<dyn Fn() -> Box<dyn Component> + Send + Sync>;

/// Registry of component creators, keyed by type name.
///
/// Registration problems are reported through the shared [`MessageHandler`]
/// rather than as errors, so a plugin with one bad entry still loads the rest.
#[derive(Clone)]
pub struct ComponentFactory {
    creators: BTreeMap<String, Creator>,
    messages: Arc<MessageHandler>,
}

impl ComponentFactory {
    pub fn new(messages: Arc<MessageHandler>) -> Self {
        Self {
            creators: BTreeMap::new(),
            messages,
        }
    }

    pub fn messages(&self) -> &Arc<MessageHandler> {
        &self.messages
    }

    pub fn register<F>(&mut self, type_name: &str, creator: F) -> RegisterStatus
    where
        F: Fn() -> Box<dyn Component> + Send + Sync + 'static,
    {
        self.register_creator(type_name, Arc::new(creator))
    }

    /// First registration wins; a duplicate is reported once and ignored.
    pub fn register_creator(&mut self, type_name: &str, creator: Creator) -> RegisterStatus {
        if self.creators.contains_key(type_name) {
            self.messages.warning(format!(
                "Component type {type_name} is already registered, keeping the first registration"
            ));
            return RegisterStatus::AlreadyRegistered;
        }
        tracing::debug!(type_name, "registered component type");
        self.creators.insert(type_name.to_owned(), creator);
        RegisterStatus::Registered
    }

    pub fn unregister(&mut self, type_name: &str) -> bool {
        self.creators.remove(type_name).is_some()
    }

    pub fn creator(&self, type_name: &str) -> Option<Creator> {
        self.creators.get(type_name).cloned()
    }

    pub fn create(&self, type_name: &str) -> Option<Box<dyn Component>> {
        match self.creators.get(type_name) {
            Some(creator) => Some(creator()),
            None => {
                self.messages
                    .error(format!("Unknown component type {type_name}"));
                None
            }
        }
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.creators.contains_key(type_name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.creators.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.creators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creators.is_empty()
    }
}

impl std::fmt::Debug for ComponentFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentFactory")
            .field("types", &self.creators.keys().collect::<Vec<_>>())
            .finish()
    }
}
