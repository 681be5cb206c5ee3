//! The registries and diagnostics shared by everything one frontend builds.

use std::path::Path;
use std::sync::Arc;

use tlm_components::{Component, ComponentFactory, PluginLoader, register_builtin_components};
use tlm_core::MessageHandler;
use tlm_node::{NodeFactory, RegisterStatus};
use tlm_system::{ComponentSystem, register_subsystem};

use crate::error::{AppError, AppResult};

/// Component and node registries, loaded plugins and the message queue.
///
/// There is no global registry: every system built through an engine shares
/// its node registry and message queue, and nothing else.
pub struct Engine {
    components: ComponentFactory,
    node_types: Arc<NodeFactory>,
    plugins: PluginLoader,
    messages: Arc<MessageHandler>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// An engine with the built-in node types and components registered.
    pub fn new() -> Self {
        let messages = Arc::new(MessageHandler::new());
        let mut components = ComponentFactory::new(messages.clone());
        register_builtin_components(&mut components);
        register_subsystem(&mut components);
        Self {
            components,
            node_types: Arc::new(NodeFactory::with_builtins()),
            plugins: PluginLoader::new(messages.clone()),
            messages,
        }
    }

    pub fn messages(&self) -> &Arc<MessageHandler> {
        &self.messages
    }

    pub fn components(&self) -> &ComponentFactory {
        &self.components
    }

    pub fn node_types(&self) -> &Arc<NodeFactory> {
        &self.node_types
    }

    /// Load a component library. Systems built earlier keep the node
    /// registry they were built with.
    pub fn load_plugin(&mut self, path: &Path) -> AppResult<Vec<String>> {
        let nodes = Arc::make_mut(&mut self.node_types);
        Ok(self.plugins.load(path, &mut self.components, nodes)?)
    }

    /// Register a component type without going through a plugin.
    pub fn register_component<F>(&mut self, type_name: &str, creator: F) -> RegisterStatus
    where
        F: Fn() -> Box<dyn Component> + Send + Sync + 'static,
    {
        self.components.register(type_name, creator)
    }

    pub fn loaded_plugins(&self) -> impl Iterator<Item = &Path> {
        self.plugins.loaded()
    }

    /// An empty system wired to this engine's registries.
    pub fn new_system(&self, name: &str) -> ComponentSystem {
        let mut system = ComponentSystem::new(name);
        system.set_environment(self.messages.clone(), self.node_types.clone());
        system
    }

    pub fn create(&self, type_name: &str) -> AppResult<Box<dyn Component>> {
        self.components
            .create(type_name)
            .ok_or_else(|| AppError::UnknownType(type_name.to_owned()))
    }

    /// Registered component type names, sorted.
    pub fn component_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.components.names().collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("components", &self.components.len())
            .field("plugins", &self.plugins.loaded().count())
            .finish()
    }
}
