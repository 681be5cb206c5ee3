//! Dynamic component libraries.
//!
//! A plugin is a `cdylib` exporting one static, `tlm_plugin_declaration`,
//! normally produced with [`export_plugin!`](crate::export_plugin). Loading it
//! checks the declaration and then lets the library register its component
//! and node types through a [`PluginRegistrar`].
//!
//! Every instance created from a plugin creator holds an `Arc` of the library,
//! so unloading only drops the loader's own handle.

use std::any::Any;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::Library;
use tlm_core::MessageHandler;
use tlm_node::{NodeFactory, NodeType, RegisterStatus};

use crate::configurator::Configurator;
use crate::context::{InitContext, SimContext};
use crate::error::{ComponentError, ComponentResult};
use crate::factory::ComponentFactory;
use crate::traits::{CausalRole, Component};

/// Bumped whenever [`PluginDeclaration`] or [`PluginRegistrar`] change shape.
pub const PLUGIN_ABI_VERSION: u32 = 1;

pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DECLARATION_SYMBOL: &[u8] = b"tlm_plugin_declaration\0";

#[repr(C)]
#[derive(Clone, Copy)]
pub struct PluginDeclaration {
    pub abi_version: u32,
    pub core_version: &'static str,
    pub debug_build: bool,
    pub register: unsafe fn(&mut PluginRegistrar<'_>),
}

/// Export a plugin declaration calling `$register` on load.
///
/// ```ignore
/// fn register(r: &mut tlm_components::PluginRegistrar<'_>) {
///     r.register_component("MyOrifice", || Box::new(MyOrifice::default()));
/// }
/// tlm_components::export_plugin!(register);
/// ```
#[macro_export]
macro_rules! export_plugin {
    ($register:expr) => {
        #[unsafe(no_mangle)]
        #[allow(non_upper_case_globals)]
        pub static tlm_plugin_declaration: $crate::PluginDeclaration = $crate::PluginDeclaration {
            abi_version: $crate::PLUGIN_ABI_VERSION,
            core_version: $crate::CORE_VERSION,
            debug_build: cfg!(debug_assertions),
            register: $register,
        };
    };
}

/// Refuse an ABI mismatch, warn about a version or build-profile mismatch.
pub fn check_declaration(
    decl: &PluginDeclaration,
    messages: &MessageHandler,
    path: &Path,
) -> ComponentResult<()> {
    if decl.abi_version != PLUGIN_ABI_VERSION {
        return Err(ComponentError::Plugin {
            path: path.display().to_string(),
            what: format!(
                "ABI version {} does not match {PLUGIN_ABI_VERSION}",
                decl.abi_version
            ),
        });
    }
    if decl.core_version != CORE_VERSION {
        messages.warning(format!(
            "Plugin {} was built against core {} but this is {CORE_VERSION}",
            path.display(),
            decl.core_version
        ));
    }
    if decl.debug_build != cfg!(debug_assertions) {
        let profile = |debug: bool| if debug { "debug" } else { "release" };
        messages.warning(format!(
            "Plugin {} is a {} build loaded into a {} build",
            path.display(),
            profile(decl.debug_build),
            profile(cfg!(debug_assertions))
        ));
    }
    Ok(())
}

/// Handed to a plugin's register function.
pub struct PluginRegistrar<'a> {
    components: &'a mut ComponentFactory,
    nodes: &'a mut NodeFactory,
    anchor: Arc<dyn Any + Send + Sync>,
    registered: Vec<String>,
    node_types: Vec<String>,
}

impl<'a> PluginRegistrar<'a> {
    /// `anchor` is cloned into every creator and every instance it makes.
    pub fn new(
        components: &'a mut ComponentFactory,
        nodes: &'a mut NodeFactory,
        anchor: Arc<dyn Any + Send + Sync>,
    ) -> Self {
        Self {
            components,
            nodes,
            anchor,
            registered: Vec::new(),
            node_types: Vec::new(),
        }
    }

    pub fn register_component(
        &mut self,
        type_name: &str,
        create: fn() -> Box<dyn Component>,
    ) -> RegisterStatus {
        let anchor = Arc::clone(&self.anchor);
        let status = self.components.register(type_name, move || {
            Box::new(LibraryBound {
                inner: create(),
                _anchor: Arc::clone(&anchor),
            }) as Box<dyn Component>
        });
        if status == RegisterStatus::Registered {
            self.registered.push(type_name.to_owned());
        }
        status
    }

    pub fn register_node_type(&mut self, node_type: NodeType) -> RegisterStatus {
        let name = node_type.name().to_owned();
        let status = self.nodes.register(node_type);
        match status {
            RegisterStatus::Registered => self.node_types.push(name),
            RegisterStatus::AlreadyRegistered => self
                .components
                .messages()
                .warning(format!("Node type {name} is already registered")),
        }
        status
    }

    /// Component and node type names registered so far.
    pub fn into_registered(self) -> (Vec<String>, Vec<String>) {
        (self.registered, self.node_types)
    }
}

/// Plugin-created component that keeps its library loaded.
///
/// Field order matters: `inner` (whose code and vtable live in the library)
/// drops before the anchor.
struct LibraryBound {
    inner: Box<dyn Component>,
    _anchor: Arc<dyn Any + Send + Sync>,
}

impl Component for LibraryBound {
    fn role(&self) -> CausalRole {
        self.inner.role()
    }

    fn configure(&self, cfg: &mut Configurator) {
        self.inner.configure(cfg);
    }

    fn initialize(&mut self, ctx: &mut InitContext<'_>) -> ComponentResult<()> {
        self.inner.initialize(ctx)
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) {
        self.inner.simulate_one_timestep(ctx);
    }

    fn finalize(&mut self, ctx: &mut SimContext<'_>) {
        self.inner.finalize(ctx);
    }

    fn direct_feedthrough(&self) -> bool {
        self.inner.direct_feedthrough()
    }

    fn check_model(&self, messages: &MessageHandler) -> bool {
        self.inner.check_model(messages)
    }
}

struct LoadedPlugin {
    _library: Arc<Library>,
    components: Vec<String>,
    node_types: Vec<String>,
}

/// Libraries loaded into one engine, keyed by path.
pub struct PluginLoader {
    loaded: BTreeMap<PathBuf, LoadedPlugin>,
    messages: Arc<MessageHandler>,
}

impl PluginLoader {
    pub fn new(messages: Arc<MessageHandler>) -> Self {
        Self {
            loaded: BTreeMap::new(),
            messages,
        }
    }

    /// Load `path` and register what it declares. Returns the component type
    /// names it added.
    pub fn load(
        &mut self,
        path: &Path,
        components: &mut ComponentFactory,
        nodes: &mut NodeFactory,
    ) -> ComponentResult<Vec<String>> {
        let key = path.to_path_buf();
        if self.loaded.contains_key(&key) {
            self.messages
                .warning(format!("Plugin {} is already loaded", path.display()));
            return Ok(Vec::new());
        }
        let plugin_err = |what: String| ComponentError::Plugin {
            path: path.display().to_string(),
            what,
        };

        // SAFETY: loading a library runs its initializers; plugins are trusted
        // code chosen by the user.
        let library = unsafe { Library::new(path) }.map_err(|e| plugin_err(e.to_string()))?;
        // SAFETY: the symbol is the static emitted by `export_plugin!`; it is
        // copied out before anything else touches the library.
        let decl = unsafe {
            library
                .get::<*const PluginDeclaration>(DECLARATION_SYMBOL)
                .map(|symbol| symbol.read())
        }
        .map_err(|e| plugin_err(e.to_string()))?;

        check_declaration(&decl, &self.messages, path)?;

        let library = Arc::new(library);
        let anchor: Arc<dyn Any + Send + Sync> = library.clone();
        let mut registrar = PluginRegistrar::new(components, nodes, anchor);
        // SAFETY: the declaration passed the ABI check above.
        unsafe { (decl.register)(&mut registrar) };
        let (added, node_types) = registrar.into_registered();

        tracing::info!(
            path = %path.display(),
            components = added.len(),
            node_types = node_types.len(),
            "loaded plugin"
        );
        self.messages.info(format!(
            "Loaded plugin {} with {} component type(s)",
            path.display(),
            added.len()
        ));
        self.loaded.insert(
            key,
            LoadedPlugin {
                _library: library,
                components: added.clone(),
                node_types,
            },
        );
        Ok(added)
    }

    /// Unregister everything `path` added. Live instances keep the library
    /// loaded until they drop.
    pub fn unload(
        &mut self,
        path: &Path,
        components: &mut ComponentFactory,
        nodes: &mut NodeFactory,
    ) -> bool {
        let Some(plugin) = self.loaded.remove(path) else {
            return false;
        };
        for name in &plugin.components {
            components.unregister(name);
        }
        for name in &plugin.node_types {
            nodes.unregister(name);
        }
        tracing::info!(path = %path.display(), "unloaded plugin");
        true
    }

    pub fn loaded(&self) -> impl Iterator<Item = &Path> {
        self.loaded.keys().map(PathBuf::as_path)
    }

    pub fn components_of(&self, path: &Path) -> Option<&[String]> {
        self.loaded.get(path).map(|p| p.components.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tlm_core::Severity;
    use tlm_node::SlotKind;

    struct Dummy;

    impl Component for Dummy {
        fn role(&self) -> CausalRole {
            CausalRole::Signal
        }
        fn configure(&self, cfg: &mut Configurator) {
            cfg.add_output_variable("out", "");
        }
        fn initialize(&mut self, _ctx: &mut InitContext<'_>) -> ComponentResult<()> {
            Ok(())
        }
        fn simulate_one_timestep(&mut self, _ctx: &mut SimContext<'_>) {}
    }

    fn make_dummy() -> Box<dyn Component> {
        Box::new(Dummy)
    }

    fn declaration(abi_version: u32, core_version: &'static str) -> PluginDeclaration {
        unsafe fn register(_: &mut PluginRegistrar<'_>) {}
        PluginDeclaration {
            abi_version,
            core_version,
            debug_build: cfg!(debug_assertions),
            register,
        }
    }

    #[test]
    fn abi_mismatch_is_refused() {
        let messages = MessageHandler::new();
        let decl = declaration(PLUGIN_ABI_VERSION + 1, CORE_VERSION);
        let err = check_declaration(&decl, &messages, Path::new("libfoo.so")).unwrap_err();
        assert!(matches!(err, ComponentError::Plugin { .. }));
        assert_eq!(messages.num_waiting(), 0);
    }

    #[test]
    fn version_mismatch_only_warns() {
        let messages = MessageHandler::new();
        let decl = declaration(PLUGIN_ABI_VERSION, "0.0.0-other");
        check_declaration(&decl, &messages, Path::new("libfoo.so")).unwrap();
        assert_eq!(messages.count(Severity::Warning), 1);
    }

    #[test]
    fn instances_hold_the_anchor() {
        let messages = Arc::new(MessageHandler::new());
        let mut components = ComponentFactory::new(messages);
        let mut nodes = NodeFactory::with_builtins();
        let anchor = Arc::new(());
        let base = Arc::strong_count(&anchor);

        let mut registrar = PluginRegistrar::new(&mut components, &mut nodes, anchor.clone());
        assert_eq!(
            registrar.register_component("Dummy", make_dummy),
            RegisterStatus::Registered
        );
        registrar.register_node_type(NodeType::new("thermal").with_slot("T", "K", SlotKind::Effort, 300.0));
        let (added, node_types) = registrar.into_registered();
        assert_eq!(added, ["Dummy"]);
        assert_eq!(node_types, ["thermal"]);

        let instance = components.create("Dummy").unwrap();
        assert_eq!(instance.role(), CausalRole::Signal);
        assert!(Arc::strong_count(&anchor) > base);

        components.unregister("Dummy");
        let with_instance = Arc::strong_count(&anchor);
        assert!(with_instance > base);
        drop(instance);
        assert_eq!(Arc::strong_count(&anchor), base);
    }

    #[test]
    fn missing_library_is_an_error() {
        let messages = Arc::new(MessageHandler::new());
        let mut components = ComponentFactory::new(messages.clone());
        let mut nodes = NodeFactory::with_builtins();
        let mut loader = PluginLoader::new(messages);
        let err = loader
            .load(Path::new("/nonexistent/libnothing.so"), &mut components, &mut nodes)
            .unwrap_err();
        assert!(matches!(err, ComponentError::Plugin { .. }));
        assert_eq!(loader.loaded().count(), 0);
        assert!(!loader.unload(Path::new("/nonexistent/libnothing.so"), &mut components, &mut nodes));
    }
}
