//! Module loaders and the plugin entry point
//!
//! A module loader hands out a batch of module exports. Loaders can be
//! registered statically with the bridge or compiled into a shared library
//! placed in the plugins directory; in the latter case the library exports
//! `hostbridge_module_loader`, normally generated with
//! [`export_module_loader!`](crate::export_module_loader).
//!
//! Shared-library plugins must be built with the same compiler and the same
//! `hostbridge-sdk` version as the host: the entry passes Rust trait objects
//! across the boundary.

use std::sync::Arc;

use crate::module::NativeModule;

/// ABI revision checked by the host when loading a plugin library
pub const PLUGIN_ABI_VERSION: u32 = 1;

/// Symbol looked up in plugin libraries
pub const PLUGIN_ENTRY_SYMBOL: &str = "hostbridge_module_loader";

/// Something a loader exported.
///
/// Loaders may hand out objects that do not implement the module contract
/// (for example a plugin built against another SDK revision). Those are
/// reported as `Unsupported` and skipped by the bridge.
pub enum ModuleExport {
    /// A usable native module
    Module(Arc<dyn NativeModule>),
    /// An object that does not satisfy the module contract
    Unsupported {
        /// Name or type of the offending object
        name: String,
        /// Why it was rejected
        reason: String,
    },
}

impl ModuleExport {
    /// Wrap a module
    pub fn module(module: impl NativeModule + 'static) -> Self {
        ModuleExport::Module(Arc::new(module))
    }

    /// Capability check: the module, if this export provides one
    pub fn into_module(self) -> Option<Arc<dyn NativeModule>> {
        match self {
            ModuleExport::Module(module) => Some(module),
            ModuleExport::Unsupported { .. } => None,
        }
    }

    /// Display name of the export
    pub fn name(&self) -> &str {
        match self {
            ModuleExport::Module(module) => module.name(),
            ModuleExport::Unsupported { name, .. } => name,
        }
    }
}

impl std::fmt::Debug for ModuleExport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleExport::Module(module) => write!(f, "ModuleExport::Module({})", module.name()),
            ModuleExport::Unsupported { name, reason } => {
                write!(f, "ModuleExport::Unsupported({}: {})", name, reason)
            }
        }
    }
}

/// Provider of native modules.
///
/// Called once per registry build; every call must return fresh module
/// instances because the previous ones are discarded on reload.
pub trait ModuleLoader: Send + Sync {
    /// Modules made available by this loader
    fn available_modules(&self) -> Vec<ModuleExport>;
}

/// Value returned by a plugin library's entry symbol.
pub struct PluginEntry {
    /// Must equal [`PLUGIN_ABI_VERSION`]
    pub abi_version: u32,
    /// The plugin's module loader
    pub loader: Box<dyn ModuleLoader>,
}

impl PluginEntry {
    /// Wrap a loader with the current ABI version
    pub fn new(loader: impl ModuleLoader + 'static) -> Self {
        PluginEntry {
            abi_version: PLUGIN_ABI_VERSION,
            loader: Box::new(loader),
        }
    }
}

/// Generate the `hostbridge_module_loader` entry symbol for a plugin library.
///
/// ```ignore
/// struct MyLoader;
/// impl ModuleLoader for MyLoader { /* ... */ }
///
/// hostbridge_sdk::export_module_loader!(MyLoader);
/// ```
#[macro_export]
macro_rules! export_module_loader {
    ($loader:expr) => {
        #[no_mangle]
        #[allow(improper_ctypes_definitions)]
        pub extern "C" fn hostbridge_module_loader() -> *mut $crate::PluginEntry {
            ::std::boxed::Box::into_raw(::std::boxed::Box::new($crate::PluginEntry::new($loader)))
        }
    };
}
