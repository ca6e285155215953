//! Plugin discovery
//!
//! Modules outside the host binary live in shared libraries placed in the
//! plugins directory. Each library exports `hostbridge_module_loader`, which
//! returns a [`PluginEntry`]. Anything that goes wrong with one library is
//! logged and that library is skipped.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hostbridge_sdk::{
    Args, BridgeContext, Constants, MethodInfo, ModuleExport, NativeModule, NativeResult, PluginEntry, Value,
    ViewConfig, PLUGIN_ABI_VERSION, PLUGIN_ENTRY_SYMBOL,
};
use thiserror::Error;

/// Errors that can occur while loading a plugin library
#[derive(Debug, Error)]
pub enum LoadError {
    /// Library file not found or could not be loaded
    #[error("Library not found: {path}")]
    NotFound {
        /// Path that was attempted
        path: String,
    },

    /// Symbol not found in library
    #[error("Symbol not found: {symbol} in {library}")]
    SymbolNotFound {
        /// Symbol name that was not found
        symbol: String,
        /// Library path
        library: String,
    },

    /// The entry point returned nothing usable
    #[error("Invalid plugin entry: {0}")]
    InvalidEntry(String),

    /// Plugin built for another ABI revision
    #[error("Plugin ABI version {found} does not match host version {expected}")]
    AbiMismatch {
        /// Version reported by the plugin
        found: u32,
        /// Version of this host
        expected: u32,
    },

    /// Platform-specific error
    #[error("Platform error: {0}")]
    PlatformError(String),

    /// Invalid path encoding
    #[error("Invalid UTF-8 in path: {0}")]
    InvalidPath(String),
}

/// A loaded plugin library.
///
/// Modules created by the library point into its code, so the library must
/// be dropped after every module it produced. [`DylibDiscovery`] hands the
/// modules out wrapped in [`PluginModule`], which keeps the library open.
pub struct Library {
    handle: LibraryHandle,
    path: String,
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library").field("path", &self.path).finish()
    }
}

impl Library {
    /// Load a dynamic library from the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path_ref = path.as_ref();
        let path_str = path_ref
            .to_str()
            .ok_or_else(|| LoadError::InvalidPath(format!("{:?}", path_ref)))?;

        let handle = LibraryHandle::load(path_str)?;

        Ok(Library {
            handle,
            path: path_str.to_string(),
        })
    }

    /// Get a function pointer by name.
    ///
    /// # Safety
    ///
    /// The function signature must match `T` and the library must stay
    /// loaded while the pointer is used.
    pub unsafe fn get<T>(&self, symbol: &str) -> Result<T, LoadError> {
        self.handle.symbol(symbol, &self.path)
    }

    /// Call the plugin entry point and collect the modules it exports.
    pub fn load_exports(&self) -> Result<Vec<ModuleExport>, LoadError> {
        type EntryFn = extern "C" fn() -> *mut PluginEntry;

        let entry = unsafe {
            let entry_fn: EntryFn = self.get(PLUGIN_ENTRY_SYMBOL)?;
            let entry_ptr = entry_fn();
            if entry_ptr.is_null() {
                return Err(LoadError::InvalidEntry(format!("{} returned null", PLUGIN_ENTRY_SYMBOL)));
            }
            Box::from_raw(entry_ptr)
        };

        if entry.abi_version != PLUGIN_ABI_VERSION {
            return Err(LoadError::AbiMismatch {
                found: entry.abi_version,
                expected: PLUGIN_ABI_VERSION,
            });
        }
        Ok(entry.loader.available_modules())
    }

    /// Get the path this library was loaded from
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// A module exported by a plugin library, holding that library open.
///
/// Clones of the registry, worker threads and retired executors may keep a
/// module alive past a reload; the library is closed only when the last
/// reference to the last of its modules goes away.
pub struct PluginModule {
    // Declared first: the module is dropped while its code is still mapped.
    module: Arc<dyn NativeModule>,
    library: Arc<Library>,
}

impl PluginModule {
    /// Tie `module` to the library that produced it
    pub fn new(module: Arc<dyn NativeModule>, library: Arc<Library>) -> Self {
        PluginModule { module, library }
    }

    /// The library the module came from
    pub fn library(&self) -> &Arc<Library> {
        &self.library
    }
}

impl NativeModule for PluginModule {
    fn name(&self) -> &str {
        self.module.name()
    }

    fn methods(&self) -> Vec<MethodInfo> {
        self.module.methods()
    }

    fn constants(&self) -> Constants {
        self.module.constants()
    }

    fn set_bridge(&self, bridge: Arc<dyn BridgeContext>) {
        self.module.set_bridge(bridge)
    }

    fn view_config(&self) -> Option<ViewConfig> {
        self.module.view_config()
    }

    fn call(&self, ctx: &dyn BridgeContext, method: usize, args: Args<'_>) -> NativeResult<Value> {
        self.module.call(ctx, method, args)
    }
}

/// Wrap every usable export so it keeps `library` open
fn bind_exports(exports: Vec<ModuleExport>, library: &Arc<Library>) -> Vec<ModuleExport> {
    exports
        .into_iter()
        .map(|export| match export {
            ModuleExport::Module(module) => {
                ModuleExport::Module(Arc::new(PluginModule::new(module, library.clone())))
            }
            unsupported => unsupported,
        })
        .collect()
}

// ============================================================================
// Discovery
// ============================================================================

/// Result of searching a plugins directory.
#[derive(Debug, Default)]
pub struct Discovered {
    /// Everything the libraries exported, in discovery order
    pub exports: Vec<ModuleExport>,
    /// Libraries that exported something; their modules hold them open too
    pub libraries: Vec<Arc<Library>>,
}

/// Finds module exports under a filesystem path.
pub trait PluginDiscovery: Send {
    /// Search `path`; problems with individual entries are logged and skipped
    fn discover(&self, path: &Path) -> Discovered;
}

/// Opens every `*.so` / `*.dylib` in the plugins directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct DylibDiscovery;

impl DylibDiscovery {
    fn candidates(path: &Path) -> Vec<PathBuf> {
        let mut found = Vec::new();
        for extension in ["so", "dylib"] {
            let pattern = path.join(format!("*.{}", extension));
            let Some(pattern) = pattern.to_str() else {
                tracing::warn!("Plugins path {} is not valid UTF-8", path.display());
                return Vec::new();
            };
            match glob::glob(pattern) {
                Ok(paths) => found.extend(paths.filter_map(Result::ok)),
                Err(e) => tracing::warn!("Bad plugin pattern {}: {}", pattern, e),
            }
        }
        found.sort();
        found
    }
}

impl PluginDiscovery for DylibDiscovery {
    fn discover(&self, path: &Path) -> Discovered {
        let mut discovered = Discovered::default();
        if !path.is_dir() {
            tracing::debug!("Plugins path {} does not exist", path.display());
            return discovered;
        }

        for candidate in Self::candidates(path) {
            let library = match Library::open(&candidate) {
                Ok(library) => library,
                Err(e) => {
                    tracing::warn!("Skipping plugin {}: {}", candidate.display(), e);
                    continue;
                }
            };
            match library.load_exports() {
                Ok(exports) => {
                    tracing::info!("Loaded {} module(s) from {}", exports.len(), library.path());
                    let library = Arc::new(library);
                    discovered.exports.extend(bind_exports(exports, &library));
                    discovered.libraries.push(library);
                }
                Err(e) => tracing::warn!("Skipping plugin {}: {}", library.path(), e),
            }
        }
        discovered
    }
}

// Platform-specific implementations

#[cfg(unix)]
type LibraryHandle = UnixLibrary;

#[cfg(not(unix))]
type LibraryHandle = UnsupportedLibrary;

// ============================================================================
// Unix Implementation (Linux, macOS, BSD)
// ============================================================================

#[cfg(unix)]
struct UnixLibrary {
    handle: *mut std::ffi::c_void,
}

#[cfg(unix)]
impl UnixLibrary {
    fn load(path: &str) -> Result<Self, LoadError> {
        let c_path = std::ffi::CString::new(path).map_err(|e| LoadError::PlatformError(format!("Invalid path: {}", e)))?;

        let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };

        if handle.is_null() {
            return Err(LoadError::NotFound {
                path: format!("{}: {}", path, last_dl_error()),
            });
        }

        Ok(UnixLibrary { handle })
    }

    unsafe fn symbol<T>(&self, name: &str, lib_path: &str) -> Result<T, LoadError> {
        let c_name =
            std::ffi::CString::new(name).map_err(|e| LoadError::PlatformError(format!("Invalid symbol name: {}", e)))?;

        // Clear any previous error
        libc::dlerror();

        let symbol = libc::dlsym(self.handle, c_name.as_ptr());
        if symbol.is_null() {
            return Err(LoadError::SymbolNotFound {
                symbol: name.to_string(),
                library: format!("{}: {}", lib_path, last_dl_error()),
            });
        }

        Ok(std::mem::transmute_copy(&symbol))
    }
}

#[cfg(unix)]
fn last_dl_error() -> String {
    unsafe {
        let err_ptr = libc::dlerror();
        if err_ptr.is_null() {
            "unknown error".to_string()
        } else {
            std::ffi::CStr::from_ptr(err_ptr).to_string_lossy().into_owned()
        }
    }
}

#[cfg(unix)]
impl Drop for UnixLibrary {
    fn drop(&mut self) {
        unsafe {
            libc::dlclose(self.handle);
        }
    }
}

#[cfg(unix)]
unsafe impl Send for UnixLibrary {}
#[cfg(unix)]
unsafe impl Sync for UnixLibrary {}

// ============================================================================
// Other platforms
// ============================================================================

#[cfg(not(unix))]
struct UnsupportedLibrary;

#[cfg(not(unix))]
impl UnsupportedLibrary {
    fn load(_path: &str) -> Result<Self, LoadError> {
        Err(LoadError::PlatformError(
            "plugin libraries are only supported on unix".to_string(),
        ))
    }

    unsafe fn symbol<T>(&self, name: &str, lib_path: &str) -> Result<T, LoadError> {
        Err(LoadError::SymbolNotFound {
            symbol: name.to_string(),
            library: lib_path.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_not_found() {
        let result = Library::open("/nonexistent/library.so");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_directory_yields_nothing() {
        let discovered = DylibDiscovery.discover(Path::new("/nonexistent/plugins"));
        assert!(discovered.exports.is_empty());
        assert!(discovered.libraries.is_empty());
    }

    struct Echo;

    impl NativeModule for Echo {
        fn name(&self) -> &str {
            "Echo"
        }

        fn methods(&self) -> Vec<MethodInfo> {
            vec![MethodInfo::sync("echo")]
        }

        fn call(&self, _ctx: &dyn BridgeContext, _method: usize, args: Args<'_>) -> NativeResult<Value> {
            args.get(0)
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_plugin_modules_keep_their_library_open() {
        use hostbridge_sdk::testing::RecordingContext;

        let library = Arc::new(Library::open("libc.so.6").unwrap());
        let exports = bind_exports(
            vec![
                ModuleExport::module(Echo),
                ModuleExport::Unsupported { name: "Widget".to_string(), reason: "no methods".to_string() },
            ],
            &library,
        );
        assert_eq!(Arc::strong_count(&library), 2);

        let mut exports = exports.into_iter();
        let module = exports.next().and_then(ModuleExport::into_module).unwrap();
        assert!(exports.next().and_then(ModuleExport::into_module).is_none());
        assert_eq!(module.name(), "Echo");
        let ctx = RecordingContext::new();
        assert_eq!(module.call(&ctx, 0, Args::new(&[Value::from(4)])), Ok(Value::from(4)));

        // A clone outliving the discovery result still pins the library.
        let held = module.clone();
        drop(module);
        assert_eq!(Arc::strong_count(&library), 2);
        drop(held);
        assert_eq!(Arc::strong_count(&library), 1);
    }

    #[test]
    fn test_non_library_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.so"), b"not an ELF file").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        assert_eq!(DylibDiscovery::candidates(dir.path()).len(), 1);
        let discovered = DylibDiscovery.discover(dir.path());
        assert!(discovered.exports.is_empty());
        assert!(discovered.libraries.is_empty());
    }
}
