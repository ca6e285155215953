//! Hostbridge built-in modules
//!
//! Native modules every bridge registers before anything discovered at
//! runtime, plus the two synthetic modules the bridge appends last:
//! [`SourceCode`] and [`UiManager`].

#![warn(missing_docs)]

pub mod app_state;
pub mod exceptions;
pub mod http;
pub mod net_info;
pub mod networking;
pub mod source_code;
pub mod storage;
pub mod timing;
pub mod ui_manager;
pub mod view_managers;

use std::sync::Arc;

use hostbridge_sdk::NativeModule;

pub use app_state::{AppState, AppStateKind};
pub use exceptions::{ExceptionReport, ExceptionsManager};
pub use net_info::{Connectivity, NetInfo};
pub use networking::Networking;
pub use source_code::SourceCode;
pub use storage::AsyncLocalStorage;
pub use timing::Timing;
pub use ui_manager::{Frame, UiManager, ViewCommand};
pub use view_managers::ViewManagerModule;

/// Modules registered ahead of loaders and plugins, in registration order
pub fn internal_modules() -> Vec<Arc<dyn NativeModule>> {
    let mut modules: Vec<Arc<dyn NativeModule>> = vec![
        Arc::new(Timing::new()),
        Arc::new(AppState::new()),
        Arc::new(AsyncLocalStorage::new()),
        Arc::new(Networking::new()),
        Arc::new(NetInfo::new()),
    ];
    for manager in ViewManagerModule::builtin() {
        modules.push(Arc::new(manager));
    }
    modules.push(Arc::new(ExceptionsManager::new()));
    modules
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_module_order() {
        let names: Vec<String> = internal_modules().iter().map(|m| m.name().to_string()).collect();
        assert_eq!(
            names,
            vec![
                "Timing",
                "AppState",
                "AsyncLocalStorage",
                "Networking",
                "NetInfo",
                "RCTViewManager",
                "RCTRawTextManager",
                "RCTTextManager",
                "RCTImageViewManager",
                "ExceptionsManager",
            ]
        );
    }
}
