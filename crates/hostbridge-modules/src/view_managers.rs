//! View managers: modules that only describe a native view type
//!
//! A view manager exposes no methods. Its whole purpose is the
//! [`ViewConfig`] it hands to the UI manager, which publishes the view's
//! props and bubbling events to scripts.

use hostbridge_sdk::{Args, BridgeContext, MethodInfo, NativeError, NativeModule, NativeResult, Value, ViewConfig};

/// Module describing one native view type.
pub struct ViewManagerModule {
    name: String,
    config: ViewConfig,
}

impl ViewManagerModule {
    /// Create a view manager module named `name` for `config`
    pub fn new(name: impl Into<String>, config: ViewConfig) -> Self {
        ViewManagerModule {
            name: name.into(),
            config,
        }
    }

    /// Plain container view
    pub fn view() -> Self {
        Self::new(
            "RCTViewManager",
            ViewConfig::new("RCTView")
                .prop("backgroundColor", "Color")
                .prop("opacity", "number")
                .prop("pointerEvents", "String")
                .prop("testID", "String")
                .bubbling_event("topPress")
                .bubbling_event("topLayout"),
        )
    }

    /// Raw text leaf
    pub fn raw_text() -> Self {
        Self::new("RCTRawTextManager", ViewConfig::new("RCTRawText").prop("text", "String"))
    }

    /// Text container
    pub fn text() -> Self {
        Self::new(
            "RCTTextManager",
            ViewConfig::new("RCTText")
                .prop("color", "Color")
                .prop("fontSize", "number")
                .prop("fontWeight", "String")
                .prop("numberOfLines", "number")
                .bubbling_event("topPress"),
        )
    }

    /// Image view
    pub fn image() -> Self {
        Self::new(
            "RCTImageViewManager",
            ViewConfig::new("RCTImageView")
                .prop("src", "String")
                .prop("resizeMode", "String")
                .prop("tintColor", "Color")
                .bubbling_event("topLoad")
                .bubbling_event("topError"),
        )
    }

    /// The built-in view managers, in registration order
    pub fn builtin() -> Vec<ViewManagerModule> {
        vec![Self::view(), Self::raw_text(), Self::text(), Self::image()]
    }
}

impl NativeModule for ViewManagerModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn methods(&self) -> Vec<MethodInfo> {
        Vec::new()
    }

    fn view_config(&self) -> Option<ViewConfig> {
        Some(self.config.clone())
    }

    fn call(&self, _ctx: &dyn BridgeContext, method: usize, _args: Args<'_>) -> NativeResult<Value> {
        Err(NativeError::UnknownMethod(method))
    }
}
