//! UIManager: shadow view hierarchy driven by scripts
//!
//! The UI manager is registered after every other module and receives the
//! view configurations they export. Scripts create and arrange views by tag;
//! the host adds root views and reports layout frames.

mod tree;

pub use tree::{Frame, ShadowTree, ShadowView, TreeError};

use std::sync::Arc;

use hostbridge_sdk::{
    json, Args, BridgeContext, Callback, Constants, Map, MethodInfo, NativeError, NativeModule, NativeResult, Value,
    ViewConfig,
};
use parking_lot::Mutex;

/// View name used for host-created root views
pub const ROOT_VIEW_NAME: &str = "RCTRootView";

/// Root tags are 1, 11, 21, ...
const ROOT_TAG_INCREMENT: i64 = 10;

const CREATE_VIEW: usize = 0;
const UPDATE_VIEW: usize = 1;
const MANAGE_CHILDREN: usize = 2;
const SET_CHILDREN: usize = 3;
const REMOVE_ROOT_VIEW: usize = 4;
const REMOVE_SUBVIEWS: usize = 5;
const MEASURE: usize = 6;
const DISPATCH_COMMAND: usize = 7;

impl From<TreeError> for NativeError {
    fn from(e: TreeError) -> Self {
        NativeError::ArgumentError(e.to_string())
    }
}

/// A view manager command sent by a script
#[derive(Debug, Clone, PartialEq)]
pub struct ViewCommand {
    /// Target view tag
    pub tag: i64,
    /// Command identifier
    pub command: Value,
    /// Command arguments
    pub args: Vec<Value>,
}

struct UiState {
    tree: ShadowTree,
    next_root_tag: i64,
    commands: Vec<ViewCommand>,
}

/// Synthetic UI manager module.
pub struct UiManager {
    view_configs: Vec<ViewConfig>,
    state: Mutex<UiState>,
    bridge: Mutex<Option<Arc<dyn BridgeContext>>>,
}

impl UiManager {
    /// Create the UI manager for the views exported by earlier modules
    pub fn new(view_configs: Vec<ViewConfig>) -> Self {
        UiManager {
            view_configs,
            state: Mutex::new(UiState {
                tree: ShadowTree::new(),
                next_root_tag: 1,
                commands: Vec::new(),
            }),
            bridge: Mutex::new(None),
        }
    }

    /// View configurations known to this UI manager
    pub fn view_configs(&self) -> &[ViewConfig] {
        &self.view_configs
    }

    fn knows_view(&self, view_name: &str) -> bool {
        view_name == ROOT_VIEW_NAME || self.view_configs.iter().any(|c| c.view_name == view_name)
    }

    /// Add a host root view and return its tag
    pub fn add_root_view(&self) -> i64 {
        let mut state = self.state.lock();
        let mut tag = state.next_root_tag;
        while state.tree.get(tag).is_some() {
            tag += ROOT_TAG_INCREMENT;
        }
        state.next_root_tag = tag + ROOT_TAG_INCREMENT;
        // The tag was just checked to be free.
        let _ = state.tree.add_root(tag, ROOT_VIEW_NAME);
        tracing::debug!("Added root view {}", tag);
        tag
    }

    /// Snapshot of a view
    pub fn view(&self, tag: i64) -> Option<ShadowView> {
        self.state.lock().tree.get(tag).cloned()
    }

    /// Number of live views, roots included
    pub fn view_count(&self) -> usize {
        self.state.lock().tree.len()
    }

    /// Report the layout frame of a view
    pub fn set_frame(&self, tag: i64, frame: Frame) -> Result<(), TreeError> {
        self.state.lock().tree.set_frame(tag, frame)
    }

    /// Take the view manager commands received so far
    pub fn take_commands(&self) -> Vec<ViewCommand> {
        std::mem::take(&mut self.state.lock().commands)
    }

    /// Send an event to the script-side handler of a view
    pub fn dispatch_event(&self, tag: i64, name: &str, body: Value) {
        match self.bridge.lock().as_ref() {
            Some(bridge) => bridge.dispatch_view_event(tag, name, body),
            None => tracing::warn!("Dropping view event {} for {}: no bridge", name, tag),
        }
    }

    fn custom_bubbling_event_types(&self) -> Map<String, Value> {
        let mut types = Map::new();
        for event in self.view_configs.iter().flat_map(|c| &c.bubbling_events) {
            let handler = match event.strip_prefix("top") {
                Some(rest) => format!("on{}", rest),
                None => format!("on{}", event),
            };
            types.insert(
                event.clone(),
                json!({
                    "phasedRegistrationNames": {
                        "bubbled": handler,
                        "captured": format!("{}Capture", handler),
                    }
                }),
            );
        }
        types
    }
}

fn props_arg(args: &Args<'_>, index: usize) -> NativeResult<Map<String, Value>> {
    Ok(args.opt::<Map<String, Value>>(index)?.unwrap_or_default())
}

fn index_list(args: &Args<'_>, index: usize) -> NativeResult<Vec<usize>> {
    let values: Option<Vec<Value>> = args.opt(index)?;
    values
        .unwrap_or_default()
        .iter()
        .map(|v| {
            v.as_u64()
                .map(|n| n as usize)
                .ok_or_else(|| NativeError::ArgumentError(format!("Invalid index {} in argument {}", v, index)))
        })
        .collect()
}

fn tag_list(args: &Args<'_>, index: usize) -> NativeResult<Vec<i64>> {
    let values: Option<Vec<Value>> = args.opt(index)?;
    values
        .unwrap_or_default()
        .iter()
        .map(|v| {
            v.as_i64()
                .ok_or_else(|| NativeError::ArgumentError(format!("Invalid tag {} in argument {}", v, index)))
        })
        .collect()
}

impl NativeModule for UiManager {
    fn name(&self) -> &str {
        "UIManager"
    }

    fn methods(&self) -> Vec<MethodInfo> {
        vec![
            MethodInfo::method("createView"),
            MethodInfo::method("updateView"),
            MethodInfo::method("manageChildren"),
            MethodInfo::method("setChildren"),
            MethodInfo::method("removeRootView"),
            MethodInfo::method("removeSubviewsFromContainerWithID"),
            MethodInfo::method("measure"),
            MethodInfo::method("dispatchViewManagerCommand"),
        ]
    }

    fn constants(&self) -> Constants {
        let mut constants = Constants::new();
        for config in &self.view_configs {
            constants.insert(
                config.view_name.clone(),
                json!({ "NativeProps": config.native_props }),
            );
        }
        constants.insert(
            "customBubblingEventTypes".to_string(),
            Value::Object(self.custom_bubbling_event_types()),
        );
        constants
    }

    fn set_bridge(&self, bridge: Arc<dyn BridgeContext>) {
        *self.bridge.lock() = Some(bridge);
    }

    fn call(&self, ctx: &dyn BridgeContext, method: usize, args: Args<'_>) -> NativeResult<Value> {
        match method {
            CREATE_VIEW => {
                let tag: i64 = args.get(0)?;
                let view_name: String = args.get(1)?;
                let root_tag: i64 = args.get(2)?;
                let props = props_arg(&args, 3)?;
                if !self.knows_view(&view_name) {
                    return Err(NativeError::ArgumentError(format!("Unknown view type {}", view_name)));
                }
                self.state.lock().tree.create(tag, &view_name, root_tag, props)?;
            }
            UPDATE_VIEW => {
                let tag: i64 = args.get(0)?;
                let props = props_arg(&args, 2)?;
                self.state.lock().tree.update(tag, props)?;
            }
            MANAGE_CHILDREN => {
                let container: i64 = args.get(0)?;
                let move_from = index_list(&args, 1)?;
                let move_to = index_list(&args, 2)?;
                let add_tags = tag_list(&args, 3)?;
                let add_at = index_list(&args, 4)?;
                let remove_at = index_list(&args, 5)?;
                self.state
                    .lock()
                    .tree
                    .manage_children(container, &move_from, &move_to, &add_tags, &add_at, &remove_at)?;
            }
            SET_CHILDREN => {
                let container: i64 = args.get(0)?;
                let tags = tag_list(&args, 1)?;
                self.state.lock().tree.set_children(container, &tags)?;
            }
            REMOVE_ROOT_VIEW => {
                let tag: i64 = args.get(0)?;
                self.state.lock().tree.remove_root(tag)?;
            }
            REMOVE_SUBVIEWS => {
                let tag: i64 = args.get(0)?;
                self.state.lock().tree.remove_subviews(tag)?;
            }
            MEASURE => {
                let tag: i64 = args.get(0)?;
                let callback: Callback = args.get(1)?;
                let measured = self.state.lock().tree.measure(tag)?;
                callback.invoke(ctx, measured.iter().map(|v| json!(v)).collect());
            }
            DISPATCH_COMMAND => {
                let tag: i64 = args.get(0)?;
                let command: Value = args.get(1)?;
                let command_args: Option<Vec<Value>> = args.opt(2)?;
                tracing::debug!("View command {} for {}", command, tag);
                self.state.lock().commands.push(ViewCommand {
                    tag,
                    command,
                    args: command_args.unwrap_or_default(),
                });
            }
            other => return Err(NativeError::UnknownMethod(other)),
        }
        Ok(Value::Null)
    }
}
