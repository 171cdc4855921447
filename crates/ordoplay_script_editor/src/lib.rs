// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor core for `OrdoPlay` visual scripts.
//!
//! Everything an editor front end needs besides drawing:
//! - A reducer [`store`] with serialized dispatch and cancellable async actions
//! - Editor state and graph editing [`actions`]
//! - The node [`searcher`], resolved through an async action
//! - A registry-based UI factory and host view abstraction ([`view`])
//! - UI reconciliation after each edit ([`reconcile`])
//! - Script [`settings`] loaded from RON
//! - An editing [`session`] tying the pieces together

pub mod actions;
pub mod reconcile;
pub mod searcher;
pub mod session;
pub mod settings;
pub mod store;
pub mod view;

pub use actions::{
    register_editor_reducers, AcknowledgeChanges, ActionError, ChangeFunctionCallMethod, ConnectPorts, CreateNode,
    DeleteElements, DisconnectEdges, EditorEnv, EditorState, MarkSaved, MoveNodes, RenameNode, SetEmbeddedConstant,
    SetNodeColor, SetNodesCollapsed, SetNodesLocked,
};
pub use reconcile::{
    apply_plan, compute_changes, delete_graph_elements, full_rebuild, rebuild_edges, rebuild_nodes, reconcile,
    ChangeList, ReconcilePlan,
};
pub use searcher::{open_searcher, SearcherHandle, SearcherTarget};
pub use session::{ScriptSession, SessionError};
pub use settings::{CompilerSettings, ScriptSettings, SettingsError, SETTINGS_FILE_NAME, SETTINGS_FORMAT_VERSION};
pub use store::{AsyncAction, BoxedAction, CancellationToken, Store, StoreError, TickStatus};
pub use view::{ElementRef, GraphView, HeadlessView, NodeBuilder, UiFactory, ViewOperation, VisualElement};
