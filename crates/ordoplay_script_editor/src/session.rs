// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor session: one graph being edited, with everything around it.

use crate::actions::{register_editor_reducers, AcknowledgeChanges, EditorEnv, EditorState, MarkSaved};
use crate::reconcile::{reconcile, ReconcilePlan};
use crate::searcher::{open_searcher, SearcherHandle, SearcherTarget};
use crate::settings::ScriptSettings;
use crate::store::{Store, StoreError};
use crate::view::{GraphView, UiFactory};
use ordoplay_script_graph::{AssetError, AssetStore, Graph, NodeExtensions, NodeId, NodeLibrary, TypeDatabase};
use ordoplay_script_translator::{CompilationResult, CompilerBackend, ScriptCompiler, TraceRecorder, TranslatorExtensions};
use std::sync::Arc;

/// Session errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Asset could not be saved
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// Store rejected an action
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// An open graph with its store, node library, UI factory and trace recorder
pub struct ScriptSession {
    store: Store<EditorState>,
    database: Arc<TypeDatabase>,
    node_extensions: Option<Arc<NodeExtensions>>,
    translators: TranslatorExtensions,
    library: NodeLibrary,
    factory: UiFactory,
    settings: ScriptSettings,
    trace: TraceRecorder,
}

impl ScriptSession {
    /// Open `graph` with the built-in node kinds only
    pub fn new(graph: Graph, database: TypeDatabase, settings: ScriptSettings) -> Self {
        Self::with_extensions(graph, database, settings, None, TranslatorExtensions::new())
    }

    /// Open `graph` with extension node kinds and their translators
    pub fn with_extensions(
        graph: Graph,
        database: TypeDatabase,
        settings: ScriptSettings,
        node_extensions: Option<Arc<NodeExtensions>>,
        translators: TranslatorExtensions,
    ) -> Self {
        let database = Arc::new(database);
        let library = NodeLibrary::standard(database.methods());

        let mut env = EditorEnv::new(database.clone());
        if let Some(extensions) = &node_extensions {
            env = env.with_extensions(extensions.clone());
        }
        let store = Store::new(EditorState::new(graph));
        register_editor_reducers(&store, env);

        Self {
            store,
            database,
            node_extensions,
            translators,
            library,
            factory: UiFactory::standard(),
            settings,
            trace: TraceRecorder::new(),
        }
    }

    /// Editor store
    pub fn store(&self) -> &Store<EditorState> {
        &self.store
    }

    /// Current editor state
    pub fn state(&self) -> Arc<EditorState> {
        self.store.state()
    }

    /// Node library offered by the searcher
    pub fn library_mut(&mut self) -> &mut NodeLibrary {
        &mut self.library
    }

    /// UI factory, open to registration
    pub fn factory_mut(&mut self) -> &mut UiFactory {
        &mut self.factory
    }

    /// Settings
    pub fn settings(&self) -> &ScriptSettings {
        &self.settings
    }

    /// Trace recorder filled by traced compilations
    pub fn trace(&self) -> &TraceRecorder {
        &self.trace
    }

    /// Open the node searcher
    pub fn open_searcher(&self, target: SearcherTarget) -> Result<SearcherHandle, StoreError> {
        open_searcher(&self.store, &self.library, target)
    }

    /// Bring `view` in line with the graph and clear the change list
    pub fn reconcile(&self, view: &mut dyn GraphView) -> Result<ReconcilePlan, StoreError> {
        let state = self.store.state();
        if state.changes.is_empty() {
            return Ok(ReconcilePlan::default());
        }
        let plan = reconcile(view, &state.graph, &self.factory, &state.changes);
        self.store.dispatch(AcknowledgeChanges)?;
        Ok(plan)
    }

    /// Compile the current graph with the session's settings
    pub fn compile(&mut self, backend: &dyn CompilerBackend) -> CompilationResult {
        let mut graph = self.store.state().graph.clone();
        let options = self.settings.translation_options();

        let mut compiler = ScriptCompiler::new(self.database.as_ref(), backend)
            .with_extensions(&self.translators)
            .with_trace(&mut self.trace);
        if let Some(extensions) = &self.node_extensions {
            compiler = compiler.with_node_extensions(extensions);
        }

        let mut errors = compiler.prepare(&mut graph);
        let mut result = compiler.compile(&graph, &options);
        errors.append(&mut result.errors);
        result.errors = errors;
        result
    }

    /// Record a trace hit reported by the running script
    pub fn record_hit(&mut self, index: usize, frame: u64) -> Option<NodeId> {
        let graph = self.store.state().graph.name.clone();
        self.trace.record_hit(&graph, index, frame)
    }

    /// Save the graph and mark the session clean
    pub fn save(&self, assets: &mut dyn AssetStore, path: &str) -> Result<(), SessionError> {
        assets.save(path, &self.store.state().graph)?;
        self.store.dispatch(MarkSaved)?;
        tracing::info!(path, "Saved graph");
        Ok(())
    }
}

impl std::fmt::Debug for ScriptSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptSession")
            .field("graph", &self.store.state().graph.name)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
