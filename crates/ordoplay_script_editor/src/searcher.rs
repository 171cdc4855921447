// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node searcher.
//!
//! Opening the searcher dispatches a cancellable async action that waits
//! for the user's pick. Picking a template resolves it into a
//! [`CreateNode`]; closing the searcher or opening another one resolves it
//! to nothing.

use crate::actions::{CreateNode, EditorState};
use crate::store::{BoxedAction, CancellationToken, Store, StoreError};
use futures::future::{select, Either};
use ordoplay_script_graph::{NodeId, NodeLibrary, NodeTemplate};
use tokio::sync::oneshot;

/// Where a picked node goes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearcherTarget {
    /// Position of a free-standing node
    pub position: [f32; 2],
    /// Stack and index, for nodes dropped into a stack
    pub stack: Option<(NodeId, Option<usize>)>,
}

impl SearcherTarget {
    /// Free-standing node at `position`
    pub fn at(position: [f32; 2]) -> Self {
        Self { position, stack: None }
    }

    /// Node inserted into `stack`
    pub fn in_stack(stack: NodeId, index: Option<usize>) -> Self {
        Self {
            position: [0.0, 0.0],
            stack: Some((stack, index)),
        }
    }
}

/// An open searcher
#[derive(Debug)]
pub struct SearcherHandle {
    library: NodeLibrary,
    sender: oneshot::Sender<String>,
    token: CancellationToken,
}

impl SearcherHandle {
    /// Templates matching `query`
    pub fn results(&self, query: &str) -> Vec<&NodeTemplate> {
        self.library.search(query)
    }

    /// Pick a template; false if the searcher is gone or the id is unknown
    pub fn pick(self, template_id: &str) -> bool {
        if self.library.get(template_id).is_none() {
            return false;
        }
        self.sender.send(template_id.to_string()).is_ok()
    }

    /// Whether a newer action superseded this searcher
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Open the searcher; the pick is applied on a later [`Store::tick`]
pub fn open_searcher(
    store: &Store<EditorState>,
    library: &NodeLibrary,
    target: SearcherTarget,
) -> Result<SearcherHandle, StoreError> {
    let mut library = library.clone();
    for template in NodeLibrary::variable_templates(&store.state().graph) {
        library.register(template);
    }

    let (sender, receiver) = oneshot::channel::<String>();
    let templates = library.clone();
    let token = store.dispatch_cancellable(move |token| async move {
        match select(receiver, token.cancelled()).await {
            Either::Left((Ok(id), _)) => {
                let template = templates.get(&id)?;
                tracing::debug!(template = %id, "Searcher picked template");
                Some(BoxedAction::new(CreateNode {
                    kind: template.kind.clone(),
                    position: target.position,
                    stack: target.stack,
                }))
            }
            Either::Left((Err(_), _)) => {
                tracing::debug!("Searcher closed without a pick");
                None
            }
            Either::Right(_) => {
                tracing::debug!("Searcher cancelled");
                None
            }
        }
    })?;

    Ok(SearcherHandle { library, sender, token })
}
