use std::sync::Arc;

use super::bundle::TransactionBundle;
use super::handler::{Handler, HandlerResult};

/// One node of the configured filter/handler tree (SPEC_FULL.md §4.3-4.4): a
/// filter gates descent into its children on a predicate re-evaluated at
/// every phase, or a leaf handler.
pub enum Node {
    Filter(FilterNode),
    Handler(Arc<dyn Handler>),
}

pub struct FilterNode {
    pub predicate: Arc<dyn Fn(&TransactionBundle) -> bool + Send + Sync>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn filter(
        predicate: impl Fn(&TransactionBundle) -> bool + Send + Sync + 'static,
        children: Vec<Node>,
    ) -> Node {
        Node::Filter(FilterNode {
            predicate: Arc::new(predicate),
            children,
        })
    }

    pub fn handler(handler: impl Handler + 'static) -> Node {
        Node::Handler(Arc::new(handler))
    }

    pub fn worker_init(&self) {
        match self {
            Node::Handler(h) => h.worker_init(),
            Node::Filter(f) => {
                for child in &f.children {
                    child.worker_init();
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pre,
    Handle,
    Post,
}

/// Run a single phase over the tree. Filters are re-evaluated on every call,
/// so a mark set during `pre` can open or close a branch for `handle`.
pub fn run_phase(nodes: &[Node], bundle: &mut TransactionBundle, phase: Phase) -> HandlerResult {
    for node in nodes {
        match node {
            Node::Handler(h) => match phase {
                Phase::Pre => h.pre(bundle)?,
                Phase::Handle => h.handle(bundle)?,
                Phase::Post => h.post(bundle)?,
            },
            Node::Filter(f) => {
                if (f.predicate)(bundle) {
                    run_phase(&f.children, bundle, phase)?;
                }
            }
        }
    }
    Ok(())
}

/// Run the full pre-all, handle-all, post-all cycle over one list
/// (SPEC_FULL.md §4.1 step 5). An abort signal from any phase stops the
/// remaining phases and nodes of this list.
pub fn run_list(nodes: &[Node], bundle: &mut TransactionBundle) -> HandlerResult {
    run_phase(nodes, bundle, Phase::Pre)?;
    run_phase(nodes, bundle, Phase::Handle)?;
    run_phase(nodes, bundle, Phase::Post)?;
    Ok(())
}

/// Predicate helper for the common case of gating a branch on a mark set by
/// an earlier handler.
pub fn has_mark(name: impl Into<String>) -> impl Fn(&TransactionBundle) -> bool + Send + Sync {
    let name = name.into();
    move |bundle: &TransactionBundle| bundle.has_mark(&name)
}
