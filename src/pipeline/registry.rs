//! Extension Registry (SPEC_FULL.md §4.5): a process-wide, name-keyed table
//! of extensions contributing setup and cleanup handlers that wrap the
//! configured filter/handler tree on every request.

use std::collections::HashMap;
use std::sync::Arc;

use super::filter::Node;

/// An installable extension. Registration is idempotent by name: registering
/// the same name twice replaces the earlier registration rather than
/// duplicating its handlers in the setup/cleanup lists.
pub trait Extension: Send + Sync {
    fn create_setup_handlers(&self) -> Vec<Node>;
    fn create_cleanup_handlers(&self) -> Vec<Node>;
}

#[derive(Default)]
pub struct ExtensionRegistry {
    order: Vec<String>,
    extensions: HashMap<String, Arc<dyn Extension>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, extension: Arc<dyn Extension>) {
        let name = name.into();
        if !self.extensions.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.extensions.insert(name, extension);
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.extensions.contains_key(name)
    }

    /// Setup handlers in registration order, flattened across all registered
    /// extensions.
    pub fn setup_handlers(&self) -> Vec<Node> {
        self.order
            .iter()
            .flat_map(|name| self.extensions[name].create_setup_handlers())
            .collect()
    }

    /// Cleanup handlers in registration order, flattened across all
    /// registered extensions.
    pub fn cleanup_handlers(&self) -> Vec<Node> {
        self.order
            .iter()
            .flat_map(|name| self.extensions[name].create_cleanup_handlers())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::bundle::TransactionBundle;
    use crate::pipeline::handler::{Handler, HandlerResult};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingExtension(Arc<AtomicUsize>);

    struct CountingHandler(Arc<AtomicUsize>);
    impl Handler for CountingHandler {
        fn pre(&self, _bundle: &mut TransactionBundle) -> HandlerResult {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl Extension for CountingExtension {
        fn create_setup_handlers(&self) -> Vec<Node> {
            vec![Node::handler(CountingHandler(self.0.clone()))]
        }
        fn create_cleanup_handlers(&self) -> Vec<Node> {
            Vec::new()
        }
    }

    #[test]
    fn reregistering_a_name_replaces_rather_than_duplicates() {
        let counter_a = Arc::new(AtomicUsize::new(0));
        let counter_b = Arc::new(AtomicUsize::new(0));
        let mut registry = ExtensionRegistry::new();
        registry.register("dns", Arc::new(CountingExtension(counter_a.clone())));
        registry.register("dns", Arc::new(CountingExtension(counter_b.clone())));

        let setup = registry.setup_handlers();
        assert_eq!(setup.len(), 1);

        let mut bundle = TransactionBundle::new(
            crate::wire::Message::new(crate::wire::MessageType::Solicit, [0, 0, 1]),
            Vec::new(),
            Default::default(),
            true,
            false,
            false,
        );
        super::super::filter::run_phase(&setup, &mut bundle, super::super::filter::Phase::Pre)
            .unwrap();
        assert_eq!(counter_a.load(Ordering::SeqCst), 0);
        assert_eq!(counter_b.load(Ordering::SeqCst), 1);
    }
}
