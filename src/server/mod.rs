//! OS-thread worker runtime and listener sockets (SPEC_FULL.md §4.9, §5, §6).

pub mod socket;
pub mod worker;

use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::info;

use crate::pipeline::MessageHandler;
use socket::{ListenerSpec, SocketError};

/// Binds every listener in `specs` and spawns one named OS thread per
/// listener, each running [`worker::run`] against a shared, immutable
/// [`MessageHandler`]. Mirrors SPEC_FULL.md §5's "master process owns
/// configuration and the listening sockets; it forks/spawns workers."
pub fn spawn_workers(
    specs: &[ListenerSpec],
    message_handler: Arc<MessageHandler>,
) -> Result<Vec<JoinHandle<()>>, SocketError> {
    message_handler.worker_init();

    let listeners = socket::recycle(Vec::new(), specs)?;
    let mut handles = Vec::with_capacity(listeners.len());
    for listener in listeners {
        let spec_name = listener.spec.to_string();
        info!(listener = %spec_name, "starting worker");
        let message_handler = Arc::clone(&message_handler);
        let handle = std::thread::Builder::new()
            .name(format!("dhcp6d-{spec_name}"))
            .spawn(move || worker::run(listener, &message_handler))
            .expect("failed to spawn worker thread");
        handles.push(handle);
    }
    Ok(handles)
}

pub use socket::{bind, recycle, validate_unicast_address};
