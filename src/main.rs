// src/main.rs

use std::sync::Arc;

use tracing::{error, info, warn};

use dhcp6d::config::Config;
use dhcp6d::handlers::{AllowUnicastHandler, DnsExtension, IaAllocationHandler};
use dhcp6d::leasedb::LeaseDb;
use dhcp6d::pipeline::{Extension, ExtensionRegistry, MessageHandler, Node};
use dhcp6d::reservationdb::ReservationDb;
use dhcp6d::server;
use dhcp6d::Reservation;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = pico_args::Arguments::from_env();
    let config_dir: String = args
        .opt_value_from_str("--config-dir")?
        .unwrap_or_else(|| ".".to_string());
    let reservations_path: String = args
        .opt_value_from_str("--reservations")?
        .unwrap_or_else(|| "reservations.json".to_string());

    let config = Config::load_from_files(&config_dir)?;
    dhcp6d::logging::init_stdout(config.log_level);

    let reservations = Arc::new(ReservationDb::new());
    let leases = Arc::new(LeaseDb::new());

    let reservation_data: Vec<Reservation> =
        serde_json::from_reader(std::fs::File::open(&reservations_path)?)?;
    info!(count = reservation_data.len(), "loaded reservations");
    reservations.load_reservations(reservation_data);

    let mut registry = ExtensionRegistry::new();
    for name in &config.extensions {
        if registry.is_registered(name) {
            warn!(extension = name.as_str(), "duplicate extension name in config, replacing previous registration");
        }
        match name.as_str() {
            "dns" => registry.register(
                "dns",
                DnsExtension {
                    recursive_name_servers: Vec::new(),
                    domain_search_list: Vec::new(),
                }
                .into_extension(),
            ),
            other => error!(extension = other, "unknown extension name, ignoring"),
        }
    }

    let allocator = IaAllocationHandler::new(
        Arc::clone(&reservations),
        Arc::clone(&leases),
        config.option1837_extractors.clone(),
    );
    let mut tree: Vec<Node> = Vec::new();
    if let Some(address) = config.server_unicast_address {
        tree.push(Node::handler(AllowUnicastHandler { address }));
    }
    tree.push(Node::handler(allocator));

    let message_handler = Arc::new(MessageHandler::new(
        config.server_duid.clone(),
        tree,
        registry,
        config.allow_rapid_commit,
        config.rapid_commit_rejections,
    ));

    info!(listeners = config.listeners.len(), "starting dhcp6d");
    let handles = server::spawn_workers(&config.listeners, message_handler)?;
    for handle in handles {
        let _ = handle.join();
    }

    Ok(())
}
