//! Concrete handlers built on top of the pipeline core: policy mini-handlers,
//! relay bookkeeping, the example reservation-backed allocator, and the DNS
//! option extensions (SPEC_FULL.md §4.6-§4.8).

pub mod allocation;
pub mod dns;
pub mod policy;
pub mod relay;

pub use allocation::IaAllocationHandler;
pub use dns::DnsExtension;
pub use policy::{AllowUnicastHandler, IgnoreRequestHandler};
pub use relay::InterfaceIdMirrorHandler;
