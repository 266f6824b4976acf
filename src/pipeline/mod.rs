//! The request-processing pipeline: the per-request `TransactionBundle`, the
//! three-phase `Handler` contract, the filter tree that shapes which
//! handlers see which requests, the option combiner, the extension
//! registry, and the Message Handler that ties them together
//! (SPEC_FULL.md §3-§4).

pub mod bundle;
pub mod combine;
pub mod filter;
pub mod handler;
pub mod message_handler;
pub mod registry;

pub use bundle::{ResponseMessage, TransactionBundle};
pub use combine::{dedup_concat, replace_singleton, CombiningHandler, OptionContributor};
pub use filter::{has_mark, run_list, run_phase, FilterNode, Node, Phase};
pub use handler::{Handler, HandlerError, HandlerResult, RelayHandler, RelayHandlerAdapter};
pub use message_handler::MessageHandler;
pub use registry::{Extension, ExtensionRegistry};
