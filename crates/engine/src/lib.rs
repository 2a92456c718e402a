#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `engine` turns a set of confirmed block matches into the ordered
//! transcript of `move` and `add` operations that rebuilds the target, and
//! wires the whole apply path together: parse the control file, populate the
//! block index, scan the seed, plan, and verify the sink's reported digest
//! against the header SHA-1.
//!
//! # Design
//!
//! - [`sink::Sink`] is the narrow interface the planner drives. The remote
//!   transport implements it; [`sink::MemorySink`] is an in-process
//!   reference implementation that applies the transcript against a seed
//!   buffer, used by the test suite and available to embedders.
//! - [`planner`] sorts matches, coalesces same-displacement runs into single
//!   moves, and streams literal bytes for the uncovered target gaps in
//!   bounded chunks, in file order.
//! - [`session`] owns the lifecycle: the block index lives from control-file
//!   parse to end of session, and the final SHA-1 comparison is the last
//!   gate regardless of intermediate successes.

pub mod planner;
pub mod session;
pub mod sink;

mod error;

pub use error::EngineError;
pub use session::{ApplyOutcome, apply, apply_paths};
pub use sink::{MemorySink, Operation, Sink, SinkError};
