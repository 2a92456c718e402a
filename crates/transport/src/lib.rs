#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `transport` ships the planner's operation transcript to the companion
//! upload server over HTTP. It implements the engine's [`engine::Sink`]
//! trait with one REST call per operation and nothing more: retries,
//! backoff, and server-side ordering are the server's concern, and the
//! engine treats every failure returned from here as fatal for the session.

mod http;

pub use http::HttpSink;
