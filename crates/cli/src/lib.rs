#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `cli` implements the thin command-line front-ends for the two binaries:
//! `oc-zsyncmake`, which writes the block-checksum control file for a
//! target file, and `oc-zsync`, which matches a seed against a control file
//! and streams the resulting transcript to the remote upload server.
//!
//! Both entry points take an argument iterator together with handles for
//! standard output and error, so the full surface stays testable with
//! byte-vector writers. Failures render as a single line on standard error
//! naming the kind and, where applicable, the offending value; distinct
//! failure kinds map to distinct exit codes.

mod apply;
mod exit_code;
mod make;

pub use apply::run_apply;
pub use exit_code::ExitCode;
pub use make::run_make;

use std::io::Write;

/// Installs the stderr tracing subscriber, honouring `RUST_LOG`.
///
/// Safe to call from every entry point; only the first call wins.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

/// Renders a clap outcome: help and version go to stdout and succeed,
/// everything else is a usage error.
fn render_parse_error<O: Write, E: Write>(
    err: &clap::Error,
    stdout: &mut O,
    stderr: &mut E,
) -> ExitCode {
    use clap::error::ErrorKind;

    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = write!(stdout, "{err}");
            ExitCode::Ok
        }
        _ => {
            let _ = write!(stderr, "{err}");
            ExitCode::Syntax
        }
    }
}
