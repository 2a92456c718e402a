use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Parser;

use crate::exit_code::ExitCode;
use crate::{init_tracing, render_parse_error};

/// Match a seed file against a control file and upload the delta.
#[derive(Parser, Debug)]
#[command(name = "oc-zsync", version, about)]
struct ApplyArgs {
    /// Control file describing the target; the literal bytes are read from
    /// the same path with the `.zsync` suffix stripped.
    control: PathBuf,
    /// Local file the target's blocks are searched in.
    seed: PathBuf,
    /// Server base URL, scheme included.
    host: String,
    /// Remote file path the upload applies to.
    path: String,
    /// Credentials passed through to the server.
    user: String,
    /// Password for `user`.
    pass: String,
}

/// Entry point of the `oc-zsync` binary.
pub fn run_apply<I, T, O, E>(args: I, stdout: &mut O, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    O: Write,
    E: Write,
{
    init_tracing();
    let args = match ApplyArgs::try_parse_from(args) {
        Ok(args) => args,
        Err(err) => return render_parse_error(&err, stdout, stderr),
    };

    let Some(literals) = literal_source(&args.control) else {
        let _ = writeln!(
            stderr,
            "control file {} does not end in .zsync; cannot locate the literal source",
            args.control.display()
        );
        return ExitCode::Syntax;
    };

    let mut sink = match transport::HttpSink::new(args.host, args.path, args.user, args.pass) {
        Ok(sink) => sink,
        Err(err) => {
            let _ = writeln!(stderr, "{err}");
            return ExitCode::Sink;
        }
    };

    match engine::apply_paths(&args.control, &args.seed, &literals, &mut sink) {
        Ok(outcome) => {
            let _ = writeln!(
                stdout,
                "{} of {} blocks reused; remote digest {}",
                outcome.matched_blocks, outcome.total_blocks, outcome.digest
            );
            ExitCode::Ok
        }
        Err(err) => {
            let _ = writeln!(stderr, "{err}");
            ExitCode::from_engine(&err)
        }
    }
}

/// The file literal bytes are read from: the control path without its
/// `.zsync` suffix, the pairing `oc-zsyncmake` establishes.
fn literal_source(control: &Path) -> Option<PathBuf> {
    let name = control.file_name()?.to_str()?;
    let stem = name.strip_suffix(".zsync")?;
    if stem.is_empty() {
        return None;
    }
    Some(control.with_file_name(stem))
}
