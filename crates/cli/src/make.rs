use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;

use clap::Parser;

use crate::exit_code::ExitCode;
use crate::{init_tracing, render_parse_error};

/// Write the block-checksum control file for a target file.
#[derive(Parser, Debug)]
#[command(name = "oc-zsyncmake", version, about)]
struct MakeArgs {
    /// File to summarise.
    input: PathBuf,
    /// Control file to write; name it `<input>.zsync` so the applier can
    /// pair the two.
    output: PathBuf,
}

/// Entry point of the `oc-zsyncmake` binary.
pub fn run_make<I, T, O, E>(args: I, stdout: &mut O, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    O: Write,
    E: Write,
{
    init_tracing();
    let args = match MakeArgs::try_parse_from(args) {
        Ok(args) => args,
        Err(err) => return render_parse_error(&err, stdout, stderr),
    };

    match signature::write_signature_file(&args.input, &args.output) {
        Ok(summary) => {
            let _ = writeln!(
                stdout,
                "{}: {} bytes in {} blocks of {}",
                args.output.display(),
                summary.length,
                summary.nblocks,
                summary.blocksize
            );
            ExitCode::Ok
        }
        Err(err) => {
            let _ = writeln!(stderr, "{err}");
            ExitCode::from_signature(&err)
        }
    }
}
