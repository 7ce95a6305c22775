//! Driver for the sv2rtl compiler.
use crate::cmdline::Opts;
use std::io::Write;
use sv2rtl_frontend::ast;
use sv2rtl_ir as ir;
use sv2rtl_utils::Sv2RtlResult;

/// Run the compiler from the command line.
pub fn run_compiler() -> Sv2RtlResult<()> {
    // parse the command line arguments into Opts struct
    let opts = Opts::get_opts()?;

    env_logger::Builder::new()
        .format_timestamp(None)
        .filter_level(opts.log_level)
        .target(env_logger::Target::Stderr)
        .init();

    let design = ast::Design::construct(opts.file.as_deref())?;
    let conf = opts.lower_conf();
    let lowered = sv2rtl_lower::lower_design(&design, &conf)?;

    let out = &mut opts.output.get_write()?;
    ir::Printer::write_design(&lowered, out)?;
    out.flush()?;
    Ok(())
}
