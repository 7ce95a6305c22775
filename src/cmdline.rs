//! Command line parsing for the sv2rtl compiler.
use argh::FromArgs;
use std::path::{Path, PathBuf};
use sv2rtl_lower::LowerConf;
use sv2rtl_utils::{OutputFile, Sv2RtlResult};

fn read_path(path: &str) -> Result<PathBuf, String> {
    Ok(Path::new(path).into())
}

#[derive(FromArgs)]
/// Lower an elaborated SystemVerilog design to RTLIL.
pub struct Opts {
    /// input design in JSON form. Reads from stdin when omitted.
    #[argh(positional, from_str_fn(read_path))]
    pub file: Option<PathBuf>,

    /// output file, default is stdout
    #[argh(option, short = 'o', default = "OutputFile::Stdout")]
    pub output: OutputFile,

    /// name of the top module. Overrides the one recorded in the design.
    #[argh(option)]
    pub top: Option<String>,

    /// logging level
    #[argh(option, long = "log", default = "log::LevelFilter::Warn")]
    pub log_level: log::LevelFilter,

    /// emit $dff/$adff cells for clocked blocks
    #[argh(switch, long = "register-cells")]
    pub register_cells: bool,

    /// maximum number of iterations of an unrolled or evaluated loop
    #[argh(option, long = "max-loop-iterations")]
    pub max_loop_iterations: Option<u64>,

    /// maximum nesting depth of function calls
    #[argh(option, long = "max-call-depth")]
    pub max_call_depth: Option<usize>,

    /// do not attach src attributes
    #[argh(switch, long = "no-src")]
    pub no_src: bool,
}

impl Opts {
    /// Parse the command line.
    pub fn get_opts() -> Sv2RtlResult<Opts> {
        Ok(argh::from_env())
    }

    /// Lowering options selected on the command line.
    pub fn lower_conf(&self) -> LowerConf {
        let default = LowerConf::default();
        LowerConf {
            register_cells: self.register_cells,
            max_loop_iterations: self
                .max_loop_iterations
                .unwrap_or(default.max_loop_iterations),
            max_call_depth: self.max_call_depth.unwrap_or(default.max_call_depth),
            keep_src: !self.no_src,
            top: self.top.as_deref().map(Into::into),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Opts {
        Opts::from_args(&["sv2rtl"], args).unwrap()
    }

    #[test]
    fn defaults() {
        let opts = parse(&["design.json"]);
        assert_eq!(opts.file, Some(PathBuf::from("design.json")));
        assert!(matches!(opts.output, OutputFile::Stdout));
        assert_eq!(opts.log_level, log::LevelFilter::Warn);
        let conf = opts.lower_conf();
        assert!(!conf.register_cells);
        assert!(conf.keep_src);
        assert_eq!(conf.max_call_depth, LowerConf::default().max_call_depth);
        assert_eq!(conf.top, None);
    }

    #[test]
    fn lowering_options() {
        let opts = parse(&[
            "--top",
            "cpu",
            "--register-cells",
            "--max-loop-iterations",
            "16",
            "--no-src",
            "-o",
            "out.il",
        ]);
        assert_eq!(opts.file, None);
        assert!(matches!(opts.output, OutputFile::File(_)));
        let conf = opts.lower_conf();
        assert!(conf.register_cells);
        assert!(!conf.keep_src);
        assert_eq!(conf.max_loop_iterations, 16);
        assert_eq!(conf.top, Some("cpu".into()));
    }
}
