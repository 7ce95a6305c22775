use sv2rtl::driver;
use sv2rtl_utils::Sv2RtlResult;

fn main() -> Sv2RtlResult<()> {
    driver::run_compiler()
}
