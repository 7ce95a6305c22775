//! Calls to user functions.
use crate::align::Value;
use crate::context::Lowerer;
use sv2rtl_frontend::Expr;
use sv2rtl_utils::{Id, Sv2RtlResult};

impl Lowerer<'_> {
    /// A call whose arguments or body did not fold. The body is turned into
    /// a process of its own.
    pub(crate) fn lower_call(
        &mut self,
        name: Id,
        package: Option<Id>,
        args: &[Expr],
    ) -> Sv2RtlResult<Value> {
        let Some(func) = self.find_function(name, package) else {
            self.warn(format!("function `{}` is not declared", name));
            return Ok(Value::default());
        };
        log::debug!("generating logic for call to `{}`", name);
        self.generate_call(func, args)
    }
}
