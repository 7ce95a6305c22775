//! Clock and reset detection for edge-sensitive blocks.
use crate::context::Lowerer;
use sv2rtl_frontend::ast::Edge;
use sv2rtl_ir::{Cell, Const, RRC, SigSpec};
use sv2rtl_utils::Sv2RtlResult;

/// How one sensitivity entry was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensitivityRule {
    /// First rising edge: the clock.
    RisingClock,
    /// Rising edge after the clock is known. Ignored.
    ExtraRisingEdge,
    /// First edge is falling: a falling-edge clock.
    FallingClock,
    /// Falling edge after the clock: active-low asynchronous reset.
    FallingReset,
    /// Level entry while no reset is known: active-high reset.
    LevelReset,
    /// Any other level entry. Ignored.
    ExtraLevel,
}

#[derive(Debug, Clone, Copy)]
enum Known {
    No,
    Yes,
    Either,
}

impl Known {
    fn holds(self, set: bool) -> bool {
        match self {
            Known::No => !set,
            Known::Yes => set,
            Known::Either => true,
        }
    }
}

/// Rules in priority order: edge, clock known, reset known.
const RULES: [(SensitivityRule, Edge, Known, Known); 6] = [
    (SensitivityRule::RisingClock, Edge::Posedge, Known::No, Known::Either),
    (SensitivityRule::ExtraRisingEdge, Edge::Posedge, Known::Yes, Known::Either),
    (SensitivityRule::FallingClock, Edge::Negedge, Known::No, Known::Either),
    (SensitivityRule::FallingReset, Edge::Negedge, Known::Yes, Known::Either),
    (SensitivityRule::LevelReset, Edge::Level, Known::Either, Known::No),
    (SensitivityRule::ExtraLevel, Edge::Level, Known::Either, Known::Yes),
];

/// Clock and reset of a clocked block.
#[derive(Debug, Clone, Default)]
pub struct ClockingContext {
    pub clock: Option<SigSpec>,
    /// Rising edge when set.
    pub clock_polarity: bool,
    pub reset: Option<SigSpec>,
    /// Active high when set.
    pub reset_polarity: bool,
    /// Rule applied to each entry, `None` where no rule matched.
    pub applied: Vec<Option<SensitivityRule>>,
}

impl ClockingContext {
    /// Classify the entries of a sensitivity list in order.
    pub fn analyze(entries: &[(Edge, SigSpec)]) -> Self {
        let mut ctx = Self::default();
        for (edge, sig) in entries {
            let rule = RULES
                .iter()
                .find(|(_, e, clock, reset)| {
                    e == edge
                        && clock.holds(ctx.clock.is_some())
                        && reset.holds(ctx.reset.is_some())
                })
                .map(|row| row.0);
            match rule {
                Some(SensitivityRule::RisingClock) => {
                    ctx.clock = Some(sig.clone());
                    ctx.clock_polarity = true;
                }
                Some(SensitivityRule::FallingClock) => {
                    ctx.clock = Some(sig.clone());
                    ctx.clock_polarity = false;
                }
                Some(SensitivityRule::FallingReset) => {
                    ctx.reset = Some(sig.clone());
                    ctx.reset_polarity = false;
                }
                Some(SensitivityRule::LevelReset) => {
                    ctx.reset = Some(sig.clone());
                    ctx.reset_polarity = true;
                }
                Some(rule) => log::debug!("sensitivity entry ignored ({:?})", rule),
                None => log::warn!("unrecognized {:?} entry in sensitivity list, ignored", edge),
            }
            ctx.applied.push(rule);
        }
        ctx
    }

    pub fn has_reset(&self) -> bool {
        self.reset.is_some()
    }
}

impl Lowerer<'_> {
    /// `$dff` clocked by `ctx`.
    pub(crate) fn add_dff(
        &mut self,
        ctx: &ClockingContext,
        d: &SigSpec,
        q: &SigSpec,
    ) -> Sv2RtlResult<RRC<Cell>> {
        let Some(clk) = &ctx.clock else {
            return Err(self.fatal("register without a clock"));
        };
        Ok(self.builder().dff((clk, ctx.clock_polarity), d, q))
    }

    /// `$adff` clocked and reset by `ctx`, resetting to `value`.
    pub(crate) fn add_adff(
        &mut self,
        ctx: &ClockingContext,
        d: &SigSpec,
        q: &SigSpec,
        value: Const,
    ) -> Sv2RtlResult<RRC<Cell>> {
        let Some(clk) = &ctx.clock else {
            return Err(self.fatal("register without a clock"));
        };
        let Some(rst) = &ctx.reset else {
            return Err(self.fatal("register with asynchronous reset but no reset signal"));
        };
        Ok(self.builder().adff(
            (clk, ctx.clock_polarity),
            (rst, ctx.reset_polarity),
            value,
            d,
            q,
        ))
    }
}
