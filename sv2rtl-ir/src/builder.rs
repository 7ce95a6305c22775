//! IR Builder. Provides convience methods to create cells together with the
//! wires that carry their outputs.
use crate::{self as ir, CellKind, Const, RRC, SigSpec, State};
use sv2rtl_utils::SourceLoc;

/// IR builder.
/// Every cell and wire created through the builder gets an automatic
/// `$<kind>$<n>` name and, when known, a `src` attribute.
pub struct Builder<'a> {
    /// Module for which this builder is constructing.
    pub module: &'a mut ir::Module,
    /// Location attached to created objects.
    src: Option<SourceLoc>,
}

fn int_param(v: i64) -> Const {
    Const::from_int(v, 32)
}

impl<'a> Builder<'a> {
    /// Instantiate a new builder for a module.
    pub fn new(module: &'a mut ir::Module) -> Self {
        Self { module, src: None }
    }

    /// Attach `loc` to everything built from here on.
    pub fn with_src(mut self, loc: Option<&SourceLoc>) -> Self {
        self.src = loc.cloned();
        self
    }

    /// Construct a new internal cell of `kind`.
    pub fn add_cell(&mut self, kind: CellKind) -> RRC<ir::Cell> {
        let name = self.module.auto_name(kind.tag());
        let cell = self.module.add_cell(name, kind.as_ref());
        cell.borrow_mut().attributes.set_src(self.src.as_ref());
        cell
    }

    /// Output wire of `cell`, named after it.
    fn output_of(&mut self, cell: &RRC<ir::Cell>, width: u32) -> SigSpec {
        let name = format!("{}_Y", cell.borrow().name);
        let wire = self.module.add_wire(name, width);
        wire.borrow_mut().attributes.set_src(self.src.as_ref());
        SigSpec::from_wire(&wire)
    }

    /// Single-input operator cell (`$not`, `$reduce_or`, `$pos`, ...).
    pub fn unary(
        &mut self,
        kind: CellKind,
        a: &SigSpec,
        a_signed: bool,
        y_width: u32,
    ) -> SigSpec {
        debug_assert!(kind.is_unary(), "{} is not a unary cell", kind);
        let cell = self.add_cell(kind);
        let y = self.output_of(&cell, y_width);
        let mut c = cell.borrow_mut();
        c.set_param("A_SIGNED", int_param(a_signed as i64));
        c.set_param("A_WIDTH", int_param(a.width() as i64));
        c.set_param("Y_WIDTH", int_param(y_width as i64));
        c.set_port("A", a.clone());
        c.set_port("Y", y.clone());
        y
    }

    /// Two-input operator cell (`$and`, `$add`, `$eq`, `$shl`, ...).
    pub fn binary(
        &mut self,
        kind: CellKind,
        (a, a_signed): (&SigSpec, bool),
        (b, b_signed): (&SigSpec, bool),
        y_width: u32,
    ) -> SigSpec {
        let cell = self.add_cell(kind);
        let y = self.output_of(&cell, y_width);
        let mut c = cell.borrow_mut();
        c.set_param("A_SIGNED", int_param(a_signed as i64));
        c.set_param("A_WIDTH", int_param(a.width() as i64));
        c.set_param("B_SIGNED", int_param(b_signed as i64));
        c.set_param("B_WIDTH", int_param(b.width() as i64));
        c.set_param("Y_WIDTH", int_param(y_width as i64));
        c.set_port("A", a.clone());
        c.set_port("B", b.clone());
        c.set_port("Y", y.clone());
        y
    }

    /// `s ? b : a`. `a` and `b` must have the same width.
    pub fn mux(&mut self, a: &SigSpec, b: &SigSpec, s: &SigSpec) -> SigSpec {
        debug_assert_eq!(a.width(), b.width(), "mux inputs differ in width");
        let cell = self.add_cell(CellKind::Mux);
        let y = self.output_of(&cell, a.width());
        let mut c = cell.borrow_mut();
        c.set_param("WIDTH", int_param(a.width() as i64));
        c.set_port("A", a.clone());
        c.set_port("B", b.clone());
        c.set_port("S", s.clone());
        c.set_port("Y", y.clone());
        y
    }

    /// `y_width` bits of `a` starting at the dynamic offset `b`. Bits out of
    /// range read as x.
    pub fn shiftx(
        &mut self,
        a: &SigSpec,
        b: &SigSpec,
        b_signed: bool,
        y_width: u32,
    ) -> SigSpec {
        self.binary(CellKind::Shiftx, (a, false), (b, b_signed), y_width)
    }

    fn memory_params(c: &mut ir::Cell, mem: &ir::Memory) {
        c.set_param("MEMID", Const::from_string(&format!("\\{}", mem.name)));
        c.set_param("ABITS", int_param(mem.abits() as i64));
        c.set_param("WIDTH", int_param(mem.width as i64));
    }

    /// Asynchronous read port.
    pub fn memrd(&mut self, mem: &RRC<ir::Memory>, addr: &SigSpec) -> SigSpec {
        let mem = mem.borrow();
        let cell = self.add_cell(CellKind::MemRd);
        let data = {
            let name = format!("{}_DATA", cell.borrow().name);
            let wire = self.module.add_wire(name, mem.width);
            SigSpec::from_wire(&wire)
        };
        let mut c = cell.borrow_mut();
        Self::memory_params(&mut c, &mem);
        c.set_param("CLK_ENABLE", int_param(0));
        c.set_param("CLK_POLARITY", int_param(0));
        c.set_param("TRANSPARENT", int_param(0));
        c.set_port("CLK", SigSpec::from_state(State::Sx, 1));
        c.set_port("EN", SigSpec::from_bool(true));
        c.set_port("ADDR", addr.extend_u0(mem.abits(), false));
        c.set_port("DATA", data.clone());
        data
    }

    /// Clocked write port. `en` has one bit per data bit.
    pub fn memwr(
        &mut self,
        mem: &RRC<ir::Memory>,
        (clk, clk_polarity): (&SigSpec, bool),
        addr: &SigSpec,
        data: &SigSpec,
        en: &SigSpec,
    ) -> RRC<ir::Cell> {
        let mem = mem.borrow();
        let cell = self.add_cell(CellKind::MemWr);
        {
            let mut c = cell.borrow_mut();
            Self::memory_params(&mut c, &mem);
            c.set_param("CLK_ENABLE", int_param(1));
            c.set_param("CLK_POLARITY", int_param(clk_polarity as i64));
            c.set_param("PRIORITY", int_param(0));
            c.set_port("CLK", clk.clone());
            c.set_port("EN", en.clone());
            c.set_port("ADDR", addr.extend_u0(mem.abits(), false));
            c.set_port("DATA", data.clone());
        }
        cell
    }

    /// Register without reset.
    pub fn dff(
        &mut self,
        (clk, clk_polarity): (&SigSpec, bool),
        d: &SigSpec,
        q: &SigSpec,
    ) -> RRC<ir::Cell> {
        let cell = self.add_cell(CellKind::Dff);
        {
            let mut c = cell.borrow_mut();
            c.set_param("WIDTH", int_param(q.width() as i64));
            c.set_param("CLK_POLARITY", int_param(clk_polarity as i64));
            c.set_port("CLK", clk.clone());
            c.set_port("D", d.clone());
            c.set_port("Q", q.clone());
        }
        cell
    }

    /// Register with an asynchronous reset to `arst_value`.
    pub fn adff(
        &mut self,
        (clk, clk_polarity): (&SigSpec, bool),
        (arst, arst_polarity): (&SigSpec, bool),
        arst_value: Const,
        d: &SigSpec,
        q: &SigSpec,
    ) -> RRC<ir::Cell> {
        let cell = self.add_cell(CellKind::Adff);
        {
            let mut c = cell.borrow_mut();
            c.set_param("WIDTH", int_param(q.width() as i64));
            c.set_param("CLK_POLARITY", int_param(clk_polarity as i64));
            c.set_param("ARST_POLARITY", int_param(arst_polarity as i64));
            c.set_param("ARST_VALUE", arst_value.resized(q.width()));
            c.set_port("CLK", clk.clone());
            c.set_port("ARST", arst.clone());
            c.set_port("D", d.clone());
            c.set_port("Q", q.clone());
        }
        cell
    }
}
