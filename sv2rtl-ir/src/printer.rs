//! Implements a formatter for the in-memory representation of modules in the
//! RTLIL text format.
use crate::{self as ir, Const, SigChunk, SigSpec};
use itertools::Itertools;
use std::io;
use sv2rtl_utils::Id;

/// Printer for the IR.
pub struct Printer;

impl Printer {
    /// Public names are prefixed with `\`, internal `$` names are kept.
    pub fn escape_id(id: Id) -> String {
        let s = id.as_str();
        if s.starts_with('$') || s.starts_with('\\') {
            s.to_string()
        } else {
            format!("\\{}", s)
        }
    }

    fn escape_string(s: &str) -> String {
        let mut out = String::with_capacity(s.len() + 2);
        out.push('"');
        for c in s.chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\t' => out.push_str("\\t"),
                c => out.push(c),
            }
        }
        out.push('"');
        out
    }

    /// Format a constant used as a parameter or attribute value. Plain
    /// 32-bit integers are written in decimal.
    pub fn format_const(c: &Const) -> String {
        if c.flags.string {
            if let Some(s) = c.decode_string() {
                return Self::escape_string(&s);
            }
        }
        if c.width() == 32 {
            if let Some(v) = c.as_i64(c.flags.signed) {
                return v.to_string();
            }
        }
        c.to_string()
    }

    fn format_chunk(chunk: &SigChunk) -> String {
        match chunk {
            SigChunk::Const(c) => c.to_string(),
            SigChunk::Wire {
                wire,
                offset,
                width,
            } => {
                let wire = wire.borrow();
                let name = Self::escape_id(wire.name);
                if *offset == 0 && *width == wire.width {
                    name
                } else if *width == 1 {
                    format!("{} [{}]", name, offset)
                } else {
                    format!("{} [{}:{}]", name, offset + width - 1, offset)
                }
            }
        }
    }

    /// Format a signal, most significant chunk first.
    pub fn format_sig(sig: &SigSpec) -> String {
        let chunks = sig.chunks();
        match chunks.len() {
            0 => "{ }".to_string(),
            1 => Self::format_chunk(&chunks[0]),
            _ => format!(
                "{{ {} }}",
                chunks.iter().rev().map(Self::format_chunk).join(" ")
            ),
        }
    }

    fn write_attributes<F: io::Write>(
        attrs: &ir::Attributes,
        indent: usize,
        f: &mut F,
    ) -> io::Result<()> {
        for (attr, value) in attrs.iter() {
            writeln!(
                f,
                "{}attribute \\{} {}",
                " ".repeat(indent),
                attr,
                Self::format_const(value)
            )?;
        }
        Ok(())
    }

    /// Prints out the design.
    pub fn write_design<F: io::Write>(
        design: &ir::Design,
        f: &mut F,
    ) -> io::Result<()> {
        for (idx, module) in design.modules.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            Self::write_module(module, f)?;
        }
        Ok(())
    }

    /// Format and write a module.
    pub fn write_module<F: io::Write>(
        module: &ir::Module,
        f: &mut F,
    ) -> io::Result<()> {
        Self::write_attributes(&module.attributes, 0, f)?;
        writeln!(f, "module {}", Self::escape_id(module.name))?;
        for wire in module.wires.iter() {
            Self::write_wire(&wire.borrow(), 2, f)?;
        }
        for mem in module.memories.iter() {
            Self::write_memory(&mem.borrow(), 2, f)?;
        }
        for cell in module.cells.iter() {
            Self::write_cell(&cell.borrow(), 2, f)?;
        }
        for proc in module.processes.iter() {
            Self::write_process(&proc.borrow(), 2, f)?;
        }
        for (lhs, rhs) in &module.connections {
            writeln!(
                f,
                "  connect {} {}",
                Self::format_sig(lhs),
                Self::format_sig(rhs)
            )?;
        }
        writeln!(f, "end")
    }

    pub fn write_wire<F: io::Write>(
        wire: &ir::Wire,
        indent: usize,
        f: &mut F,
    ) -> io::Result<()> {
        Self::write_attributes(&wire.attributes, indent, f)?;
        write!(f, "{}wire ", " ".repeat(indent))?;
        if wire.width != 1 {
            write!(f, "width {} ", wire.width)?;
        }
        if wire.upto {
            write!(f, "upto ")?;
        }
        if wire.start_offset != 0 {
            write!(f, "offset {} ", wire.start_offset)?;
        }
        if wire.signed {
            write!(f, "signed ")?;
        }
        match (wire.port_input, wire.port_output) {
            (true, true) => write!(f, "inout {} ", wire.port_id)?,
            (true, false) => write!(f, "input {} ", wire.port_id)?,
            (false, true) => write!(f, "output {} ", wire.port_id)?,
            (false, false) => (),
        }
        writeln!(f, "{}", Self::escape_id(wire.name))
    }

    pub fn write_memory<F: io::Write>(
        mem: &ir::Memory,
        indent: usize,
        f: &mut F,
    ) -> io::Result<()> {
        Self::write_attributes(&mem.attributes, indent, f)?;
        write!(f, "{}memory width {} size {} ", " ".repeat(indent), mem.width, mem.size)?;
        if mem.start_offset != 0 {
            write!(f, "offset {} ", mem.start_offset)?;
        }
        writeln!(f, "{}", Self::escape_id(mem.name))
    }

    pub fn write_cell<F: io::Write>(
        cell: &ir::Cell,
        indent: usize,
        f: &mut F,
    ) -> io::Result<()> {
        let pad = " ".repeat(indent);
        Self::write_attributes(&cell.attributes, indent, f)?;
        writeln!(
            f,
            "{}cell {} {}",
            pad,
            Self::escape_id(cell.ty),
            Self::escape_id(cell.name)
        )?;
        for (name, value) in &cell.parameters {
            writeln!(
                f,
                "{}  parameter \\{} {}",
                pad,
                name,
                Self::format_const(value)
            )?;
        }
        for (port, sig) in &cell.connections {
            writeln!(f, "{}  connect \\{} {}", pad, port, Self::format_sig(sig))?;
        }
        writeln!(f, "{}end", pad)
    }

    fn write_case<F: io::Write>(
        case: &ir::CaseRule,
        indent: usize,
        f: &mut F,
    ) -> io::Result<()> {
        let pad = " ".repeat(indent);
        for (lhs, rhs) in &case.actions {
            writeln!(
                f,
                "{}assign {} {}",
                pad,
                Self::format_sig(lhs),
                Self::format_sig(rhs)
            )?;
        }
        for sw in &case.switches {
            Self::write_attributes(&sw.attributes, indent, f)?;
            writeln!(f, "{}switch {}", pad, Self::format_sig(&sw.signal))?;
            for c in &sw.cases {
                Self::write_attributes(&c.attributes, indent + 2, f)?;
                if c.compare.is_empty() {
                    writeln!(f, "{}  case", pad)?;
                } else {
                    writeln!(
                        f,
                        "{}  case {}",
                        pad,
                        c.compare.iter().map(Self::format_sig).join(" , ")
                    )?;
                }
                Self::write_case(c, indent + 4, f)?;
            }
            writeln!(f, "{}end", pad)?;
        }
        Ok(())
    }

    pub fn write_process<F: io::Write>(
        proc: &ir::Process,
        indent: usize,
        f: &mut F,
    ) -> io::Result<()> {
        let pad = " ".repeat(indent);
        Self::write_attributes(&proc.attributes, indent, f)?;
        writeln!(f, "{}process {}", pad, Self::escape_id(proc.name))?;
        Self::write_case(&proc.root_case, indent + 2, f)?;
        for sync in &proc.syncs {
            if sync.signal.is_empty() {
                writeln!(f, "{}  sync {}", pad, sync.ty)?;
            } else {
                writeln!(
                    f,
                    "{}  sync {} {}",
                    pad,
                    sync.ty,
                    Self::format_sig(&sync.signal)
                )?;
            }
            for (lhs, rhs) in &sync.actions {
                writeln!(
                    f,
                    "{}    update {} {}",
                    pad,
                    Self::format_sig(lhs),
                    Self::format_sig(rhs)
                )?;
            }
        }
        writeln!(f, "{}end", pad)
    }
}
