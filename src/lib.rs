//! # The sv2rtl Compiler
//!
//! This crate plumbs together the sv2rtl crates and provides a command-line
//! interface that lowers an elaborated design into RTLIL text.
//! Depend on [`sv2rtl_frontend`], [`sv2rtl_ir`] and [`sv2rtl_lower`] directly
//! to lower designs from a program.
pub mod cmdline;
pub mod driver;
