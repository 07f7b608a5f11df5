//! Export core modules shared by the CLI and library callers.

pub mod excel_core;

pub use excel_core::generate_report_buffer;
