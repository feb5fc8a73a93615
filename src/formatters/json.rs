//! JSON report format.

use std::io::Write;

use anyhow::Result;

use crate::formatters::{Render, Report};

#[derive(Debug, Default)]
pub struct JsonFormatter;

impl Render for JsonFormatter {
    fn render(&self, writer: &mut dyn Write, report: &Report) -> Result<()> {
        serde_json::to_writer_pretty(&mut *writer, report)?;
        writeln!(writer)?;
        Ok(())
    }
}
