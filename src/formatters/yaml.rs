//! YAML report format.

use std::io::Write;

use anyhow::Result;

use crate::formatters::{Render, Report};

#[derive(Debug, Default)]
pub struct YamlFormatter;

impl Render for YamlFormatter {
    fn render(&self, writer: &mut dyn Write, report: &Report) -> Result<()> {
        serde_yaml::to_writer(writer, report)?;
        Ok(())
    }
}
