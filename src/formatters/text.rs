//! Terminal report format.

use std::io::Write;

use anyhow::Result;
use colored::Colorize;

use crate::core::issue::Rank;
use crate::formatters::{Render, Report};

const ISSUE_SPLITTER: &str = "--------------------------------------------------";

#[derive(Debug, Default)]
pub struct TextFormatter;

fn rank_title(name: &str) -> colored::ColoredString {
    match name {
        "HIGH" => Rank::High.title().red(),
        "MEDIUM" => Rank::Medium.title().yellow(),
        "LOW" => Rank::Low.title().green(),
        _ => Rank::Undefined.title().normal(),
    }
}

impl Render for TextFormatter {
    fn render(&self, writer: &mut dyn Write, report: &Report) -> Result<()> {
        writeln!(writer, "Test results:")?;
        if report.results.is_empty() {
            writeln!(writer, "\tNo issues identified.")?;
        }
        for entry in &report.results {
            let issue = &entry.issue;
            writeln!(
                writer,
                ">> Issue: [{}:{}] {}",
                issue.test_id, issue.test_name, issue.text
            )?;
            writeln!(
                writer,
                "   Severity: {}   Confidence: {}",
                rank_title(issue.severity.name()),
                rank_title(issue.confidence.name())
            )?;
            writeln!(writer, "   Location: {}:{}", issue.filename, issue.lineno)?;
            if !issue.code.is_empty() {
                write!(writer, "{}", issue.code)?;
            }
            if let Some(candidates) = &entry.candidates {
                writeln!(writer, "   Candidates ({}):", candidates.len())?;
                for candidate in candidates {
                    writeln!(
                        writer,
                        "\t{}:{} {}",
                        candidate.filename, candidate.lineno, candidate.text
                    )?;
                }
            }
            writeln!(writer, "{}", ISSUE_SPLITTER)?;
        }

        let totals = &report.metrics["_totals"];
        writeln!(writer, "\nCode scanned:")?;
        writeln!(
            writer,
            "\tTotal lines of code: {}",
            totals["loc"].as_u64().unwrap_or(0)
        )?;
        writeln!(
            writer,
            "\tTotal lines skipped (//nosec): {}",
            totals["nosec"].as_u64().unwrap_or(0)
        )?;

        writeln!(writer, "\nFiles skipped ({}):", report.errors.len())?;
        for skipped in &report.errors {
            writeln!(writer, "\t{} ({})", skipped.filename, skipped.reason)?;
        }
        Ok(())
    }
}
