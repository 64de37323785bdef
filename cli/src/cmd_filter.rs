//! `firehose filter`: run the delivery filter over recorded stream output.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use firehose_core::{filter_message, Filtered};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct FilterSummary {
    pub delivered: u64,
    pub skipped: u64,
    pub undecodable: u64,
}

pub fn run(input: &str) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let summary = if input == "-" {
        filter_lines(std::io::stdin().lock(), &mut out)?
    } else {
        let file = std::fs::File::open(input).with_context(|| format!("opening {input}"))?;
        filter_lines(std::io::BufReader::new(file), &mut out)?
    };
    eprintln!(
        "{} delivered, {} skipped, {} undecodable",
        summary.delivered, summary.skipped, summary.undecodable
    );
    Ok(())
}

/// Write the text of every deliverable line of `input` to `out`.
/// Blank lines are keep-alives and are not counted.
pub fn filter_lines(input: impl BufRead, out: &mut impl Write) -> Result<FilterSummary> {
    let mut summary = FilterSummary::default();
    for line in input.lines() {
        let line = line.context("reading input")?;
        if line.trim().is_empty() {
            continue;
        }
        match filter_message(&line) {
            Ok(Filtered::Deliver(text)) => {
                writeln!(out, "{text}")?;
                summary.delivered += 1;
            }
            Ok(Filtered::Skip) => summary.skipped += 1,
            Err(e) => {
                tracing::debug!(error = %e, "undecodable line");
                summary.undecodable += 1;
            }
        }
    }
    Ok(summary)
}
