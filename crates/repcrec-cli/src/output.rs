//! Output formatting

use crate::error::CliResult;
use repcrec_types::{DumpReport, Event, Outcome, TxKind};
use std::io::Write;

/// Collects events and prints them as text lines or as one JSON array
pub struct Output {
    json_mode: bool,
    events: Vec<Event>,
}

impl Output {
    /// Create a new output builder
    pub fn new(json_mode: bool) -> Self {
        Self {
            json_mode,
            events: Vec::new(),
        }
    }

    /// Add events in the order they happened
    pub fn extend(&mut self, events: impl IntoIterator<Item = Event>) {
        self.events.extend(events);
    }

    /// Events collected so far
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Write everything collected
    pub fn write_to(&self, out: &mut impl Write) -> CliResult<()> {
        if self.json_mode {
            serde_json::to_writer_pretty(&mut *out, &self.events)?;
            writeln!(out)?;
        } else {
            for event in &self.events {
                writeln!(out, "{}", render(event))?;
            }
        }
        out.flush()?;
        Ok(())
    }
}

/// Human-readable rendering of one event
pub fn render(event: &Event) -> String {
    match &event.outcome {
        Outcome::Began { tx, kind } => match kind {
            TxKind::ReadOnly => format!("{tx} begins (read-only)"),
            TxKind::ReadWrite => format!("{tx} begins"),
        },
        Outcome::Read(read) => format!(
            "{}: {} = {} (site {})",
            read.tx, read.var, read.value, read.site
        ),
        Outcome::Written { tx, var, sites } => {
            let sites: Vec<String> = sites.iter().map(ToString::to_string).collect();
            format!("{tx} writes {var} at sites {}", sites.join(", "))
        }
        Outcome::Committed { tx } => format!("{tx} commits"),
        Outcome::Aborted { tx, reason } => format!("{tx} aborts ({reason})"),
        Outcome::SiteFailed { site } => format!("site {site} fails"),
        Outcome::SiteRecovered { site } => format!("site {site} recovers"),
        Outcome::Dump(report) => render_dump(report),
        Outcome::Blocked { op } => format!("{op} waits"),
        Outcome::Rejected { op, reason } => format!("{op} rejected: {reason}"),
    }
}

/// One line per site: `site 1 (up) - x2: 20, x4: 40, ...`
pub fn render_dump(report: &DumpReport) -> String {
    report
        .sites
        .iter()
        .map(|dump| {
            let values: Vec<String> = dump
                .values
                .iter()
                .map(|(var, value)| format!("{var}: {value}"))
                .collect();
            format!("site {} ({}) - {}", dump.site, dump.status, values.join(", "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
