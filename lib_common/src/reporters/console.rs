//! Human-readable report lines for the console.
//!
//! The reporter writes to any `Write` sink. Production uses stdout; tests hand
//! it a `Vec<u8>`.

use std::io::{self, Stdout, Write};

use crate::eddn::{DockingEvent, Envelope, ScanReport};

const SEPARATOR: &str = "----------------------------------------------------------------";

pub struct ConsoleReporter<W: Write> {
    out: W,
}

impl ConsoleReporter<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Pretty-prints the whole envelope, metadata included.
    pub fn envelope(&mut self, envelope: &Envelope) -> io::Result<()> {
        let pretty = envelope.to_pretty_json().map_err(io::Error::from)?;
        writeln!(self.out, "{}", pretty)?;
        self.out.flush()
    }

    pub fn discovery(&mut self, report: &ScanReport) -> io::Result<()> {
        writeln!(self.out, "New system discovered: {}", report.system_name)?;
        writeln!(self.out, "Star type: {}", report.star_type)?;
        writeln!(self.out, "Stellar mass: {}", report.stellar_mass)?;
        writeln!(self.out, "Position: {}", report.position)?;
        writeln!(self.out, "{}", SEPARATOR)?;
        self.out.flush()
    }

    pub fn docking(&mut self, event: &DockingEvent) -> io::Result<()> {
        writeln!(self.out, "{}", event)?;
        self.out.flush()
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
