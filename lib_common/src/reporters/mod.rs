/// Console output of envelopes, discoveries and docking events.
pub mod console;

pub use console::ConsoleReporter;
