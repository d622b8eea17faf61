/// Implements the local logger: coloured TTY output plus a rotated log file.
pub mod loggerlocal;
