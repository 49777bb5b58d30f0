// Adapters layer: concrete implementations of the domain ports.

pub mod ledger_file;
pub mod memory;
pub mod sink;
