mod classify;
mod reader;

pub use classify::{classify, classify_snapshot, Action};
pub use reader::StatusReader;

#[cfg(test)]
mod tests;
