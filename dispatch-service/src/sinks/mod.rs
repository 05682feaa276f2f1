#[cfg(test)]
pub(crate) mod memory;
pub mod questdb;

pub use questdb::QuestDbDispatchStore;
