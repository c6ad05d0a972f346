pub mod commands;
pub mod ledger;
pub mod model;
pub mod policy;
pub mod window;

#[cfg(test)]
pub(crate) mod fixtures;
