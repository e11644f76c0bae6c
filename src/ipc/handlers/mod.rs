pub mod analysis;
pub mod core;
pub mod ledger;
