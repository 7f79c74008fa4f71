pub mod api;
pub mod format;
pub mod ledger;
pub mod models;
pub mod report;
