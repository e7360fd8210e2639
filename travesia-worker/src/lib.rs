pub mod worker;

pub use worker::start_reconciliation_worker;
