pub mod fare_ledger;
pub mod matcher;
