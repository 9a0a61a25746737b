pub mod hashmap_filter_storage;
pub mod ledger;
pub mod pure_dp_filter;
pub mod quotas;
pub mod traits;
