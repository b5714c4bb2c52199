pub mod api;
pub mod contract;
pub mod maturity;
