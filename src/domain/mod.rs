pub mod customers;
pub mod ids;
pub mod period;
pub mod receipt;
pub mod reconcile;
pub mod share;
pub mod validation;
