pub mod payment;
pub mod reconciliation;

pub use payment::*;
pub use reconciliation::*;
