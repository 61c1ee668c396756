// Capability traits the facade dispatches through

pub mod traits;

// Re-export commonly used items
pub use traits::{Delegate, Store, TransactionFn, TransactionFuture};
