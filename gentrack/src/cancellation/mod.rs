//! Cooperative cancellation for background poll tasks.

mod token;

pub use token::CancellationToken;
