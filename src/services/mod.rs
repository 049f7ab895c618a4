//! Business logic services for MarkChain

pub mod user;

pub use user::{UserError, UserService};
