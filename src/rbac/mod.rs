pub mod middleware;
pub mod types;

pub use types::Role;
