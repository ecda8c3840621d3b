//! Collaborator traits implemented outside the engine

pub mod store;
pub mod session;

pub use store::Store;
pub use session::{SessionProvider, StaticSession};
