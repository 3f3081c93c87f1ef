//! Services shared by every client surface

mod local_store;

pub use local_store::LocalStore;
