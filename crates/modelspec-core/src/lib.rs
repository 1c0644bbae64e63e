pub mod config;
pub mod error;
pub mod interfaces;
pub mod lifecycle;
pub mod manifest;
pub mod reference;
pub mod run;
pub mod store;

pub use reference::ModelReference;
pub use run::{run_example, RunRequest};
pub use store::ModelStore;
