//! The eventflow core, holding the domain model, the observable local
//! mirror of the backend collections, and the cold-start seed store.

mod events;
mod mirror;
mod model;
mod persistence;

pub use events::*;
pub use mirror::*;
pub use model::*;
pub use persistence::*;
