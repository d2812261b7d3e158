//! Test support: an in-memory store implementing the reader and the
//! transition procedures, plus fixture loaders.

mod fixtures;
mod store;

pub use fixtures::{load_copies_csv, load_store_json, open_dibs, open_rent, open_rental};
pub use store::{Fault, InMemoryStore};
