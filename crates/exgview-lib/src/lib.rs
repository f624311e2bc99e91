pub mod classify;
pub mod config;
pub mod error;
pub mod io;
pub mod plot;
pub mod table;

pub use classify::*;
pub use error::{ExgError, Result};
pub use table::*;
