//! The central domain logic and interface definitions for the bill-board.

pub mod error;
pub mod models;
pub mod privilege;
pub mod traits;

#[cfg(feature = "testing")]
pub mod testing;

// Re-exporting for easier access in other crates
pub use error::{AppError, Result};
pub use models::*;
pub use privilege::{Privilege, PrivilegeSet};
pub use traits::*;
