//! # Objects
//!
//! Generation-counted object ids, the game object record, and the
//! per-world object table.

mod game_object;
mod id;
mod table;

pub use game_object::{GameObject, ObjectDesc};
pub use id::ObjectId;
pub use table::ObjectTable;
