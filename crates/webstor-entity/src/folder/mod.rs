//! Folder entity and tree placement rules.

pub mod model;
pub mod tree;

pub use model::{CreateFolder, Folder};
pub use tree::{MovePlacement, classify_move};
