pub mod manager;
pub mod model;

pub use model::{GameInstance, DATA_DIR_NAME};
