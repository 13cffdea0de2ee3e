pub mod api;
pub mod cell_tower;
pub mod cli;
mod error;
pub mod loader;
mod settings;
pub mod store;

pub use cell_tower::{CellTower, TowerAttributes};
pub use error::{Error, Result};
pub use loader::{CsvLoader, LoadReport};
pub use settings::Settings;
pub use store::{MemoryTowerStore, PgTowerStore, TowerStore};
