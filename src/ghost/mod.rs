// Ghost catalog, filtering and speed measurement

pub mod catalog;
pub mod filter;
pub mod model;
pub mod speed;

pub use catalog::{CatalogSource, CatalogStore, GhostCatalog, HttpCatalogSource};
pub use filter::{FilterSelection, FilterState, InclusionState, SpeedFilter};
pub use model::{DifficultyMode, Evidence, Ghost, SpeedRange};
pub use speed::{SpeedCalculator, SpeedCategory, SpeedReading};
