pub mod fuel;
pub mod grid;
pub mod home;
pub mod types;

pub use fuel::*;
pub use grid::*;
pub use home::*;
pub use types::*;
