pub mod enums;
pub mod lead;
pub mod property;
pub mod settings;

pub use enums::*;
pub use lead::*;
pub use property::*;
pub use settings::*;
