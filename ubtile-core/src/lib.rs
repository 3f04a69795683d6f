mod data_type;
pub mod info;
pub mod prelude;
pub mod util;

pub use data_type::*;
pub use info::*;
