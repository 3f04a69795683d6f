pub use ubtile_core::prelude::*;
pub use ubtile_core::util::*;
