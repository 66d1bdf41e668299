pub use tally_core::*;
pub use tally_macros::*;
