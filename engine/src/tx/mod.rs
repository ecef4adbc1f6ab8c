pub mod sighash;
pub mod sign;
pub mod token;
pub mod types;

pub use sighash::*;
pub use sign::*;
pub use token::*;
pub use types::*;
