pub mod keys;
pub mod pedersen;
pub mod point;
pub mod rpa;
pub mod schnorr;

pub use keys::*;
pub use pedersen::*;
pub use point::*;
pub use rpa::*;
