//! Covenant construction and spending
//!
//! A covenant output locks a token under a one-time guard key and,
//! optionally, anchors the hash of an amount envelope. The redeem script is
//! `[proof hash push + drop]? || guard hash push || template tail`.

pub mod opcodes;
pub mod script;
pub mod spend;
pub mod template;

pub use opcodes::OpCode;
pub use script::*;
pub use spend::*;
pub use template::*;
