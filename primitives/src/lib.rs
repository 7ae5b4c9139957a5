#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod constants;
pub mod ibc;
pub mod traits;
pub mod types;

pub use constants::*;
pub use ibc::*;
pub use traits::*;
pub use types::*;
