//! Storage migrations of the records pallet.

pub mod v1;
