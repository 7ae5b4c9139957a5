#![cfg_attr(rustfmt, rustfmt_skip)]
#![allow(unused_parens)]
#![allow(unused_imports)]
#![allow(missing_docs)]

use polkadot_sdk::frame_support::{traits::Get, weights::{Weight, constants::RocksDbWeight}};
use core::marker::PhantomData;

pub trait WeightInfo {
	fn add_epoch() -> Weight;
	fn epoch_transition() -> Weight;
}

pub struct SubstrateWeight<T>(PhantomData<T>);
impl<T: polkadot_sdk::frame_system::Config> WeightInfo for SubstrateWeight<T> {
	fn add_epoch() -> Weight {
		Weight::from_parts(15_000_000, 2600)
			.saturating_add(T::DbWeight::get().reads(1))
			.saturating_add(T::DbWeight::get().writes(1))
	}
	/// Subscribers run inside the transition; budgeted as one full deposit and unbonding pass.
	fn epoch_transition() -> Weight {
		Weight::from_parts(250_000_000, 40_000)
			.saturating_add(T::DbWeight::get().reads(64))
			.saturating_add(T::DbWeight::get().writes(64))
	}
}

impl WeightInfo for () {
	fn add_epoch() -> Weight {
		Weight::from_parts(15_000_000, 2600)
			.saturating_add(RocksDbWeight::get().reads(1))
			.saturating_add(RocksDbWeight::get().writes(1))
	}
	fn epoch_transition() -> Weight {
		Weight::from_parts(250_000_000, 40_000)
			.saturating_add(RocksDbWeight::get().reads(64))
			.saturating_add(RocksDbWeight::get().writes(64))
	}
}
