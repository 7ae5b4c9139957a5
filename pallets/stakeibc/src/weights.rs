#![cfg_attr(rustfmt, rustfmt_skip)]
#![allow(unused_parens)]
#![allow(unused_imports)]
#![allow(missing_docs)]

use polkadot_sdk::frame_support::{traits::Get, weights::{Weight, constants::RocksDbWeight}};
use core::marker::PhantomData;

pub trait WeightInfo {
	fn register_host_zone() -> Weight;
	fn liquid_stake() -> Weight;
	fn redeem_stake() -> Weight;
	fn claim_undelegated_tokens() -> Weight;
	fn lsm_liquid_stake() -> Weight;
	fn update_redemption_rate() -> Weight;
	fn resume_host_zone() -> Weight;
	fn set_redemptions_enabled() -> Weight;
	fn restore_unbonding_records() -> Weight;
}

pub struct SubstrateWeight<T>(PhantomData<T>);
impl<T: polkadot_sdk::frame_system::Config> WeightInfo for SubstrateWeight<T> {
	fn register_host_zone() -> Weight {
		Weight::from_parts(42_000_000, 6800)
			.saturating_add(T::DbWeight::get().reads(2))
			.saturating_add(T::DbWeight::get().writes(1))
	}
	fn liquid_stake() -> Weight {
		Weight::from_parts(96_000_000, 9400)
			.saturating_add(T::DbWeight::get().reads(7))
			.saturating_add(T::DbWeight::get().writes(5))
	}
	fn redeem_stake() -> Weight {
		Weight::from_parts(118_000_000, 48_000)
			.saturating_add(T::DbWeight::get().reads(6))
			.saturating_add(T::DbWeight::get().writes(4))
	}
	fn claim_undelegated_tokens() -> Weight {
		Weight::from_parts(104_000_000, 48_000)
			.saturating_add(T::DbWeight::get().reads(6))
			.saturating_add(T::DbWeight::get().writes(5))
	}
	fn lsm_liquid_stake() -> Weight {
		Weight::from_parts(88_000_000, 9400)
			.saturating_add(T::DbWeight::get().reads(6))
			.saturating_add(T::DbWeight::get().writes(4))
	}
	fn update_redemption_rate() -> Weight {
		Weight::from_parts(21_000_000, 6800)
			.saturating_add(T::DbWeight::get().reads(1))
			.saturating_add(T::DbWeight::get().writes(1))
	}
	fn resume_host_zone() -> Weight {
		Weight::from_parts(19_000_000, 6800)
			.saturating_add(T::DbWeight::get().reads(1))
			.saturating_add(T::DbWeight::get().writes(1))
	}
	fn set_redemptions_enabled() -> Weight {
		Weight::from_parts(19_000_000, 6800)
			.saturating_add(T::DbWeight::get().reads(1))
			.saturating_add(T::DbWeight::get().writes(1))
	}
	fn restore_unbonding_records() -> Weight {
		Weight::from_parts(64_000_000, 48_000)
			.saturating_add(T::DbWeight::get().reads(12))
			.saturating_add(T::DbWeight::get().writes(12))
	}
}

impl WeightInfo for () {
	fn register_host_zone() -> Weight {
		Weight::from_parts(42_000_000, 6800)
			.saturating_add(RocksDbWeight::get().reads(2))
			.saturating_add(RocksDbWeight::get().writes(1))
	}
	fn liquid_stake() -> Weight {
		Weight::from_parts(96_000_000, 9400)
			.saturating_add(RocksDbWeight::get().reads(7))
			.saturating_add(RocksDbWeight::get().writes(5))
	}
	fn redeem_stake() -> Weight {
		Weight::from_parts(118_000_000, 48_000)
			.saturating_add(RocksDbWeight::get().reads(6))
			.saturating_add(RocksDbWeight::get().writes(4))
	}
	fn claim_undelegated_tokens() -> Weight {
		Weight::from_parts(104_000_000, 48_000)
			.saturating_add(RocksDbWeight::get().reads(6))
			.saturating_add(RocksDbWeight::get().writes(5))
	}
	fn lsm_liquid_stake() -> Weight {
		Weight::from_parts(88_000_000, 9400)
			.saturating_add(RocksDbWeight::get().reads(6))
			.saturating_add(RocksDbWeight::get().writes(4))
	}
	fn update_redemption_rate() -> Weight {
		Weight::from_parts(21_000_000, 6800)
			.saturating_add(RocksDbWeight::get().reads(1))
			.saturating_add(RocksDbWeight::get().writes(1))
	}
	fn resume_host_zone() -> Weight {
		Weight::from_parts(19_000_000, 6800)
			.saturating_add(RocksDbWeight::get().reads(1))
			.saturating_add(RocksDbWeight::get().writes(1))
	}
	fn set_redemptions_enabled() -> Weight {
		Weight::from_parts(19_000_000, 6800)
			.saturating_add(RocksDbWeight::get().reads(1))
			.saturating_add(RocksDbWeight::get().writes(1))
	}
	fn restore_unbonding_records() -> Weight {
		Weight::from_parts(64_000_000, 48_000)
			.saturating_add(RocksDbWeight::get().reads(12))
			.saturating_add(RocksDbWeight::get().writes(12))
	}
}
