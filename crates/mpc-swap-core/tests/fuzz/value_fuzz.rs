//! Fuzz tests for the sweep value policy

use alloy_primitives::U256;
use mpc_swap_core::trade::sweep_value;
use proptest::prelude::*;

proptest! {
    /// With enough balance, value plus gas is exactly the balance
    #[test]
    fn value_plus_gas_is_balance(
        balance in any::<u128>(),
        gas_price in 0u64..1_000_000_000_000,
        gas_limit in 0u64..30_000_000,
    ) {
        let balance = U256::from(balance);
        let gas_cost = U256::from(gas_price) * U256::from(gas_limit);
        let value = sweep_value(balance, U256::from(gas_price), gas_limit);

        if balance >= gas_cost {
            prop_assert_eq!(value + gas_cost, balance);
        } else {
            prop_assert_eq!(value, U256::ZERO);
        }
    }

    /// The sweep never exceeds the balance
    #[test]
    fn value_bounded_by_balance(
        balance in any::<u64>(),
        gas_price in any::<u64>(),
        gas_limit in any::<u64>(),
    ) {
        let value = sweep_value(U256::from(balance), U256::from(gas_price), gas_limit);
        prop_assert!(value <= U256::from(balance));
    }

    /// Gas cost overflow saturates to a zero sweep instead of wrapping
    #[test]
    fn overflowing_gas_cost_sweeps_nothing(
        balance in any::<u128>(),
        gas_limit in 2u64..u64::MAX,
    ) {
        let value = sweep_value(U256::from(balance), U256::MAX, gas_limit);
        prop_assert_eq!(value, U256::ZERO);
    }
}
