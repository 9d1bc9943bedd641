// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Round arithmetic. Round `r` is due at `genesis_time + (r - 1) * period`;
//! round 0 is the genesis entry and never scheduled.

use std::time::Duration;

/// The wall time at which `round` is due.
pub fn time_of_round(period: Duration, genesis_time: i64, round: u64) -> i64 {
    if round == 0 {
        return genesis_time;
    }
    genesis_time + ((round - 1) * period.as_secs()) as i64
}

/// The round due at or before `now`; 0 before genesis.
pub fn current_round(now: i64, period: Duration, genesis_time: i64) -> u64 {
    if now < genesis_time {
        return 0;
    }
    (now - genesis_time) as u64 / period.as_secs() + 1
}

/// The next round strictly after `now` and its due time.
pub fn next_round(now: i64, period: Duration, genesis_time: i64) -> (u64, i64) {
    if now < genesis_time {
        return (1, genesis_time);
    }
    let next = current_round(now, period, genesis_time) + 1;
    (next, time_of_round(period, genesis_time, next))
}
