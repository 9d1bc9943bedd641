// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use lazy_static::lazy_static;
use prometheus::{GaugeVec, IntGaugeVec, Opts};

lazy_static! {
    pub static ref BEACON_DISCREPANCY_LATENCY: Box<GaugeVec> = {
        let gauge = Box::new(
            GaugeVec::new(
                Opts::new(
                    "beacon_discrepancy_latency_ms",
                    "Millisecond gap between the scheduled round time and the moment the beacon reached storage",
                ),
                &["beacon_id"],
            )
            .expect("valid metric options"),
        );
        prometheus::default_registry()
            .register(gauge.clone())
            .expect("Registering the beacon_discrepancy_latency_ms metric with the metrics registry must succeed");
        gauge
    };
    pub static ref BEACON_STORAGE_LATENCY: Box<GaugeVec> = {
        let gauge = Box::new(
            GaugeVec::new(
                Opts::new(
                    "beacon_storage_latency_ms",
                    "Milliseconds spent in the storage layer for the last beacon put",
                ),
                &["beacon_id"],
            )
            .expect("valid metric options"),
        );
        prometheus::default_registry()
            .register(gauge.clone())
            .expect("Registering the beacon_storage_latency_ms metric with the metrics registry must succeed");
        gauge
    };
    pub static ref LAST_BEACON_ROUND: Box<IntGaugeVec> = {
        let gauge = Box::new(
            IntGaugeVec::new(
                Opts::new("last_beacon_round", "Last beacon round stored locally"),
                &["beacon_id"],
            )
            .expect("valid metric options"),
        );
        prometheus::default_registry()
            .register(gauge.clone())
            .expect("Registering the last_beacon_round metric with the metrics registry must succeed");
        gauge
    };
    pub static ref GROUP_SIZE: Box<IntGaugeVec> = {
        let gauge = Box::new(
            IntGaugeVec::new(
                Opts::new("group_size", "Number of nodes in the current group"),
                &["beacon_id"],
            )
            .expect("valid metric options"),
        );
        prometheus::default_registry()
            .register(gauge.clone())
            .expect("Registering the group_size metric with the metrics registry must succeed");
        gauge
    };
    pub static ref GROUP_THRESHOLD: Box<IntGaugeVec> = {
        let gauge = Box::new(
            IntGaugeVec::new(
                Opts::new("group_threshold", "Threshold of the current group"),
                &["beacon_id"],
            )
            .expect("valid metric options"),
        );
        prometheus::default_registry()
            .register(gauge.clone())
            .expect("Registering the group_threshold metric with the metrics registry must succeed");
        gauge
    };
}
