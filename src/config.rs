// NetSlice: SDN Slice Controller written in Rust
// Copyright (C) 2022-2023 Tibor Schneider <sctibor@ethz.ch>
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! # Configuration
//!
//! Process-wide settings fixed at startup, the well-known constants of the deployment, and the
//! static topology description the controller is seeded with.

use std::{collections::HashMap, net::Ipv4Addr, ops::RangeInclusive};

use serde::{Deserialize, Serialize};
use serde_with::{As, Same};

use crate::{
    topology::Topology,
    types::{ClassWeights, PortNo, QueueId, SwitchId, TrafficClass},
};

/// Well-known destination port of the video slice.
pub const VIDEO_PORT: u16 = 5004;
/// Well-known destination port of the latency slice.
pub const LATENCY_PORT: u16 = 10022;
/// Well-known destination port of the mission-critical slice.
pub const MISSION_CRITICAL_PORT: u16 = 10023;

/// Numeric window reserved for synthesized multicast group identifiers.
pub const MULTICAST_PORT_RANGE: RangeInclusive<u16> = 11001..=11444;
/// Prefix of every synthesized multicast group port.
pub const MULTICAST_GROUP_PREFIX: &str = "11";
/// Total digit width of a synthesized multicast group port.
pub const MULTICAST_PORT_WIDTH: usize = 5;
/// UDP port rewritten into a multicast packet delivered to its final destination.
pub const REDELIVERY_UDP_PORT: u16 = 10001;

/// The IPv4 broadcast destination handled by flooding.
pub const BROADCAST_ADDR: Ipv4Addr = Ipv4Addr::new(10, 255, 255, 255);

/// Queue for best-effort traffic.
pub const DEFAULT_QUEUE: QueueId = 0;
/// Queue for the video slice. Shares the default queue to serve as base-line noise.
pub const VIDEO_QUEUE: QueueId = 0;
/// Queue for multicast delivery groups.
pub const MULTICAST_QUEUE: QueueId = 1;
/// Queue for the latency slice.
pub const LATENCY_QUEUE: QueueId = 2;
/// Queue for the mission-critical slice.
pub const CRITICAL_QUEUE: QueueId = 3;

/// Priority of the table-miss rule.
pub const PRIO_TABLE_MISS: u16 = 0;
/// Priority of the best-effort path rule.
pub const PRIO_BASE: u16 = 1;
/// Priority of the send-to-controller callback rules installed alongside a base flow.
pub const PRIO_CALLBACK: u16 = 2;
/// Priority of slice and multicast rules.
pub const PRIO_SLICE: u16 = 3;

/// The switch port on which hosts are attached in the reference topology.
pub const HOST_PORT: PortNo = 2;
/// The ingress port blocked by the broadcast duplicate-suppression rule.
pub const BLOCKED_IN_PORT: PortNo = 4;
/// The two cross-link ports on which a switch of the reference topology can have more than one
/// next-hop choice.
pub const CROSS_LINK_PORTS: (PortNo, PortNo) = (3, 4);

/// Process-wide controller settings, fixed at startup.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Automatically reroute admitted slice flows after a switch failure. When disabled, the
    /// registry is left untouched and flows are re-admitted on the next matching traffic.
    pub smart_failure: bool,
    /// Collapse all non-default queue ids to the default queue.
    pub disable_slicing: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            smart_failure: true,
            disable_slicing: false,
        }
    }
}

impl ControllerConfig {
    /// The QoS queue of a traffic class.
    pub fn queue_for(&self, class: TrafficClass) -> QueueId {
        if self.disable_slicing {
            return DEFAULT_QUEUE;
        }
        match class {
            TrafficClass::BestEffort => DEFAULT_QUEUE,
            TrafficClass::Video => VIDEO_QUEUE,
            TrafficClass::Latency => LATENCY_QUEUE,
            TrafficClass::MissionCritical => CRITICAL_QUEUE,
        }
    }

    /// The QoS queue of multicast delivery groups.
    pub fn multicast_queue(&self) -> QueueId {
        if self.disable_slicing {
            DEFAULT_QUEUE
        } else {
            MULTICAST_QUEUE
        }
    }
}

/// One inter-switch link of the static topology. Both directions carry the same weights, each
/// direction its own port.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct StaticLink {
    /// First switch.
    pub a: SwitchId,
    /// Port on `a` towards `b`.
    pub port_a: PortNo,
    /// Second switch.
    pub b: SwitchId,
    /// Port on `b` towards `a`.
    pub port_b: PortNo,
    /// Per-class weights, applied in both directions.
    pub weights: ClassWeights,
}

/// One statically known host and its attachment point.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct StaticHost {
    /// Host address.
    pub addr: Ipv4Addr,
    /// The switch the host is attached to.
    pub switch: SwitchId,
    /// The switch port the host is attached on.
    pub port: PortNo,
}

/// The static topology the controller is seeded with at startup.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct StaticTopology {
    /// All switches.
    pub switches: Vec<SwitchId>,
    /// All inter-switch links.
    pub links: Vec<StaticLink>,
    /// All statically known hosts. These form the digit universe of multicast group decoding.
    pub hosts: Vec<StaticHost>,
    /// Destination addresses interpreted as failure signals for the mapped switch.
    pub fail_addresses: HashMap<Ipv4Addr, SwitchId>,
    /// Broadcast duplicate-suppression table: which switch to cut off for a broadcast from the
    /// given source host arriving at the given switch. A key only takes effect while the mapped
    /// switch is still in the topology.
    ///
    /// The table is specific to the reference topology. On any other topology it stays empty and
    /// no duplicate suppression happens.
    #[serde(with = "As::<Vec<(Same, Same)>>")]
    pub block_table: HashMap<(SwitchId, Ipv4Addr), SwitchId>,
}

impl StaticTopology {
    /// Seed a topology with the switches, links and hosts of this description.
    pub fn build(&self) -> Topology {
        let mut topology = Topology::new();
        for switch in &self.switches {
            topology.add_switch(*switch);
        }
        for link in &self.links {
            let a = topology.add_switch(link.a);
            let b = topology.add_switch(link.b);
            topology.connect_switches(a, link.port_a, b, link.port_b, link.weights);
        }
        for host in &self.hosts {
            let switch = topology.add_switch(host.switch);
            topology.attach_host(switch, host.port, host.addr);
        }
        topology
    }

    /// The reference deployment: four switches in a cycle, one host per switch.
    ///
    /// ```text
    /// H1 2---2 S1 4----------3 S4 2---2 H4
    ///          3                4
    ///          |                |
    ///          |                |
    ///          4                3
    /// H2 2---2 S2 3----------4 S3 2---2 H3
    /// ```
    ///
    /// The small numbers are the switch ports. Inter-switch links weigh one in every class, so
    /// shortest paths by weight and by hop count coincide.
    pub fn reference_ring() -> Self {
        let host = |n: u8| Ipv4Addr::new(10, 0, 0, n);
        let link = |a: u64, port_a: PortNo, b: u64, port_b: PortNo| StaticLink {
            a: SwitchId(a),
            port_a,
            b: SwitchId(b),
            port_b,
            weights: ClassWeights::uniform(1.0),
        };
        Self {
            switches: (1..=4).map(SwitchId).collect(),
            links: vec![
                link(1, 3, 2, 4),
                link(2, 3, 3, 4),
                link(3, 3, 4, 4),
                link(4, 3, 1, 4),
            ],
            hosts: (1..=4u8)
                .map(|n| StaticHost {
                    addr: host(n),
                    switch: SwitchId(n as u64),
                    port: HOST_PORT,
                })
                .collect(),
            fail_addresses: (1..=4u8)
                .map(|n| (Ipv4Addr::new(10, 0, 0, n * 11), SwitchId(n as u64)))
                .collect(),
            block_table: [
                ((SwitchId(3), host(1)), SwitchId(2)),
                ((SwitchId(4), host(2)), SwitchId(3)),
                ((SwitchId(1), host(3)), SwitchId(4)),
                ((SwitchId(2), host(4)), SwitchId(1)),
            ]
            .into_iter()
            .collect(),
        }
    }
}
