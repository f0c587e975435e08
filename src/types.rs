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

//! Module containing all type definitions

use std::net::Ipv4Addr;

use petgraph::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub(crate) type IndexType = u32;
/// Node identification (and index into the topology graph). A node is either a switch or a host.
pub type NodeId = NodeIndex<IndexType>;

/// Weight of a single (directed) link for one traffic class.
pub type LinkWeight = f64;

/// Port number on a switch.
pub type PortNo = u32;

/// QoS queue identifier. Queue identifiers are opaque labels passed to the switch.
pub type QueueId = u32;

/// Datapath identification of a switch.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SwitchId(pub u64);

impl std::fmt::Display for SwitchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SwitchId {
    fn from(x: u64) -> Self {
        Self(x)
    }
}

impl From<u32> for SwitchId {
    fn from(x: u32) -> Self {
        Self(x as u64)
    }
}

impl From<usize> for SwitchId {
    fn from(x: usize) -> Self {
        Self(x as u64)
    }
}

impl From<i32> for SwitchId {
    fn from(x: i32) -> Self {
        Self(x as u64)
    }
}

impl<T> From<&T> for SwitchId
where
    T: Into<SwitchId> + Copy,
{
    fn from(x: &T) -> Self {
        (*x).into()
    }
}

/// Traffic class of a flow. Each class selects its own edge-weight function and QoS queue. All
/// traffic that does not belong to one of the three slices is `BestEffort`.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum TrafficClass {
    /// Non-sliced traffic, routed by the `default` weight.
    BestEffort,
    /// Video slice (well-known port 5004).
    Video,
    /// Latency slice (well-known port 10022).
    Latency,
    /// Mission-critical slice (well-known port 10023).
    MissionCritical,
}

impl TrafficClass {
    /// The sliced classes, in reestablishment priority order. Mission-critical flows are rerouted
    /// first to minimize their outage window.
    pub const SLICED: [Self; 3] = [Self::MissionCritical, Self::Latency, Self::Video];

    /// The well-known destination port of a sliced class. `BestEffort` has no port.
    pub const fn well_known_port(&self) -> Option<u16> {
        match self {
            Self::BestEffort => None,
            Self::Video => Some(crate::config::VIDEO_PORT),
            Self::Latency => Some(crate::config::LATENCY_PORT),
            Self::MissionCritical => Some(crate::config::MISSION_CRITICAL_PORT),
        }
    }

    /// Map a well-known destination port to its traffic class. Unmapped ports indicate non-slice
    /// traffic and yield `None`.
    pub const fn from_dst_port(port: u16) -> Option<Self> {
        match port {
            crate::config::VIDEO_PORT => Some(Self::Video),
            crate::config::LATENCY_PORT => Some(Self::Latency),
            crate::config::MISSION_CRITICAL_PORT => Some(Self::MissionCritical),
            _ => None,
        }
    }
}

impl std::fmt::Display for TrafficClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BestEffort => f.write_str("default"),
            Self::Video => f.write_str("video"),
            Self::Latency => f.write_str("latency"),
            Self::MissionCritical => f.write_str("mission_critical"),
        }
    }
}

/// Transport protocol supported for slice matching. The discriminants are the `ip_proto` numbers
/// used in match fields.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Protocol {
    /// User Datagram Protocol.
    Udp = 17,
    /// Transmission Control Protocol.
    Tcp = 6,
}

impl Protocol {
    /// Interpret an IPv4 protocol number. Protocols other than UDP and TCP are not supported for
    /// slicing and yield `None`.
    pub const fn from_ip_proto(proto: u8) -> Option<Self> {
        match proto {
            17 => Some(Self::Udp),
            6 => Some(Self::Tcp),
            _ => None,
        }
    }

    /// The IPv4 protocol number.
    pub const fn number(&self) -> u8 {
        *self as u8
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Udp => f.write_str("UDP"),
            Self::Tcp => f.write_str("TCP"),
        }
    }
}

/// One weight value per traffic class for a single directed edge.
#[derive(PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClassWeights {
    /// Weight of the `default` class.
    pub default: LinkWeight,
    /// Weight of the `video` class.
    pub video: LinkWeight,
    /// Weight of the `latency` class.
    pub latency: LinkWeight,
    /// Weight of the `mission_critical` class.
    pub mission_critical: LinkWeight,
}

impl ClassWeights {
    /// All classes weigh zero. Used on host links, which never contribute to the path cost.
    pub const ZERO: Self = Self::uniform(0.0);

    /// The same weight in every class.
    pub const fn uniform(w: LinkWeight) -> Self {
        Self {
            default: w,
            video: w,
            latency: w,
            mission_critical: w,
        }
    }

    /// Get the weight of the given traffic class.
    pub const fn get(&self, class: TrafficClass) -> LinkWeight {
        match class {
            TrafficClass::BestEffort => self.default,
            TrafficClass::Video => self.video,
            TrafficClass::Latency => self.latency,
            TrafficClass::MissionCritical => self.mission_critical,
        }
    }
}

/// Controller Errors
#[derive(Error, Debug)]
pub enum ControllerError {
    /// No forwarding path exists between the two nodes. Callers must treat this as "destination
    /// currently unreachable", not as a fatal error.
    #[error("No path between {0:?} and {1:?}")]
    NoPath(NodeId, NodeId),
    /// No switch with this datapath id is present in the topology.
    #[error("Switch was not found in the topology: {0}")]
    SwitchNotFound(SwitchId),
    /// No host with this address is present in the topology.
    #[error("Host was not found in the topology: {0}")]
    HostNotFound(Ipv4Addr),
    /// The edge does not exist.
    #[error("Link does not exist: {0:?} -- {1:?}")]
    LinkNotFound(NodeId, NodeId),
    /// The edge exists but carries no output port (host-originated edges are leaves).
    #[error("Link {0:?} -- {1:?} carries no output port")]
    MissingOutPort(NodeId, NodeId),
    /// Json error
    #[error("{0}")]
    JsonError(Box<serde_json::Error>),
}

impl From<serde_json::Error> for ControllerError {
    fn from(value: serde_json::Error) -> Self {
        Self::JsonError(Box::new(value))
    }
}

impl PartialEq for ControllerError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NoPath(l0, l1), Self::NoPath(r0, r1)) => l0 == r0 && l1 == r1,
            (Self::SwitchNotFound(l0), Self::SwitchNotFound(r0)) => l0 == r0,
            (Self::HostNotFound(l0), Self::HostNotFound(r0)) => l0 == r0,
            (Self::LinkNotFound(l0, l1), Self::LinkNotFound(r0, r1)) => l0 == r0 && l1 == r1,
            (Self::MissingOutPort(l0, l1), Self::MissingOutPort(r0, r1)) => l0 == r0 && l1 == r1,
            (Self::JsonError(l), Self::JsonError(r)) => l.to_string() == r.to_string(),
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}
