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

//! # Datapath interface
//!
//! This module defines the commands the controller core issues towards its switches, and the
//! trait through which they are delivered. Wire-level encoding and the connection itself live in
//! the external session layer; the core only ever sees one [`Datapath`] handle per switch.
//!
//! All commands are fire-and-forget. No acknowledgement is awaited before a mutation is
//! considered complete, and any retry or backoff for delivery failures is owned by the session
//! layer.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::types::{PortNo, Protocol, QueueId, SwitchId};

/// Interface of one managed switch's active control connection.
pub trait Datapath {
    /// The datapath id of this switch.
    fn id(&self) -> SwitchId;

    /// Install a forwarding rule on the switch.
    fn install_flow(&self, flow: FlowMod);

    /// Remove every installed forwarding rule from the switch.
    fn remove_all_flows(&self);

    /// Send a packet back out of the switch with the given actions applied.
    fn send_packet_out(&self, pkt: PacketOut);
}

/// Match fields of a forwarding rule. Absent fields are wildcards.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowMatch {
    /// Match on the IPv4 ethertype. The match-all rule leaves this unset.
    pub eth_ipv4: bool,
    /// Match on the ingress port.
    pub in_port: Option<PortNo>,
    /// Match on the IPv4 source address.
    pub src: Option<Ipv4Addr>,
    /// Match on the IPv4 destination address.
    pub dst: Option<Ipv4Addr>,
    /// Match on the transport protocol.
    pub protocol: Option<Protocol>,
    /// Match on the transport destination port (UDP or TCP, depending on `protocol`).
    pub dst_port: Option<u16>,
}

impl FlowMatch {
    /// The empty match. Every packet matches.
    pub fn any() -> Self {
        Self::default()
    }

    /// Match all IPv4 traffic.
    pub fn ipv4() -> Self {
        Self {
            eth_ipv4: true,
            ..Self::default()
        }
    }

    /// Restrict the match to the given ingress port.
    pub fn in_port(mut self, port: PortNo) -> Self {
        self.in_port = Some(port);
        self
    }

    /// Restrict the match to the given source address.
    pub fn src(mut self, src: Ipv4Addr) -> Self {
        self.src = Some(src);
        self
    }

    /// Restrict the match to the given destination address.
    pub fn dst(mut self, dst: Ipv4Addr) -> Self {
        self.dst = Some(dst);
        self
    }

    /// Restrict the match to the given transport protocol and destination port.
    pub fn transport(mut self, protocol: Protocol, dst_port: u16) -> Self {
        self.protocol = Some(protocol);
        self.dst_port = Some(dst_port);
        self
    }
}

/// Where an output action sends the packet.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutPort {
    /// A concrete switch port.
    Port(PortNo),
    /// All ports except the ingress port.
    Flood,
    /// The controller, with the full payload.
    Controller,
}

/// A single action of a forwarding rule or packet-out, applied in order.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Serialize, Deserialize)]
pub enum Action {
    /// Assign the packet to a QoS queue.
    SetQueue(QueueId),
    /// Output the packet.
    Output(OutPort),
    /// Rewrite the IPv4 destination address.
    SetIpv4Dst(Ipv4Addr),
    /// Rewrite the UDP destination port.
    SetUdpDst(u16),
    /// Set the IPv4 TTL to a fixed value.
    SetIpTtl(u8),
    /// Decrement the IPv4 TTL.
    DecIpTtl,
}

/// A request to install one forwarding rule.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Serialize, Deserialize)]
pub struct FlowMod {
    /// The match fields.
    pub m: FlowMatch,
    /// The actions applied to matching packets, in order.
    pub actions: Vec<Action>,
    /// Rule priority. Higher priorities win.
    pub priority: u16,
    /// Idle timeout in seconds. Always zero, rules persist until replaced or flushed.
    pub idle_timeout: u16,
    /// Hard timeout in seconds. Always zero, rules persist until replaced or flushed.
    pub hard_timeout: u16,
}

impl FlowMod {
    /// Create a rule without timeouts.
    pub fn new(m: FlowMatch, actions: Vec<Action>, priority: u16) -> Self {
        Self {
            m,
            actions,
            priority,
            idle_timeout: 0,
            hard_timeout: 0,
        }
    }
}

/// A request to send a packet out of a switch.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Serialize, Deserialize)]
pub struct PacketOut {
    /// The buffer id of the original packet-in, if the switch buffered it.
    pub buffer_id: Option<u32>,
    /// The port the packet originally arrived on.
    pub in_port: PortNo,
    /// The actions applied before the packet leaves the switch, in order.
    pub actions: Vec<Action>,
    /// The raw payload. `Some` exactly when the switch did not buffer the packet.
    pub data: Option<Vec<u8>>,
}
