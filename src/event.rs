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

//! Module for defining the events delivered by the session layer. The session layer parses the
//! raw frame and hands the extracted fields to the controller; raw packet parsing is not part of
//! the core.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::types::PortNo;

/// The ethertype of a received frame, as far as the core cares about it.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum EtherType {
    /// An IPv4 packet.
    Ipv4,
    /// A link-layer discovery frame. Always ignored.
    Lldp,
    /// Anything else. Always ignored.
    Other(u16),
}

/// The IPv4 fields of a packet-in.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Ipv4Fields {
    /// Source address.
    pub src: Ipv4Addr,
    /// Destination address.
    pub dst: Ipv4Addr,
    /// IPv4 protocol number.
    pub protocol: u8,
}

/// A packet delivered to the controller because no installed rule matched it.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Serialize, Deserialize)]
pub struct PacketIn {
    /// The port the packet arrived on.
    pub in_port: PortNo,
    /// The ethertype of the frame.
    pub ethertype: EtherType,
    /// The parsed IPv4 header fields, if the frame is IPv4.
    pub ipv4: Option<Ipv4Fields>,
    /// The transport destination port, if the packet is UDP or TCP.
    pub dst_port: Option<u16>,
    /// The switch-side buffer id, if the switch buffered the packet.
    pub buffer_id: Option<u32>,
    /// The raw frame payload.
    pub data: Vec<u8>,
}

impl PacketIn {
    /// A UDP packet-in.
    pub fn udp(in_port: PortNo, src: Ipv4Addr, dst: Ipv4Addr, dst_port: u16) -> Self {
        Self {
            in_port,
            ethertype: EtherType::Ipv4,
            ipv4: Some(Ipv4Fields {
                src,
                dst,
                protocol: 17,
            }),
            dst_port: Some(dst_port),
            buffer_id: None,
            data: Vec::new(),
        }
    }

    /// A TCP packet-in.
    pub fn tcp(in_port: PortNo, src: Ipv4Addr, dst: Ipv4Addr, dst_port: u16) -> Self {
        Self {
            in_port,
            ethertype: EtherType::Ipv4,
            ipv4: Some(Ipv4Fields {
                src,
                dst,
                protocol: 6,
            }),
            dst_port: Some(dst_port),
            buffer_id: None,
            data: Vec::new(),
        }
    }

    /// An IPv4 packet-in without transport ports.
    pub fn ipv4(in_port: PortNo, src: Ipv4Addr, dst: Ipv4Addr, protocol: u8) -> Self {
        Self {
            in_port,
            ethertype: EtherType::Ipv4,
            ipv4: Some(Ipv4Fields { src, dst, protocol }),
            dst_port: None,
            buffer_id: None,
            data: Vec::new(),
        }
    }

    /// A link-layer discovery frame.
    pub fn lldp(in_port: PortNo) -> Self {
        Self {
            in_port,
            ethertype: EtherType::Lldp,
            ipv4: None,
            dst_port: None,
            buffer_id: None,
            data: Vec::new(),
        }
    }
}
