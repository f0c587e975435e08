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

//! # Multicast Aggregator
//!
//! One-to-many delivery encodes its destination set in the UDP destination port: the digits after
//! the fixed `11` prefix name the last octet of each destination host. At every hop, the
//! aggregator decodes the destinations, groups them by the output port of their shortest paths,
//! and either rewrites single-destination groups for final delivery or re-encodes
//! multi-destination groups so the next switch can continue the fan-out.

use std::{
    collections::{BTreeSet, HashMap},
    net::Ipv4Addr,
};

use log::*;

use crate::{
    config::{CROSS_LINK_PORTS, MULTICAST_GROUP_PREFIX, MULTICAST_PORT_WIDTH},
    topology::Topology,
    types::{NodeId, PortNo, TrafficClass},
};

/// Decode a multicast group port into the ordered, deduplicated list of destination hosts.
/// Digits that do not name a known host are ignored.
pub fn decode_destinations(dst_port: u16, known_hosts: &[Ipv4Addr]) -> Vec<Ipv4Addr> {
    let digits = dst_port.to_string();
    let mut destinations = Vec::new();
    for c in digits.chars().skip(MULTICAST_GROUP_PREFIX.len()) {
        let Some(d) = c.to_digit(10) else { continue };
        let addr = Ipv4Addr::new(10, 0, 0, d as u8);
        if known_hosts.contains(&addr) && !destinations.contains(&addr) {
            destinations.push(addr);
        }
    }
    destinations
}

/// Group the destinations by the output port of their shortest paths from the given switch node.
/// A destination reachable over several equally short routes appears in every such port's set.
/// Destinations not present in the topology are silently skipped.
pub fn delivery_groups(
    topology: &Topology,
    from: NodeId,
    destinations: &[Ipv4Addr],
) -> HashMap<PortNo, BTreeSet<Ipv4Addr>> {
    let mut groups: HashMap<PortNo, BTreeSet<Ipv4Addr>> = HashMap::new();
    for addr in destinations {
        let Some(dst) = topology.host(*addr) else { continue };
        let paths = match topology.all_shortest_paths(from, dst, TrafficClass::BestEffort) {
            Ok(paths) => paths,
            Err(e) => {
                debug!("Skipping multicast destination {}: {}", addr, e);
                continue;
            }
        };
        for path in paths {
            let Some(next) = Topology::next_hop_after(&path, from) else { continue };
            match topology.out_port(from, next) {
                Ok(port) => {
                    groups.entry(port).or_default().insert(*addr);
                }
                Err(e) => debug!("Skipping next hop {:?} for {}: {}", next, addr, e),
            }
        }
    }
    groups
}

/// Resolve destinations claimed by both cross-link ports, so that every destination is sent out
/// exactly one port. The overlapping destination is removed from the port whose set is currently
/// larger, ties are resolved by removing from the higher-numbered port.
///
/// Only the two cross-link ports of the reference topology are considered. By construction of the
/// four-cycle, these are the only ports on which a switch ever has more than one next-hop choice.
pub fn resolve_ambiguous(groups: &mut HashMap<PortNo, BTreeSet<Ipv4Addr>>) {
    let (lo, hi) = CROSS_LINK_PORTS;
    let ambiguous: Vec<Ipv4Addr> = match (groups.get(&lo), groups.get(&hi)) {
        (Some(a), Some(b)) => a.intersection(b).copied().collect(),
        _ => return,
    };
    if !ambiguous.is_empty() {
        info!("Ambiguous multicast destinations: {:?}", ambiguous);
    }
    for addr in ambiguous {
        let larger = if groups[&lo].len() > groups[&hi].len() {
            lo
        } else {
            hi
        };
        if let Some(set) = groups.get_mut(&larger) {
            set.remove(&addr);
        }
    }
}

/// Synthesize the group port for a multi-destination group: the `11` prefix, the last octet of
/// every destination in ascending order, right-padded with zeros to the fixed digit width.
/// Returns `None` if the encoding does not fit a port number, which only happens for hosts whose
/// last octet has more than one digit.
pub fn encode_group_port(destinations: &BTreeSet<Ipv4Addr>) -> Option<u16> {
    let mut port = String::from(MULTICAST_GROUP_PREFIX);
    for addr in destinations {
        port.push_str(&addr.octets()[3].to_string());
    }
    while port.len() < MULTICAST_PORT_WIDTH {
        port.push('0');
    }
    port.parse().ok()
}
