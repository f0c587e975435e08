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

//! Test the multicast destination decoding, next-hop grouping and ambiguity resolution.

use std::{collections::BTreeSet, net::Ipv4Addr};

use maplit::btreeset;
use pretty_assertions::assert_eq;

use crate::{
    config::StaticTopology,
    multicast::{decode_destinations, delivery_groups, encode_group_port, resolve_ambiguous},
    types::SwitchId,
};

fn host(n: u8) -> Ipv4Addr {
    Ipv4Addr::new(10, 0, 0, n)
}

fn known_hosts() -> Vec<Ipv4Addr> {
    (1..=4).map(host).collect()
}

#[test]
fn decode() {
    // digit 0 names no host and is ignored
    assert_eq!(decode_destinations(11013, &known_hosts()), vec![host(1), host(3)]);
    // repeated digits are deduplicated, order of first occurrence is kept
    assert_eq!(
        decode_destinations(11231, &known_hosts()),
        vec![host(2), host(3), host(1)]
    );
    // digits outside the known host set are ignored
    assert_eq!(decode_destinations(11090, &known_hosts()), vec![] as Vec<Ipv4Addr>);
    assert_eq!(decode_destinations(11444, &known_hosts()), vec![host(4)]);
}

#[test]
fn group_by_next_hop() {
    let topo = StaticTopology::reference_ring().build();
    let s2 = topo.switch(SwitchId(2)).unwrap();

    // h1 sits one hop behind port 4, h3 one hop behind port 3
    let groups = delivery_groups(&topo, s2, &[host(1), host(3)]);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[&4], btreeset![host(1)]);
    assert_eq!(groups[&3], btreeset![host(3)]);
}

#[test]
fn grouping_skips_unknown_destinations() {
    let mut topo = StaticTopology::reference_ring().build();
    let s2 = topo.switch(SwitchId(2)).unwrap();
    let s1 = topo.switch(SwitchId(1)).unwrap();
    topo.remove_node(s1);

    // h1 lost its attachment switch, h9 never existed. Both silently drop out.
    let groups = delivery_groups(&topo, s2, &[host(1), host(3), host(9)]);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[&3], btreeset![host(3)]);
}

#[test]
fn ambiguous_destination_lands_on_one_port() {
    let topo = StaticTopology::reference_ring().build();
    let s1 = topo.switch(SwitchId(1)).unwrap();

    // the opposite corner is reachable over both cross links
    let mut groups = delivery_groups(&topo, s1, &[host(3)]);
    assert_eq!(groups[&3], btreeset![host(3)]);
    assert_eq!(groups[&4], btreeset![host(3)]);

    resolve_ambiguous(&mut groups);
    let on_3 = groups[&3].contains(&host(3));
    let on_4 = groups[&4].contains(&host(3));
    assert!(on_3 ^ on_4);
    // equally large sets resolve towards the lower port
    assert!(on_3);
}

#[test]
fn ambiguity_prefers_the_smaller_group() {
    let topo = StaticTopology::reference_ring().build();
    let s1 = topo.switch(SwitchId(1)).unwrap();

    // h2 is unambiguous on port 3, h3 is claimed by both cross links
    let mut groups = delivery_groups(&topo, s1, &[host(2), host(3)]);
    assert_eq!(groups[&3], btreeset![host(2), host(3)]);
    assert_eq!(groups[&4], btreeset![host(3)]);

    resolve_ambiguous(&mut groups);
    // port 3 was larger, so it loses the overlapping destination
    assert_eq!(groups[&3], btreeset![host(2)]);
    assert_eq!(groups[&4], btreeset![host(3)]);
}

#[test]
fn group_port_encoding() {
    assert_eq!(encode_group_port(&btreeset![host(1), host(3)]), Some(11130));
    assert_eq!(
        encode_group_port(&btreeset![host(2), host(3), host(4)]),
        Some(11234)
    );
    // a single destination still pads to the fixed width
    assert_eq!(encode_group_port(&btreeset![host(4)]), Some(11400));
    // hosts with multi-digit suffixes overflow the port and cannot be encoded
    let big: BTreeSet<Ipv4Addr> = btreeset![host(100), host(200), host(250)];
    assert_eq!(encode_group_port(&big), None);
}
