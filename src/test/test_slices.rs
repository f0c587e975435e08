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

//! Test the slice registry semantics.

use std::net::Ipv4Addr;

use pretty_assertions::assert_eq;

use crate::{
    config::{LATENCY_PORT, MISSION_CRITICAL_PORT, PRIO_SLICE, VIDEO_PORT},
    slices::{SliceFlow, SliceRegistry},
    types::{NodeId, Protocol, TrafficClass},
};

fn host(n: u8) -> Ipv4Addr {
    Ipv4Addr::new(10, 0, 0, n)
}

fn node(i: u32) -> NodeId {
    i.into()
}

fn record(class: TrafficClass, path: Vec<NodeId>) -> SliceFlow {
    SliceFlow {
        src: host(1),
        dst: host(2),
        protocol: Protocol::Udp,
        dst_port: class.well_known_port().unwrap(),
        queue_id: 0,
        class,
        path,
        priority: PRIO_SLICE,
    }
}

#[test]
fn class_of() {
    let reg = SliceRegistry::new();
    assert_eq!(reg.class_of(VIDEO_PORT), Some(TrafficClass::Video));
    assert_eq!(reg.class_of(LATENCY_PORT), Some(TrafficClass::Latency));
    assert_eq!(
        reg.class_of(MISSION_CRITICAL_PORT),
        Some(TrafficClass::MissionCritical)
    );
    // unmapped ports are not slices
    assert_eq!(reg.class_of(80), None);
    assert_eq!(reg.class_of(11013), None);
}

#[test]
fn admission_deduplicates() {
    let mut reg = SliceRegistry::new();
    let sl = record(TrafficClass::Video, vec![node(4), node(0), node(1), node(5)]);

    assert!(reg.admit(sl.clone()));
    assert_eq!(reg.len(), 1);
    // admitting the identical tuple leaves the registry unchanged
    assert!(!reg.admit(sl));
    assert_eq!(reg.len(), 1);
}

#[test]
fn records_are_value_tuples() {
    let mut reg = SliceRegistry::new();
    reg.admit(record(
        TrafficClass::Video,
        vec![node(4), node(0), node(1), node(5)],
    ));
    // the same endpoints over a different path are a distinct entry
    reg.admit(record(
        TrafficClass::Video,
        vec![node(4), node(0), node(3), node(2), node(1), node(5)],
    ));
    assert_eq!(reg.class(TrafficClass::Video).len(), 2);

    // and so is the same pair in a different class
    reg.admit(record(
        TrafficClass::Latency,
        vec![node(4), node(0), node(1), node(5)],
    ));
    assert_eq!(reg.len(), 3);
}

#[test]
fn prune_unreachable() {
    let mut reg = SliceRegistry::new();
    // h1 -> s1 -> s2 -> h2: s2 serves the destination host
    let via_dst = record(TrafficClass::Video, vec![node(4), node(0), node(1), node(5)]);
    // h1 -> s2 -> s3 -> h3: s2 serves the source host
    let via_src = record(
        TrafficClass::Latency,
        vec![node(4), node(1), node(2), node(6)],
    );
    // h1 -> s1 -> s4 -> h4: does not touch s2 at an endpoint position
    let unrelated = record(
        TrafficClass::MissionCritical,
        vec![node(4), node(0), node(3), node(7)],
    );
    reg.admit(via_dst.clone());
    reg.admit(via_src.clone());
    reg.admit(unrelated.clone());

    let mut dropped = reg.prune_unreachable(node(1));
    dropped.sort_by_key(|sl| sl.class);
    assert_eq!(dropped, vec![via_dst, via_src]);
    assert_eq!(reg.len(), 1);
    assert!(reg.class(TrafficClass::MissionCritical).contains(&unrelated));

    // registry consistency: no remaining path touches the failed node next to an endpoint
    for class in TrafficClass::SLICED {
        for sl in reg.class(class) {
            assert_ne!(sl.path[1], node(1));
            assert_ne!(sl.path[sl.path.len() - 2], node(1));
        }
    }
}

#[test]
fn prune_ignores_transit_nodes() {
    let mut reg = SliceRegistry::new();
    // h1 -> s1 -> s2 -> s3 -> h3: s2 is only a transit hop
    let transit = record(
        TrafficClass::Video,
        vec![node(4), node(0), node(1), node(2), node(6)],
    );
    reg.admit(transit.clone());

    assert_eq!(reg.prune_unreachable(node(1)), vec![]);
    assert!(reg.class(TrafficClass::Video).contains(&transit));
}

#[test]
fn take_and_replace() {
    let mut reg = SliceRegistry::new();
    let sl = record(TrafficClass::Video, vec![node(4), node(0), node(1), node(5)]);
    reg.admit(sl.clone());

    let taken = reg.take_class(TrafficClass::Video);
    assert_eq!(taken.len(), 1);
    assert!(reg.is_empty());

    reg.replace_class(TrafficClass::Video, taken);
    assert_eq!(reg.len(), 1);
    assert!(reg.class(TrafficClass::Video).contains(&sl));
}
