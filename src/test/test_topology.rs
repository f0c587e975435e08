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

//! Test the topology graph and its path computation.

use std::net::Ipv4Addr;

use pretty_assertions::assert_eq;

use crate::{
    config::StaticTopology,
    topology::Topology,
    types::{ClassWeights, ControllerError, NodeId, SwitchId, TrafficClass},
};

fn host(n: u8) -> Ipv4Addr {
    Ipv4Addr::new(10, 0, 0, n)
}

/// The reference ring, as seeded at controller startup.
fn ring() -> Topology {
    StaticTopology::reference_ring().build()
}

#[test]
fn idempotent_node_removal() {
    let mut topo = ring();
    let s3 = topo.switch(SwitchId(3)).unwrap();
    assert!(topo.remove_node(s3));
    // a second failure signal for the same node must be a no-op
    assert!(!topo.remove_node(s3));
    assert!(!topo.contains(s3));
    assert_eq!(topo.switch(SwitchId(3)), None);
}

#[test]
fn idempotent_mutation() {
    let mut topo = ring();
    let nodes = topo.num_nodes();
    let s1 = topo.add_switch(SwitchId(1));
    assert_eq!(Some(s1), topo.switch(SwitchId(1)));
    let h1 = topo.add_host(host(1));
    assert_eq!(Some(h1), topo.host(host(1)));
    assert_eq!(topo.num_nodes(), nodes);
}

#[test]
fn ring_scenario() {
    let topo = ring();
    let s1 = topo.switch(SwitchId(1)).unwrap();
    let s2 = topo.switch(SwitchId(2)).unwrap();
    let s3 = topo.switch(SwitchId(3)).unwrap();
    let h3 = topo.host(host(3)).unwrap();

    let path = topo
        .shortest_path(s1, h3, TrafficClass::BestEffort)
        .unwrap();
    assert_eq!(path, vec![s1, s2, s3, h3]);

    // the declared edge ports along the path
    assert_eq!(topo.out_port(s1, s2), Ok(3));
    assert_eq!(topo.out_port(s2, s3), Ok(3));
    assert_eq!(topo.out_port(s3, h3), Ok(2));
}

#[test]
fn path_validity() {
    let topo = ring();
    for (a, b) in [(1u64, 3u64), (2, 4), (1, 2), (3, 1), (4, 2)] {
        let src = topo.switch(SwitchId(a)).unwrap();
        let dst = topo.switch(SwitchId(b)).unwrap();
        for class in [
            TrafficClass::BestEffort,
            TrafficClass::Video,
            TrafficClass::Latency,
            TrafficClass::MissionCritical,
        ] {
            let path = topo.shortest_path(src, dst, class).unwrap();
            assert_eq!(*path.first().unwrap(), src);
            assert_eq!(*path.last().unwrap(), dst);
            for edge in path.windows(2) {
                assert!(topo.graph().find_edge(edge[0], edge[1]).is_some());
            }
        }
    }
}

#[test]
fn all_shortest_paths_on_the_ring() {
    let topo = ring();
    let s1 = topo.switch(SwitchId(1)).unwrap();
    let s2 = topo.switch(SwitchId(2)).unwrap();
    let s3 = topo.switch(SwitchId(3)).unwrap();
    let s4 = topo.switch(SwitchId(4)).unwrap();
    let h3 = topo.host(host(3)).unwrap();

    // the opposite corner is reachable over both cross links, ordered by the first neighbor
    let paths = topo
        .all_shortest_paths(s1, h3, TrafficClass::BestEffort)
        .unwrap();
    assert_eq!(paths, vec![vec![s1, s2, s3, h3], vec![s1, s4, s3, h3]]);

    // the direct neighbor has a unique shortest path
    let paths = topo
        .all_shortest_paths(s1, s2, TrafficClass::BestEffort)
        .unwrap();
    assert_eq!(paths, vec![vec![s1, s2]]);
}

#[test]
fn no_path_is_recoverable() {
    let mut topo = ring();
    let s1 = topo.switch(SwitchId(1)).unwrap();
    let s3 = topo.switch(SwitchId(3)).unwrap();
    let h3 = topo.host(host(3)).unwrap();

    // removing the attachment switch isolates the host
    topo.remove_node(s3);
    assert_eq!(
        topo.shortest_path(s1, h3, TrafficClass::BestEffort),
        Err(ControllerError::NoPath(s1, h3))
    );
    assert_eq!(
        topo.all_shortest_paths(s1, h3, TrafficClass::BestEffort),
        Err(ControllerError::NoPath(s1, h3))
    );

    // asking about the removed node itself is an error as well
    assert_eq!(
        topo.shortest_path(s1, s3, TrafficClass::BestEffort),
        Err(ControllerError::NoPath(s1, s3))
    );
}

#[test]
fn degraded_ring_reroutes() {
    let mut topo = ring();
    let s1 = topo.switch(SwitchId(1)).unwrap();
    let s2 = topo.switch(SwitchId(2)).unwrap();
    let s3 = topo.switch(SwitchId(3)).unwrap();
    let s4 = topo.switch(SwitchId(4)).unwrap();
    let h3 = topo.host(host(3)).unwrap();

    topo.remove_node(s2);
    let path = topo
        .shortest_path(s1, h3, TrafficClass::BestEffort)
        .unwrap();
    assert_eq!(path, vec![s1, s4, s3, h3]);
}

#[test]
fn out_port_errors() {
    let topo = ring();
    let s1 = topo.switch(SwitchId(1)).unwrap();
    let s3 = topo.switch(SwitchId(3)).unwrap();
    let h1 = topo.host(host(1)).unwrap();

    // opposite corners share no edge
    assert_eq!(
        topo.out_port(s1, s3),
        Err(ControllerError::LinkNotFound(s1, s3))
    );
    // host-originated edges carry no port
    assert_eq!(
        topo.out_port(h1, s1),
        Err(ControllerError::MissingOutPort(h1, s1))
    );
}

#[test]
fn next_hop_after() {
    let path: Vec<NodeId> = vec![0.into(), 1.into(), 2.into()];
    assert_eq!(Topology::next_hop_after(&path, 0.into()), Some(1.into()));
    assert_eq!(Topology::next_hop_after(&path, 1.into()), Some(2.into()));
    assert_eq!(Topology::next_hop_after(&path, 2.into()), None);
    assert_eq!(Topology::next_hop_after(&path, 7.into()), None);
}

#[test]
fn weights_differ_per_class() {
    // s1 -- s2 directly (video weight 10), and via s3 (all weights 1)
    let mut topo = Topology::new();
    let s1 = topo.add_switch(SwitchId(1));
    let s2 = topo.add_switch(SwitchId(2));
    let s3 = topo.add_switch(SwitchId(3));
    topo.connect_switches(
        s1,
        3,
        s2,
        4,
        ClassWeights {
            default: 1.0,
            video: 10.0,
            latency: 1.0,
            mission_critical: 1.0,
        },
    );
    topo.connect_switches(s1, 4, s3, 3, ClassWeights::uniform(1.0));
    topo.connect_switches(s3, 4, s2, 3, ClassWeights::uniform(1.0));

    assert_eq!(
        topo.shortest_path(s1, s2, TrafficClass::BestEffort).unwrap(),
        vec![s1, s2]
    );
    assert_eq!(
        topo.shortest_path(s1, s2, TrafficClass::Video).unwrap(),
        vec![s1, s3, s2]
    );
}

#[test]
fn lazy_host_learning() {
    let mut topo = ring();
    let s2 = topo.switch(SwitchId(2)).unwrap();
    let h9 = topo.attach_host(s2, 7, host(9));

    assert_eq!(topo.host(host(9)), Some(h9));
    assert_eq!(topo.out_port(s2, h9), Ok(7));
    let s4 = topo.switch(SwitchId(4)).unwrap();
    let path = topo.shortest_path(s4, h9, TrafficClass::Latency).unwrap();
    assert_eq!(*path.last().unwrap(), h9);
    assert_eq!(path.len(), 4);
}
