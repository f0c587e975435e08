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

//! # Topology
//!
//! This module contains the directed weighted graph of the network. Nodes are switches (datapath
//! ids) or hosts (IPv4 addresses), edges carry the output port towards the target and one weight
//! per traffic class. The topology owns all path computation: single shortest paths for unicast
//! flows, and the set of all equally short paths for multicast next-hop aggregation.

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
    net::Ipv4Addr,
};

use log::*;
use ordered_float::NotNan;
use petgraph::{
    stable_graph::StableGraph,
    visit::EdgeRef,
    Directed,
    Direction::{Incoming, Outgoing},
};
use serde::{Deserialize, Serialize};

use crate::types::{
    ClassWeights, ControllerError, IndexType, LinkWeight, NodeId, PortNo, SwitchId, TrafficClass,
};

/// Tolerance when comparing accumulated path costs.
pub(crate) const MIN_EPSILON: LinkWeight = LinkWeight::EPSILON * 1024.0;

/// The graph of the network.
pub type TopologyGraph = StableGraph<(), LinkAttrs, Directed, IndexType>;

/// Attributes of a single directed edge.
#[derive(PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LinkAttrs {
    /// The port on the source device used to reach the target. Host-originated edges carry no
    /// port, since hosts are leaves.
    pub out_port: Option<PortNo>,
    /// The per-class weights of this edge.
    pub weights: ClassWeights,
}

/// What a node in the topology represents.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Node {
    /// A switch, identified by its datapath id.
    Switch(SwitchId),
    /// A host, identified by its IPv4 address.
    Host(Ipv4Addr),
}

/// # Topology
///
/// Directed graph over switches and hosts. Switch nodes are seeded at startup from the static
/// topology, host nodes are added lazily when their traffic is first observed. Removing a node
/// always removes all incident edges, so the graph never contains dangling links.
///
/// The graph uses stable indices: a [`NodeId`] handed out for one node stays valid when other
/// nodes are removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Topology {
    graph: TopologyGraph,
    switches: HashMap<NodeId, SwitchId>,
    switch_lut: HashMap<SwitchId, NodeId>,
    hosts: HashMap<NodeId, Ipv4Addr>,
    host_lut: HashMap<Ipv4Addr, NodeId>,
}

impl Topology {
    /// Create an empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a switch node. If a node for this datapath id already exists, return it unchanged.
    pub fn add_switch(&mut self, switch: SwitchId) -> NodeId {
        if let Some(node) = self.switch_lut.get(&switch) {
            return *node;
        }
        let node = self.graph.add_node(());
        self.switches.insert(node, switch);
        self.switch_lut.insert(switch, node);
        node
    }

    /// Add a host node. If a node for this address already exists, return it unchanged.
    pub fn add_host(&mut self, addr: Ipv4Addr) -> NodeId {
        if let Some(node) = self.host_lut.get(&addr) {
            return *node;
        }
        let node = self.graph.add_node(());
        self.hosts.insert(node, addr);
        self.host_lut.insert(addr, node);
        node
    }

    /// Insert a directed edge, or update its attributes if it already exists.
    pub fn add_edge(
        &mut self,
        from: NodeId,
        to: NodeId,
        out_port: Option<PortNo>,
        weights: ClassWeights,
    ) {
        let attrs = LinkAttrs { out_port, weights };
        match self.graph.find_edge(from, to) {
            Some(e) => {
                if let Some(w) = self.graph.edge_weight_mut(e) {
                    *w = attrs;
                }
            }
            None => {
                self.graph.add_edge(from, to, attrs);
            }
        }
    }

    /// Connect two switches with a reciprocal pair of edges. The same weights apply in both
    /// directions, each direction carries its own output port.
    pub fn connect_switches(
        &mut self,
        a: NodeId,
        port_a: PortNo,
        b: NodeId,
        port_b: PortNo,
        weights: ClassWeights,
    ) {
        self.add_edge(a, b, Some(port_a), weights);
        self.add_edge(b, a, Some(port_b), weights);
    }

    /// Attach a host to a switch. The switch-to-host edge carries the given port, the
    /// host-to-switch edge carries none. Host links weigh zero in every class.
    pub fn attach_host(&mut self, switch: NodeId, port: PortNo, addr: Ipv4Addr) -> NodeId {
        let host = self.add_host(addr);
        self.add_edge(switch, host, Some(port), ClassWeights::ZERO);
        self.add_edge(host, switch, None, ClassWeights::ZERO);
        host
    }

    /// Remove a node and all incident edges. Removing an absent node is a logged no-op returning
    /// `false`, since failure signals may be delivered more than once.
    pub fn remove_node(&mut self, node: NodeId) -> bool {
        if !self.graph.contains_node(node) {
            debug!("Node {:?} was already removed, dropping", node);
            return false;
        }
        if let Some(switch) = self.switches.remove(&node) {
            self.switch_lut.remove(&switch);
        }
        if let Some(addr) = self.hosts.remove(&node) {
            self.host_lut.remove(&addr);
        }
        self.graph.remove_node(node);
        true
    }

    /// Returns `true` if the node is present in the graph.
    pub fn contains(&self, node: NodeId) -> bool {
        self.graph.contains_node(node)
    }

    /// Get the node of a switch.
    pub fn switch(&self, switch: SwitchId) -> Option<NodeId> {
        self.switch_lut.get(&switch).copied()
    }

    /// Get the node of a host.
    pub fn host(&self, addr: Ipv4Addr) -> Option<NodeId> {
        self.host_lut.get(&addr).copied()
    }

    /// What the given node represents, or `None` if it is not in the graph.
    pub fn node(&self, node: NodeId) -> Option<Node> {
        if let Some(switch) = self.switches.get(&node) {
            Some(Node::Switch(*switch))
        } else {
            self.hosts.get(&node).map(|addr| Node::Host(*addr))
        }
    }

    /// All host nodes directly attached to the given switch node, in ascending node order.
    pub fn attached_hosts(&self, switch: NodeId) -> Vec<NodeId> {
        let mut hosts: Vec<NodeId> = self
            .graph
            .neighbors_directed(switch, Outgoing)
            .filter(|n| self.hosts.contains_key(n))
            .collect();
        hosts.sort();
        hosts
    }

    /// The number of nodes currently in the graph.
    pub fn num_nodes(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns a reference to the topology graph (PetGraph struct).
    pub fn graph(&self) -> &TopologyGraph {
        &self.graph
    }

    /// Look up the output port of the edge from `node` to `next`. Only valid for
    /// switch-originated edges.
    pub fn out_port(&self, node: NodeId, next: NodeId) -> Result<PortNo, ControllerError> {
        let e = self
            .graph
            .find_edge(node, next)
            .ok_or(ControllerError::LinkNotFound(node, next))?;
        self.graph
            .edge_weight(e)
            .and_then(|attrs| attrs.out_port)
            .ok_or(ControllerError::MissingOutPort(node, next))
    }

    /// The node immediately following `node` on `path`, or `None` if `node` is not on the path or
    /// is its last element.
    pub fn next_hop_after(path: &[NodeId], node: NodeId) -> Option<NodeId> {
        let idx = path.iter().position(|n| *n == node)?;
        path.get(idx + 1).copied()
    }

    /// Compute the minimum-weight path from `src` to `dst` using the weights of the given traffic
    /// class. Ties are broken deterministically towards the neighbor with the smaller node index.
    /// Fails with [`ControllerError::NoPath`] when either endpoint is absent or no path exists.
    pub fn shortest_path(
        &self,
        src: NodeId,
        dst: NodeId,
        class: TrafficClass,
    ) -> Result<Vec<NodeId>, ControllerError> {
        if !self.graph.contains_node(src) || !self.graph.contains_node(dst) {
            return Err(ControllerError::NoPath(src, dst));
        }

        // Dijkstra from the source, tracking the first (smallest-neighbor) path per node.
        let mut dist: HashMap<NodeId, LinkWeight> = HashMap::new();
        let mut paths: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        let mut heap: BinaryHeap<Reverse<(NotNan<LinkWeight>, NodeId)>> = BinaryHeap::new();
        dist.insert(src, 0.0);
        paths.insert(src, vec![src]);
        heap.push(Reverse((NotNan::new(0.0).unwrap(), src)));

        while let Some(Reverse((d, u))) = heap.pop() {
            let d = d.into_inner();
            if d > dist.get(&u).copied().unwrap_or(LinkWeight::INFINITY) + MIN_EPSILON {
                continue;
            }
            if u == dst {
                break;
            }
            for (v, w) in self.sorted_neighbors(u, class, Outgoing) {
                let nd = d + w;
                if nd + MIN_EPSILON < dist.get(&v).copied().unwrap_or(LinkWeight::INFINITY) {
                    dist.insert(v, nd);
                    let mut p = paths[&u].clone();
                    p.push(v);
                    paths.insert(v, p);
                    heap.push(Reverse((NotNan::new(nd).unwrap(), v)));
                }
            }
        }

        paths.remove(&dst).ok_or(ControllerError::NoPath(src, dst))
    }

    /// Compute every path of minimum total weight from `src` to `dst`. The result is ordered by
    /// the first diverging neighbor (ascending node index). Fails with [`ControllerError::NoPath`]
    /// when either endpoint is absent or no path exists.
    pub fn all_shortest_paths(
        &self,
        src: NodeId,
        dst: NodeId,
        class: TrafficClass,
    ) -> Result<Vec<Vec<NodeId>>, ControllerError> {
        if !self.graph.contains_node(src) || !self.graph.contains_node(dst) {
            return Err(ControllerError::NoPath(src, dst));
        }

        // distance of every node towards the destination
        let dist = self.distances_to(dst, class);
        let total = *dist.get(&src).ok_or(ControllerError::NoPath(src, dst))?;

        // walk the shortest-path DAG. The on-path check keeps zero-weight host detours out.
        let mut paths = Vec::new();
        let mut cur = vec![src];
        self.expand_paths(dst, class, total, 0.0, &dist, &mut cur, &mut paths);

        if paths.is_empty() {
            Err(ControllerError::NoPath(src, dst))
        } else {
            Ok(paths)
        }
    }

    /// Recursively collect all paths whose accumulated cost stays tight with respect to the
    /// distance table.
    fn expand_paths(
        &self,
        dst: NodeId,
        class: TrafficClass,
        total: LinkWeight,
        cost: LinkWeight,
        dist: &HashMap<NodeId, LinkWeight>,
        cur: &mut Vec<NodeId>,
        paths: &mut Vec<Vec<NodeId>>,
    ) {
        let u = *cur.last().unwrap();
        if u == dst {
            paths.push(cur.clone());
            return;
        }
        for (v, w) in self.sorted_neighbors(u, class, Outgoing) {
            if cur.contains(&v) {
                continue;
            }
            let Some(rest) = dist.get(&v) else { continue };
            if (cost + w + rest - total).abs() <= MIN_EPSILON {
                cur.push(v);
                self.expand_paths(dst, class, total, cost + w, dist, cur, paths);
                cur.pop();
            }
        }
    }

    /// Distance of every node towards `target`, following edges forward (Dijkstra on the reversed
    /// graph). Unreachable nodes are absent from the result.
    fn distances_to(&self, target: NodeId, class: TrafficClass) -> HashMap<NodeId, LinkWeight> {
        let mut dist: HashMap<NodeId, LinkWeight> = HashMap::new();
        let mut heap: BinaryHeap<Reverse<(NotNan<LinkWeight>, NodeId)>> = BinaryHeap::new();
        dist.insert(target, 0.0);
        heap.push(Reverse((NotNan::new(0.0).unwrap(), target)));

        while let Some(Reverse((d, u))) = heap.pop() {
            let d = d.into_inner();
            if d > dist.get(&u).copied().unwrap_or(LinkWeight::INFINITY) + MIN_EPSILON {
                continue;
            }
            for (v, w) in self.sorted_neighbors(u, class, Incoming) {
                let nd = d + w;
                if nd + MIN_EPSILON < dist.get(&v).copied().unwrap_or(LinkWeight::INFINITY) {
                    dist.insert(v, nd);
                    heap.push(Reverse((NotNan::new(nd).unwrap(), v)));
                }
            }
        }

        dist
    }

    /// The neighbors of `u` in the given direction with the class weight of the connecting edge,
    /// sorted by ascending node index.
    fn sorted_neighbors(
        &self,
        u: NodeId,
        class: TrafficClass,
        dir: petgraph::Direction,
    ) -> Vec<(NodeId, LinkWeight)> {
        let mut neighbors: Vec<(NodeId, LinkWeight)> = self
            .graph
            .edges_directed(u, dir)
            .map(|e| {
                let v = match dir {
                    Outgoing => e.target(),
                    Incoming => e.source(),
                };
                (v, e.weight().weights.get(class))
            })
            .collect();
        neighbors.sort_by_key(|a| a.0);
        neighbors
    }
}
