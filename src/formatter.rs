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

//! Utilities to render node ids, paths and slice records for log messages. Node ids are plain
//! graph indices, so a readable representation needs the topology.

use itertools::Itertools;

use crate::{
    slices::SliceFlow,
    topology::{Node, Topology},
    types::NodeId,
};

/// Render a structure in a human-readable way, resolving node ids against the topology.
pub trait TopologyFormatter {
    /// Return the formatted string. Nodes no longer present in the topology render as `?`.
    fn fmt(&self, topology: &Topology) -> String;
}

impl TopologyFormatter for NodeId {
    fn fmt(&self, topology: &Topology) -> String {
        match topology.node(*self) {
            Some(Node::Switch(switch)) => format!("s{}", switch),
            Some(Node::Host(addr)) => addr.to_string(),
            None => String::from("?"),
        }
    }
}

impl TopologyFormatter for [NodeId] {
    fn fmt(&self, topology: &Topology) -> String {
        self.iter().map(|node| node.fmt(topology)).join(" -> ")
    }
}

impl TopologyFormatter for Vec<NodeId> {
    fn fmt(&self, topology: &Topology) -> String {
        self.as_slice().fmt(topology)
    }
}

impl TopologyFormatter for SliceFlow {
    fn fmt(&self, topology: &Topology) -> String {
        format!(
            "({} -> {}, {} dport {}, class {}, queue {}, prio {}, path {})",
            self.src,
            self.dst,
            self.protocol,
            self.dst_port,
            self.class,
            self.queue_id,
            self.priority,
            self.path.fmt(topology),
        )
    }
}
