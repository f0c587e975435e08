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

//! # Slice Registry
//!
//! This module holds the records of all admitted slice flows, one set per sliced traffic class.
//! Records are value tuples: two records that differ in any field (including the stored path) are
//! distinct entries. The registry supports admission with deduplication, pruning after a node
//! removal, and wholesale replacement during reestablishment.

use std::{collections::HashMap, collections::HashSet, net::Ipv4Addr};

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::types::{NodeId, Protocol, QueueId, TrafficClass};

lazy_static! {
    static ref EMPTY_SET: HashSet<SliceFlow> = HashSet::new();
}

/// A single admitted slice flow.
///
/// The path is the node sequence from source host to destination host as computed at admission
/// time. It is immutable once stored, except when replaced wholesale during reestablishment.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Serialize, Deserialize)]
pub struct SliceFlow {
    /// Source host address.
    pub src: Ipv4Addr,
    /// Destination host address.
    pub dst: Ipv4Addr,
    /// Transport protocol matched by the installed rules.
    pub protocol: Protocol,
    /// The matched well-known destination port.
    pub dst_port: u16,
    /// QoS queue assigned to this flow.
    pub queue_id: QueueId,
    /// Traffic class selecting the edge-weight function.
    pub class: TrafficClass,
    /// Node sequence from source host to destination host.
    pub path: Vec<NodeId>,
    /// Priority of the installed rules.
    pub priority: u16,
}

/// # Slice Registry
///
/// Mapping from the three sliced traffic classes to the set of their active slice flows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceRegistry {
    slices: HashMap<TrafficClass, HashSet<SliceFlow>>,
}

impl Default for SliceRegistry {
    fn default() -> Self {
        Self {
            slices: TrafficClass::SLICED
                .into_iter()
                .map(|class| (class, HashSet::new()))
                .collect(),
        }
    }
}

impl SliceRegistry {
    /// Create a registry with an empty set for every sliced class.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a well-known destination port to its traffic class. `None` indicates non-slice traffic.
    pub fn class_of(&self, dst_port: u16) -> Option<TrafficClass> {
        TrafficClass::from_dst_port(dst_port)
    }

    /// Add a record to the set of its class if no equal record is present. Returns whether the
    /// record was newly inserted.
    pub fn admit(&mut self, record: SliceFlow) -> bool {
        self.slices.entry(record.class).or_default().insert(record)
    }

    /// All records of the given class.
    pub fn class(&self, class: TrafficClass) -> &HashSet<SliceFlow> {
        self.slices.get(&class).unwrap_or(&EMPTY_SET)
    }

    /// The total number of stored records.
    pub fn len(&self) -> usize {
        self.slices.values().map(HashSet::len).sum()
    }

    /// Returns `true` if no record is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Permanently discard every record whose stored path has `failed` as the second node (the
    /// next hop of the source switch) or as the second-to-last node (the last switch before the
    /// destination host). Since each host has exactly one attachment switch, such a record's
    /// endpoint is assumed unreachable. Returns the discarded records.
    pub fn prune_unreachable(&mut self, failed: NodeId) -> Vec<SliceFlow> {
        let mut dropped = Vec::new();
        for set in self.slices.values_mut() {
            for record in std::mem::take(set) {
                let n = record.path.len();
                if n >= 2 && (record.path[1] == failed || record.path[n - 2] == failed) {
                    dropped.push(record);
                } else {
                    set.insert(record);
                }
            }
        }
        dropped
    }

    /// Take the whole record set of a class out of the registry, leaving an empty set.
    pub fn take_class(&mut self, class: TrafficClass) -> HashSet<SliceFlow> {
        std::mem::take(self.slices.entry(class).or_default())
    }

    /// Replace the whole record set of a class.
    pub fn replace_class(&mut self, class: TrafficClass, records: HashSet<SliceFlow>) {
        self.slices.insert(class, records);
    }
}
