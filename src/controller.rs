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

//! # Top-level Controller module
//!
//! This module contains the event-driven front controller. It classifies every packet-in into
//! failure signal, slice traffic, multicast traffic or ordinary traffic, dispatches into the
//! topology, the slice registry and the multicast aggregator, and issues flow-install and
//! packet-out commands back through the datapath handles.

use std::{
    collections::{HashMap, HashSet},
    net::Ipv4Addr,
};

use itertools::Itertools;
use log::*;

use crate::{
    config::{
        ControllerConfig, StaticTopology, BLOCKED_IN_PORT, BROADCAST_ADDR, DEFAULT_QUEUE,
        HOST_PORT, MULTICAST_PORT_RANGE, PRIO_BASE, PRIO_CALLBACK, PRIO_SLICE, PRIO_TABLE_MISS,
        REDELIVERY_UDP_PORT,
    },
    datapath::{Action, Datapath, FlowMatch, FlowMod, OutPort, PacketOut},
    event::{EtherType, PacketIn},
    formatter::TopologyFormatter,
    multicast,
    slices::{SliceFlow, SliceRegistry},
    topology::Topology,
    types::{ControllerError, NodeId, PortNo, Protocol, QueueId, SwitchId, TrafficClass},
};

/// # Controller
///
/// The single authoritative instance holding the topology and the slice registry. All mutation
/// goes through `&mut self`, so the embedder's event loop (or one coarse lock around the
/// controller) serializes packet-in handling from different switches before it touches shared
/// state. Commands towards the switches are fire-and-forget.
#[derive(Debug)]
pub struct Controller<D> {
    config: ControllerConfig,
    topology: Topology,
    slices: SliceRegistry,
    /// Known switch connections. Append-only: a failed switch loses its graph node, never its
    /// handle.
    datapaths: Vec<D>,
    /// The statically known hosts, the digit universe of multicast group decoding.
    known_hosts: Vec<Ipv4Addr>,
    /// Destination addresses interpreted as failure signals.
    fail_addresses: HashMap<Ipv4Addr, SwitchId>,
    /// Broadcast duplicate-suppression table of the reference topology.
    block_table: HashMap<(SwitchId, Ipv4Addr), SwitchId>,
}

impl<D> Controller<D> {
    /// Create a controller seeded with the given static topology.
    pub fn new(config: ControllerConfig, static_topology: &StaticTopology) -> Self {
        Self {
            config,
            topology: static_topology.build(),
            slices: SliceRegistry::new(),
            datapaths: Vec::new(),
            known_hosts: static_topology.hosts.iter().map(|h| h.addr).collect(),
            fail_addresses: static_topology.fail_addresses.clone(),
            block_table: static_topology.block_table.clone(),
        }
    }

    /// Returns a reference to the topology.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Returns a reference to the slice registry.
    pub fn slices(&self) -> &SliceRegistry {
        &self.slices
    }

    /// Returns the controller settings.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Returns the known switch connections, in join order.
    pub fn datapaths(&self) -> &[D] {
        &self.datapaths
    }

    /// Serialize the topology and the slice registry as JSON.
    pub fn state_json(&self) -> Result<String, ControllerError> {
        Ok(serde_json::to_string(&(&self.topology, &self.slices))?)
    }

    /// Restore the topology and the slice registry from a snapshot taken with
    /// [`Self::state_json`].
    pub fn restore_state(&mut self, json: &str) -> Result<(), ControllerError> {
        let (topology, slices) = serde_json::from_str(json)?;
        self.topology = topology;
        self.slices = slices;
        Ok(())
    }
}

impl<D> Default for Controller<D> {
    /// A controller over the reference topology with default settings.
    fn default() -> Self {
        Self::new(ControllerConfig::default(), &StaticTopology::reference_ring())
    }
}

impl<D: Datapath> Controller<D> {
    /// A new switch connected. Install the table-miss rule that sends every unmatched packet to
    /// the controller with its full payload, and record the handle.
    pub fn on_switch_join(&mut self, dp: D) {
        info!("Switch {} joined, setting table-miss flow entry", dp.id());
        Self::install_table_miss(&dp);
        self.datapaths.push(dp);
    }

    /// Handle a packet-in event from the session layer.
    ///
    /// The packet is classified in order: non-IPv4 and link-layer-discovery traffic is dropped,
    /// failure-simulation addresses trigger failure recovery, slice ports admit a slice flow,
    /// the reserved multicast window delegates to the aggregator, and everything else receives a
    /// best-effort base flow. A packet for which no forwarding decision can be produced is
    /// dropped with a logged error; this is terminal for the packet only, since an identical
    /// later packet-in re-triggers the same computation.
    pub fn on_packet_in(&mut self, switch: SwitchId, pkt: PacketIn) -> Result<(), ControllerError> {
        if pkt.ethertype != EtherType::Ipv4 {
            return Ok(());
        }
        let Some(ip) = pkt.ipv4 else {
            return Ok(());
        };
        debug!("Packet-in on switch {}: {} -> {}", switch, ip.src, ip.dst);

        // certain destination addresses signal a switch failure. The packet is never forwarded.
        if let Some(&failed) = self.fail_addresses.get(&ip.dst) {
            self.handle_switch_failure(failed);
            return Ok(());
        }

        let dp_idx = self
            .datapaths
            .iter()
            .position(|dp| dp.id() == switch)
            .ok_or(ControllerError::SwitchNotFound(switch))?;

        // a host we have not seen yet joins the graph at its observed ingress port
        if self.topology.host(ip.src).is_none() {
            info!("Adding host {} to the topology", ip.src);
            let node = self
                .topology
                .switch(switch)
                .ok_or(ControllerError::SwitchNotFound(switch))?;
            self.topology.attach_host(node, pkt.in_port, ip.src);
        }

        let decision = match (Protocol::from_ip_proto(ip.protocol), pkt.dst_port) {
            (Some(proto), Some(dst_port)) => {
                if let Some(class) = TrafficClass::from_dst_port(dst_port) {
                    if ip.dst == BROADCAST_ADDR {
                        self.add_broadcast_slice(
                            dp_idx,
                            pkt.in_port,
                            ip.src,
                            ip.dst,
                            proto,
                            dst_port,
                            class,
                        )
                        .map(Some)
                    } else {
                        self.add_slice(dp_idx, ip.src, ip.dst, proto, dst_port, class)
                            .map(|(port, queue)| Some((OutPort::Port(port), queue)))
                    }
                } else if proto == Protocol::Udp && MULTICAST_PORT_RANGE.contains(&dst_port) {
                    // destinations are implied by the port. The aggregator recomputes the
                    // delivery groups on every hop and emits its own packet-out.
                    return self.add_multicast_flows(dp_idx, ip.src, dst_port, &pkt);
                } else {
                    self.add_ordinary_flow(dp_idx, pkt.in_port, ip.src, ip.dst)
                }
            }
            _ => self.add_ordinary_flow(dp_idx, pkt.in_port, ip.src, ip.dst),
        };

        match decision {
            Ok(Some((out, queue))) => {
                let dp = &self.datapaths[dp_idx];
                Self::packet_out(
                    dp,
                    &pkt,
                    vec![Action::SetQueue(queue), Action::Output(out)],
                );
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e @ (ControllerError::NoPath(_, _) | ControllerError::HostNotFound(_))) => {
                error!("No flows added on switch {}, dropping the packet: {}", switch, e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Process a failure signal for the given switch. Removing a switch that is already gone is a
    /// no-op, since failure signals may be delivered more than once.
    pub fn handle_switch_failure(&mut self, switch: SwitchId) {
        info!("--------- Failure handling switch {} ---------", switch);
        let Some(node) = self.topology.switch(switch) else {
            info!("Switch {} was already removed, dropping the signal", switch);
            return;
        };
        // each host hangs off exactly one switch, so its hosts disappear with it
        for host in self.topology.attached_hosts(node) {
            self.topology.remove_node(host);
        }
        self.fail_node(switch);
        if self.config.smart_failure {
            self.repopulate_switches(node, switch);
        }
        info!("--------- Failure handling over ---------");
    }

    /// Remove the switch from the topology, delete all flows from every switch and install the
    /// table-miss rule again. Afterwards it is as if the network had been reset without the
    /// failed switch.
    pub fn fail_node(&mut self, switch: SwitchId) {
        let Some(node) = self.topology.switch(switch) else {
            info!("Switch {} was already removed, dropping the signal", switch);
            return;
        };
        info!("Removing switch {} from the topology", switch);
        self.topology.remove_node(node);
        // every table is reset, whether the switch lies on an affected path or not. Determining
        // exactly which switches are affected is not attempted.
        for dp in &self.datapaths {
            info!("Removing all flows from switch {}", dp.id());
            dp.remove_all_flows();
            Self::install_table_miss(dp);
        }
    }

    /// Send all rules needed to reestablish the admitted flows on the new topology. Flows whose
    /// endpoint became unreachable are removed for good.
    fn repopulate_switches(&mut self, failed: NodeId, switch: SwitchId) {
        for record in self.slices.prune_unreachable(failed) {
            info!(
                "Permanently removing {}: its host behind switch {} became unreachable",
                record.fmt(&self.topology),
                switch
            );
        }

        // strict priority order. A class completes all of its rule installation before the next
        // one starts, to keep the outage window of mission-critical flows minimal.
        for class in TrafficClass::SLICED {
            let records = self.slices.take_class(class);
            let mut rebuilt = HashSet::with_capacity(records.len());
            for record in records {
                if record.path.contains(&failed) {
                    info!("Rerouting {}", record.fmt(&self.topology));
                }
                match self.reestablish_slice(&record) {
                    Ok(new_record) => {
                        rebuilt.insert(new_record);
                    }
                    Err(e) => {
                        error!(
                            "Dropping slice-flow {}: {}",
                            record.fmt(&self.topology),
                            e
                        );
                    }
                }
            }
            self.slices.replace_class(class, rebuilt);
        }
    }

    /// Reestablish a single slice flow: recompute the shortest path between its hosts and send
    /// the matching rule to every switch along the new path. Switches off the path receive
    /// nothing, their tables were already flushed.
    fn reestablish_slice(&self, record: &SliceFlow) -> Result<SliceFlow, ControllerError> {
        let src = self
            .topology
            .host(record.src)
            .ok_or(ControllerError::HostNotFound(record.src))?;
        let dst = self
            .topology
            .host(record.dst)
            .ok_or(ControllerError::HostNotFound(record.dst))?;
        let path = self.topology.shortest_path(src, dst, record.class)?;

        for dp in &self.datapaths {
            let Some(node) = self.topology.switch(dp.id()) else {
                continue;
            };
            let Some(next) = Topology::next_hop_after(&path, node) else {
                continue;
            };
            let out_port = self.topology.out_port(node, next)?;
            Self::install_port_flow(
                dp,
                record.protocol,
                record.dst_port,
                record.src,
                record.dst,
                vec![
                    Action::SetQueue(record.queue_id),
                    Action::Output(OutPort::Port(out_port)),
                ],
                record.priority,
            );
        }

        Ok(SliceFlow {
            path,
            ..record.clone()
        })
    }

    /// Admit a slice flow and install its rule on the triggering switch. Returns the output port
    /// towards the destination and the assigned queue.
    fn add_slice(
        &mut self,
        dp_idx: usize,
        src: Ipv4Addr,
        dst: Ipv4Addr,
        protocol: Protocol,
        dst_port: u16,
        class: TrafficClass,
    ) -> Result<(PortNo, QueueId), ControllerError> {
        let dpid = self.datapaths[dp_idx].id();
        let sw_node = self
            .topology
            .switch(dpid)
            .ok_or(ControllerError::SwitchNotFound(dpid))?;
        let dst_node = self
            .topology
            .host(dst)
            .ok_or(ControllerError::HostNotFound(dst))?;
        let src_node = self
            .topology
            .host(src)
            .ok_or(ControllerError::HostNotFound(src))?;

        // the path from this switch decides the rule's output port and queue
        let path = self.topology.shortest_path(sw_node, dst_node, class)?;
        let next = Topology::next_hop_after(&path, sw_node)
            .ok_or(ControllerError::NoPath(sw_node, dst_node))?;
        let out_port = self.topology.out_port(sw_node, next)?;
        let queue = self.config.queue_for(class);

        // the record stores the end-to-end path, so the flow can be reestablished later
        let src_path = self.topology.shortest_path(src_node, dst_node, class)?;
        let record = SliceFlow {
            src,
            dst,
            protocol,
            dst_port,
            queue_id: queue,
            class,
            path: src_path,
            priority: PRIO_SLICE,
        };
        if self.slices.admit(record.clone()) {
            info!("Adding new slice-flow {}", record.fmt(&self.topology));
        } else {
            info!(
                "Slice-flow {} already initialized, just adding the rule to switch {}",
                record.fmt(&self.topology),
                dpid
            );
        }

        Self::install_port_flow(
            &self.datapaths[dp_idx],
            protocol,
            dst_port,
            src,
            dst,
            vec![
                Action::SetQueue(queue),
                Action::Output(OutPort::Port(out_port)),
            ],
            PRIO_SLICE,
        );
        Ok((out_port, queue))
    }

    /// Install the flooding rule for a broadcast slice packet. Packets arriving from the host
    /// port get a fresh TTL, packets arriving from another switch decrement it. On switches named
    /// by the block table, the duplicate arriving over the second path is dropped and the flood
    /// is narrowed to the host port. No registry record is created for broadcast flows.
    fn add_broadcast_slice(
        &self,
        dp_idx: usize,
        in_port: PortNo,
        src: Ipv4Addr,
        dst: Ipv4Addr,
        protocol: Protocol,
        dst_port: u16,
        class: TrafficClass,
    ) -> Result<(OutPort, QueueId), ControllerError> {
        let dp = &self.datapaths[dp_idx];
        let queue = self.config.queue_for(class);
        let (out, actions) = self.broadcast_actions(dp, in_port, src, dst, queue, PRIO_SLICE + 1);
        Self::install_port_flow(dp, protocol, dst_port, src, dst, actions, PRIO_SLICE);
        Ok((out, queue))
    }

    /// Install the flooding rule for an ordinary broadcast packet, on the default queue.
    fn add_base_broadcast(
        &self,
        dp_idx: usize,
        in_port: PortNo,
        src: Ipv4Addr,
        dst: Ipv4Addr,
    ) -> Result<(OutPort, QueueId), ControllerError> {
        let dp = &self.datapaths[dp_idx];
        let (out, actions) =
            self.broadcast_actions(dp, in_port, src, dst, DEFAULT_QUEUE, PRIO_CALLBACK + 1);
        dp.install_flow(FlowMod::new(
            FlowMatch::ipv4().src(src).dst(dst),
            actions,
            PRIO_CALLBACK,
        ));
        Ok((out, DEFAULT_QUEUE))
    }

    /// The output and action list shared by both broadcast variants. Installs the block rule as a
    /// side effect where the block table applies.
    fn broadcast_actions(
        &self,
        dp: &D,
        in_port: PortNo,
        src: Ipv4Addr,
        dst: Ipv4Addr,
        queue: QueueId,
        block_priority: u16,
    ) -> (OutPort, Vec<Action>) {
        if in_port == HOST_PORT {
            // first hop. Bound the flood over the cycle with a fresh TTL.
            return (
                OutPort::Flood,
                vec![
                    Action::SetIpTtl(3),
                    Action::SetQueue(queue),
                    Action::Output(OutPort::Flood),
                ],
            );
        }
        let mut out = OutPort::Flood;
        if let Some(&blocked) = self.block_table.get(&(dp.id(), src)) {
            if self.topology.switch(blocked).is_some() {
                // the same frame also arrives over the second path. Drop that copy and deliver
                // only to the attached host.
                dp.install_flow(FlowMod::new(
                    FlowMatch::ipv4().src(src).dst(dst).in_port(BLOCKED_IN_PORT),
                    vec![],
                    block_priority,
                ));
                out = OutPort::Port(HOST_PORT);
            }
        }
        (
            out,
            vec![
                Action::DecIpTtl,
                Action::SetQueue(queue),
                Action::Output(out),
            ],
        )
    }

    /// Decide how to forward traffic that belongs to no slice. Returns `None` when the
    /// destination is unknown and the packet must be dropped.
    fn add_ordinary_flow(
        &self,
        dp_idx: usize,
        in_port: PortNo,
        src: Ipv4Addr,
        dst: Ipv4Addr,
    ) -> Result<Option<(OutPort, QueueId)>, ControllerError> {
        if dst == BROADCAST_ADDR {
            self.add_base_broadcast(dp_idx, in_port, src, dst).map(Some)
        } else if self.topology.host(dst).is_some() {
            self.add_base_flow(dp_idx, src, dst)
                .map(|(port, queue)| Some((OutPort::Port(port), queue)))
        } else {
            info!("Destination {} not known to the controller, dropping", dst);
            Ok(None)
        }
    }

    /// Install the best-effort path rule for one host pair, together with higher-priority
    /// send-to-controller rules for every slice port, so that future slice traffic between the
    /// same endpoints is still intercepted.
    fn add_base_flow(
        &self,
        dp_idx: usize,
        src: Ipv4Addr,
        dst: Ipv4Addr,
    ) -> Result<(PortNo, QueueId), ControllerError> {
        let dp = &self.datapaths[dp_idx];
        let dpid = dp.id();
        let sw_node = self
            .topology
            .switch(dpid)
            .ok_or(ControllerError::SwitchNotFound(dpid))?;
        let dst_node = self
            .topology
            .host(dst)
            .ok_or(ControllerError::HostNotFound(dst))?;
        let path = self
            .topology
            .shortest_path(sw_node, dst_node, TrafficClass::BestEffort)?;
        let next = Topology::next_hop_after(&path, sw_node)
            .ok_or(ControllerError::NoPath(sw_node, dst_node))?;
        let out_port = self.topology.out_port(sw_node, next)?;

        info!("Switch {}: adding base flow for src {} dst {}", dpid, src, dst);
        dp.install_flow(FlowMod::new(
            FlowMatch::ipv4().src(src).dst(dst),
            vec![
                Action::SetQueue(DEFAULT_QUEUE),
                Action::Output(OutPort::Port(out_port)),
            ],
            PRIO_BASE,
        ));

        debug!("Adding callback rules for the slice ports");
        for protocol in [Protocol::Udp, Protocol::Tcp] {
            for class in TrafficClass::SLICED {
                let Some(port) = class.well_known_port() else {
                    continue;
                };
                Self::install_port_flow(
                    dp,
                    protocol,
                    port,
                    src,
                    dst,
                    vec![Action::Output(OutPort::Controller)],
                    PRIO_CALLBACK,
                );
            }
        }
        Ok((out_port, DEFAULT_QUEUE))
    }

    /// Decode the multicast group port, aggregate the destinations per next-hop port and install
    /// the resulting redirection rule on the triggering switch, then send the packet out with the
    /// same actions.
    fn add_multicast_flows(
        &self,
        dp_idx: usize,
        src: Ipv4Addr,
        dst_port: u16,
        pkt: &PacketIn,
    ) -> Result<(), ControllerError> {
        let dp = &self.datapaths[dp_idx];
        let dpid = dp.id();
        let sw_node = self
            .topology
            .switch(dpid)
            .ok_or(ControllerError::SwitchNotFound(dpid))?;

        let destinations = multicast::decode_destinations(dst_port, &self.known_hosts);
        info!(
            "Adding multicast flow: src {}, destinations {}",
            src,
            destinations.iter().map(|d| d.to_string()).join(", ")
        );

        let mut groups = multicast::delivery_groups(&self.topology, sw_node, &destinations);
        multicast::resolve_ambiguous(&mut groups);

        let queue = self.config.multicast_queue();
        let mut actions = Vec::new();
        for (port, group) in groups.into_iter().sorted_by_key(|(port, _)| *port) {
            match group.len() {
                0 => continue,
                1 => {
                    let Some(&dst) = group.iter().next() else {
                        continue;
                    };
                    actions.extend([
                        Action::SetQueue(queue),
                        Action::SetIpv4Dst(dst),
                        Action::SetUdpDst(REDELIVERY_UDP_PORT),
                        Action::Output(OutPort::Port(port)),
                    ]);
                    info!("Delivering to {} over switch port {}", dst, port);
                }
                _ => {
                    let Some(group_port) = multicast::encode_group_port(&group) else {
                        error!("Cannot encode a group port for {:?}", group);
                        continue;
                    };
                    actions.extend([
                        Action::SetQueue(queue),
                        Action::SetUdpDst(group_port),
                        Action::Output(OutPort::Port(port)),
                    ]);
                    info!(
                        "Forwarding group port {} over switch port {}",
                        group_port, port
                    );
                }
            }
        }

        dp.install_flow(FlowMod::new(
            FlowMatch::ipv4().transport(Protocol::Udp, dst_port).src(src),
            actions.clone(),
            PRIO_SLICE,
        ));
        Self::packet_out(dp, pkt, actions);
        Ok(())
    }

    /// Install a rule matching protocol, destination port and the host pair.
    fn install_port_flow(
        dp: &D,
        protocol: Protocol,
        dst_port: u16,
        src: Ipv4Addr,
        dst: Ipv4Addr,
        actions: Vec<Action>,
        priority: u16,
    ) {
        dp.install_flow(FlowMod::new(
            FlowMatch::ipv4().transport(protocol, dst_port).src(src).dst(dst),
            actions,
            priority,
        ));
    }

    /// Install the match-all rule that sends unmatched packets to the controller.
    fn install_table_miss(dp: &D) {
        dp.install_flow(FlowMod::new(
            FlowMatch::any(),
            vec![Action::Output(OutPort::Controller)],
            PRIO_TABLE_MISS,
        ));
    }

    /// Send the original packet back to the switch to be forwarded. The payload travels along if
    /// the switch did not buffer the packet.
    fn packet_out(dp: &D, pkt: &PacketIn, actions: Vec<Action>) {
        let data = if pkt.buffer_id.is_none() {
            Some(pkt.data.clone())
        } else {
            None
        };
        dp.send_packet_out(PacketOut {
            buffer_id: pkt.buffer_id,
            in_port: pkt.in_port,
            actions,
            data,
        });
    }
}
