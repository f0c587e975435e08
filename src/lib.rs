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

#![deny(missing_docs, missing_debug_implementations)]

//! # NetSlice
//!
//! This is a library implementing the control-plane core of a slicing SDN controller. It
//! maintains a live model of the switch and host topology, computes paths for different traffic
//! classes, installs forwarding rules on remote switches, and reacts to link and switch failures
//! by withdrawing and recomputing affected routes. One-to-many traffic is aggregated into
//! per-next-hop delivery groups built from all equally short paths.
//!
//! ## Main Concepts
//!
//! The [`controller::Controller`] is the main datastructure to operate on. It owns the
//! [`topology::Topology`] (a directed graph over switches and hosts, see
//! [Petgraph](https://docs.rs/petgraph/latest/petgraph/index.html)) and the
//! [`slices::SliceRegistry`] of admitted traffic flows. The session layer that speaks the wire
//! protocol to the switches stays outside of this crate: it delivers parsed
//! [`event::PacketIn`] events, and receives commands through the [`datapath::Datapath`] trait,
//! one handle per connected switch.
//!
//! There is exactly one authoritative controller instance. All state mutation goes through
//! `&mut Controller`, so handing events from concurrently connected switches to the controller
//! through a single event loop (or one coarse lock) keeps the topology and the registry
//! consistent.
//!
//! ## Example usage
//!
//! ```
//! use netslice::prelude::*;
//! use std::net::Ipv4Addr;
//!
//! # #[derive(Debug)]
//! # struct Conn(SwitchId);
//! # impl Datapath for Conn {
//! #     fn id(&self) -> SwitchId { self.0 }
//! #     fn install_flow(&self, _: FlowMod) {}
//! #     fn remove_all_flows(&self) {}
//! #     fn send_packet_out(&self, _: PacketOut) {}
//! # }
//! fn main() -> Result<(), ControllerError> {
//!     // a controller over the reference topology: four switches in a cycle, one host each.
//!     let mut ctrl: Controller<Conn> = Controller::default();
//!
//!     // the session layer reports the switches as they connect.
//!     for id in 1..=4u64 {
//!         ctrl.on_switch_join(Conn(SwitchId(id)));
//!     }
//!
//!     // a latency-slice packet from h1 to h3 admits a slice flow and installs its rule.
//!     let h1 = Ipv4Addr::new(10, 0, 0, 1);
//!     let h3 = Ipv4Addr::new(10, 0, 0, 3);
//!     ctrl.on_packet_in(SwitchId(1), PacketIn::udp(2, h1, h3, 10022))?;
//!     assert_eq!(ctrl.slices().class(TrafficClass::Latency).len(), 1);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod controller;
pub mod datapath;
pub mod event;
#[cfg(not(tarpaulin_include))]
pub mod formatter;
pub mod multicast;
pub mod prelude;
pub mod slices;
pub mod topology;
pub mod types;

#[cfg(test)]
#[cfg(not(tarpaulin_include))]
mod test;
