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

//! Test helpers shared by all test modules.

use std::{cell::RefCell, rc::Rc};

use crate::{
    config::{ControllerConfig, StaticTopology},
    controller::Controller,
    datapath::{Datapath, FlowMod, PacketOut},
    types::SwitchId,
};

mod test_multicast;
mod test_slices;
mod test_topology;

/// One command issued by the controller, as seen by a [`MockDatapath`].
#[derive(Debug, Clone, PartialEq)]
pub(self) enum Command {
    /// A flow was installed on the switch.
    Install(SwitchId, FlowMod),
    /// All flows were removed from the switch.
    Flush(SwitchId),
    /// A packet was sent out of the switch.
    PacketOut(SwitchId, PacketOut),
}

/// A datapath that records every issued command into a log shared by all datapaths of the test,
/// so that global command ordering can be asserted.
#[derive(Debug, Clone)]
pub(self) struct MockDatapath {
    id: SwitchId,
    log: Rc<RefCell<Vec<Command>>>,
}

impl MockDatapath {
    pub(self) fn new(id: impl Into<SwitchId>, log: &Rc<RefCell<Vec<Command>>>) -> Self {
        Self {
            id: id.into(),
            log: log.clone(),
        }
    }
}

impl Datapath for MockDatapath {
    fn id(&self) -> SwitchId {
        self.id
    }

    fn install_flow(&self, flow: FlowMod) {
        self.log.borrow_mut().push(Command::Install(self.id, flow));
    }

    fn remove_all_flows(&self) {
        self.log.borrow_mut().push(Command::Flush(self.id));
    }

    fn send_packet_out(&self, pkt: PacketOut) {
        self.log.borrow_mut().push(Command::PacketOut(self.id, pkt));
    }
}

/// A controller over the reference ring with all four switches joined, together with the shared
/// command log. The log is cleared after the joins.
pub(self) fn ring_controller(
    config: ControllerConfig,
) -> (Controller<MockDatapath>, Rc<RefCell<Vec<Command>>>) {
    controller_for(config, &StaticTopology::reference_ring())
}

/// A controller over an arbitrary static topology with all its switches joined, together with
/// the shared command log. The log is cleared after the joins.
pub(self) fn controller_for(
    config: ControllerConfig,
    topo: &StaticTopology,
) -> (Controller<MockDatapath>, Rc<RefCell<Vec<Command>>>) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut ctrl = Controller::new(config, topo);
    for switch in &topo.switches {
        ctrl.on_switch_join(MockDatapath::new(switch, &log));
    }
    log.borrow_mut().clear();
    (ctrl, log)
}
