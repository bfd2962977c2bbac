use std::rc::Rc;

use crate::events::{ListenerId, NodeEvent, ObservesLocalMutation};
use crate::node::NodeCore;
use crate::wire::{Argument, Peer};

/// Stateless leaf that triggers an action on the device.
///
/// Local invocations are announced as [`NodeEvent::LocalCall`] and forwarded
/// to the peer by a monitoring dispatcher; inbound invocations surface as
/// [`NodeEvent::RemoteCall`].
#[derive(Default)]
pub struct Command {
    core: NodeCore,
}

impl Command {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn core(&self) -> &NodeCore {
        &self.core
    }

    pub fn call(&self, args: Vec<Argument>) {
        self.core.emit(&NodeEvent::LocalCall { args });
    }

    pub fn handle_call(&self, peer: Option<&Peer>, args: &[Argument]) {
        self.core.emit(&NodeEvent::RemoteCall {
            args: args.to_vec(),
            peer: peer.cloned(),
        });
    }
}

impl ObservesLocalMutation for Command {
    fn on_local_mutation(&self, listener: Rc<dyn Fn(&[Argument])>) -> ListenerId {
        self.core.on(move |event| {
            if let NodeEvent::LocalCall { args } = event {
                listener(args);
            }
        })
    }

    fn off_local_mutation(&self, id: ListenerId) -> bool {
        self.core.off(id)
    }
}
