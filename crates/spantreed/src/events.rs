//! Controller event queue.
//!
//! All mutation funnels through one mpsc channel with one consumer
//! task. Switch-connect, link, and packet-in events are serialized, so
//! no two reconciliations ever overlap and no locking is needed around
//! the controller state. Producers (transport and discovery
//! integrations) only ever hold an [`EventSender`].

use crate::controller::TreeController;
use spantree_types::{Dpid, LinkEvent, PortNo};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Events consumed by the controller loop.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// A switch connection came up.
    SwitchUp(Dpid),
    /// A switch connection went away.
    SwitchDown(Dpid),
    /// A discovery link report.
    Link(LinkEvent),
    /// A packet handed up by a switch.
    PacketIn {
        dpid: Dpid,
        in_port: PortNo,
        buffer_id: Option<u32>,
        data: Vec<u8>,
        is_control_frame: bool,
    },
    /// Stop the loop after the events already queued.
    Shutdown,
}

/// Sending half of the controller event queue.
pub type EventSender = mpsc::UnboundedSender<ControllerEvent>;

/// Receiving half of the controller event queue.
pub type EventReceiver = mpsc::UnboundedReceiver<ControllerEvent>;

/// Creates the controller event channel.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Runs the single-consumer event loop until `Shutdown` or until every
/// sender is dropped.
///
/// Each event is handled to completion before the next one is taken;
/// in particular a reconcile sweep is never preempted, so every switch
/// observes a globally consistent tree snapshot.
pub async fn run_event_loop(mut controller: TreeController, mut rx: EventReceiver) -> TreeController {
    info!("controller event loop started");

    while let Some(event) = rx.recv().await {
        debug!(?event, "handling event");
        match event {
            ControllerEvent::SwitchUp(dpid) => controller.on_switch_connect(dpid),
            ControllerEvent::SwitchDown(dpid) => controller.on_switch_disconnect(dpid),
            ControllerEvent::Link(link_event) => controller.on_link_event(link_event),
            ControllerEvent::PacketIn {
                dpid,
                in_port,
                buffer_id,
                data,
                is_control_frame,
            } => {
                controller.on_packet_in(dpid, in_port, buffer_id, data, is_control_frame);
            }
            ControllerEvent::Shutdown => break,
        }
    }

    info!("controller event loop stopped");
    controller
}
