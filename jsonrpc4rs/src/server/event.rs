// event.rs
//
// The boot-ready signal (spec §5 "Graceful start signal"): capacity-1
// channel that receives a single value once the listener is live. A
// non-blocking send drops the signal if one is already buffered, so a
// slow or absent reader never stalls the server task.

use tokio::sync::mpsc;

pub type EventSender = mpsc::Sender<()>;
pub type EventReceiver = mpsc::Receiver<()>;

pub fn create_event_channel() -> (EventSender, EventReceiver) {
    mpsc::channel(1)
}

pub fn signal_ready(tx: &EventSender) {
    let _ = tx.try_send(());
}
