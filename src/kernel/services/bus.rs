use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use crate::kernel::bridge::RuntimeEvent;

#[derive(Debug)]
pub enum KernelMessage {
    Runtime(RuntimeEvent),
    LocaleApplied {
        locale: String,
        refresh_workspace: bool,
    },
}

#[derive(Clone)]
pub struct KernelBusSender {
    tx: Sender<KernelMessage>,
}

pub struct KernelBusReceiver {
    rx: Receiver<KernelMessage>,
}

pub fn kernel_bus() -> (KernelBusSender, KernelBusReceiver) {
    let (tx, rx) = mpsc::channel();
    (KernelBusSender { tx }, KernelBusReceiver { rx })
}

impl KernelBusSender {
    pub fn send(&self, msg: KernelMessage) -> Result<(), mpsc::SendError<KernelMessage>> {
        self.tx.send(msg)
    }

    pub fn send_event(&self, event: RuntimeEvent) -> Result<(), mpsc::SendError<KernelMessage>> {
        self.send(KernelMessage::Runtime(event))
    }
}

impl std::fmt::Debug for KernelBusSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelBusSender").finish_non_exhaustive()
    }
}

impl KernelBusReceiver {
    pub fn try_recv(&mut self) -> Result<KernelMessage, TryRecvError> {
        self.rx.try_recv()
    }
}
