use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

pub(crate) fn shutdown_signal() -> (P4rtServerShutdownHandle, P4rtServerShutdownSignal) {
    let (tx, rx) = oneshot::channel();

    (P4rtServerShutdownHandle { tx }, P4rtServerShutdownSignal { rx })
}

/// Stops the server when `shutdown()` is called or when dropped.
pub(crate) struct P4rtServerShutdownHandle {
    tx: oneshot::Sender<()>,
}

impl P4rtServerShutdownHandle {
    pub(crate) fn shutdown(self) {
        // Receiver is gone if the server already exited.
        let _ = self.tx.send(());
    }
}

pub(crate) struct P4rtServerShutdownSignal {
    rx: oneshot::Receiver<()>,
}

impl Future for P4rtServerShutdownSignal {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|_| ())
    }
}
