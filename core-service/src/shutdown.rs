//! Cooperative shutdown for the run loops

use tokio::sync::watch;

/// Owner side; dropping it also counts as shutdown
#[derive(Debug)]
pub struct Shutdown {
    sender: watch::Sender<bool>,
}

/// Cloneable listener handed to each loop
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once shutdown is triggered or the owner is dropped
    pub async fn wait(&mut self) {
        // An Err means the sender is gone, which is shutdown as well
        let _ = self.receiver.wait_for(|stop| *stop).await;
    }
}
