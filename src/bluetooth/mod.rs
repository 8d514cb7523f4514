pub mod bluez;
pub mod decoder;
#[cfg(test)]
pub mod mock;
pub mod poller;
pub mod retry;
pub mod transport;

pub use bluez::BluerTransport;
pub use poller::MiFloraPoller;
pub use transport::Transport;
