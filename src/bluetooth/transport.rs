/// Capability the poller needs from the Bluetooth stack
use crate::error::TransportError;

/// Connect / read / write / disconnect on numbered GATT characteristics.
///
/// All methods take `&self` so an operation can be re-issued from a retry
/// loop while the session stays borrowed. `disconnect` consumes the
/// session; it is expected to log rather than fail.
#[allow(async_fn_in_trait)]
pub trait Transport {
    type Session;

    async fn connect(&self, address: &str, adapter: &str)
        -> Result<Self::Session, TransportError>;

    async fn read_characteristic(
        &self,
        session: &Self::Session,
        handle: u16,
    ) -> Result<Vec<u8>, TransportError>;

    async fn write_characteristic(
        &self,
        session: &Self::Session,
        handle: u16,
        value: &[u8],
        wait_for_response: bool,
    ) -> Result<(), TransportError>;

    async fn disconnect(&self, session: Self::Session);
}
