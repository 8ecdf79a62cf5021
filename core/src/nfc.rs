//! Communicating with the card using NFC technology

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The card could not be selected on the air interface. There is no card to talk to any
    /// more, so discovery stops as soon as this is seen.
    #[error("No card could be selected in the field")]
    CardSelect,

    #[error("Timed out while waiting for the card to respond")]
    Timeout,

    #[error("The reply of {0} octets is too short to carry a status word")]
    Truncated(usize),

    #[error("Error occurred while communicating with the reader: {0}")]
    Reader(String),
}

impl TransportError {
    /// Whether the error aborts a whole discovery instead of only the current candidate.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::CardSelect)
    }
}

/// A delegate that carries frames between this crate and the card.
///
/// Implementations own the RF field: a transmission with `activate_field` set must bring the
/// field up and select the card first, and one without `leave_field_on` must drop the field once
/// the reply has been received.
pub trait Transport {
    /// Transmits the frame to the card, then receives the raw reply including the status word.
    fn transmit(
        &mut self,
        frame: &[u8],
        activate_field: bool,
        leave_field_on: bool,
    ) -> Result<Vec<u8>, TransportError>;

    /// Drops the RF field. Must be harmless when the field is already off.
    fn drop_field(&mut self);
}

impl<T> Transport for Box<T>
where
    T: Transport + ?Sized,
{
    fn transmit(
        &mut self,
        frame: &[u8],
        activate_field: bool,
        leave_field_on: bool,
    ) -> Result<Vec<u8>, TransportError> {
        (**self).transmit(frame, activate_field, leave_field_on)
    }

    fn drop_field(&mut self) {
        (**self).drop_field()
    }
}
