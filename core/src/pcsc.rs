//! PC/SC transport for the emv library.
//! Can be enabled by turning `pcsc` feature on.
//!
//! ## What is PC/SC?
//! PC/SC (Personal Computer/Smart Card) is an abstraction layer for communicating with Smart Cards
//! from Windows. Using this layer, applications can connect to any devices that supports PC/SC,
//! without depending on their driver implementation. Windows and macOS supports PC/SC by themselves,
//! Linux also supports by installing pcsc-lite shared library.
//!
//! Contactless readers expose the card in their field as an ordinary PC/SC card, so the field
//! is driven by powering the card up and down.
//!
//! ## Usage
//! ```rust,no_run
//! use emv::{Card, TlvDb};
//! use emv::pcsc::Context;
//!
//! let ctx = Context::try_new().unwrap();
//! let device = ctx.open().unwrap();
//! let pcsc_card = device.connect(&ctx).unwrap();
//!
//! let mut card = Card::new(pcsc_card);
//! let mut tlv = TlvDb::new();
//! let found = card.search(true, false, false, &mut tlv).unwrap();
//! ```

use std::ffi::{CStr, CString};
use std::thread::sleep;
use std::time::Duration;

use pcsc::{Disposition, Protocols, Scope, ShareMode, MAX_BUFFER_SIZE};

#[cfg(feature = "tracing")]
use tracing::{debug, info, warn};

use crate::nfc::{Transport, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Error occurred while communicating with PC/SC: {0}")]
    PcscError(#[from] pcsc::Error),

    #[error("Reader not found on PC/SC service")]
    ReaderNotFound,
}

pub(crate) type Result<T> = std::result::Result<T, Error>;

/// PC/SC context.
pub struct Context {
    ctx: pcsc::Context,
}

impl Context {
    /// Creates a PC/SC context in user scope.
    pub fn try_new() -> Result<Self> {
        Ok(Self {
            ctx: pcsc::Context::establish(Scope::User).map_err(Error::PcscError)?,
        })
    }

    /// Finds a PC/SC device, then opens a connection to them.
    pub fn open(&self) -> Result<Device> {
        let mut buf = [0u8; 2048];

        Ok(Device::new(
            self.ctx
                .list_readers(&mut buf)
                .map_err(Error::PcscError)?
                .next()
                .ok_or(Error::ReaderNotFound)?,
        ))
    }
}

/// PC/SC device handle.
pub struct Device {
    reader: CString,
}

impl Device {
    fn new(reader: &CStr) -> Self {
        debug!("Using device: {}", reader.to_str().unwrap_or_default());

        Self {
            reader: reader.to_owned(),
        }
    }

    /// Connects to the card put on the device after waiting them.
    pub fn connect(&self, ctx: &Context) -> Result<PcscCard> {
        // Waits for touching card, polling for each seconds.
        debug!("Waiting for a card");

        loop {
            match ctx
                .ctx
                .connect(&self.reader, ShareMode::Shared, Protocols::ANY)
            {
                Ok(card) => {
                    debug!("Connected to your card");

                    return Ok(PcscCard::new(card));
                }
                Err(e) => match e {
                    pcsc::Error::NoSmartcard => {
                        info!("Still waiting for your card...");
                        sleep(Duration::from_secs(1));

                        continue;
                    }
                    _ => return Err(Error::PcscError(e)),
                },
            }
        }
    }
}

/// A card to be communicated through PC/SC.
pub struct PcscCard {
    card: pcsc::Card,
    powered: bool,
}

impl PcscCard {
    fn new(card: pcsc::Card) -> Self {
        Self {
            card,
            powered: true,
        }
    }
}

impl From<pcsc::Error> for TransportError {
    fn from(e: pcsc::Error) -> Self {
        match e {
            pcsc::Error::NoSmartcard | pcsc::Error::RemovedCard => Self::CardSelect,
            pcsc::Error::Timeout => Self::Timeout,
            e => Self::Reader(e.to_string()),
        }
    }
}

impl Transport for PcscCard {
    fn transmit(
        &mut self,
        frame: &[u8],
        activate_field: bool,
        leave_field_on: bool,
    ) -> std::result::Result<Vec<u8>, TransportError> {
        if activate_field {
            debug!("Activating the field");
        }

        debug!("TX: {}", hex::encode(frame));

        let mut rx = [0u8; MAX_BUFFER_SIZE];
        let rx = self.card.transmit(frame, &mut rx)?.to_vec();
        self.powered = true;

        debug!("RX: {}", hex::encode(&rx));

        if !leave_field_on {
            self.drop_field();
        }

        Ok(rx)
    }

    fn drop_field(&mut self) {
        if !self.powered {
            return;
        }

        // The card is powered up again on reconnection, in a fresh session.
        if let Err(e) =
            self.card
                .reconnect(ShareMode::Shared, Protocols::ANY, Disposition::UnpowerCard)
        {
            warn!("Can't reset the card: {}", e);
        }

        self.powered = false;
    }
}
