use crate::apdu::{ins, Command, Response, CLA_DEFAULT, CLA_PROPRIETARY};
use crate::aid::Directory;
use crate::config::Config;
use crate::nfc::{Transport, TransportError};
use crate::tlv::TlvDb;

#[cfg(feature = "tracing")]
use tracing::{info, warn};

const READ_RECORD_P2_SFI: u8 = 0x04;

const CRYPTO_CHECKSUM_P1: u8 = 0x8E;
const CRYPTO_CHECKSUM_P2: u8 = 0x80;

/// Reference control parameters (P1) of `GENERATE AC`.
pub mod ac {
    /// Application Authentication Cryptogram: declines the transaction.
    pub const AAC: u8 = 0x00;

    /// Transaction Certificate: approves the transaction offline.
    pub const TC: u8 = 0x40;

    /// Authorisation Request Cryptogram: asks to go online.
    pub const ARQC: u8 = 0x80;

    /// Requests a combined DDA / application cryptogram signature.
    pub const CDA: u8 = 0x10;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("The card returned an error {} ({})", .0.status(), .0.status().description())]
    Status(Response),

    #[error("A payload of {0} octets does not fit in a command")]
    PayloadTooLong(usize),
}

impl Error {
    /// Whether the error must abort a discovery in progress.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_fatal())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// An adapter to communicate with the card through the delegate
pub struct Card<T>
where
    T: Transport,
{
    delegate: T,
    config: Config,
}

impl<T> Card<T>
where
    T: Transport,
{
    /// Initiates an adapter with the delegate and the default settings.
    pub fn new(delegate: T) -> Self {
        Self::with_config(delegate, Config::default())
    }

    /// Initiates an adapter with the delegate and the settings.
    pub fn with_config(delegate: T, config: Config) -> Self {
        Self { delegate, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Gives the delegate back.
    pub fn into_inner(self) -> T {
        self.delegate
    }

    /// Drops the RF field.
    pub fn drop_field(&mut self) {
        self.delegate.drop_field()
    }

    /// Sends the command and receives the response.
    ///
    /// With `activate_field` the field is reset first, so the command starts a new session.
    /// A response other than `9000` is an [`Error::Status`] that still carries the payload.
    /// A command with a payload too long to frame is refused before anything is transmitted.
    /// On success a non-empty payload is parsed and appended to `tlv`, if given.
    pub fn exchange_ex(
        &mut self,
        activate_field: bool,
        leave_field_on: bool,
        command: &Command,
        tlv: Option<&mut TlvDb>,
    ) -> Result<Response> {
        if !command.is_framable() {
            return Err(Error::PayloadTooLong(command.payload().len()));
        }

        if activate_field {
            self.delegate.drop_field();
        }

        let frame = command.to_bytes();
        if self.config.apdu_logging {
            info!(">>>> {}", hex::encode_upper(&frame));
        }

        let rx = self
            .delegate
            .transmit(&frame, activate_field, leave_field_on)?;

        if self.config.apdu_logging {
            info!("<<<< {}", hex::encode_upper(&rx));
        }

        let length = rx.len();
        let response = Response::from_bytes(rx).ok_or(TransportError::Truncated(length))?;

        if !response.is_ok() {
            if self.config.apdu_logging {
                info!(
                    "APDU({:02X}{:02X}) ERROR: [{}] {}",
                    command.cla(),
                    command.ins(),
                    response.status(),
                    response.status().description(),
                );
            }

            return Err(Error::Status(response));
        }

        if let Some(tlv) = tlv {
            if !response.payload().is_empty() {
                match TlvDb::parse_multi(response.payload()) {
                    Ok(parsed) => tlv.add(parsed),
                    Err(e) => {
                        warn!("Can't parse response as TLV tree: {}", e);
                    }
                }
            }
        }

        Ok(response)
    }

    /// Sends the command within the current session.
    pub fn exchange(
        &mut self,
        leave_field_on: bool,
        command: &Command,
        tlv: Option<&mut TlvDb>,
    ) -> Result<Response> {
        self.exchange_ex(false, leave_field_on, command, tlv)
    }

    /// Selects an application with its AID.
    pub fn select(
        &mut self,
        activate_field: bool,
        leave_field_on: bool,
        aid: &[u8],
        tlv: Option<&mut TlvDb>,
    ) -> Result<Response> {
        self.exchange_ex(activate_field, leave_field_on, &Command::select(aid), tlv)
    }

    /// Selects one of the directory applications.
    pub fn select_pse(
        &mut self,
        activate_field: bool,
        leave_field_on: bool,
        directory: Directory,
    ) -> Result<Response> {
        self.select(activate_field, leave_field_on, directory.name(), None)
    }

    /// Sends `GET PROCESSING OPTIONS` with the PDOL data.
    pub fn gpo(
        &mut self,
        leave_field_on: bool,
        pdol: &[u8],
        tlv: Option<&mut TlvDb>,
    ) -> Result<Response> {
        let command = Command::new_with_payload(
            CLA_PROPRIETARY,
            ins::GET_PROCESSING_OPTIONS,
            0x00,
            0x00,
            pdol.to_vec(),
        );

        self.exchange(leave_field_on, &command, tlv)
    }

    /// Reads the record from the file with the short file identifier.
    pub fn read_record(
        &mut self,
        leave_field_on: bool,
        sfi: u8,
        record: u8,
        tlv: Option<&mut TlvDb>,
    ) -> Result<Response> {
        let command = Command::new(
            CLA_DEFAULT,
            ins::READ_RECORD,
            record,
            (sfi << 3) | READ_RECORD_P2_SFI,
        );

        self.exchange(leave_field_on, &command, tlv)
    }

    /// Sends `GENERATE AC` with the CDOL data. See [`ac`] for the reference control values.
    pub fn generate_ac(
        &mut self,
        leave_field_on: bool,
        reference_control: u8,
        cdol: &[u8],
        tlv: Option<&mut TlvDb>,
    ) -> Result<Response> {
        let command = Command::new_with_payload(
            CLA_PROPRIETARY,
            ins::GENERATE_AC,
            reference_control,
            0x00,
            cdol.to_vec(),
        );

        self.exchange(leave_field_on, &command, tlv)
    }

    /// Asks the card for an unpredictable number.
    pub fn generate_challenge(
        &mut self,
        leave_field_on: bool,
        tlv: Option<&mut TlvDb>,
    ) -> Result<Response> {
        let command = Command::new(CLA_DEFAULT, ins::GET_CHALLENGE, 0x00, 0x00);

        self.exchange(leave_field_on, &command, tlv)
    }

    /// Sends the magnetic-stripe mode `COMPUTE CRYPTOGRAPHIC CHECKSUM` with the UDOL data.
    pub fn compute_crypto_checksum(
        &mut self,
        leave_field_on: bool,
        udol: &[u8],
        tlv: Option<&mut TlvDb>,
    ) -> Result<Response> {
        let command = Command::new_with_payload(
            CLA_PROPRIETARY,
            ins::COMPUTE_CRYPTOGRAPHIC_CHECKSUM,
            CRYPTO_CHECKSUM_P1,
            CRYPTO_CHECKSUM_P2,
            udol.to_vec(),
        );

        self.exchange(leave_field_on, &command, tlv)
    }
}
