//! APDU commands and responses exchanged with the card

use std::fmt::{Display, Formatter};

pub const CLA_DEFAULT: u8 = 0x00;
pub const CLA_PROPRIETARY: u8 = 0x80;

/// Instruction codes of the commands this crate sends.
pub mod ins {
    pub const SELECT: u8 = 0xA4;
    pub const READ_RECORD: u8 = 0xB2;
    pub const GET_PROCESSING_OPTIONS: u8 = 0xA8;
    pub const GENERATE_AC: u8 = 0xAE;
    pub const GET_CHALLENGE: u8 = 0x84;
    pub const COMPUTE_CRYPTOGRAPHIC_CHECKSUM: u8 = 0x2A;
}

/// Longest payload a short command can carry.
pub const MAX_PAYLOAD: usize = 255;

const SELECT_P1_BY_NAME: u8 = 0x04;
const SELECT_P2_FIRST: u8 = 0x00;

/// An APDU command to be transmitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    cla: u8,
    ins: u8,
    p1: u8,
    p2: u8,
    payload: Vec<u8>,
}

impl Command {
    /// Constructs a command with CLA, INS, P1, and P2.
    /// No payload will be transmitted.
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self::new_with_payload(cla, ins, p1, p2, Vec::new())
    }

    /// Constructs a command with CLA, INS, P1, P2, and a payload.
    /// A payload over [`MAX_PAYLOAD`] octets can't be framed, see [`Command::is_framable`].
    pub fn new_with_payload(cla: u8, ins: u8, p1: u8, p2: u8, payload: Vec<u8>) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            payload,
        }
    }

    /// Constructs a `SELECT` command choosing an application by its name.
    pub fn select(aid: &[u8]) -> Self {
        Self::new_with_payload(
            CLA_DEFAULT,
            ins::SELECT,
            SELECT_P1_BY_NAME,
            SELECT_P2_FIRST,
            aid.to_vec(),
        )
    }

    pub fn cla(&self) -> u8 {
        self.cla
    }

    pub fn ins(&self) -> u8 {
        self.ins
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Whether the payload fits in the single octet of Lc.
    pub fn is_framable(&self) -> bool {
        self.payload.len() <= MAX_PAYLOAD
    }

    /// Converts the command into octets. The command must be framable.
    /// Lc is always present, and an Le of zero asks for as many octets as the card has.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(6 + self.payload.len());

        buffer.extend([self.cla, self.ins, self.p1, self.p2]);
        buffer.push(self.payload.len() as u8);
        buffer.extend_from_slice(&self.payload);
        buffer.push(0x00);

        buffer
    }
}

/// A status word (SW1 SW2) that ends every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct StatusWord(pub u16);

impl StatusWord {
    pub const OK: Self = Self(0x9000);

    pub fn new(sw1: u8, sw2: u8) -> Self {
        Self(u16::from_be_bytes([sw1, sw2]))
    }

    pub fn sw1(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn sw2(self) -> u8 {
        self.0 as u8
    }

    /// Only `9000` counts as success; warnings are failures as much as errors are.
    pub fn is_ok(self) -> bool {
        self == Self::OK
    }

    /// Gives the ISO 7816-4 meaning of the status word.
    pub fn description(self) -> &'static str {
        match (self.sw1(), self.sw2()) {
            (0x90, 0x00) => "Command successfully executed",
            (0x61, _) => "Response bytes still available",
            (0x62, 0x81) => "Part of returned data may be corrupted",
            (0x62, 0x82) => "End of file or record reached before reading Le bytes",
            (0x62, 0x83) => "Selected file invalidated",
            (0x62, 0x84) => "FCI not formatted according to ISO 7816-4",
            (0x62, _) => "State of non-volatile memory unchanged",
            (0x63, 0xC0..=0xCF) => "Verification failed, counter shows retries left",
            (0x63, _) => "State of non-volatile memory changed",
            (0x64, _) => "Execution error, state of non-volatile memory unchanged",
            (0x65, 0x81) => "Memory failure",
            (0x65, _) => "Execution error, state of non-volatile memory changed",
            (0x67, 0x00) => "Wrong length",
            (0x68, 0x81) => "Logical channel not supported",
            (0x68, 0x82) => "Secure messaging not supported",
            (0x68, _) => "Functions in CLA not supported",
            (0x69, 0x82) => "Security status not satisfied",
            (0x69, 0x83) => "Authentication method blocked",
            (0x69, 0x84) => "Referenced data invalidated",
            (0x69, 0x85) => "Conditions of use not satisfied",
            (0x69, 0x86) => "Command not allowed (no current EF)",
            (0x69, _) => "Command not allowed",
            (0x6A, 0x80) => "Incorrect parameters in the data field",
            (0x6A, 0x81) => "Function not supported",
            (0x6A, 0x82) => "File or application not found",
            (0x6A, 0x83) => "Record not found",
            (0x6A, 0x84) => "Not enough memory space in the file",
            (0x6A, 0x86) => "Incorrect parameters P1-P2",
            (0x6A, 0x88) => "Referenced data not found",
            (0x6A, _) => "Wrong parameters P1-P2",
            (0x6B, 0x00) => "Wrong parameters P1-P2",
            (0x6C, _) => "Wrong Le field, SW2 gives the exact length",
            (0x6D, 0x00) => "Instruction code not supported or invalid",
            (0x6E, 0x00) => "Class not supported",
            (0x6F, 0x00) => "No precise diagnosis",
            _ => "Unknown status word",
        }
    }
}

impl Display for StatusWord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}

/// A response that was received from the card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    payload: Vec<u8>,
    status: StatusWord,
}

impl Response {
    /// Parses a response from the octets, splitting off the trailing status word.
    /// Gives nothing if there are fewer than 2 octets.
    pub fn from_bytes(mut bytes: Vec<u8>) -> Option<Self> {
        let sw2 = bytes.pop()?;
        let sw1 = bytes.pop()?;

        Some(Self {
            payload: bytes,
            status: StatusWord::new(sw1, sw2),
        })
    }

    /// Determines whether the response indicates success or not.
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    pub fn status(&self) -> StatusWord {
        self.status
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn test_select_frame() {
        assert_eq!(
            Command::select(b"2PAY.SYS.DDF01").to_bytes(),
            hex!("00A40400 0E 325041592E5359532E4444463031 00").to_vec(),
        );
    }

    #[test]
    fn test_frame_without_payload() {
        assert_eq!(
            Command::new(CLA_DEFAULT, ins::GET_CHALLENGE, 0x00, 0x00).to_bytes(),
            hex!("00840000 00 00").to_vec(),
        );
    }

    #[test]
    fn test_framable_payload() {
        let command = Command::new_with_payload(
            CLA_PROPRIETARY,
            ins::GET_PROCESSING_OPTIONS,
            0x00,
            0x00,
            vec![0xAA; MAX_PAYLOAD],
        );
        assert!(command.is_framable());
        assert_eq!(command.to_bytes()[4], 0xFF);
        assert_eq!(command.to_bytes().len(), MAX_PAYLOAD + 6);

        let command = Command::new_with_payload(
            CLA_PROPRIETARY,
            ins::GET_PROCESSING_OPTIONS,
            0x00,
            0x00,
            vec![0xAA; MAX_PAYLOAD + 1],
        );
        assert!(!command.is_framable());
    }

    #[test]
    fn test_response_split() {
        let response = Response::from_bytes(hex!("6F00 9000").to_vec()).unwrap();
        assert!(response.is_ok());
        assert_eq!(response.payload(), &hex!("6F00"));

        let response = Response::from_bytes(hex!("6A82").to_vec()).unwrap();
        assert!(!response.is_ok());
        assert!(response.payload().is_empty());
        assert_eq!(response.status(), StatusWord(0x6A82));

        assert!(Response::from_bytes(vec![0x90]).is_none());
    }

    #[test]
    fn test_status_word() {
        let sw = StatusWord::new(0x62, 0x83);
        assert_eq!(sw.to_string(), "6283");
        assert_eq!(sw.sw1(), 0x62);
        assert_eq!(sw.sw2(), 0x83);
        assert!(!sw.is_ok());
        assert!(!StatusWord(0x9100).is_ok());
        assert_eq!(
            StatusWord(0x6A82).description(),
            "File or application not found"
        );
        assert_eq!(StatusWord(0x1234).description(), "Unknown status word");
    }
}
