//! A crate to discover and talk to EMV payment applications through an APDU delegate.
//!
//! The card is reached through a [`Transport`] implementation, wrapped in a [`Card`] that frames
//! the commands, checks the status words and collects the replies into a [`TlvDb`].

#![cfg_attr(not(feature = "tracing"), allow(unused_imports, unused_variables))]

#[cfg(not(feature = "tracing"))]
#[macro_use]
mod trace;

#[cfg(feature = "pcsc")]
pub mod pcsc;

pub mod aid;
pub mod apdu;
pub mod card;
pub mod config;
pub mod dump;
pub mod nfc;
pub mod search;
pub mod select;
pub mod tags;
pub mod tlv;
pub mod track2;

pub use card::Card;
pub use config::Config;
pub use nfc::{Transport, TransportError};
pub use tlv::{Tag, TlvDb};
