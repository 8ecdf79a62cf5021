//! Discovery of the payment applications on a card.
//!
//! Two strategies are offered: reading the directory of a PSE/PPSE, and trying every AID of
//! [`KNOWN_AIDS`] in turn. Both merge the reply of every application they manage to select into
//! the tree given by the caller, and both skip a failing candidate instead of giving up, unless
//! the card disappears from the field.

use crate::aid::{Directory, KNOWN_AIDS};
use crate::apdu::Response;
use crate::card::{Card, Error, Result};
use crate::dump::Dump;
use crate::nfc::{Transport, TransportError};
use crate::tags;
use crate::tlv::TlvDb;

#[cfg(feature = "tracing")]
use tracing::{debug, error, info, warn};

/// Outcome of one candidate after [`attempt`].
#[derive(Debug)]
pub enum Attempt {
    /// The card answered `9000`.
    Selected(Response),

    /// The card answered with an error status word. Not retried.
    Rejected(Response),

    /// The command could not be framed. Not retried.
    Unframable(usize),

    /// Every attempt failed in the transport.
    Exhausted(TransportError),

    /// The transport failed in a way that ends the whole discovery.
    Fatal(TransportError),
}

/// Runs `f` until it gets an answer from the card, at most `max_attempts` times.
/// Only recoverable transport failures are retried.
pub fn attempt<F>(max_attempts: u8, mut f: F) -> Attempt
where
    F: FnMut() -> Result<Response>,
{
    let mut attempts = 1;

    loop {
        match f() {
            Ok(response) => return Attempt::Selected(response),
            Err(Error::Status(response)) => return Attempt::Rejected(response),
            Err(Error::PayloadTooLong(length)) => return Attempt::Unframable(length),
            Err(Error::Transport(e)) if e.is_fatal() => return Attempt::Fatal(e),
            Err(Error::Transport(e)) if attempts >= max_attempts => return Attempt::Exhausted(e),
            Err(Error::Transport(e)) => {
                debug!("Attempt {} of {} failed: {}", attempts, max_attempts, e);
                attempts += 1;
            }
        }
    }
}

#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
fn log_decoded(aid: &[u8], payload: &[u8]) {
    info!("{}:", hex::encode_upper(aid));

    match TlvDb::parse_multi(payload) {
        Ok(db) => {
            info!("-------------------- TLV decoded --------------------");
            info!("{}", Dump::new(&db));
        }
        Err(e) => {
            warn!("Can't parse response as TLV tree: {}", e);
        }
    }
}

impl<T> Card<T>
where
    T: Transport,
{
    /// Finds the applications listed in the directory and selects each of them.
    ///
    /// Replies of the selected applications are appended to `tlv`, and their AIDs returned in
    /// order. An error is returned only if the directory itself can't be selected, or the card
    /// leaves the field. The field is dropped before returning unless `leave_field_on` is set.
    pub fn search_pse(
        &mut self,
        activate_field: bool,
        leave_field_on: bool,
        directory: Directory,
        decode: bool,
        tlv: &mut TlvDb,
    ) -> Result<Vec<Vec<u8>>> {
        let result = self.search_directory(activate_field, directory, decode, tlv);

        if !leave_field_on {
            self.drop_field();
        }

        result
    }

    /// Selects every known AID in turn.
    ///
    /// Replies of the selected applications are appended to `tlv`, and their AIDs returned in
    /// order. An error is returned only if the card leaves the field. The field is dropped before
    /// returning unless `leave_field_on` is set.
    pub fn search(
        &mut self,
        activate_field: bool,
        leave_field_on: bool,
        decode: bool,
        tlv: &mut TlvDb,
    ) -> Result<Vec<Vec<u8>>> {
        let result = self.search_known(activate_field, leave_field_on, decode, tlv);

        if !leave_field_on {
            self.drop_field();
        }

        result
    }

    fn search_directory(
        &mut self,
        activate_field: bool,
        directory: Directory,
        decode: bool,
        tlv: &mut TlvDb,
    ) -> Result<Vec<Vec<u8>>> {
        let response = match self.select_pse(activate_field, true, directory) {
            Ok(response) => response,
            Err(e) => {
                error!("Can't select {:?}: {}", directory, e);
                return Err(e);
            }
        };

        let listing = match TlvDb::parse_multi(response.payload()) {
            Ok(listing) => listing,
            Err(e) => {
                error!("Can't get TLV from the {:?} response: {}", directory, e);
                return Ok(Vec::new());
            }
        };

        let mut found = Vec::new();
        let mut entry = listing.find_path(&tags::DIRECTORY_ENTRY_PATH);
        if entry.is_none() {
            info!("{:?} doesn't have records", directory);
        }

        while let Some(id) = entry {
            if let Some(aid) = listing.get_inchild(id, tags::APPLICATION_IDENTIFIER) {
                if self.select_candidate(false, true, aid.value(), decode, tlv)? {
                    found.push(aid.value().to_vec());
                }
            }

            entry = listing.find_next(id, tags::APPLICATION_TEMPLATE);
        }

        Ok(found)
    }

    fn search_known(
        &mut self,
        activate_field: bool,
        leave_field_on: bool,
        decode: bool,
        tlv: &mut TlvDb,
    ) -> Result<Vec<Vec<u8>>> {
        let last = KNOWN_AIDS.len() - 1;
        let mut found = Vec::new();

        for (i, known) in KNOWN_AIDS.iter().enumerate() {
            let activate = i == 0 && activate_field;
            let leave_on = i != last || leave_field_on;

            if self.select_candidate(activate, leave_on, known.aid, decode, tlv)? {
                found.push(known.aid.to_vec());
            }
        }

        Ok(found)
    }

    /// Selects one candidate under the retry policy.
    /// Gives whether it was selected; fails only when the discovery must stop.
    fn select_candidate(
        &mut self,
        activate_field: bool,
        leave_field_on: bool,
        aid: &[u8],
        decode: bool,
        tlv: &mut TlvDb,
    ) -> Result<bool> {
        let max_attempts = self.config().max_attempts;
        let outcome = attempt(max_attempts, || {
            self.select(activate_field, leave_field_on, aid, Some(&mut *tlv))
        });

        match outcome {
            Attempt::Selected(response) => {
                debug!("Selected {}", hex::encode_upper(aid));
                if decode {
                    log_decoded(aid, response.payload());
                }

                Ok(true)
            }
            Attempt::Rejected(response) => {
                debug!(
                    "{} rejected with {} ({})",
                    hex::encode_upper(aid),
                    response.status(),
                    response.status().description(),
                );

                Ok(false)
            }
            Attempt::Unframable(length) => {
                warn!("AID of {} octets can't be selected. Skipped...", length);

                Ok(false)
            }
            Attempt::Exhausted(e) => {
                warn!(
                    "Retry failed [{}]: {}. Skipped...",
                    hex::encode_upper(aid),
                    e
                );

                Ok(false)
            }
            Attempt::Fatal(e) => {
                error!("Card lost while selecting {}. Exit...", hex::encode_upper(aid));

                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_success_after_retries() {
        let mut calls = 0;
        let outcome = attempt(3, || {
            calls += 1;
            match calls {
                1 | 2 => Err(TransportError::Timeout.into()),
                _ => Ok(Response::from_bytes(vec![0x90, 0x00]).unwrap()),
            }
        });

        assert!(matches!(outcome, Attempt::Selected(_)));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_attempt_exhausted() {
        let mut calls = 0;
        let outcome = attempt(3, || {
            calls += 1;
            Err(TransportError::Reader("gone".into()).into())
        });

        assert!(matches!(
            outcome,
            Attempt::Exhausted(TransportError::Reader(_))
        ));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_attempt_fatal_is_not_retried() {
        let mut calls = 0;
        let outcome = attempt(3, || {
            calls += 1;
            Err(TransportError::CardSelect.into())
        });

        assert!(matches!(outcome, Attempt::Fatal(TransportError::CardSelect)));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_attempt_status_is_not_retried() {
        let mut calls = 0;
        let outcome = attempt(3, || {
            calls += 1;
            Err(Error::Status(
                Response::from_bytes(vec![0x6A, 0x82]).unwrap(),
            ))
        });

        assert!(matches!(outcome, Attempt::Rejected(_)));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_attempt_unframable_is_not_retried() {
        let mut calls = 0;
        let outcome = attempt(3, || {
            calls += 1;
            Err(Error::PayloadTooLong(256))
        });

        assert!(matches!(outcome, Attempt::Unframable(256)));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_attempt_at_least_once() {
        let mut calls = 0;
        let outcome = attempt(0, || {
            calls += 1;
            Err(TransportError::Timeout.into())
        });

        assert!(matches!(outcome, Attempt::Exhausted(TransportError::Timeout)));
        assert_eq!(calls, 1);
    }
}
