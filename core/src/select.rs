//! Choosing the application to work with among the discovered ones.

use crate::tags;
use crate::tlv::{NodeId, Tlv, TlvDb};

/// An application found by discovery, as listed by [`entries`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DirectoryEntry {
    pub aid: Vec<u8>,
    pub priority: Option<u16>,
    pub label: Option<String>,
}

/// Reads an Application Priority Indicator from its first 2 octets at most.
fn priority(indicator: &Tlv) -> u16 {
    indicator
        .value()
        .iter()
        .take(2)
        .fold(0u16, |priority, byte| (priority << 8) | *byte as u16)
}

/// Walks the top-level FCI templates, stopping at the first one without a DF name.
fn walk<'a>(tlv: &'a TlvDb) -> impl Iterator<Item = (NodeId, &'a Tlv)> + 'a {
    let mut entry = tlv.find(tags::FCI_TEMPLATE);

    std::iter::from_fn(move || {
        let id = entry?;
        let aid = tlv.get_inchild(id, tags::DF_NAME)?;
        entry = tlv.find_next(id, tags::FCI_TEMPLATE);

        Some((id, aid))
    })
}

/// Picks the application with the highest priority, i.e. the lowest priority value.
///
/// An application without a priority is picked only if nothing was picked before it, so it never
/// wins over a later application that has one. Gives nothing if the tree has no application.
pub fn select_application(tlv: &TlvDb) -> Option<Vec<u8>> {
    let mut selected: Option<&[u8]> = None;
    let mut best: Option<u16> = None;

    for (id, aid) in walk(tlv) {
        match tlv.get_inchild(id, tags::APPLICATION_PRIORITY_INDICATOR) {
            Some(indicator) => {
                let priority = priority(indicator);
                if best.map_or(true, |best| priority < best) {
                    best = Some(priority);
                    selected = Some(aid.value());
                }
            }
            None => {
                if selected.is_none() {
                    selected = Some(aid.value());
                }
            }
        }
    }

    selected.map(<[u8]>::to_vec)
}

/// Lists the applications in the tree, in discovery order.
pub fn entries(tlv: &TlvDb) -> Vec<DirectoryEntry> {
    walk(tlv)
        .map(|(id, aid)| DirectoryEntry {
            aid: aid.value().to_vec(),
            priority: tlv
                .get_inchild(id, tags::APPLICATION_PRIORITY_INDICATOR)
                .map(priority),
            label: tlv
                .get_inchild(id, tags::APPLICATION_LABEL)
                .map(|label| String::from_utf8_lossy(label.value()).to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    fn forest(entries: &[&[u8]]) -> TlvDb {
        let mut db = TlvDb::new();
        for entry in entries {
            db.add(TlvDb::parse(entry).unwrap());
        }
        db
    }

    const VISA: &[u8] = &hex!("6F0B 8407A0000000031010 5000");
    const VISA_PRIO_2: &[u8] = &hex!("6F0E 8407A0000000031010 870102 5000");
    const MASTERCARD_PRIO_1: &[u8] = &hex!("6F0E 8407A0000000041010 870101 5000");
    const AMEX: &[u8] = &hex!("6F0A 8406A00000002501 5000");

    #[test]
    fn test_lowest_priority_wins() {
        let db = forest(&[VISA, VISA_PRIO_2, MASTERCARD_PRIO_1]);
        assert_eq!(
            select_application(&db),
            Some(hex!("A0000000041010").to_vec())
        );
    }

    #[test]
    fn test_first_without_priority() {
        let db = forest(&[VISA, AMEX]);
        assert_eq!(
            select_application(&db),
            Some(hex!("A0000000031010").to_vec())
        );
    }

    #[test]
    fn test_priority_beats_earlier_entry_without_one() {
        let db = forest(&[AMEX, VISA_PRIO_2]);
        assert_eq!(
            select_application(&db),
            Some(hex!("A0000000031010").to_vec())
        );
    }

    #[test]
    fn test_entry_without_priority_never_replaces() {
        let db = forest(&[VISA_PRIO_2, AMEX]);
        assert_eq!(
            select_application(&db),
            Some(hex!("A0000000031010").to_vec())
        );
    }

    #[test]
    fn test_two_octet_priority() {
        let db = forest(&[
            &hex!("6F0D 8407A0000000031010 87020100"),
            &hex!("6F0C 8407A0000000041010 870180"),
        ]);
        assert_eq!(
            select_application(&db),
            Some(hex!("A0000000041010").to_vec())
        );
    }

    #[test]
    fn test_no_application() {
        assert_eq!(select_application(&TlvDb::new()), None);
        assert_eq!(
            select_application(&TlvDb::fixed(tags::APPLICATION_PAN, &hex!("41111111"))),
            None
        );
        // The scan ends at an FCI without a DF name.
        assert_eq!(select_application(&forest(&[&hex!("6F03 870101"), VISA])), None);
    }

    #[test]
    fn test_entries() {
        let db = forest(&[
            &hex!("6F12 8407A0000000031010 870101 500456495341"),
            VISA,
        ]);

        assert_eq!(
            entries(&db),
            vec![
                DirectoryEntry {
                    aid: hex!("A0000000031010").to_vec(),
                    priority: Some(1),
                    label: Some("VISA".to_string()),
                },
                DirectoryEntry {
                    aid: hex!("A0000000031010").to_vec(),
                    priority: None,
                    label: Some(String::new()),
                },
            ]
        );
    }
}
