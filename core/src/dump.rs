//! Human-readable renderings of TLV trees and discovered applications.

use std::fmt::{Display, Formatter};

use crate::aid;
use crate::select::{self, DirectoryEntry};
use crate::tags;
use crate::tlv::{Tlv, TlvDb};

const INDENT: &str = "    ";

/// Renders a TLV forest one record per line, nested records indented under their parent.
pub struct Dump<'a> {
    tlv: &'a TlvDb,
}

impl<'a> Dump<'a> {
    pub fn new(tlv: &'a TlvDb) -> Self {
        Self { tlv }
    }
}

fn is_printable(value: &[u8]) -> bool {
    !value.is_empty() && value.iter().all(|b| b.is_ascii_graphic() || *b == b' ')
}

fn write_record(f: &mut Formatter<'_>, tlv: &Tlv, depth: usize, leaf: bool) -> std::fmt::Result {
    write!(
        f,
        "{}{} [{:02X}] {}",
        INDENT.repeat(depth),
        tlv.tag(),
        tlv.len(),
        tags::name(tlv.tag()),
    )?;

    if leaf && !tlv.is_constructed() {
        write!(f, ": {}", hex::encode_upper(tlv.value()))?;

        if is_printable(tlv.value()) {
            write!(f, " ({})", String::from_utf8_lossy(tlv.value()))?;
        }
    }

    writeln!(f)
}

impl Display for Dump<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut result = Ok(());

        self.tlv.visit(|_, tlv, depth, leaf| {
            if result.is_ok() {
                result = write_record(f, tlv, depth, leaf);
            }

            result.is_ok()
        });

        result
    }
}

/// Renders the applications of a tree as an AID / priority / name table.
pub struct AidTable {
    entries: Vec<DirectoryEntry>,
}

impl AidTable {
    pub fn new(tlv: &TlvDb) -> Self {
        Self {
            entries: select::entries(tlv),
        }
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }
}

impl Display for AidTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.entries.is_empty() {
            return writeln!(f, "none");
        }

        writeln!(f, "{:<32} | {:<8} | Name", "AID", "Priority")?;
        writeln!(f, "{:-<32}-+-{:-<8}-+-{:-<16}", "", "", "")?;

        for entry in &self.entries {
            let priority = entry
                .priority
                .map(|priority| priority.to_string())
                .unwrap_or_else(|| "-".to_string());

            // Falls back to the payment system when the card gives no label.
            let name = match &entry.label {
                Some(label) if !label.is_empty() => label.clone(),
                _ => aid::vendor(&entry.aid)
                    .map(|vendor| vendor.to_string())
                    .unwrap_or_default(),
            };

            writeln!(
                f,
                "{:<32} | {:<8} | {}",
                hex::encode_upper(&entry.aid),
                priority,
                name
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;

    use super::*;

    #[test]
    fn test_dump() {
        let db = TlvDb::parse(&hex!("6F10 840E325041592E5359532E4444463031")).unwrap();

        assert_eq!(
            Dump::new(&db).to_string(),
            "6F [10] File Control Information (FCI) Template\n    \
             84 [0E] Dedicated File (DF) Name: 325041592E5359532E4444463031 (2PAY.SYS.DDF01)\n",
        );
    }

    #[test]
    fn test_dump_binary_value() {
        let db = TlvDb::fixed(tags::APPLICATION_PAN, &hex!("4111111111111111"));

        assert_eq!(
            Dump::new(&db).to_string(),
            "5A [08] Application PAN: 4111111111111111\n",
        );
    }

    #[test]
    fn test_dump_empty() {
        assert_eq!(Dump::new(&TlvDb::new()).to_string(), "");
    }

    #[test]
    fn test_aid_table() {
        let mut db = TlvDb::parse(&hex!("6F12 8407A0000000031010 870101 500456495341")).unwrap();
        db.add(TlvDb::parse(&hex!("6F0B 8407A0000000041010 5000")).unwrap());

        let table = AidTable::new(&db);
        assert_eq!(table.entries().len(), 2);

        let rendered = table.to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("AID"));
        assert!(lines[2].starts_with("A0000000031010"));
        assert!(lines[2].ends_with("| 1        | VISA"));
        assert!(lines[3].ends_with("| -        | MasterCard"));
    }

    #[test]
    fn test_aid_table_empty() {
        assert_eq!(AidTable::new(&TlvDb::new()).to_string(), "none\n");
    }
}
