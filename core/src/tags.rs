//! EMV tags used by this crate, and their human-readable names.

use crate::tlv::Tag;

// Discretionary data objects
pub const DCVV_RAW: Tag = Tag(0x02);

// Application metadata
pub const APPLICATION_IDENTIFIER: Tag = Tag(0x4F);
pub const APPLICATION_LABEL: Tag = Tag(0x50);
pub const APPLICATION_PAN: Tag = Tag(0x5A);
pub const APPLICATION_TEMPLATE: Tag = Tag(0x61);
pub const APPLICATION_PRIORITY_INDICATOR: Tag = Tag(0x87);
pub const APPLICATION_EXPIRATION_DATE: Tag = Tag(0x5F24);
pub const APPLICATION_PAN_SEQUENCE_NUMBER: Tag = Tag(0x5F34);
pub const APPLICATION_PREFERRED_NAME: Tag = Tag(0x9F12);

// Cardholder data
pub const CARDHOLDER_NAME: Tag = Tag(0x5F20);
pub const TRACK_1_DATA: Tag = Tag(0x56);
pub const TRACK_2_EQUIVALENT_DATA: Tag = Tag(0x57);
pub const TRACK_2_DATA: Tag = Tag(0x9F6B);

// File control information
pub const FCI_TEMPLATE: Tag = Tag(0x6F);
pub const DF_NAME: Tag = Tag(0x84);
pub const FCI_PROPRIETARY_TEMPLATE: Tag = Tag(0xA5);
pub const FCI_ISSUER_DISCRETIONARY_DATA: Tag = Tag(0xBF0C);
pub const LANGUAGE_PREFERENCE: Tag = Tag(0x5F2D);
pub const PDOL: Tag = Tag(0x9F38);

// Processing
pub const AIP: Tag = Tag(0x82);
pub const AFL: Tag = Tag(0x94);
pub const CDOL1: Tag = Tag(0x8C);
pub const CDOL2: Tag = Tag(0x8D);
pub const APPLICATION_TRANSACTION_COUNTER: Tag = Tag(0x9F36);
pub const APPLICATION_CRYPTOGRAM: Tag = Tag(0x9F26);
pub const CRYPTOGRAM_INFORMATION_DATA: Tag = Tag(0x9F27);
pub const ISSUER_APPLICATION_DATA: Tag = Tag(0x9F10);
pub const UDOL: Tag = Tag(0x9F69);

// Response templates
pub const RESPONSE_MESSAGE_TEMPLATE_FORMAT_1: Tag = Tag(0x80);
pub const RESPONSE_MESSAGE_TEMPLATE_FORMAT_2: Tag = Tag(0x77);
pub const RECORD_TEMPLATE: Tag = Tag(0x70);

/// Path from the top of a PSE/PPSE reply down to its directory entries.
pub const DIRECTORY_ENTRY_PATH: [Tag; 4] = [
    FCI_TEMPLATE,
    FCI_PROPRIETARY_TEMPLATE,
    FCI_ISSUER_DISCRETIONARY_DATA,
    APPLICATION_TEMPLATE,
];

/// Gets a human-readable name for an EMV tag.
pub fn name(tag: Tag) -> &'static str {
    match tag {
        DCVV_RAW => "dCVV raw data",
        APPLICATION_IDENTIFIER => "Application Identifier (AID)",
        APPLICATION_LABEL => "Application Label",
        TRACK_1_DATA => "Track 1 Data",
        TRACK_2_EQUIVALENT_DATA => "Track 2 Equivalent Data",
        APPLICATION_PAN => "Application PAN",
        APPLICATION_TEMPLATE => "Application Template",
        FCI_TEMPLATE => "File Control Information (FCI) Template",
        RECORD_TEMPLATE => "Record Template",
        RESPONSE_MESSAGE_TEMPLATE_FORMAT_2 => "Response Message Template Format 2",
        RESPONSE_MESSAGE_TEMPLATE_FORMAT_1 => "Response Message Template Format 1",
        AIP => "Application Interchange Profile",
        DF_NAME => "Dedicated File (DF) Name",
        APPLICATION_PRIORITY_INDICATOR => "Application Priority Indicator",
        CDOL1 => "CDOL1",
        CDOL2 => "CDOL2",
        AFL => "Application File Locator",
        FCI_PROPRIETARY_TEMPLATE => "FCI Proprietary Template",
        CARDHOLDER_NAME => "Cardholder Name",
        APPLICATION_EXPIRATION_DATE => "Application Expiration Date",
        LANGUAGE_PREFERENCE => "Language Preference",
        APPLICATION_PAN_SEQUENCE_NUMBER => "Application PAN Sequence Number",
        ISSUER_APPLICATION_DATA => "Issuer Application Data",
        APPLICATION_PREFERRED_NAME => "Application Preferred Name",
        APPLICATION_CRYPTOGRAM => "Application Cryptogram",
        CRYPTOGRAM_INFORMATION_DATA => "Cryptogram Information Data",
        APPLICATION_TRANSACTION_COUNTER => "Application Transaction Counter (ATC)",
        PDOL => "Processing Options Data Object List (PDOL)",
        UDOL => "UDOL",
        TRACK_2_DATA => "Track 2 Data",
        FCI_ISSUER_DISCRETIONARY_DATA => "FCI Issuer Discretionary Data",
        _ => "Unknown Tag",
    }
}
