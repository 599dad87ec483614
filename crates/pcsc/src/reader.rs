//! Reader representation for PC/SC devices

use pcsc::{ReaderState, State};
use tagkit_core::geometry::TagSize;

/// Representation of a PC/SC card reader
#[derive(Debug, Clone)]
pub struct PcscReader {
    /// Name of the reader
    name: String,

    /// Whether a card is present
    has_card: bool,

    /// Answer To Reset of the card (if present)
    atr: Option<Vec<u8>>,
}

impl PcscReader {
    /// Create a new reader
    pub const fn new(name: String, has_card: bool, atr: Option<Vec<u8>>) -> Self {
        Self {
            name,
            has_card,
            atr,
        }
    }

    /// Get the reader name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if a card is present in the reader
    pub const fn has_card(&self) -> bool {
        self.has_card
    }

    /// Get the ATR of the card if present
    pub fn atr(&self) -> Option<&[u8]> {
        self.atr.as_deref()
    }

    /// MIFARE Classic variant of the card, if its ATR identifies one
    pub fn tag_size(&self) -> Option<TagSize> {
        tag_size_from_atr(self.atr()?)
    }

    /// Create a reader from a reader state
    pub(crate) fn from_reader_state(reader_state: &ReaderState) -> Self {
        let has_card = reader_state.event_state().contains(State::PRESENT)
            && !reader_state.event_state().contains(State::EMPTY);

        let atr = if has_card {
            Some(reader_state.atr().to_vec())
        } else {
            None
        };

        Self {
            name: reader_state.name().to_string_lossy().into_owned(),
            has_card,
            atr,
        }
    }
}

/// Registered application provider identifier of PC/SC Part 3 storage cards
const STORAGE_CARD_RID: [u8; 5] = [0xA0, 0x00, 0x00, 0x03, 0x06];

/// Identify a MIFARE Classic tag from a PC/SC Part 3 storage-card ATR
///
/// Such ATRs carry the RID at bytes 7..12, the card standard at byte 12 and
/// the two-byte card name at bytes 13..15.
pub fn tag_size_from_atr(atr: &[u8]) -> Option<TagSize> {
    if atr.get(7..12)? != STORAGE_CARD_RID {
        return None;
    }
    match atr.get(13..15)? {
        [0x00, 0x01] => Some(TagSize::Classic1K),
        [0x00, 0x02] => Some(TagSize::Classic4K),
        [0x00, 0x26] => Some(TagSize::Mini),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_tag_size_from_atr() {
        let classic_1k = hex!("3B8F8001804F0CA000000306030001000000006A");
        let classic_4k = hex!("3B8F8001804F0CA0000003060300020000000069");
        let ultralight = hex!("3B8F8001804F0CA0000003060300030000000068");
        assert_eq!(tag_size_from_atr(&classic_1k), Some(TagSize::Classic1K));
        assert_eq!(tag_size_from_atr(&classic_4k), Some(TagSize::Classic4K));
        assert_eq!(tag_size_from_atr(&ultralight), None);
        assert_eq!(tag_size_from_atr(&hex!("3B8A80")), None);

        let reader = PcscReader::new("ACS ACR122U".to_string(), true, Some(classic_1k.to_vec()));
        assert_eq!(reader.tag_size().map(TagSize::sector_count), Some(16));
    }
}
