//! MIFARE Classic over PC/SC
//!
//! Contactless readers expose storage cards through the pseudo-APDUs of
//! PC/SC Part 3: keys are loaded into a reader slot, then a sector is
//! authenticated with that slot, then blocks are read and written with
//! READ BINARY and UPDATE BINARY. Value-block commands are not part of the
//! standard; the common ACS encoding is used.

use std::ffi::CString;
use std::fmt;

use pcsc::{Card, Context, Disposition};
use tagkit_core::block::BLOCK_LEN;
use tagkit_core::{Key, KeyRole, geometry};
use tagkit_probe::link::{LinkResult, TagLink};
use tracing::{debug, trace};

use crate::config::PcscConfig;
use crate::error::PcscError;
use crate::reader::tag_size_from_atr;

/// Status word for success
const SW_OK: [u8; 2] = [0x90, 0x00];

/// Status word for a rejected authentication
const SW_AUTH_FAILED: [u8; 2] = [0x63, 0x00];

/// Pseudo-APDU construction
pub mod apdu {
    use super::*;

    /// LOAD KEYS into a volatile reader slot
    pub fn load_key(slot: u8, key: &Key) -> Vec<u8> {
        let mut command = vec![0xFF, 0x82, 0x00, slot, 0x06];
        command.extend_from_slice(key.as_bytes());
        command
    }

    /// GENERAL AUTHENTICATE a block with the key in a reader slot
    pub fn authenticate(block: u16, role: KeyRole, slot: u8) -> Vec<u8> {
        let [msb, lsb] = block.to_be_bytes();
        let key_type = match role {
            KeyRole::A => 0x60,
            KeyRole::B => 0x61,
        };
        vec![0xFF, 0x86, 0x00, 0x00, 0x05, 0x01, msb, lsb, key_type, slot]
    }

    /// READ BINARY of one block
    pub fn read_binary(block: u16) -> Vec<u8> {
        let [msb, lsb] = block.to_be_bytes();
        vec![0xFF, 0xB0, msb, lsb, BLOCK_LEN as u8]
    }

    /// UPDATE BINARY of one block
    pub fn update_binary(block: u16, data: &[u8; BLOCK_LEN]) -> Vec<u8> {
        let [msb, lsb] = block.to_be_bytes();
        let mut command = vec![0xFF, 0xD6, msb, lsb, BLOCK_LEN as u8];
        command.extend_from_slice(data);
        command
    }

    /// Value block operation: increment (`0x01`) or decrement (`0x02`) and store
    pub fn value_operation(block: u8, op: u8, value: u32) -> Vec<u8> {
        let mut command = vec![0xFF, 0xD7, 0x00, block, 0x05, op];
        command.extend_from_slice(&value.to_be_bytes());
        command
    }
}

/// Split a response into data and status word
fn split_response(response: &[u8]) -> Result<(&[u8], [u8; 2]), PcscError> {
    match response {
        [data @ .., sw1, sw2] => Ok((data, [*sw1, *sw2])),
        _ => Err(PcscError::MalformedResponse(hex::encode_upper(response))),
    }
}

/// Value operation waiting for a transfer
#[derive(Debug, Clone, Copy)]
struct PendingValue {
    block: usize,
    op: u8,
    value: u32,
}

/// A [`TagLink`] through a PC/SC contactless reader
pub struct PcscTagLink {
    /// PC/SC context
    context: Context,
    /// Card connection, if established
    card: Option<Card>,
    /// Reader name
    reader_name: String,
    /// Configuration
    config: PcscConfig,
    /// Sector count of the connected tag
    sectors: usize,
    /// Key currently loaded in the reader slot
    loaded_key: Option<Key>,
    /// Increment or decrement applied on the next transfer
    pending_value: Option<PendingValue>,
}

impl fmt::Debug for PcscTagLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscTagLink")
            .field("reader_name", &self.reader_name)
            .field("has_card", &self.card.is_some())
            .field("config", &self.config)
            .field("sectors", &self.sectors)
            .finish()
    }
}

impl PcscTagLink {
    /// Create a link for the specified reader, without connecting
    pub(crate) fn new(
        context: Context,
        reader_name: &str,
        config: PcscConfig,
    ) -> Result<Self, PcscError> {
        Ok(Self {
            context,
            card: None,
            reader_name: reader_name.to_string(),
            sectors: config.fallback_sectors,
            config,
            loaded_key: None,
            pending_value: None,
        })
    }

    /// Try to connect to the card
    fn connect_card(&mut self) -> Result<(), PcscError> {
        if self.card.is_some() {
            return Ok(());
        }

        let reader_cstr = CString::new(self.reader_name.clone())
            .map_err(|_| PcscError::ReaderNotFound(self.reader_name.clone()))?;

        let card = match self.context.connect(
            &reader_cstr,
            self.config.share_mode.into(),
            self.config.protocols,
        ) {
            Ok(card) => card,
            Err(pcsc::Error::NoSmartcard) => {
                return Err(PcscError::NoCard(self.reader_name.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let atr = card.get_attribute_owned(pcsc::Attribute::AtrString)?;
        self.sectors = tag_size_from_atr(&atr).map_or(self.config.fallback_sectors, |size| {
            size.sector_count()
        });
        debug!(atr = %hex::encode_upper(&atr), sectors = self.sectors, "Card connected");

        self.card = Some(card);
        self.loaded_key = None;
        Ok(())
    }

    /// Get the reader name
    pub fn reader_name(&self) -> &str {
        &self.reader_name
    }

    /// Transmit a command and return the response data, checking the status word
    fn transmit(&mut self, command: &[u8]) -> Result<Vec<u8>, PcscError> {
        let response = self.transmit_raw(command)?;
        let (data, sw) = split_response(&response)?;
        if sw != SW_OK {
            return Err(PcscError::status_word_bytes(sw[0], sw[1]));
        }
        Ok(data.to_vec())
    }

    fn transmit_raw(&mut self, command: &[u8]) -> Result<Vec<u8>, PcscError> {
        let card = self
            .card
            .as_mut()
            .ok_or_else(|| PcscError::NoCard(self.reader_name.clone()))?;

        trace!(command = %hex::encode_upper(command), "Transmitting");
        let mut buffer = [0u8; 258];
        match card.transmit(command, &mut buffer) {
            Ok(response) => {
                trace!(response = %hex::encode_upper(response), "Received");
                Ok(response.to_vec())
            }
            Err(e) => {
                if matches!(e, pcsc::Error::ResetCard | pcsc::Error::RemovedCard) {
                    self.card = None;
                    self.loaded_key = None;

                    if self.config.auto_reconnect && e == pcsc::Error::ResetCard {
                        self.connect_card()?;
                        return self.transmit_raw(command);
                    }
                }
                Err(e.into())
            }
        }
    }

    fn block_number(block: usize) -> Result<u16, PcscError> {
        u16::try_from(block).map_err(|_| PcscError::Other(format!("block {block} out of range")))
    }
}

impl TagLink for PcscTagLink {
    fn do_authenticate(&mut self, sector: usize, key: &Key, role: KeyRole) -> LinkResult<bool> {
        if self.loaded_key != Some(*key) {
            self.transmit(&apdu::load_key(self.config.key_slot, key))?;
            self.loaded_key = Some(*key);
        }

        let block = Self::block_number(self.sector_to_block(sector))?;
        let response = self
            .transmit_raw(&apdu::authenticate(block, role, self.config.key_slot))?;
        match split_response(&response)? {
            (_, SW_OK) => Ok(true),
            (_, SW_AUTH_FAILED) => Ok(false),
            (_, [sw1, sw2]) => Err(PcscError::status_word_bytes(sw1, sw2).into()),
        }
    }

    fn do_read_block(&mut self, block: usize) -> LinkResult<[u8; BLOCK_LEN]> {
        let data = self.transmit(&apdu::read_binary(Self::block_number(block)?))?;
        data.as_slice().try_into().map_err(|_| {
            PcscError::MalformedResponse(format!("expected {BLOCK_LEN} bytes, got {}", data.len()))
                .into()
        })
    }

    fn write_block(&mut self, block: usize, data: &[u8; BLOCK_LEN]) -> LinkResult<()> {
        self.transmit(&apdu::update_binary(Self::block_number(block)?, data))?;
        Ok(())
    }

    fn increment(&mut self, block: usize, value: u32) -> LinkResult<()> {
        self.pending_value = Some(PendingValue {
            block,
            op: 0x01,
            value,
        });
        Ok(())
    }

    fn decrement(&mut self, block: usize, value: u32) -> LinkResult<()> {
        self.pending_value = Some(PendingValue {
            block,
            op: 0x02,
            value,
        });
        Ok(())
    }

    /// Readers run the value operation and the transfer as one command, so
    /// only a transfer back to the operated block is possible
    fn transfer(&mut self, block: usize) -> LinkResult<()> {
        let pending = self
            .pending_value
            .take()
            .filter(|pending| pending.block == block)
            .ok_or_else(|| PcscError::Other(format!("no value operation pending for block {block}")))?;
        let block = u8::try_from(block)
            .map_err(|_| PcscError::Other(format!("block {block} out of range")))?;
        self.transmit(&apdu::value_operation(block, pending.op, pending.value))?;
        Ok(())
    }

    fn connect(&mut self) -> LinkResult<()> {
        Ok(self.connect_card()?)
    }

    fn close(&mut self) {
        self.loaded_key = None;
        self.pending_value = None;
        if let Some(card) = self.card.take() {
            if let Err((_, e)) = card.disconnect(Disposition::LeaveCard) {
                debug!(error = %e, "Disconnect failed");
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.card.is_some()
    }

    fn sector_count(&self) -> usize {
        self.sectors
    }

    fn sector_to_block(&self, sector: usize) -> usize {
        geometry::first_block(sector)
    }
}

impl Drop for PcscTagLink {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_load_key() {
        assert_eq!(
            apdu::load_key(0, &Key::DEFAULT),
            hex!("FF82000006FFFFFFFFFFFF").to_vec()
        );
    }

    #[test]
    fn test_authenticate() {
        assert_eq!(
            apdu::authenticate(4, KeyRole::A, 0),
            hex!("FF860000050100046000").to_vec()
        );
        assert_eq!(
            apdu::authenticate(0x80, KeyRole::B, 1),
            hex!("FF860000050100806101").to_vec()
        );
    }

    #[test]
    fn test_read_and_update_binary() {
        assert_eq!(apdu::read_binary(7), hex!("FFB0000710").to_vec());
        let command = apdu::update_binary(5, &[0xAB; 16]);
        assert_eq!(&command[..5], &hex!("FFD6000510"));
        assert_eq!(command.len(), 21);
    }

    #[test]
    fn test_value_operation() {
        assert_eq!(
            apdu::value_operation(5, 0x02, 3),
            hex!("FFD70005050200000003").to_vec()
        );
    }

    #[test]
    fn test_split_response() {
        let (data, sw) = split_response(&hex!("01029000")).unwrap();
        assert_eq!(data, &[0x01, 0x02]);
        assert_eq!(sw, SW_OK);
        assert!(matches!(
            split_response(&[0x90]),
            Err(PcscError::MalformedResponse(_))
        ));
    }
}
