//! Consist (lash-up) members of a train record.
//!
//! Each member is two bytes on the wire, `<flags> <address>`; an unused
//! slot has either byte set to `0xFF`.

use bytes::{BufMut, BytesMut};

const UNIT_MASK: u8 = 0b0000_0011;
const REVERSE: u8 = 0b0000_0100;
const TRAIN_LINKED: u8 = 0b0000_1000;
const HORN_MASKED: u8 = 0b0001_0000;
const DIALOG_MASKED: u8 = 0b0010_0000;
const TMCC2: u8 = 0b0100_0000;
const ACCESSORY: u8 = 0b1000_0000;

/// Position of a unit within its consist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitType {
    Single,
    Head,
    Middle,
    Tail,
}

/// One engine (or accessory car) in a train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsistComponent {
    pub address: u8,
    pub flags: u8,
}

impl ConsistComponent {
    pub fn new(address: u8, flags: u8) -> Self {
        ConsistComponent { address, flags }
    }

    pub fn unit_type(&self) -> UnitType {
        match self.flags & UNIT_MASK {
            0 => UnitType::Single,
            1 => UnitType::Head,
            2 => UnitType::Middle,
            _ => UnitType::Tail,
        }
    }

    pub fn is_head(&self) -> bool {
        self.unit_type() == UnitType::Head
    }

    pub fn is_tail(&self) -> bool {
        self.unit_type() == UnitType::Tail
    }

    pub fn is_forward(&self) -> bool {
        self.flags & REVERSE == 0
    }

    pub fn is_reverse(&self) -> bool {
        !self.is_forward()
    }

    pub fn is_train_linked(&self) -> bool {
        self.flags & TRAIN_LINKED != 0
    }

    pub fn is_horn_masked(&self) -> bool {
        self.flags & HORN_MASKED != 0
    }

    pub fn is_dialog_masked(&self) -> bool {
        self.flags & DIALOG_MASKED != 0
    }

    pub fn is_tmcc2(&self) -> bool {
        self.flags & TMCC2 != 0
    }

    pub fn is_accessory(&self) -> bool {
        self.flags & ACCESSORY != 0
    }

    /// Decode up to 16 pairs, skipping empty slots.
    pub fn decode_list(raw: &[u8]) -> Vec<ConsistComponent> {
        raw.chunks_exact(2)
            .take(16)
            .filter(|pair| pair[0] != 0xFF && pair[1] != 0xFF)
            .map(|pair| ConsistComponent::new(pair[1], pair[0]))
            .collect()
    }

    /// Write `components` as `slots` pairs, padding unused slots with 0xFF.
    pub fn encode_list(components: &[ConsistComponent], slots: usize, buf: &mut BytesMut) {
        let used = components.len().min(slots);
        for comp in &components[..used] {
            buf.put_u8(comp.flags);
            buf.put_u8(comp.address);
        }
        buf.put_bytes(0xFF, (slots - used) * 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_bits() {
        let c = ConsistComponent::new(10, 0b1101_1110);
        assert_eq!(c.unit_type(), UnitType::Middle);
        assert!(c.is_reverse());
        assert!(c.is_train_linked());
        assert!(c.is_horn_masked());
        assert!(!c.is_dialog_masked());
        assert!(c.is_tmcc2());
        assert!(c.is_accessory());
    }

    #[test]
    fn empty_slots_skipped() {
        let raw = [0x01, 12, 0xFF, 0xFF, 0x00, 0xFF, 0x03, 14];
        let list = ConsistComponent::decode_list(&raw);
        assert_eq!(list.len(), 2);
        assert!(list[0].is_head());
        assert!(list[1].is_forward());
    }

    #[test]
    fn encode_pads_to_slot_count() {
        let mut buf = BytesMut::new();
        ConsistComponent::encode_list(&[ConsistComponent::new(12, 1)], 3, &mut buf);
        assert_eq!(&buf[..], &[0x01, 12, 0xFF, 0xFF, 0xFF, 0xFF]);
    }
}
