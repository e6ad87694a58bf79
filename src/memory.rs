//! Read-only access to interpreter memory
//!
//! The interpreter owns all game state. This module is the boundary the
//! introspection layer reads through: a global byte buffer, the object
//! table and the most recent raw text output.
//!
//! Object layouts follow the Z-Machine Standard, section 12:
//!
//! V1-3: 9-byte entries, 32 attributes, byte-sized links
//!   the 32 attribute flags     parent     sibling     child   properties
//!   ---32 bits in 4 bytes---   ---3 bytes------------------  ---2 bytes--
//!
//! V4+: 14-byte entries, 48 attributes, word-sized links
//!   the 48 attribute flags     parent     sibling     child   properties
//!   ---48 bits in 6 bytes---   ---3 words, i.e. 6 bytes----  ---2 bytes--

use bitvec::prelude::*;
use log::debug;

use crate::error::{IntrospectError, RangeKind, Result};
use crate::header::Header;

pub const MAX_OBJECTS_V3: u16 = 255;
pub const MAX_ATTRIBUTES_V3: u16 = 32;
pub const MAX_PROPERTIES_V3: usize = 31;
pub const OBJECT_ENTRY_SIZE_V3: usize = 9;

pub const MAX_OBJECTS_V4: u16 = 65535;
pub const MAX_ATTRIBUTES_V4: u16 = 48;
pub const MAX_PROPERTIES_V4: usize = 63;
pub const OBJECT_ENTRY_SIZE_V4: usize = 14;

/// Attribute flags of one object. Attribute 0 is the top bit of the first byte.
pub type Attributes = BitArray<[u8; 6], Msb0>;

/// One entry of the object table. Links are object numbers, 0 = none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldObject {
    pub num: u16,
    pub parent: u16,
    pub sibling: u16,
    pub child: u16,
    pub attributes: Attributes,
}

impl WorldObject {
    pub fn new(num: u16) -> Self {
        WorldObject {
            num,
            parent: 0,
            sibling: 0,
            child: 0,
            attributes: BitArray::ZERO,
        }
    }

    pub fn has_attribute(&self, attr: u16) -> bool {
        self.attributes
            .get(attr as usize)
            .map(|bit| *bit)
            .unwrap_or(false)
    }

    /// Attribute indices that are currently on, ascending
    pub fn attribute_list(&self) -> Vec<u16> {
        self.attributes.iter_ones().map(|i| i as u16).collect()
    }
}

/// Capability set the core needs from interpreter memory
pub trait MemoryAccessor {
    /// Read a byte from the global memory buffer at an absolute address
    fn read_byte(&self, addr: usize) -> Result<u8>;

    /// Read a big-endian word
    fn read_word(&self, addr: usize) -> Result<u16> {
        let next = addr.checked_add(1).ok_or_else(|| {
            IntrospectError::out_of_range(self.label(), RangeKind::Address, addr, usize::MAX - 1)
        })?;
        let high = self.read_byte(addr)? as u16;
        let low = self.read_byte(next)? as u16;
        Ok((high << 8) | low)
    }

    /// Name used in errors, usually the game id
    fn label(&self) -> &str {
        "memory"
    }

    /// Decode object `obj_num` (1-based) from the object table
    fn object(&self, obj_num: u16) -> Result<WorldObject>;

    /// Number of attribute flags per object for this story's version
    fn attribute_count(&self) -> u16;

    /// The most recent raw text output
    fn text(&self) -> &str;
}

/// MemoryView reads a raw Z-machine memory image and text buffer
pub struct MemoryView<'a> {
    memory: &'a [u8],
    text: &'a str,
    header: Header,
    label: String,
}

impl<'a> MemoryView<'a> {
    pub fn new(memory: &'a [u8], text: &'a str) -> Result<Self> {
        let header = Header::parse(memory)?;
        let label = header.fingerprint().to_string();
        Ok(MemoryView {
            memory,
            text,
            header,
            label,
        })
    }

    /// Like `new`, but errors name `game` instead of the story fingerprint
    pub fn for_game(memory: &'a [u8], text: &'a str, game: &str) -> Result<Self> {
        let mut view = Self::new(memory, text)?;
        view.label = game.to_string();
        Ok(view)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    fn is_v3(&self) -> bool {
        self.header.version <= 3
    }

    fn max_objects(&self) -> u16 {
        if self.is_v3() {
            MAX_OBJECTS_V3
        } else {
            MAX_OBJECTS_V4
        }
    }

    fn object_addr(&self, obj_num: u16) -> Result<usize> {
        if obj_num == 0 || obj_num > self.max_objects() {
            return Err(IntrospectError::out_of_range(
                &self.label,
                RangeKind::Object,
                obj_num as usize,
                self.max_objects() as usize,
            ));
        }

        let (defaults, entry_size) = if self.is_v3() {
            (MAX_PROPERTIES_V3, OBJECT_ENTRY_SIZE_V3)
        } else {
            (MAX_PROPERTIES_V4, OBJECT_ENTRY_SIZE_V4)
        };
        let obj_tree_base = self.header.object_table_addr + defaults * 2;
        let addr = obj_tree_base + (obj_num as usize - 1) * entry_size;

        if addr + entry_size > self.memory.len() {
            return Err(IntrospectError::out_of_range(
                &self.label,
                RangeKind::Address,
                addr + entry_size - 1,
                self.memory.len(),
            ));
        }
        Ok(addr)
    }
}

impl MemoryAccessor for MemoryView<'_> {
    fn read_byte(&self, addr: usize) -> Result<u8> {
        self.memory.get(addr).copied().ok_or_else(|| {
            IntrospectError::out_of_range(
                &self.label,
                RangeKind::Address,
                addr,
                self.memory.len(),
            )
        })
    }

    fn object(&self, obj_num: u16) -> Result<WorldObject> {
        let addr = self.object_addr(obj_num)?;
        let entry = &self.memory[addr..];
        let mut raw = [0u8; 6];

        let obj = if self.is_v3() {
            raw[..4].copy_from_slice(&entry[..4]);
            WorldObject {
                num: obj_num,
                parent: entry[4] as u16,
                sibling: entry[5] as u16,
                child: entry[6] as u16,
                attributes: BitArray::new(raw),
            }
        } else {
            raw.copy_from_slice(&entry[..6]);
            WorldObject {
                num: obj_num,
                parent: u16::from_be_bytes([entry[6], entry[7]]),
                sibling: u16::from_be_bytes([entry[8], entry[9]]),
                child: u16::from_be_bytes([entry[10], entry[11]]),
                attributes: BitArray::new(raw),
            }
        };

        debug!(
            "object {} @ {:#06x}: parent={} sibling={} child={} attrs={:?}",
            obj_num,
            addr,
            obj.parent,
            obj.sibling,
            obj.child,
            obj.attribute_list()
        );
        Ok(obj)
    }

    fn attribute_count(&self) -> u16 {
        if self.is_v3() {
            MAX_ATTRIBUTES_V3
        } else {
            MAX_ATTRIBUTES_V4
        }
    }

    fn text(&self) -> &str {
        self.text
    }

    fn label(&self) -> &str {
        &self.label
    }
}
