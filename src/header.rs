use std::fmt::Display;
use std::fmt::Error;
use std::fmt::Formatter;

use crate::error::IntrospectError;

pub const HEADER_SIZE: usize = 0x40;

/// Read a big-endian word. Caller guarantees `addr + 1` is in bounds.
pub fn get_mem_addr(bytes: &[u8], addr: usize) -> usize {
    u16::from_be_bytes([bytes[addr], bytes[addr + 1]]) as usize
}

/// The fixed 64-byte story header at the start of every Z-machine image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub release: u16,
    pub serial: String,
    pub base_high_mem: usize,
    pub base_static_mem: usize,
    pub initial_pc: usize,
    pub dictionary: usize,
    pub object_table_addr: usize,
    pub global_variables: usize,
    pub abbrev_table: usize,
    pub len_file: usize,
    pub checksum_file: u16,
}

impl Header {
    pub fn parse(bytes: &[u8]) -> crate::error::Result<Header> {
        if bytes.len() < HEADER_SIZE {
            return Err(IntrospectError::MalformedStory(format!(
                "image is {} bytes, smaller than the {HEADER_SIZE}-byte header",
                bytes.len()
            )));
        }

        let version = bytes[0];
        if !(1..=8).contains(&version) {
            return Err(IntrospectError::MalformedStory(format!(
                "unknown Z-machine version {version}"
            )));
        }

        // Packed file length scales with version (11.1.6)
        let length_scale = match version {
            1..=3 => 2,
            4 | 5 => 4,
            _ => 8,
        };

        Ok(Header {
            version,
            release: get_mem_addr(bytes, 0x02) as u16,
            serial: bytes[0x12..0x18].iter().map(|&b| b as char).collect(),
            base_high_mem: get_mem_addr(bytes, 0x04),
            base_static_mem: get_mem_addr(bytes, 0x0E),
            initial_pc: get_mem_addr(bytes, 0x06),
            dictionary: get_mem_addr(bytes, 0x08),
            object_table_addr: get_mem_addr(bytes, 0x0A),
            global_variables: get_mem_addr(bytes, 0x0C),
            abbrev_table: get_mem_addr(bytes, 0x18),
            len_file: get_mem_addr(bytes, 0x1A) * length_scale,
            checksum_file: get_mem_addr(bytes, 0x1C) as u16,
        })
    }

    /// Release and serial together identify one build of a game
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint {
            release: self.release,
            serial: self.serial.clone(),
            checksum: None,
        }
    }

    /// Like `fingerprint`, but also pinned to the header checksum
    pub fn checked_fingerprint(&self) -> Fingerprint {
        Fingerprint {
            checksum: Some(self.checksum_file),
            ..self.fingerprint()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fingerprint {
    pub release: u16,
    pub serial: String,
    /// Tells apart builds that share release and serial
    #[serde(default)]
    pub checksum: Option<u16>,
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(f, "r{}-s{}", self.release, self.serial)?;
        if let Some(checksum) = self.checksum {
            write!(f, "-c{checksum:04x}")?;
        }
        Ok(())
    }
}

impl Display for Header {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(
            f,
            "
Z-code version:           {}
Release number:           {}
Size of resident memory:  {:#06x}
Start PC:                 {:#06x}
Dictionary address:       {:#06x}
Object table address:     {:#06x}
Global variables address: {:#06x}
Size of dynamic memory:   {:#06x}
Serial number:            {}
Abbreviations address:    {:#06x}
File size:                {:#06x}
Checksum:                 {:#06x}
",
            self.version,
            self.release,
            self.base_high_mem,
            self.initial_pc,
            self.dictionary,
            self.object_table_addr,
            self.global_variables,
            self.base_static_mem,
            self.serial,
            self.abbrev_table,
            self.len_file,
            self.checksum_file,
        )
    }
}
