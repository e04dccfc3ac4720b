// MCUboot Image - Header and TLV trailer of a signed firmware image
//
// Layout (little-endian):
//   header (hdr_size bytes, 32 used): magic, load addr, hdr size,
//     protected TLV size, image size, flags, version
//   body (img_size bytes)
//   optional protected TLV area (magic 0x6908)
//   TLV area (magic 0x6907): {type u8, pad u8, len u16, value}...

use std::fmt;
use thiserror::Error;

pub const IMAGE_MAGIC: u32 = 0x96f3_b83d;
pub const TLV_INFO_MAGIC: u16 = 0x6907;
pub const TLV_PROT_INFO_MAGIC: u16 = 0x6908;
pub const IMAGE_HEADER_SIZE: usize = 32;
const TLV_INFO_SIZE: usize = 4;
const TLV_ENTRY_SIZE: usize = 4;

/// TLV types this client looks for
pub const TLV_SHA256: u8 = 0x10;

/// Errors inspecting a firmware image
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageInfoError {
    #[error("Image truncated: needed {needed} bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    #[error("Bad image magic: {0:#010x}")]
    BadMagic(u32),

    #[error("Bad TLV info magic {magic:#06x} at offset {offset}")]
    BadTlvMagic { offset: usize, magic: u16 },

    #[error("TLV {0:#04x} not found in image")]
    TlvNotFound(u8),
}

/// Image version as stored in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageVersion {
    pub major: u8,
    pub minor: u8,
    pub revision: u16,
    pub build: u32,
}

impl fmt::Display for ImageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}+{}", self.major, self.minor, self.revision, self.build)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    pub load_addr: u32,
    pub hdr_size: u16,
    pub protect_tlv_size: u16,
    pub img_size: u32,
    pub flags: u32,
    pub version: ImageVersion,
}

/// One TLV entry from the unprotected trailer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTlv {
    pub tlv_type: u8,
    pub value: Vec<u8>,
}

/// The parsed header and trailer of an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub header: ImageHeader,
    pub tlvs: Vec<ImageTlv>,
}

fn slice(data: &[u8], offset: usize, needed: usize) -> Result<&[u8], ImageInfoError> {
    offset
        .checked_add(needed)
        .and_then(|end| data.get(offset..end))
        .ok_or(ImageInfoError::Truncated { offset, needed })
}

fn read_u16(data: &[u8], offset: usize) -> Result<u16, ImageInfoError> {
    let b = slice(data, offset, 2)?;
    Ok(u16::from_le_bytes([b[0], b[1]]))
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32, ImageInfoError> {
    let b = slice(data, offset, 4)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

impl ImageHeader {
    pub fn parse(data: &[u8]) -> Result<Self, ImageInfoError> {
        slice(data, 0, IMAGE_HEADER_SIZE)?;
        let magic = read_u32(data, 0)?;
        if magic != IMAGE_MAGIC {
            return Err(ImageInfoError::BadMagic(magic));
        }
        Ok(Self {
            load_addr: read_u32(data, 4)?,
            hdr_size: read_u16(data, 8)?,
            protect_tlv_size: read_u16(data, 10)?,
            img_size: read_u32(data, 12)?,
            flags: read_u32(data, 16)?,
            version: ImageVersion {
                major: data[20],
                minor: data[21],
                revision: read_u16(data, 22)?,
                build: read_u32(data, 24)?,
            },
        })
    }

    /// Offset of the first TLV area, right after the image body
    pub fn tlv_offset(&self) -> usize {
        self.hdr_size as usize + self.img_size as usize
    }
}

impl ImageInfo {
    pub fn parse(data: &[u8]) -> Result<Self, ImageInfoError> {
        let header = ImageHeader::parse(data)?;
        let mut offset = header.tlv_offset();

        // The protected area, when present, precedes the one holding the hash
        if read_u16(data, offset)? == TLV_PROT_INFO_MAGIC {
            offset += read_u16(data, offset + 2)? as usize;
        }

        let magic = read_u16(data, offset)?;
        if magic != TLV_INFO_MAGIC {
            return Err(ImageInfoError::BadTlvMagic { offset, magic });
        }
        let end = offset + read_u16(data, offset + 2)? as usize;
        slice(data, offset, end - offset)?;

        let mut tlvs = Vec::new();
        let mut cursor = offset + TLV_INFO_SIZE;
        while cursor + TLV_ENTRY_SIZE <= end {
            let tlv_type = data[cursor];
            let len = read_u16(data, cursor + 2)? as usize;
            let value = slice(data, cursor + TLV_ENTRY_SIZE, len)?.to_vec();
            tlvs.push(ImageTlv { tlv_type, value });
            cursor += TLV_ENTRY_SIZE + len;
        }

        Ok(Self { header, tlvs })
    }

    pub fn get_tlv(&self, tlv_type: u8) -> Result<&ImageTlv, ImageInfoError> {
        self.tlvs
            .iter()
            .find(|tlv| tlv.tlv_type == tlv_type)
            .ok_or(ImageInfoError::TlvNotFound(tlv_type))
    }

    /// SHA-256 of the image as recorded by the signing tool
    pub fn sha256(&self) -> Result<&[u8], ImageInfoError> {
        self.get_tlv(TLV_SHA256).map(|tlv| tlv.value.as_slice())
    }
}

impl fmt::Display for ImageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "image v{} ({} bytes, header {} bytes, {} TLVs)",
            self.header.version,
            self.header.img_size,
            self.header.hdr_size,
            self.tlvs.len()
        )
    }
}
