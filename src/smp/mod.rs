// SMP module - THE CODEC
// Header layout, CBOR message bodies, link framing, typed requests and
// firmware image inspection

mod framing;
mod groups;
mod header;
mod mcuboot;
mod message;
pub mod requests;

pub use header::{HeaderError, Operation, SmpHeader, SmpVersion, HEADER_SIZE};

pub use groups::{mgmt_err_name, GroupId, RC_OK};

pub use message::{
    encode_request, encode_response, map_get, Bytes, MessageError, RawResponse, SmpRequest,
};

pub use framing::{
    crc16_xmodem, encode_serial, max_serial_packet, FrameError, PacketAssembler, SerialDecoder,
    DEFAULT_LINE_LENGTH, SERIAL_CONTINUE, SERIAL_START,
};

pub use mcuboot::{
    ImageHeader, ImageInfo, ImageInfoError, ImageTlv, ImageVersion, IMAGE_HEADER_SIZE, IMAGE_MAGIC,
    TLV_INFO_MAGIC, TLV_PROT_INFO_MAGIC, TLV_SHA256,
};
