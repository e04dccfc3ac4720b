// Image management group requests

use crate::smp::{Bytes, GroupId, Operation, SmpRequest};
use serde::{Deserialize, Serialize};

/// Read the state of the images on the device
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImageStatesRead {}

/// One image slot as reported by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageState {
    #[serde(default)]
    pub image: Option<u32>,
    pub slot: u32,
    pub version: String,
    #[serde(default)]
    pub hash: Option<Bytes>,
    #[serde(default)]
    pub bootable: bool,
    #[serde(default)]
    pub pending: bool,
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub permanent: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageStatesReadResponse {
    #[serde(default)]
    pub images: Vec<ImageState>,
    #[serde(default, rename = "splitStatus")]
    pub split_status: Option<i64>,
}

impl SmpRequest for ImageStatesRead {
    type Response = ImageStatesReadResponse;
    const GROUP: GroupId = GroupId::IMAGE;
    const COMMAND: u8 = 0;
    const OPERATION: Operation = Operation::Read;
    const NAME: &'static str = "ImageStatesRead";
}

/// Mark an image for test or confirm the running image
#[derive(Debug, Clone, Serialize)]
pub struct ImageStatesWrite {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<Bytes>,
    pub confirm: bool,
}

impl SmpRequest for ImageStatesWrite {
    type Response = ImageStatesReadResponse;
    const GROUP: GroupId = GroupId::IMAGE;
    const COMMAND: u8 = 0;
    const OPERATION: Operation = Operation::Write;
    const NAME: &'static str = "ImageStatesWrite";
}

/// One chunk of an image upload
///
/// `len` and `sha` are only sent with the first chunk.
#[derive(Debug, Clone, Serialize)]
pub struct ImageUploadWrite {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub len: Option<u64>,
    pub off: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<Bytes>,
    pub data: Bytes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageUploadWriteResponse {
    pub off: u64,
    #[serde(default, rename = "match")]
    pub matched: Option<bool>,
}

impl SmpRequest for ImageUploadWrite {
    type Response = ImageUploadWriteResponse;
    const GROUP: GroupId = GroupId::IMAGE;
    const COMMAND: u8 = 1;
    const OPERATION: Operation = Operation::Write;
    const NAME: &'static str = "ImageUploadWrite";
}

/// Erase an image slot
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImageErase {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageEraseResponse {}

impl SmpRequest for ImageErase {
    type Response = ImageEraseResponse;
    const GROUP: GroupId = GroupId::IMAGE;
    const COMMAND: u8 = 5;
    const OPERATION: Operation = Operation::Write;
    const NAME: &'static str = "ImageErase";
}
