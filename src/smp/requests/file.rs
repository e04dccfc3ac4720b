// File management group requests

use crate::smp::{Bytes, GroupId, Operation, SmpRequest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One chunk of a file download
#[derive(Debug, Clone, Serialize)]
pub struct FileDownload {
    pub off: u64,
    pub name: String,
}

/// `len` is only present in the response to the first chunk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileDownloadResponse {
    pub off: u64,
    pub data: Bytes,
    #[serde(default)]
    pub len: Option<u64>,
}

impl SmpRequest for FileDownload {
    type Response = FileDownloadResponse;
    const GROUP: GroupId = GroupId::FILE;
    const COMMAND: u8 = 0;
    const OPERATION: Operation = Operation::Read;
    const NAME: &'static str = "FileDownload";
}

/// One chunk of a file upload
#[derive(Debug, Clone, Serialize)]
pub struct FileUpload {
    pub off: u64,
    pub data: Bytes,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub len: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileUploadResponse {
    pub off: u64,
}

impl SmpRequest for FileUpload {
    type Response = FileUploadResponse;
    const GROUP: GroupId = GroupId::FILE;
    const COMMAND: u8 = 0;
    const OPERATION: Operation = Operation::Write;
    const NAME: &'static str = "FileUpload";
}

/// Read the size of a file
#[derive(Debug, Clone, Serialize)]
pub struct FileStatus {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileStatusResponse {
    pub len: u64,
}

impl SmpRequest for FileStatus {
    type Response = FileStatusResponse;
    const GROUP: GroupId = GroupId::FILE;
    const COMMAND: u8 = 1;
    const OPERATION: Operation = Operation::Read;
    const NAME: &'static str = "FileStatus";
}

/// Compute a hash or checksum of a file on the device
#[derive(Debug, Clone, Serialize)]
pub struct FileHashChecksum {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub hash_type: Option<String>,
}

/// `output` is a byte string for hashes and an integer for checksums
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileHashChecksumResponse {
    #[serde(rename = "type")]
    pub hash_type: String,
    #[serde(default)]
    pub off: Option<u64>,
    pub len: u64,
    pub output: HashOutput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HashOutput {
    Checksum(u64),
    Hash(Bytes),
}

impl Default for HashOutput {
    fn default() -> Self {
        Self::Checksum(0)
    }
}

impl SmpRequest for FileHashChecksum {
    type Response = FileHashChecksumResponse;
    const GROUP: GroupId = GroupId::FILE;
    const COMMAND: u8 = 2;
    const OPERATION: Operation = Operation::Read;
    const NAME: &'static str = "FileHashChecksum";
}

/// List the hash and checksum types the server supports
#[derive(Debug, Clone, Default, Serialize)]
pub struct SupportedFileHashChecksumTypes {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashChecksumType {
    pub format: u32,
    pub size: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupportedFileHashChecksumTypesResponse {
    pub types: BTreeMap<String, HashChecksumType>,
}

impl SmpRequest for SupportedFileHashChecksumTypes {
    type Response = SupportedFileHashChecksumTypesResponse;
    const GROUP: GroupId = GroupId::FILE;
    const COMMAND: u8 = 3;
    const OPERATION: Operation = Operation::Read;
    const NAME: &'static str = "SupportedFileHashChecksumTypes";
}
