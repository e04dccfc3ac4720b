// OS management group requests

use crate::smp::{GroupId, Operation, SmpRequest};
use serde::{Deserialize, Serialize};

/// Ask the server to echo a string back
#[derive(Debug, Clone, Serialize)]
pub struct EchoWrite {
    pub d: String,
}

impl EchoWrite {
    pub fn new(message: &str) -> Self {
        Self { d: message.to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EchoWriteResponse {
    pub r: String,
}

impl SmpRequest for EchoWrite {
    type Response = EchoWriteResponse;
    const GROUP: GroupId = GroupId::OS;
    const COMMAND: u8 = 0;
    const OPERATION: Operation = Operation::Write;
    const NAME: &'static str = "EchoWrite";
}

/// Reset the device
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResetWrite {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub force: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResetWriteResponse {}

impl SmpRequest for ResetWrite {
    type Response = ResetWriteResponse;
    const GROUP: GroupId = GroupId::OS;
    const COMMAND: u8 = 5;
    const OPERATION: Operation = Operation::Write;
    const NAME: &'static str = "ResetWrite";
}

/// Read the server's management buffer parameters
#[derive(Debug, Clone, Default, Serialize)]
pub struct McuMgrParametersRead {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McuMgrParametersReadResponse {
    pub buf_size: u32,
    pub buf_count: u32,
}

impl SmpRequest for McuMgrParametersRead {
    type Response = McuMgrParametersReadResponse;
    const GROUP: GroupId = GroupId::OS;
    const COMMAND: u8 = 6;
    const OPERATION: Operation = Operation::Read;
    const NAME: &'static str = "McuMgrParametersRead";
}
