// Shell management group requests

use crate::smp::{GroupId, Operation, SmpRequest};
use serde::{Deserialize, Serialize};

/// Execute a shell command on the device
#[derive(Debug, Clone, Serialize)]
pub struct Execute {
    pub argv: Vec<String>,
}

/// `ret` is the command's own return code, not the protocol's
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub o: String,
    pub ret: i64,
}

impl SmpRequest for Execute {
    type Response = ExecuteResponse;
    const GROUP: GroupId = GroupId::SHELL;
    const COMMAND: u8 = 0;
    const OPERATION: Operation = Operation::Write;
    const NAME: &'static str = "Execute";
}
