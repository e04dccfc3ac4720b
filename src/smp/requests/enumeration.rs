// Enumeration management group requests

use crate::smp::{GroupId, Operation, SmpRequest};
use serde::{Deserialize, Serialize};

/// List the groups the server supports
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListSupportedGroups {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListSupportedGroupsResponse {
    pub groups: Vec<u16>,
}

impl SmpRequest for ListSupportedGroups {
    type Response = ListSupportedGroupsResponse;
    const GROUP: GroupId = GroupId::ENUMERATION;
    const COMMAND: u8 = 1;
    const OPERATION: Operation = Operation::Read;
    const NAME: &'static str = "ListSupportedGroups";
}

/// Request details of some or all groups
#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<u16>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDetail {
    pub group: u16,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub handlers: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupDetailsResponse {
    pub groups: Vec<GroupDetail>,
}

impl SmpRequest for GroupDetails {
    type Response = GroupDetailsResponse;
    const GROUP: GroupId = GroupId::ENUMERATION;
    const COMMAND: u8 = 3;
    const OPERATION: Operation = Operation::Read;
    const NAME: &'static str = "GroupDetails";
}
