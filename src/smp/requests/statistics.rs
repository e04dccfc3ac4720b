// Statistics management group requests

use crate::smp::{GroupId, Operation, SmpRequest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Read the counters of one statistics group
#[derive(Debug, Clone, Serialize)]
pub struct GroupData {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupDataResponse {
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, u64>,
}

impl SmpRequest for GroupData {
    type Response = GroupDataResponse;
    const GROUP: GroupId = GroupId::STATISTICS;
    const COMMAND: u8 = 0;
    const OPERATION: Operation = Operation::Read;
    const NAME: &'static str = "GroupData";
}

/// List the statistics groups
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListOfGroups {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListOfGroupsResponse {
    #[serde(default)]
    pub stat_list: Vec<String>,
}

impl SmpRequest for ListOfGroups {
    type Response = ListOfGroupsResponse;
    const GROUP: GroupId = GroupId::STATISTICS;
    const COMMAND: u8 = 1;
    const OPERATION: Operation = Operation::Read;
    const NAME: &'static str = "ListOfGroups";
}
