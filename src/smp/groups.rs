// Groups - Protocol group namespaces and their return code tables
//
// Every group owns its own return-code enumeration. Legacy (V1) errors share
// the single MGMT_ERR table instead.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A protocol group identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u16);

impl GroupId {
    pub const OS: Self = Self(0);
    pub const IMAGE: Self = Self(1);
    pub const STATISTICS: Self = Self(2);
    pub const SETTINGS: Self = Self(3);
    pub const LOG: Self = Self(4);
    pub const CRASH: Self = Self(5);
    pub const SPLIT: Self = Self(6);
    pub const RUN: Self = Self(7);
    pub const FILE: Self = Self(8);
    pub const SHELL: Self = Self(9);
    pub const ENUMERATION: Self = Self(10);
    pub const ZEPHYR: Self = Self(63);
    /// First identifier available to application-defined groups
    pub const USER_DEFINED: Self = Self(64);

    /// Human-readable group name, if the group is a well-known one
    pub fn name(&self) -> Option<&'static str> {
        let name = match *self {
            Self::OS => "os",
            Self::IMAGE => "image",
            Self::STATISTICS => "statistics",
            Self::SETTINGS => "settings",
            Self::LOG => "log",
            Self::CRASH => "crash",
            Self::SPLIT => "split",
            Self::RUN => "run",
            Self::FILE => "file",
            Self::SHELL => "shell",
            Self::ENUMERATION => "enumeration",
            Self::ZEPHYR => "zephyr",
            _ => return None,
        };
        Some(name)
    }

    pub fn is_user_defined(&self) -> bool {
        self.0 >= Self::USER_DEFINED.0
    }

    /// Name of a grouped (V2) return code in this group's enumeration
    pub fn rc_name(&self, rc: i64) -> Option<&'static str> {
        if rc == RC_OK {
            return Some("OK");
        }
        if rc == 1 {
            return Some("UNKNOWN");
        }
        let table: &[(i64, &str)] = match *self {
            Self::OS => &[
                (2, "INVALID_FORMAT"),
                (3, "QUERY_YIELDS_NO_ANSWER"),
                (4, "RTC_NOT_SET"),
                (5, "RTC_COMMAND_FAILED"),
            ],
            Self::IMAGE => &[
                (2, "FLASH_CONFIG_QUERY_FAIL"),
                (3, "NO_IMAGE"),
                (4, "NO_TLVS"),
                (5, "INVALID_TLV"),
                (6, "TLV_MULTIPLE_HASHES_FOUND"),
                (7, "TLV_INVALID_SIZE"),
                (8, "HASH_NOT_FOUND"),
                (9, "NO_FREE_SLOT"),
                (10, "FLASH_OPEN_FAILED"),
                (11, "FLASH_READ_FAILED"),
                (12, "FLASH_WRITE_FAILED"),
                (13, "FLASH_ERASE_FAILED"),
                (14, "INVALID_SLOT"),
                (15, "NO_FREE_MEMORY"),
                (16, "FLASH_CONTEXT_ALREADY_SET"),
                (17, "FLASH_CONTEXT_NOT_SET"),
                (18, "FLASH_AREA_DEVICE_NULL"),
                (19, "INVALID_PAGE_OFFSET"),
                (20, "INVALID_OFFSET"),
                (21, "INVALID_LENGTH"),
                (22, "INVALID_IMAGE_HEADER"),
                (23, "INVALID_IMAGE_HEADER_MAGIC"),
                (24, "INVALID_HASH"),
                (25, "INVALID_FLASH_ADDRESS"),
                (26, "VERSION_GET_FAILED"),
                (27, "CURRENT_VERSION_IS_NEWER"),
                (28, "IMAGE_ALREADY_PENDING"),
                (29, "INVALID_IMAGE_VECTOR_TABLE"),
                (30, "INVALID_IMAGE_TOO_LARGE"),
                (31, "INVALID_IMAGE_DATA_OVERRUN"),
                (32, "IMAGE_CONFIRMATION_DENIED"),
                (33, "IMAGE_SETTING_TEST_TO_ACTIVE_DENIED"),
            ],
            Self::STATISTICS => &[(2, "INVALID_GROUP"), (3, "INVALID_STAT_NAME"), (4, "INVALID_STAT_SIZE"), (5, "WALK_ABORTED")],
            Self::FILE => &[
                (2, "INVALID_NAME"),
                (3, "NOT_FOUND"),
                (4, "IS_DIRECTORY"),
                (5, "OPEN_FAILED"),
                (6, "SEEK_FAILED"),
                (7, "READ_FAILED"),
                (8, "TRUNCATE_FAILED"),
                (9, "DELETE_FAILED"),
                (10, "WRITE_FAILED"),
                (11, "OFFSET_NOT_VALID"),
                (12, "OFFSET_LARGER_THAN_FILE"),
                (13, "CHECKSUM_HASH_NOT_FOUND"),
                (14, "MOUNT_POINT_NOT_FOUND"),
                (15, "READ_ONLY_FILESYSTEM"),
                (16, "FILE_EMPTY"),
            ],
            Self::SHELL => &[(2, "COMMAND_TOO_LONG"), (3, "EMPTY_COMMAND")],
            Self::ENUMERATION => &[(2, "TOO_MANY_GROUP_ENTRIES"), (3, "INSUFFICIENT_HEAP_FOR_ENTRIES"), (4, "INDEX_TOO_LARGE")],
            _ => &[],
        };
        table.iter().find(|(code, _)| *code == rc).map(|(_, name)| *name)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}({})", name, self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

/// The return code every group uses for success
pub const RC_OK: i64 = 0;

/// Name of a legacy (V1) MGMT_ERR return code
pub fn mgmt_err_name(rc: i64) -> Option<&'static str> {
    let name = match rc {
        0 => "EOK",
        1 => "EUNKNOWN",
        2 => "ENOMEM",
        3 => "EINVAL",
        4 => "ETIMEOUT",
        5 => "ENOENT",
        6 => "EBADSTATE",
        7 => "EMSGSIZE",
        8 => "ENOTSUP",
        9 => "ECORRUPT",
        10 => "EBUSY",
        11 => "EACCESSDENIED",
        12 => "UNSUPPORTED_TOO_OLD",
        13 => "UNSUPPORTED_TOO_NEW",
        256 => "EPERUSER",
        _ => return None,
    };
    Some(name)
}
