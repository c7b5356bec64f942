// Error codes implementation
// Stable codes attached to log events and operator output.

pub mod validation {
    pub const INVALID_INPUT: &str = "VALIDATION_1001";
}

pub mod configuration {
    pub const INVALID_SETTINGS: &str = "CONFIG_2001";
}

pub mod database {
    pub const CONNECTION_FAILED: &str = "DB_4001";
    pub const QUERY_FAILED: &str = "DB_4002";
    pub const DRIVER_ERROR: &str = "DB_4003";
    pub const INVALID_PARAMETER: &str = "DB_4004";
}

pub mod policy {
    pub const CONFIG_UNREADABLE: &str = "POLICY_5001";
    pub const PERSIST_FAILED: &str = "POLICY_5002";
    pub const INVALID_REGEX: &str = "POLICY_5003";
    pub const WATCHER_FAILED: &str = "POLICY_5004";
}

pub mod internal {
    pub const IO_ERROR: &str = "INTERNAL_9001";
    pub const UNEXPECTED: &str = "INTERNAL_9999";
}
