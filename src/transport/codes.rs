//! Platform status codes returned by the transports, with their classification.

/// How a failing status code is treated by the inspector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// The structure or class does not exist on this OS build; the domain is silently omitted
    Unavailable,
    /// Anything else; the domain is dropped and the failure logged
    Failed,
}

pub const STATUS_NOT_IMPLEMENTED: u32 = 0xC000_0002;
pub const STATUS_INVALID_INFO_CLASS: u32 = 0xC000_0003;
pub const STATUS_INFO_LENGTH_MISMATCH: u32 = 0xC000_0004;
pub const STATUS_INVALID_PARAMETER: u32 = 0xC000_000D;
pub const STATUS_ACCESS_DENIED: u32 = 0xC000_0022;
pub const STATUS_BUFFER_TOO_SMALL: u32 = 0xC000_0023;
pub const STATUS_NOT_SUPPORTED: u32 = 0xC000_00BB;
pub const STATUS_BUFFER_OVERFLOW: u32 = 0x8000_0005;

pub const WBEM_E_FAILED: u32 = 0x8004_1001;
pub const WBEM_E_NOT_FOUND: u32 = 0x8004_1002;
pub const WBEM_E_ACCESS_DENIED: u32 = 0x8004_1003;
pub const WBEM_E_INVALID_NAMESPACE: u32 = 0x8004_100E;
pub const WBEM_E_INVALID_CLASS: u32 = 0x8004_1010;

pub const TBS_E_INTERNAL_ERROR: u32 = 0x8028_4001;
pub const TBS_E_SERVICE_NOT_RUNNING: u32 = 0x8028_4008;
pub const TBS_E_TPM_NOT_FOUND: u32 = 0x8028_400F;

const TABLE: &[(u32, &str, StatusKind)] = &[
    (STATUS_NOT_IMPLEMENTED, "STATUS_NOT_IMPLEMENTED", StatusKind::Unavailable),
    (STATUS_INVALID_INFO_CLASS, "STATUS_INVALID_INFO_CLASS", StatusKind::Unavailable),
    (STATUS_NOT_SUPPORTED, "STATUS_NOT_SUPPORTED", StatusKind::Unavailable),
    (WBEM_E_NOT_FOUND, "WBEM_E_NOT_FOUND", StatusKind::Unavailable),
    (WBEM_E_INVALID_NAMESPACE, "WBEM_E_INVALID_NAMESPACE", StatusKind::Unavailable),
    (WBEM_E_INVALID_CLASS, "WBEM_E_INVALID_CLASS", StatusKind::Unavailable),
    (TBS_E_TPM_NOT_FOUND, "TBS_E_TPM_NOT_FOUND", StatusKind::Unavailable),
    (TBS_E_SERVICE_NOT_RUNNING, "TBS_E_SERVICE_NOT_RUNNING", StatusKind::Unavailable),
    (STATUS_INFO_LENGTH_MISMATCH, "STATUS_INFO_LENGTH_MISMATCH", StatusKind::Failed),
    (STATUS_INVALID_PARAMETER, "STATUS_INVALID_PARAMETER", StatusKind::Failed),
    (STATUS_ACCESS_DENIED, "STATUS_ACCESS_DENIED", StatusKind::Failed),
    (STATUS_BUFFER_TOO_SMALL, "STATUS_BUFFER_TOO_SMALL", StatusKind::Failed),
    (STATUS_BUFFER_OVERFLOW, "STATUS_BUFFER_OVERFLOW", StatusKind::Failed),
    (WBEM_E_FAILED, "WBEM_E_FAILED", StatusKind::Failed),
    (WBEM_E_ACCESS_DENIED, "WBEM_E_ACCESS_DENIED", StatusKind::Failed),
    (TBS_E_INTERNAL_ERROR, "TBS_E_INTERNAL_ERROR", StatusKind::Failed),
];

/// Find the symbolic name and classification of a status code
pub fn lookup(code: u32) -> Option<(&'static str, StatusKind)> {
    TABLE.iter().find(|(c, _, _)| *c == code).map(|(_, name, kind)| (*name, *kind))
}

/// Resolve a symbolic name (as written in snapshots) back to its code
pub fn code_for_symbol(symbol: &str) -> Option<u32> {
    TABLE.iter().find(|(_, name, _)| name.eq_ignore_ascii_case(symbol)).map(|(c, _, _)| *c)
}
