// codes.rs
//
// JSON-RPC 2.0 standard error codes plus the framework's single custom
// error code. `WITHOUT_ERROR` is an internal sentinel only; it is never
// serialized onto the wire.

pub const WITHOUT_ERROR: i32 = 0;
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
pub const CUSTOM_ERROR: i32 = -32000;

/// Canonical message for a standard error code. Custom errors (`CUSTOM_ERROR`)
/// carry their own arbitrary message and are not looked up here.
pub fn message_for(code: i32) -> &'static str {
    match code {
        PARSE_ERROR => "Parse error",
        INVALID_REQUEST => "Invalid request",
        METHOD_NOT_FOUND => "Method not found",
        INVALID_PARAMS => "Invalid params",
        INTERNAL_ERROR => "Internal error",
        _ => "Unknown error",
    }
}
