// RRCS error codes, as carried in slot 1 of positional responses and in
// the `ErrorCode` member of enumeration structs.

use std::borrow::Cow;

/// Success. Every other code is a device-reported failure.
pub const SUCCESS: i64 = 0;

const TABLE: &[(i64, &str)] = &[
    (0, "Success"),
    (1, "Unknown error"),
    (2, "Invalid parameter"),
    (3, "Invalid port address"),
    (4, "Invalid crosspoint"),
    (5, "Object not found"),
    (6, "Port not found"),
    (7, "Node not found"),
    (8, "Net not found"),
    (9, "Access denied"),
    (10, "Operation failed"),
    (11, "Operation not supported"),
    (12, "Timeout while processing request"),
    (13, "Server is in standby mode"),
    (14, "Invalid key address"),
    (15, "Invalid key label"),
    (16, "Invalid transaction key"),
];

/// Human-readable description of a device error code.
pub fn describe(code: i64) -> Cow<'static, str> {
    TABLE
        .iter()
        .find(|(c, _)| *c == code)
        .map_or_else(
            || Cow::Owned(format!("unknown error code {code}")),
            |(_, text)| Cow::Borrowed(*text),
        )
}
