//! PSEM response codes (ANSI C12.18 §5.3.2)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Response code carried in the first byte of every PSEM response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseCode {
    /// Acknowledge, no problem
    Ok = 0x00,
    /// Error, rejection of the received service request
    Err = 0x01,
    /// Service not supported
    Sns = 0x02,
    /// Insufficient security clearance
    Isc = 0x03,
    /// Operation not possible
    Onp = 0x04,
    /// Inappropriate action requested
    Iar = 0x05,
    /// Device busy
    Bsy = 0x06,
    /// Data not ready
    Dnr = 0x07,
    /// Data locked
    Dlk = 0x08,
    /// Renegotiate request
    Rno = 0x09,
    /// Invalid service sequence state
    Isss = 0x0A,
}

impl ResponseCode {
    /// Parse a response code byte
    ///
    /// Unknown codes are reported as `Err`, which is how the protocol treats
    /// any rejection it cannot classify further.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x00 => ResponseCode::Ok,
            0x02 => ResponseCode::Sns,
            0x03 => ResponseCode::Isc,
            0x04 => ResponseCode::Onp,
            0x05 => ResponseCode::Iar,
            0x06 => ResponseCode::Bsy,
            0x07 => ResponseCode::Dnr,
            0x08 => ResponseCode::Dlk,
            0x09 => ResponseCode::Rno,
            0x0A => ResponseCode::Isss,
            _ => ResponseCode::Err,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn is_ok(self) -> bool {
        self == ResponseCode::Ok
    }

    /// Busy and data-not-ready responses clear up on their own
    pub fn is_retryable(self) -> bool {
        matches!(self, ResponseCode::Bsy | ResponseCode::Dnr)
    }

    pub fn description(self) -> &'static str {
        match self {
            ResponseCode::Ok => "ok",
            ResponseCode::Err => "error",
            ResponseCode::Sns => "service not supported",
            ResponseCode::Isc => "insufficient security clearance",
            ResponseCode::Onp => "operation not possible",
            ResponseCode::Iar => "inappropriate action requested",
            ResponseCode::Bsy => "device busy",
            ResponseCode::Dnr => "data not ready",
            ResponseCode::Dlk => "data locked",
            ResponseCode::Rno => "renegotiate request",
            ResponseCode::Isss => "invalid service sequence state",
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.description(), self.to_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_u8() {
        assert_eq!(ResponseCode::from_u8(0x00), ResponseCode::Ok);
        assert_eq!(ResponseCode::from_u8(0x06), ResponseCode::Bsy);
        assert_eq!(ResponseCode::from_u8(0x0A), ResponseCode::Isss);
        assert_eq!(ResponseCode::from_u8(0x42), ResponseCode::Err);
    }

    #[test]
    fn test_retryable() {
        assert!(ResponseCode::Bsy.is_retryable());
        assert!(ResponseCode::Dnr.is_retryable());
        assert!(!ResponseCode::Isc.is_retryable());
    }

    #[test]
    fn test_display() {
        assert_eq!(ResponseCode::Onp.to_string(), "operation not possible (0x04)");
    }
}
