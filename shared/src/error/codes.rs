//! Unified error codes for the delivery platform
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Basket errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Catalog (menu) errors
//! - 7xxx: Store errors
//! - 8xxx: Account errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so clients can switch on a
/// number instead of parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1002,
    /// Token is invalid
    TokenInvalid = 1003,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// A specific role is required
    RoleRequired = 2002,

    // ==================== 3xxx: Basket ====================
    /// The buyer has no basket
    BasketNotFound = 3001,
    /// The basket has no items
    BasketEmpty = 3002,
    /// Basket line not found
    BasketItemNotFound = 3003,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order is no longer in the PLACED state
    OrderNotPlaced = 4002,
    /// Order has no items
    OrderEmpty = 4003,
    /// Requested status is not a valid transition target
    InvalidStatusTransition = 4004,
    /// Items belong to more than one store
    MixedStoreOrder = 4005,
    /// Order total is below the store's minimum
    BelowMinimumOrder = 4006,

    // ==================== 5xxx: Payment ====================
    /// Buyer deposit does not cover the order total
    InsufficientBalance = 5001,

    // ==================== 6xxx: Catalog ====================
    /// Menu item not found
    MenuNotFound = 6001,
    /// Menu item is sold out
    MenuSoldOut = 6002,
    /// Menu item has been removed
    MenuDeleted = 6003,
    /// Menu option not found
    OptionNotFound = 6004,

    // ==================== 7xxx: Store ====================
    /// Store not found
    StoreNotFound = 7001,
    /// Store has been closed
    StoreDeleted = 7002,

    // ==================== 8xxx: Account ====================
    /// User not found (or deleted)
    UserNotFound = 8001,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9003,
    /// Upstream network error
    NetworkError = 9004,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Get the default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            Self::Success => "Success",
            Self::Unknown => "Unknown error",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::AlreadyExists => "Resource already exists",
            Self::InvalidRequest => "Invalid request",
            Self::InvalidFormat => "Invalid format",
            Self::RequiredField => "Required field missing",
            Self::ValueOutOfRange => "Value out of range",

            // Auth
            Self::NotAuthenticated => "Not authenticated",
            Self::TokenExpired => "Token has expired",
            Self::TokenInvalid => "Invalid token",

            // Permission
            Self::PermissionDenied => "Permission denied",
            Self::RoleRequired => "Role required",

            // Basket
            Self::BasketNotFound => "Basket not found",
            Self::BasketEmpty => "Basket is empty",
            Self::BasketItemNotFound => "Basket item not found",

            // Order
            Self::OrderNotFound => "Order not found",
            Self::OrderNotPlaced => "Order has already been processed",
            Self::OrderEmpty => "Order has no items",
            Self::InvalidStatusTransition => "Invalid status transition",
            Self::MixedStoreOrder => "Items from different stores cannot be ordered together",
            Self::BelowMinimumOrder => "Order total is below the minimum order amount",

            // Payment
            Self::InsufficientBalance => "Insufficient balance",

            // Catalog
            Self::MenuNotFound => "Menu not found",
            Self::MenuSoldOut => "Menu is sold out",
            Self::MenuDeleted => "Menu has been removed",
            Self::OptionNotFound => "Menu option not found",

            // Store
            Self::StoreNotFound => "Store not found",
            Self::StoreDeleted => "Store has been closed",

            // Account
            Self::UserNotFound => "User not found",

            // System
            Self::InternalError => "Internal server error",
            Self::DatabaseError => "Database error",
            Self::ConfigError => "Configuration error",
            Self::NetworkError => "Network error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code as u16
    }
}

/// Error returned when converting an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(Self::Success),
            1 => Ok(Self::Unknown),
            2 => Ok(Self::ValidationFailed),
            3 => Ok(Self::NotFound),
            4 => Ok(Self::AlreadyExists),
            5 => Ok(Self::InvalidRequest),
            6 => Ok(Self::InvalidFormat),
            7 => Ok(Self::RequiredField),
            8 => Ok(Self::ValueOutOfRange),

            // Auth
            1001 => Ok(Self::NotAuthenticated),
            1002 => Ok(Self::TokenExpired),
            1003 => Ok(Self::TokenInvalid),

            // Permission
            2001 => Ok(Self::PermissionDenied),
            2002 => Ok(Self::RoleRequired),

            // Basket
            3001 => Ok(Self::BasketNotFound),
            3002 => Ok(Self::BasketEmpty),
            3003 => Ok(Self::BasketItemNotFound),

            // Order
            4001 => Ok(Self::OrderNotFound),
            4002 => Ok(Self::OrderNotPlaced),
            4003 => Ok(Self::OrderEmpty),
            4004 => Ok(Self::InvalidStatusTransition),
            4005 => Ok(Self::MixedStoreOrder),
            4006 => Ok(Self::BelowMinimumOrder),

            // Payment
            5001 => Ok(Self::InsufficientBalance),

            // Catalog
            6001 => Ok(Self::MenuNotFound),
            6002 => Ok(Self::MenuSoldOut),
            6003 => Ok(Self::MenuDeleted),
            6004 => Ok(Self::OptionNotFound),

            // Store
            7001 => Ok(Self::StoreNotFound),
            7002 => Ok(Self::StoreDeleted),

            // Account
            8001 => Ok(Self::UserNotFound),

            // System
            9001 => Ok(Self::InternalError),
            9002 => Ok(Self::DatabaseError),
            9003 => Ok(Self::ConfigError),
            9004 => Ok(Self::NetworkError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::ValueOutOfRange.code(), 8);
        assert_eq!(ErrorCode::NotAuthenticated.code(), 1001);
        assert_eq!(ErrorCode::PermissionDenied.code(), 2001);
        assert_eq!(ErrorCode::BasketEmpty.code(), 3002);
        assert_eq!(ErrorCode::OrderNotPlaced.code(), 4002);
        assert_eq!(ErrorCode::BelowMinimumOrder.code(), 4006);
        assert_eq!(ErrorCode::InsufficientBalance.code(), 5001);
        assert_eq!(ErrorCode::MenuSoldOut.code(), 6002);
        assert_eq!(ErrorCode::StoreDeleted.code(), 7002);
        assert_eq!(ErrorCode::UserNotFound.code(), 8001);
        assert_eq!(ErrorCode::InternalError.code(), 9001);
    }

    #[test]
    fn test_is_success() {
        assert!(ErrorCode::Success.is_success());
        assert!(!ErrorCode::Unknown.is_success());
        assert!(!ErrorCode::OrderNotFound.is_success());
    }

    #[test]
    fn test_try_from_valid() {
        assert_eq!(ErrorCode::try_from(0), Ok(ErrorCode::Success));
        assert_eq!(ErrorCode::try_from(3001), Ok(ErrorCode::BasketNotFound));
        assert_eq!(ErrorCode::try_from(4002), Ok(ErrorCode::OrderNotPlaced));
        assert_eq!(ErrorCode::try_from(6004), Ok(ErrorCode::OptionNotFound));
        assert_eq!(ErrorCode::try_from(9004), Ok(ErrorCode::NetworkError));
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(999), Err(InvalidErrorCode(999)));
        assert_eq!(ErrorCode::try_from(4999), Err(InvalidErrorCode(4999)));
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_string(&ErrorCode::InsufficientBalance).unwrap();
        assert_eq!(json, "5001");
    }

    #[test]
    fn test_deserialize() {
        let code: ErrorCode = serde_json::from_str("4006").unwrap();
        assert_eq!(code, ErrorCode::BelowMinimumOrder);
    }

    #[test]
    fn test_deserialize_invalid() {
        let result: Result<ErrorCode, _> = serde_json::from_str("12345");
        assert!(result.is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ErrorCode::OrderNotFound), "4001");
        assert_eq!(format!("{}", ErrorCode::Success), "0");
    }

    #[test]
    fn test_message() {
        assert_eq!(ErrorCode::BasketEmpty.message(), "Basket is empty");
        assert_eq!(ErrorCode::InsufficientBalance.message(), "Insufficient balance");
        assert_eq!(
            ErrorCode::OrderNotPlaced.message(),
            "Order has already been processed"
        );
    }

    #[test]
    fn test_invalid_error_code_display() {
        assert_eq!(InvalidErrorCode(42).to_string(), "invalid error code: 42");
    }

    #[test]
    fn test_every_code_survives_u16() {
        let all = [
            ErrorCode::Success,
            ErrorCode::Unknown,
            ErrorCode::ValidationFailed,
            ErrorCode::NotFound,
            ErrorCode::AlreadyExists,
            ErrorCode::InvalidRequest,
            ErrorCode::InvalidFormat,
            ErrorCode::RequiredField,
            ErrorCode::ValueOutOfRange,
            ErrorCode::NotAuthenticated,
            ErrorCode::TokenExpired,
            ErrorCode::TokenInvalid,
            ErrorCode::PermissionDenied,
            ErrorCode::RoleRequired,
            ErrorCode::BasketNotFound,
            ErrorCode::BasketEmpty,
            ErrorCode::BasketItemNotFound,
            ErrorCode::OrderNotFound,
            ErrorCode::OrderNotPlaced,
            ErrorCode::OrderEmpty,
            ErrorCode::InvalidStatusTransition,
            ErrorCode::MixedStoreOrder,
            ErrorCode::BelowMinimumOrder,
            ErrorCode::InsufficientBalance,
            ErrorCode::MenuNotFound,
            ErrorCode::MenuSoldOut,
            ErrorCode::MenuDeleted,
            ErrorCode::OptionNotFound,
            ErrorCode::StoreNotFound,
            ErrorCode::StoreDeleted,
            ErrorCode::UserNotFound,
            ErrorCode::InternalError,
            ErrorCode::DatabaseError,
            ErrorCode::ConfigError,
            ErrorCode::NetworkError,
        ];
        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate value {}", code.code());
            assert_eq!(ErrorCode::try_from(u16::from(code)), Ok(code));
        }
    }
}
