//! Status module mapping symbolic status keys to HTTP codes.
//!
//! This module handles:
//! - The three disjoint status groups (success, client error, server error)
//! - The union lookup table and name resolution

pub mod groups;
pub mod table;

pub use groups::{
    ClientErrorStatus, ErrorStatus, ServerErrorStatus, StatusGroup, StatusKey, SuccessStatus,
};
pub use table::{resolve, StatusTable};
