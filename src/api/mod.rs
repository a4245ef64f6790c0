//! HTTP API handlers, one module per resource.
//!
//! Handlers stay thin: parse and validate input, delegate to the
//! repository, wrap the result. Status-bucket derivation always uses
//! the server's current date.

pub mod dashboard;
pub mod families;
pub mod leaders;
pub mod permissions;
pub mod persons;
pub mod scouts;
pub mod settings;

use axum::Json;

use crate::errors::AppError;

/// Standard handler result: JSON body or a mapped error.
pub type ApiResult<T> = Result<Json<T>, AppError>;
