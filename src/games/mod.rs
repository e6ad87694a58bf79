//! Built-in adapter tables, one module per supported story file.
//!
//! Games without a compiled-in table can be declared in TOML instead,
//! see [`crate::config`].

use crate::adapter::GameAdapter;
use crate::error::Result;

pub mod planetfall;

/// Every built-in adapter, in registration order
pub fn builtin_adapters() -> Result<Vec<GameAdapter>> {
    Ok(vec![planetfall::adapter()?])
}
