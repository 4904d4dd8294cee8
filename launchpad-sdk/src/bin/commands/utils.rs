// Utility functions for CLI commands

use anyhow::{Context, Result};
use launchpad_sdk::{format::format_amount, prelude::*};

/// Parse a hex address
pub fn parse_address(s: &str) -> Result<Address> {
    s.parse::<Address>()
        .with_context(|| format!("Invalid address: {}", s))
}

/// Render an optional 18-decimal amount
pub fn amount_or_unknown(amount: Option<U256>) -> String {
    amount.map(format_amount).unwrap_or_else(|| "unknown".to_string())
}

/// Print success message
pub fn success(msg: &str) {
    println!("[OK] {}", msg);
}

/// Print info message
pub fn info(msg: &str) {
    println!("[INFO] {}", msg);
}

/// Print warning message
pub fn warn(msg: &str) {
    eprintln!("[WARN] {}", msg);
}

/// Print error message
pub fn error(msg: &str) {
    eprintln!("[ERROR] {}", msg);
}
