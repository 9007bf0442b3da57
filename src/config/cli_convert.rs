//! CLI to Config conversion utilities

use crate::config::cli;
use crate::distributed::AggregationPolicy;
use crate::matrix::ElementKind;
use anyhow::{Context, Result};

/// Parse a size string (e.g., "64M", "1G", "4k") to bytes
pub fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix("kb").or_else(|| s.strip_suffix('k')) {
        (n, 1024u64)
    } else if let Some(n) = s.strip_suffix("mb").or_else(|| s.strip_suffix('m')) {
        (n, 1024 * 1024)
    } else if let Some(n) = s.strip_suffix("gb").or_else(|| s.strip_suffix('g')) {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = s.strip_suffix('b') {
        (n, 1)
    } else {
        (s.as_str(), 1)
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .with_context(|| format!("Invalid size format: {}", s))?;

    num.checked_mul(multiplier)
        .with_context(|| format!("Size out of range: {}", s))
}

/// Parse a duration string (e.g., "500ms", "5s", "2m") to milliseconds
///
/// A bare number is taken as milliseconds.
pub fn parse_duration_ms(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix("ms") {
        (n, 1u64)
    } else if let Some(n) = s.strip_suffix("sec").or_else(|| s.strip_suffix('s')) {
        (n, 1000)
    } else if let Some(n) = s.strip_suffix("min").or_else(|| s.strip_suffix('m')) {
        (n, 60_000)
    } else {
        (s.as_str(), 1)
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .with_context(|| format!("Invalid duration format: {}", s))?;

    num.checked_mul(multiplier)
        .with_context(|| format!("Duration out of range: {}", s))
}

/// Convert CLI ElementType to matrix ElementKind
pub fn convert_element_type(cli_type: cli::ElementType) -> ElementKind {
    match cli_type {
        cli::ElementType::Int => ElementKind::Int,
        cli::ElementType::Float => ElementKind::Float,
    }
}

/// Convert CLI PolicyType to AggregationPolicy
pub fn convert_policy_type(cli_type: cli::PolicyType) -> AggregationPolicy {
    match cli_type {
        cli::PolicyType::Strict => AggregationPolicy::Strict,
        cli::PolicyType::BestEffort => AggregationPolicy::BestEffort,
    }
}
