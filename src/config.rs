//! Global configuration for GFI runtime behavior.
//!
//! These switches are set once at startup and read in the stream and
//! parser hot paths, so they live in atomics instead of being threaded
//! through every constructor.

use std::sync::atomic::{AtomicBool, Ordering};

/// Whether `MergeStream` checks that each of its inputs is sorted.
///
/// Checking is on by default in debug builds only.
static VERIFY_SORTED_INPUT: AtomicBool = AtomicBool::new(cfg!(debug_assertions));

/// Whether the GFF3 reader rejects features with an unknown `Parent`.
static STRICT_GFF3: AtomicBool = AtomicBool::new(false);

/// Enable or disable sort verification of merge stream inputs.
///
/// # Example
///
/// ```
/// use gfi_genomics::config;
///
/// // Also check sortedness in release builds
/// config::set_verify_sorted_input(true);
/// assert!(config::verify_sorted_input());
/// ```
#[inline]
pub fn set_verify_sorted_input(enabled: bool) {
    VERIFY_SORTED_INPUT.store(enabled, Ordering::Release);
}

/// Check if merge stream inputs are verified to be sorted.
#[inline]
pub fn verify_sorted_input() -> bool {
    VERIFY_SORTED_INPUT.load(Ordering::Acquire)
}

/// Enable strict GFF3 parsing.
///
/// In strict mode a feature whose `Parent` attribute names an ID that was
/// never defined is a parse error. In lenient mode (the default) such a
/// feature is kept as a top-level feature.
#[inline]
pub fn set_strict_gff3(enabled: bool) {
    STRICT_GFF3.store(enabled, Ordering::Release);
}

/// Check if strict GFF3 parsing is enabled.
#[inline]
pub fn strict_gff3() -> bool {
    STRICT_GFF3.load(Ordering::Acquire)
}
