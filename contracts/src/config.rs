//! # System Configuration & Constants
//!
//! Every magic number in VowLock lives here. These values are shared by all
//! escrows and certificates — they are system-level, never per-instance, and
//! once a deployment is live they are fixed for good.

/// Mandatory delay, in seconds, between a withdrawal proposal and the
/// earliest moment it can be executed. 48 hours: long enough for the
/// non-proposing partner to notice and react, short enough not to make the
/// escrow useless for real expenses.
pub const WITHDRAWAL_TIMELOCK_SECS: u64 = 48 * 60 * 60;

/// Shared artwork for every certificate token. One constant reference,
/// identical across all tokens — the per-token data lives in the metadata
/// attributes, not the image.
pub const CERTIFICATE_IMAGE_URI: &str =
    "ipfs://bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi/certificate.svg";
