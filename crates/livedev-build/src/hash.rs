//! Asset fingerprinting.

use livedev_config::BuildMode;
use md5::{Digest, Md5};

/// Placeholder fingerprint used outside production builds.
pub const DEV_HASH: &str = "dev";

/// Length of the hex fingerprint in production builds.
const HASH_LEN: usize = 5;

/// Fingerprint `content` for the given build mode.
///
/// Production builds use the first five hex digits of the MD5 digest;
/// development builds always return [`DEV_HASH`].
#[must_use]
pub fn asset_hash(content: &[u8], mode: BuildMode) -> String {
    match mode {
        BuildMode::Production => {
            let digest = hex::encode(Md5::digest(content));
            digest[..HASH_LEN].to_owned()
        }
        BuildMode::Development => DEV_HASH.to_owned(),
    }
}
