//! Miner extra-data.

use crate::miner::MAXIMUM_EXTRA_DATA_SIZE;
use alloy_primitives::Bytes;
use alloy_rlp::RlpEncodable;
use tracing::warn;

/// Client name stamped into default extra-data.
const CLIENT_NAME: &str = "n42";

#[derive(RlpEncodable)]
struct ClientVersion {
    version: u32,
    client: &'static str,
    os: &'static str,
    arch: &'static str,
}

/// `major << 16 | minor << 8 | patch` of this crate.
fn packed_version() -> u32 {
    let part = |s: &str| s.parse::<u32>().unwrap_or(0);
    part(env!("CARGO_PKG_VERSION_MAJOR")) << 16
        | part(env!("CARGO_PKG_VERSION_MINOR")) << 8
        | part(env!("CARGO_PKG_VERSION_PATCH"))
}

/// Header extra-data for mined blocks.
///
/// Empty input is replaced by the RLP list `[version, "n42", os, arch]`.
/// Anything longer than [`MAXIMUM_EXTRA_DATA_SIZE`] is dropped.
pub fn make_extra_data(extra: &[u8]) -> Bytes {
    let extra = if extra.is_empty() {
        Bytes::from(alloy_rlp::encode(ClientVersion {
            version: packed_version(),
            client: CLIENT_NAME,
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
        }))
    } else {
        Bytes::copy_from_slice(extra)
    };

    if extra.len() > MAXIMUM_EXTRA_DATA_SIZE {
        warn!(
            target: "node",
            extra = %extra,
            limit = MAXIMUM_EXTRA_DATA_SIZE,
            "Miner extra data exceed limit"
        );
        return Bytes::new();
    }
    extra
}
