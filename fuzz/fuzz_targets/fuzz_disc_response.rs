//! Fuzz target: discovery-response validator
//!
//! Arbitrary bytes must classify without panicking, and a UID that comes
//! out must re-encode to a frame that classifies to the same UID.
//!
//! cargo fuzz run fuzz_disc_response

#![no_main]

use libfuzzer_sys::fuzz_target;
use rdm_discovery::rdm::response::encode_discovery_response;
use rdm_discovery::rdm::{DiscoveryResult, classify};

fuzz_target!(|data: &[u8]| {
    if let DiscoveryResult::SingleUid(uid) = classify(Some(data)) {
        let frame = encode_discovery_response(uid, 7);
        assert_eq!(classify(Some(&frame[..])), DiscoveryResult::SingleUid(uid));
    }
});
