//! Fuzz target: RDM message decoder and mute-ack parser
//!
//! Neither may panic; a decoded header must carry a parameter block that
//! fits inside the input.
//!
//! cargo fuzz run fuzz_rdm_message

#![no_main]

use libfuzzer_sys::fuzz_target;
use rdm_discovery::rdm::Uid;
use rdm_discovery::rdm::message::{RdmMessage, decode, parse_mute_ack};

fuzz_target!(|data: &[u8]| {
    if let Some((header, pd)) = decode(data) {
        assert!(pd.len() < data.len());
        let _ = parse_mute_ack(data, &header);
    }
    let (request, _) = RdmMessage::new(Uid::new(0x7FF0, 1), 0).disc_mute(Uid::new(1, 1));
    let _ = parse_mute_ack(data, &request);
});
