#![no_main]

use audiomodem::transport::packet::Packet;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // The parser must reject or accept any input without panicking.
    let _ = Packet::parse(data);

    // A parse that succeeds must round-trip through serialize.
    if let Ok(packet) = Packet::parse(data) {
        let wire = packet.serialize();
        let reparsed = Packet::parse(&wire).expect("serialized packet must parse");
        assert_eq!(reparsed, packet);
    }

    // Exercise the length-field validation with a coherent header.
    if data.len() >= 6 {
        let mut framed = data.to_vec();
        framed[0] = 0x01;
        framed[2] = !framed[1];
        let _ = Packet::parse(&framed);
    }
});
