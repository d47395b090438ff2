//! Integration tests for the reliable transport over a scripted mock
//! channel: fragmentation, acknowledgement handling, retries, sequence
//! wraparound, busy/reset semantics, and receive-side validation.

use audiomodem::constants::{ACK, EOT, NAK, SOH};
use audiomodem::transport::packet::{next_sequence, Packet};
use audiomodem::{
    AudioModemError, ControlByte, MockChannel, ReliableTransport, TransportConfig, TransportPhase,
};
use std::time::Duration;

fn transport_with(
    channel: MockChannel,
    timeout_ms: u64,
    max_retries: u8,
    max_payload_size: usize,
) -> ReliableTransport<MockChannel> {
    ReliableTransport::with_config(
        channel,
        TransportConfig {
            timeout: Duration::from_millis(timeout_ms),
            max_retries,
            max_payload_size,
        },
    )
    .unwrap()
}

#[test]
fn test_config_validation() {
    let bad = TransportConfig {
        max_payload_size: 0,
        ..TransportConfig::default()
    };
    assert!(bad.validate().is_err());

    let bad = TransportConfig {
        max_payload_size: 300,
        ..TransportConfig::default()
    };
    assert!(matches!(
        ReliableTransport::with_config(MockChannel::new(), bad),
        Err(AudioModemError::InvalidConfig(_))
    ));
}

#[tokio::test]
async fn test_send_single_fragment() {
    let channel = MockChannel::new();
    channel.queue_rx(&[ACK]);
    let mut transport = transport_with(channel.clone(), 1000, 3, 128);

    transport.send(b"hello").await.unwrap();
    assert_eq!(transport.phase(), TransportPhase::Idle);

    let tx = channel.tx_data();
    assert_eq!(tx.len(), 2);
    let packet = Packet::parse(&tx[0]).unwrap();
    assert_eq!(packet.sequence, 1);
    assert_eq!(packet.payload, b"hello");
    assert_eq!(tx[1], vec![EOT]);
    assert_eq!(transport.stats().packets_sent, 1);
    assert_eq!(transport.stats().retransmissions, 0);
}

#[tokio::test]
async fn test_send_fragments_large_payload() {
    let channel = MockChannel::new();
    for _ in 0..3 {
        channel.queue_rx(&[ACK]);
    }
    let mut transport = transport_with(channel.clone(), 1000, 3, 4);

    transport.send(&[0u8; 10]).await.unwrap();

    let tx = channel.tx_data();
    assert_eq!(tx.len(), 4);
    let sizes: Vec<usize> = tx[..3]
        .iter()
        .map(|wire| Packet::parse(wire).unwrap().payload.len())
        .collect();
    assert_eq!(sizes, vec![4, 4, 2]);
    let seqs: Vec<u8> = tx[..3]
        .iter()
        .map(|wire| Packet::parse(wire).unwrap().sequence)
        .collect();
    assert_eq!(seqs, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_send_empty_payload_as_one_zero_length_fragment() {
    let channel = MockChannel::new();
    channel.queue_rx(&[ACK]);
    let mut transport = transport_with(channel.clone(), 1000, 3, 128);

    transport.send(&[]).await.unwrap();

    let tx = channel.tx_data();
    assert_eq!(tx.len(), 2);
    let packet = Packet::parse(&tx[0]).unwrap();
    assert_eq!(packet.sequence, 1);
    assert!(packet.payload.is_empty());
}

#[tokio::test]
async fn test_send_sequence_wraps_through_255() {
    let channel = MockChannel::new();
    for _ in 0..300 {
        channel.queue_rx(&[ACK]);
    }
    let mut transport = transport_with(channel.clone(), 1000, 3, 1);

    transport.send(&[0xAB; 300]).await.unwrap();

    let tx = channel.tx_data();
    assert_eq!(tx.len(), 301);
    let seq_254 = Packet::parse(&tx[253]).unwrap().sequence;
    let seq_255 = Packet::parse(&tx[254]).unwrap().sequence;
    let seq_256 = Packet::parse(&tx[255]).unwrap().sequence;
    assert_eq!((seq_254, seq_255, seq_256), (254, 255, 1));
    assert_eq!(next_sequence(seq_255), seq_256);
}

#[tokio::test]
async fn test_send_retries_on_nak_then_succeeds() {
    let channel = MockChannel::new();
    channel.queue_rx(&[NAK]);
    channel.queue_rx(&[NAK]);
    channel.queue_rx(&[ACK]);
    let mut transport = transport_with(channel.clone(), 1000, 3, 128);

    transport.send(&[0x42]).await.unwrap();

    let tx = channel.tx_data();
    // Original, two retransmissions, EOT.
    assert_eq!(tx.len(), 4);
    assert_eq!(tx[0], tx[1]);
    assert_eq!(tx[1], tx[2]);
    assert_eq!(transport.stats().retransmissions, 2);
}

#[tokio::test]
async fn test_send_fails_after_max_nak_retries() {
    let channel = MockChannel::new();
    for _ in 0..5 {
        channel.queue_rx(&[NAK]);
    }
    let mut transport = transport_with(channel.clone(), 1000, 2, 128);

    let result = transport.send(&[0x42]).await;
    assert!(matches!(
        result,
        Err(AudioModemError::MaxRetriesExceeded { attempts: 3 })
    ));
    assert_eq!(transport.phase(), TransportPhase::Idle);
    // Original + 2 retransmissions, no EOT.
    assert_eq!(channel.tx_data().len(), 3);
}

#[tokio::test]
async fn test_send_timeout_retries_exactly_once_per_expiry() {
    let channel = MockChannel::new();
    let mut transport = transport_with(channel.clone(), 30, 2, 128);

    let result = transport.send(&[0x42]).await;
    assert!(matches!(
        result,
        Err(AudioModemError::MaxRetriesExceeded { .. })
    ));
    // One original send plus exactly max_retries timeout-driven resends.
    assert_eq!(channel.tx_data().len(), 3);
    assert_eq!(transport.stats().retransmissions, 2);
}

#[tokio::test]
async fn test_send_ignores_stray_data_while_waiting() {
    let channel = MockChannel::new();
    channel.queue_rx(&[0x11, 0x22, 0x33]);
    channel.queue_rx(&[0x7F]);
    channel.queue_rx(&[ACK]);
    let mut transport = transport_with(channel.clone(), 1000, 3, 128);

    transport.send(&[0x01]).await.unwrap();
    assert_eq!(transport.stats().retransmissions, 0);
}

#[tokio::test]
async fn test_send_propagates_channel_failure() {
    let channel = MockChannel::new();
    channel.set_next_error("speaker unplugged");
    let mut transport = transport_with(channel, 1000, 3, 128);

    assert!(matches!(
        transport.send(&[0x42]).await,
        Err(AudioModemError::ModemError(_))
    ));
    assert_eq!(transport.phase(), TransportPhase::Idle);
}

#[tokio::test]
async fn test_receive_in_sequence_payloads() {
    let channel = MockChannel::new();
    channel.queue_rx(&Packet::new(1, b"acoustic ".to_vec()).unwrap().serialize());
    channel.queue_rx(&Packet::new(2, b"channel".to_vec()).unwrap().serialize());
    channel.queue_rx(&[EOT]);
    let mut transport = transport_with(channel.clone(), 1000, 3, 128);

    let payload = transport.receive().await.unwrap();
    assert_eq!(payload, b"acoustic channel");
    assert_eq!(transport.phase(), TransportPhase::Idle);

    let tx = channel.tx_data();
    assert_eq!(tx, vec![vec![ACK], vec![ACK]]);
    assert_eq!(transport.stats().packets_received, 2);
    assert_eq!(transport.stats().acks_sent, 2);
}

#[tokio::test]
async fn test_receive_naks_out_of_sequence_packet() {
    let channel = MockChannel::new();
    channel.queue_rx(&Packet::new(7, vec![0xAA]).unwrap().serialize());
    channel.queue_rx(&Packet::new(1, vec![0xBB]).unwrap().serialize());
    channel.queue_rx(&[EOT]);
    let mut transport = transport_with(channel.clone(), 1000, 3, 128);

    let payload = transport.receive().await.unwrap();
    assert_eq!(payload, vec![0xBB]);

    let tx = channel.tx_data();
    assert_eq!(tx, vec![vec![NAK], vec![ACK]]);
    assert_eq!(transport.stats().dropped_packets, 1);
}

#[tokio::test]
async fn test_receive_naks_corrupted_packet_and_keeps_expected_seq() {
    let mut corrupted = Packet::new(1, vec![0x10, 0x20]).unwrap().serialize();
    let last = corrupted.len() - 1;
    corrupted[last] ^= 0x01;

    let channel = MockChannel::new();
    channel.queue_rx(&corrupted);
    channel.queue_rx(&Packet::new(1, vec![0x10, 0x20]).unwrap().serialize());
    channel.queue_rx(&[EOT]);
    let mut transport = transport_with(channel.clone(), 1000, 3, 128);

    let payload = transport.receive().await.unwrap();
    // Expected sequence was not advanced by the rejected packet.
    assert_eq!(payload, vec![0x10, 0x20]);
    assert_eq!(channel.tx_data(), vec![vec![NAK], vec![ACK]]);
    assert_eq!(transport.stats().parse_errors, 1);
}

#[tokio::test]
async fn test_receive_treats_lone_unknown_byte_as_parse_error() {
    let channel = MockChannel::new();
    channel.queue_rx(&[SOH]);
    channel.queue_rx(&[EOT]);
    let mut transport = transport_with(channel.clone(), 1000, 3, 128);

    let payload = transport.receive().await.unwrap();
    assert!(payload.is_empty());
    assert_eq!(transport.stats().parse_errors, 1);
}

#[tokio::test]
async fn test_send_control_emits_single_byte() {
    let channel = MockChannel::new();
    let mut transport = transport_with(channel.clone(), 1000, 3, 128);

    transport.send_control(ControlByte::Nak).await.unwrap();
    assert_eq!(channel.tx_data(), vec![vec![NAK]]);
    assert_eq!(transport.stats().control_bytes_sent, 1);
}

#[tokio::test]
async fn test_busy_after_abandoned_operation_until_reset() {
    let channel = MockChannel::new();
    let mut transport = transport_with(channel, 5000, 3, 128);

    {
        // Drive a receive briefly, then abandon it mid-flight.
        let receive = transport.receive();
        tokio::pin!(receive);
        tokio::select! {
            _ = &mut receive => panic!("receive completed with no input"),
            _ = tokio::time::sleep(Duration::from_millis(20)) => {}
        }
    }

    assert_eq!(transport.phase(), TransportPhase::Receiving);
    assert!(matches!(
        transport.send(&[0x01]).await,
        Err(AudioModemError::Busy)
    ));
    assert!(matches!(
        transport.receive().await,
        Err(AudioModemError::Busy)
    ));

    transport.reset().await.unwrap();
    assert_eq!(transport.phase(), TransportPhase::Idle);
}

#[tokio::test]
async fn test_reset_signal_cancels_inflight_receive() {
    let channel = MockChannel::new();
    let mut transport = transport_with(channel, 5000, 3, 128);
    let reset = transport.reset_signal();

    let task = tokio::spawn(async move {
        let result = transport.receive().await;
        (transport, result)
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    reset.trigger();

    let (mut transport, result) = task.await.unwrap();
    assert!(matches!(result, Err(AudioModemError::Reset)));
    assert_eq!(transport.phase(), TransportPhase::Idle);

    // The transport is immediately usable again.
    transport.reset().await.unwrap();
    assert_eq!(transport.phase(), TransportPhase::Idle);
}

#[tokio::test]
async fn test_reset_signal_cancels_inflight_send() {
    let channel = MockChannel::new();
    let mut transport = transport_with(channel.clone(), 5000, 10, 128);
    let reset = transport.reset_signal();

    let task = tokio::spawn(async move { transport.send(&[0x42]).await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    reset.trigger();

    assert!(matches!(
        task.await.unwrap(),
        Err(AudioModemError::Reset)
    ));
    // Only the original transmission went out.
    assert_eq!(channel.tx_data().len(), 1);
}

#[tokio::test]
async fn test_reset_clears_statistics_and_channel() {
    let channel = MockChannel::new();
    channel.queue_rx(&[ACK]);
    let mut transport = transport_with(channel.clone(), 1000, 3, 128);
    transport.send(&[0x55]).await.unwrap();
    assert!(transport.stats().packets_sent > 0);

    transport.reset().await.unwrap();
    assert_eq!(transport.stats().packets_sent, 0);
    assert_eq!(channel.reset_count(), 1);
}

#[tokio::test]
async fn test_configure_rejected_while_stuck_mid_operation() {
    let channel = MockChannel::new();
    let mut transport = transport_with(channel, 5000, 3, 128);

    {
        let receive = transport.receive();
        tokio::pin!(receive);
        tokio::select! {
            _ = &mut receive => panic!("receive completed with no input"),
            _ = tokio::time::sleep(Duration::from_millis(10)) => {}
        }
    }

    assert!(matches!(
        transport.configure(TransportConfig::default()),
        Err(AudioModemError::Busy)
    ));
}
