//! 参考数据帧解码测试
//!
//! 帧数据取自 RaceBox 协议文档中的示例。

use racebox_protocol::*;

const REFERENCE_FRAME_HEX: &str = concat!(
    "B562FF015000A0E70C07E607010A0833",
    "0837190000002AAD4D0E0301EA0BC693",
    "E10D3B376F19618C09000F0109009C03",
    "00002C0700002300000000000000D000",
    "000088A9DD002C010059FDFF7100CE03",
    "2FFF5600FCFF06DB",
);

fn reference_bytes() -> Vec<u8> {
    hex::decode(REFERENCE_FRAME_HEX).expect("valid hex fixture")
}

fn assert_close(actual: f64, expected: f64, eps: f64) {
    assert!(
        (actual - expected).abs() < eps,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn reference_frame_is_well_formed() {
    let bytes = reference_bytes();
    assert_eq!(bytes.len(), FRAME_LEN);

    let frame = RaceboxFrame::from_slice(&bytes).unwrap();
    assert_eq!(frame.class(), RACEBOX_CLASS);
    assert_eq!(frame.msg_id(), RACEBOX_DATA_MSG_ID);
    assert_eq!(frame.declared_payload_len(), PAYLOAD_LEN as u16);
    assert!(frame.has_valid_checksum());
}

#[test]
fn reference_frame_decodes_location() {
    let record = RecordDecoder::new().decode(&reference_bytes()).unwrap();
    let location = record.location;

    assert_close(location.latitude, 42.6719035, 1e-9);
    assert_close(location.longitude, 23.2887238, 1e-9);
    assert_close(location.speed_kmh, 0.126, 1e-9);
    assert_eq!(location.satellites, 11);
    assert_eq!(location.fix_status, FixStatus::Fix3D);
    assert_eq!(location.fix_status.to_string(), "3D fix");
    assert_close(location.altitude_wgs, 625.761, 1e-9);
    assert_close(location.altitude_msl, 590.095, 1e-9);
}

#[test]
fn reference_frame_decodes_motion() {
    let record = RecordDecoder::new().decode(&reference_bytes()).unwrap();
    let motion = record.motion;

    assert_close(motion.acc_x, -0.003, 1e-9);
    assert_close(motion.acc_y, 0.113, 1e-9);
    assert_close(motion.acc_z, 0.974, 1e-9);
    assert_close(motion.rot_x, -2.09, 1e-9);
    assert_close(motion.rot_y, 0.86, 1e-9);
    assert_close(motion.rot_z, -0.04, 1e-9);
}

#[test]
fn reference_frame_passes_strict_decoder() {
    let decoder = RecordDecoder::with_config(DecoderConfig {
        verify_checksum: true,
        validate_coordinates: true,
    });
    assert!(decoder.decode(&reference_bytes()).is_ok());
}

#[test]
fn decoding_is_repeatable() {
    let bytes = reference_bytes();
    let decoder = RecordDecoder::new();

    let first = decoder.decode(&bytes).unwrap();
    let second = decoder.decode(&bytes).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.raw.as_bytes().as_slice(), bytes.as_slice());
}

#[test]
fn short_frame_is_rejected() {
    let bytes = reference_bytes();
    let result = RecordDecoder::new().decode(&bytes[..40]);
    assert_eq!(
        result,
        Err(ProtocolError::InvalidLength {
            expected: FRAME_LEN,
            actual: 40
        })
    );
    assert!(Record::try_from(&bytes[..80]).is_err());
}

#[test]
fn bad_marker_is_rejected() {
    let mut bytes = reference_bytes();
    bytes[0] = 0x00;
    bytes[1] = 0x00;
    assert_eq!(
        RecordDecoder::new().decode(&bytes),
        Err(ProtocolError::InvalidMarker { found: [0x00, 0x00] })
    );
}

#[test]
fn reference_frame_reassembles_from_split() {
    let bytes = reference_bytes();
    let mut assembler = FrameAssembler::new();

    assert_eq!(assembler.add_data(&bytes[..40]).count(), 0);
    let frames: Vec<_> = assembler.add_data(&bytes[40..]).collect();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].as_bytes().as_slice(), bytes.as_slice());
}
