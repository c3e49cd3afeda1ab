//! Type tests for the display-controller value types.
//! These types carry hardware indices and pixel layouts between the overlay
//! core and the driver; a wrong value programs the wrong block.

// ── PixelFormat ──────────────────────────────────────────────────────────────

#[test]
fn pixel_format_bytes_match_bits() {
    use platform::PixelFormat;
    assert_eq!(PixelFormat::Rgb565.bytes_per_pixel(), 2);
    assert_eq!(PixelFormat::Rgb888.bytes_per_pixel(), 3);
    assert_eq!(PixelFormat::Xrgb8888.bytes_per_pixel(), 4);
    assert_eq!(PixelFormat::Argb8888.bytes_per_pixel(), 4);
}

#[test]
fn yuv_reports_luma_plane_depth() {
    use platform::PixelFormat;
    assert_eq!(
        PixelFormat::Yuv420.bits_per_pixel(),
        8,
        "planar YUV describes plane 0 only"
    );
}

// ── Pipe / mixer indices ─────────────────────────────────────────────────────

#[test]
fn mixer_indices_are_hardware_numbers() {
    use platform::MixerId;
    assert_eq!(MixerId::Primary.index(), 0);
    assert_eq!(MixerId::Secondary.index(), 1);
}

#[test]
fn base_stage_is_zero() {
    use platform::MixerStage;
    assert_eq!(MixerStage::BASE, MixerStage(0));
    assert_eq!(MixerStage::default(), MixerStage::BASE);
}

#[test]
fn buffer_address_round_trips_raw_value() {
    use platform::BufferAddress;
    assert_eq!(BufferAddress(0x4000_0000).get(), 0x4000_0000);
}

// ── Register map ─────────────────────────────────────────────────────────────

#[test]
fn stream_routing_values() {
    use platform::registers::*;
    assert_eq!(DSI_STREAM_ID, 0xa0);
    assert_eq!(DSI_STREAM_ID_DMA_P0_DMA_S1, 0x10);
    assert_eq!(DSI_TRIGGER_SELECT, 0xa4);
    assert_eq!(DSI_TRIGGER_ON_DMA_P, 0x01);
}

#[test]
fn tear_check_registers() {
    use platform::registers::*;
    assert_eq!(TEAR_CHECK_ENABLE, 0x20c);
    assert_eq!(PRIMARY_START_LINE, 0x210);
    assert_eq!(SECONDARY_START_LINE, 0x214);
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[test]
fn hw_error_messages_are_distinct() {
    use platform::HwError;
    let all = [
        HwError::AllocationFailed,
        HwError::UnsupportedFormat,
        HwError::FormatRejected,
    ];
    for (i, a) in all.iter().enumerate() {
        for b in all.iter().skip(i.saturating_add(1)) {
            assert_ne!(a.to_string(), b.to_string());
        }
    }
}
