use super::*;

#[test]
fn fps_rejects_zero_parts() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
}

#[test]
fn fps_frame_conversions() {
    let fps = Fps::new(30, 1).unwrap();
    assert_eq!(fps.secs_to_frames_floor(2.0), 60);
    assert_eq!(fps.secs_to_frames_floor(0.49), 14);
    assert_eq!(fps.secs_to_frames_round(0.49), 15);
    assert!((fps.frames_to_secs(45) - 1.5).abs() < 1e-12);
}

#[test]
fn seq_index_offsets_are_checked() {
    assert_eq!(SeqIndex(5).offset(3), Some(SeqIndex(8)));
    assert_eq!(SeqIndex(5).offset(-5), Some(SeqIndex(0)));
    assert_eq!(SeqIndex(5).offset(-6), None);
    assert_eq!(SeqIndex(2).after(4), SeqIndex(6));
}
