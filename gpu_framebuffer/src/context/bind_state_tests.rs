//! Unit tests for bind_state.rs

use crate::context::DeviceBindState;
use crate::device::DeviceHandle;

#[test]
fn test_starts_on_default_target() {
    let state = DeviceBindState::new();
    assert_eq!(state.current(), None);
    assert!(state.is_currently_bound(None));
}

#[test]
fn test_record_and_restore() {
    let handle = DeviceHandle::new(7);
    let mut state = DeviceBindState::new();

    state.record_bound(handle);
    assert!(state.is_currently_bound(handle));
    assert!(!state.is_currently_bound(None));
    assert!(!state.is_currently_bound(DeviceHandle::new(8)));

    state.restore_default();
    assert_eq!(state.current(), None);
}
