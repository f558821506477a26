//! FFI bindings for Focus Meter
//!
//! C-compatible functions for embedding the focus estimator in a host
//! application that owns capture and landmark detection. Strings crossing
//! the boundary are null-terminated; strings returned by this module must be
//! freed with `focus_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::clock::ManualClock;
use crate::config::FocusConfig;
use crate::ear::eye_aspect_ratio;
use crate::error::FocusError;
use crate::recording::RecordingAdapter;
use crate::report::ReportEncoder;
use crate::session::FocusSession;
use crate::types::{EyeLandmarks, Point2, EYE_LANDMARK_COUNT};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

unsafe fn cstr_to_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Compute the eye aspect ratio of one eye.
///
/// `xy` holds the six eye points as interleaved `x, y` pairs, so `len` must
/// be 12.
///
/// # Safety
/// - `xy` must point to `len` readable doubles.
/// - `out` must point to a writable double.
/// - Returns 0 on success and -1 on error; call `focus_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn focus_eye_aspect_ratio(xy: *const f64, len: usize, out: *mut f64) -> i32 {
    clear_last_error();

    if xy.is_null() || out.is_null() {
        set_last_error("Null pointer argument");
        return -1;
    }
    if len != EYE_LANDMARK_COUNT * 2 {
        set_last_error(
            &FocusError::InvalidLandmarkCount {
                expected: EYE_LANDMARK_COUNT,
                actual: len / 2,
            }
            .to_string(),
        );
        return -1;
    }

    let coords = std::slice::from_raw_parts(xy, len);
    let points: Vec<Point2> = coords
        .chunks_exact(2)
        .map(|pair| Point2::new(pair[0], pair[1]))
        .collect();

    let result = EyeLandmarks::try_from(points.as_slice()).and_then(|eye| eye_aspect_ratio(&eye));
    match result {
        Ok(ear) => {
            *out = ear;
            0
        }
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

// ============================================================================
// Session API
// ============================================================================

/// Opaque handle to a focus session driven by caller timestamps
pub struct FocusSessionHandle {
    session: FocusSession<ManualClock>,
    clock: ManualClock,
}

/// Start a new focus session.
///
/// A `threshold` of zero or less selects the default EAR threshold.
///
/// # Safety
/// - Returns a pointer that must be released with `focus_session_finish` or
///   `focus_session_free`.
/// - Returns NULL on error; call `focus_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn focus_session_new(threshold: f64) -> *mut FocusSessionHandle {
    clear_last_error();

    let config = if threshold <= 0.0 {
        Ok(FocusConfig::default())
    } else {
        FocusConfig::with_threshold(threshold)
    };

    let clock = ManualClock::new();
    match config.and_then(|config| FocusSession::with_clock(config, clock.clone())) {
        Ok(session) => Box::into_raw(Box::new(FocusSessionHandle { session, clock })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Feed one `focus.frame.v1` JSON line to a session.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `focus_session_new`.
/// - `line` must be a valid null-terminated C string.
/// - Returns the frame's focus flag (1 focused, 0 distracted), or -1 on
///   error; call `focus_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn focus_session_observe_ndjson(
    handle: *mut FocusSessionHandle,
    line: *const c_char,
) -> i32 {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null session pointer");
        return -1;
    }
    let handle = &mut *handle;

    let line = match cstr_to_str(line) {
        Some(s) => s,
        None => {
            set_last_error("Invalid frame string pointer");
            return -1;
        }
    };

    match observe_line(handle, line) {
        Ok(flag) => i32::from(flag),
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

fn observe_line(handle: &mut FocusSessionHandle, line: &str) -> Result<u8, FocusError> {
    let frame = RecordingAdapter::parse_line(line)?
        .ok_or_else(|| FocusError::ParseError("Empty frame line".to_string()))?;
    frame.validate()?;
    let faces = frame.face_landmarks()?;

    if let Some(last) = handle.session.timeline().last_time() {
        if frame.t <= last {
            return Err(FocusError::NonMonotonicTimestamp {
                previous: last,
                current: frame.t,
            });
        }
    }

    handle.clock.set(frame.t);
    let update = handle.session.process_faces(frame.t, &faces)?;
    Ok(update.classification.state.as_flag())
}

/// End a session and return its report as JSON.
///
/// The open focused interval is closed at the last observed frame time.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `focus_session_new`.
/// - The handle is consumed; it must not be used or freed afterwards.
/// - Returns a newly allocated string that must be freed with `focus_free_string`.
/// - Returns NULL on error; call `focus_last_error` for the message.
#[no_mangle]
pub unsafe extern "C" fn focus_session_finish(handle: *mut FocusSessionHandle) -> *mut c_char {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }
    let handle = Box::from_raw(handle);
    let summary = handle.session.finish();

    match ReportEncoder::new().encode_to_json(&summary) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a session without producing a report.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `focus_session_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn focus_session_free(handle: *mut FocusSessionHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Focus Meter functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Focus Meter function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn focus_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Focus Meter call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn focus_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn focus_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::tests::frame_with_ear;

    fn frame_line(t: f64, ear: Option<f64>) -> CString {
        CString::new(serde_json::to_string(&frame_with_ear(t, ear)).unwrap()).unwrap()
    }

    fn last_error() -> String {
        unsafe {
            let error = focus_last_error();
            assert!(!error.is_null());
            CStr::from_ptr(error).to_str().unwrap().to_string()
        }
    }

    #[test]
    fn test_ffi_eye_aspect_ratio() {
        let xy = [0.0, 0.0, 1.0, 1.0, 3.0, 1.0, 4.0, 0.0, 3.0, -1.0, 1.0, -1.0];
        let mut out = 0.0;
        unsafe {
            assert_eq!(focus_eye_aspect_ratio(xy.as_ptr(), xy.len(), &mut out), 0);
        }
        assert!((out - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_ffi_eye_aspect_ratio_rejects_bad_input() {
        let short = [0.0; 10];
        let mut out = 0.0;
        unsafe {
            assert_eq!(focus_eye_aspect_ratio(short.as_ptr(), short.len(), &mut out), -1);
        }
        assert!(last_error().contains("landmark"));

        let flat = [1.0; 12];
        unsafe {
            assert_eq!(focus_eye_aspect_ratio(flat.as_ptr(), flat.len(), &mut out), -1);
        }
    }

    #[test]
    fn test_ffi_session_lifecycle() {
        unsafe {
            let handle = focus_session_new(0.0);
            assert!(!handle.is_null());

            let script = [(0.0, Some(0.3)), (1.0, Some(0.3)), (2.0, None), (3.0, Some(0.4))];
            let flags: Vec<i32> = script
                .iter()
                .map(|&(t, ear)| focus_session_observe_ndjson(handle, frame_line(t, ear).as_ptr()))
                .collect();
            assert_eq!(flags, vec![1, 1, 0, 1]);

            let report = focus_session_finish(handle);
            assert!(!report.is_null());

            let json: serde_json::Value =
                serde_json::from_str(CStr::from_ptr(report).to_str().unwrap()).unwrap();
            assert_eq!(json["total_focus_seconds"], 2.0);
            assert_eq!(json["timeline"].as_array().unwrap().len(), 4);

            focus_free_string(report);
        }
    }

    #[test]
    fn test_ffi_session_rejects_out_of_order_frame() {
        unsafe {
            let handle = focus_session_new(0.25);
            assert_eq!(focus_session_observe_ndjson(handle, frame_line(1.0, None).as_ptr()), 0);
            assert_eq!(focus_session_observe_ndjson(handle, frame_line(0.5, None).as_ptr()), -1);
            assert!(last_error().contains("0.5"));

            let garbage = CString::new("not json").unwrap();
            assert_eq!(focus_session_observe_ndjson(handle, garbage.as_ptr()), -1);

            focus_session_free(handle);
        }
    }

    #[test]
    fn test_ffi_invalid_threshold() {
        unsafe {
            assert!(focus_session_new(1.5).is_null());
        }
        assert!(!last_error().is_empty());
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = focus_version();
            assert!(!version.is_null());
            assert!(!CStr::from_ptr(version).to_str().unwrap().is_empty());
        }
    }
}
