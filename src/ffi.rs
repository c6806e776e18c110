//! FFI bindings for Mindset Credit
//!
//! This module provides C-compatible functions for calling the scoring pipeline
//! from other languages. All functions use C strings (null-terminated) and
//! return allocated memory that must be freed by the caller using
//! `mindset_free_string`.
//!
//! Every `config_json` argument may be NULL, in which case the default
//! scoring configuration is used.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::error::ScoringError;
use crate::pipeline::{applicant_response_json, score_full_json, score_phase1_json};

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

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Read a required string argument, recording an error when it is missing
unsafe fn required_arg(ptr: *const c_char, name: &str) -> Option<String> {
    let value = cstr_to_string(ptr);
    if value.is_none() {
        set_last_error(&format!("Invalid {name} string pointer"));
    }
    value
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn into_cstr(result: Result<String, ScoringError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Score a self-report history and return the admin report JSON.
///
/// # Safety
/// - `responses_json` must be a valid null-terminated C string.
/// - `config_json` must be a valid null-terminated C string or NULL.
/// - Returns a newly allocated string that must be freed with `mindset_free_string`.
/// - Returns NULL on error; call `mindset_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn mindset_score_phase1(
    responses_json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(responses) = required_arg(responses_json, "responses_json") else {
        return ptr::null_mut();
    };
    let config = cstr_to_string(config_json);

    into_cstr(score_phase1_json(&responses, config.as_deref()))
}

/// Score a self-report history plus a behavioral bundle and return the admin report JSON.
///
/// # Safety
/// - `responses_json` and `bundle_json` must be valid null-terminated C strings.
/// - `config_json` must be a valid null-terminated C string or NULL.
/// - Returns a newly allocated string that must be freed with `mindset_free_string`.
/// - Returns NULL on error; call `mindset_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn mindset_score_full(
    responses_json: *const c_char,
    bundle_json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(responses) = required_arg(responses_json, "responses_json") else {
        return ptr::null_mut();
    };
    let Some(bundle) = required_arg(bundle_json, "bundle_json") else {
        return ptr::null_mut();
    };
    let config = cstr_to_string(config_json);

    into_cstr(score_full_json(&responses, &bundle, config.as_deref()))
}

/// Return the applicant-facing decision JSON.
///
/// Scoring failures are reported as the generic under-review response rather
/// than as errors.
///
/// # Safety
/// - `responses_json` must be a valid null-terminated C string.
/// - `bundle_json` and `config_json` must be valid null-terminated C strings or NULL.
/// - Returns a newly allocated string that must be freed with `mindset_free_string`.
#[no_mangle]
pub unsafe extern "C" fn mindset_applicant_response(
    responses_json: *const c_char,
    bundle_json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let responses = cstr_to_string(responses_json).unwrap_or_default();
    let bundle = cstr_to_string(bundle_json);
    let config = cstr_to_string(config_json);

    into_cstr(applicant_response_json(
        &responses,
        bundle.as_deref(),
        config.as_deref(),
    ))
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Mindset functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Mindset function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn mindset_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next Mindset function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn mindset_last_error() -> *const c_char {
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
pub unsafe extern "C" fn mindset_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
