// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Allocation and release of container memory.
//!
//! All memory handed to C comes from the C allocator (`malloc`/`calloc`) so
//! that strings behave like `strdup` results. Every `alloc_*` helper has a
//! `free_*` twin that releases exactly what it allocated and leaves the
//! fields null and zero-length, so releasing twice is harmless.

use std::ffi::CStr;
use std::mem::{self, ManuallyDrop};
use std::ops::{Deref, DerefMut};
use std::os::raw::c_char;
use std::ptr;

use tango::{DevEncoded, TangoError, TangoResult};

use crate::types::{
    raw_slice, TangoDevEncoded, VarArray, VarEncodedArray, VarStringArray, Zeroed,
};

// =======================================================================
// Scratch: all-or-nothing population
// =======================================================================

/// Container under construction.
///
/// Dropping a `Scratch` releases everything allocated into it so far; only
/// [`Scratch::publish`] hands the value over. Converters build into a
/// scratch and write the caller's container after the last fallible step.
pub(crate) struct Scratch<T> {
    value: T,
    release: unsafe fn(&mut T),
}

impl<T> Scratch<T> {
    pub(crate) fn new(value: T, release: unsafe fn(&mut T)) -> Self {
        Self { value, release }
    }

    pub(crate) fn publish(self) -> T {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so `value` is moved out exactly once.
        unsafe { ptr::read(&this.value) }
    }
}

impl<T> Deref for Scratch<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Scratch<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T> Drop for Scratch<T> {
    fn drop(&mut self) {
        // SAFETY: the value only ever holds allocations made by this module
        // or null pointers.
        unsafe { (self.release)(&mut self.value) }
    }
}

// =======================================================================
// Sequences
// =======================================================================

fn length_of(len: usize, origin: &str) -> TangoResult<u32> {
    u32::try_from(len).map_err(|_| TangoError::too_large(len, origin))
}

/// `len` zero-valued elements, or the empty sequence when `len == 0`.
pub(crate) fn alloc_zeroed<T: Zeroed>(len: usize, origin: &str) -> TangoResult<VarArray<T>> {
    if len == 0 {
        return Ok(VarArray::empty());
    }
    let length = length_of(len, origin)?;
    // SAFETY: calloc checks `len * size` for overflow; zero bytes are a
    // valid `T` by the `Zeroed` contract.
    let raw = unsafe { libc::calloc(len, mem::size_of::<T>()) };
    if raw.is_null() {
        return Err(TangoError::out_of_memory(
            len.saturating_mul(mem::size_of::<T>()),
            origin,
        ));
    }
    Ok(VarArray {
        length,
        sequence: raw.cast::<T>(),
    })
}

/// Copy plain elements into a fresh sequence.
pub(crate) fn alloc_array<T: Copy>(items: &[T], origin: &str) -> TangoResult<VarArray<T>> {
    if items.is_empty() {
        return Ok(VarArray::empty());
    }
    let length = length_of(items.len(), origin)?;
    // SAFETY: calloc checks the multiplication for overflow.
    let raw = unsafe { libc::calloc(items.len(), mem::size_of::<T>()) }.cast::<T>();
    if raw.is_null() {
        return Err(TangoError::out_of_memory(mem::size_of_val(items), origin));
    }
    // SAFETY: `raw` has room for `items.len()` elements and does not overlap.
    unsafe { ptr::copy_nonoverlapping(items.as_ptr(), raw, items.len()) };
    Ok(VarArray {
        length,
        sequence: raw,
    })
}

/// Release a sequence of plain elements.
///
/// # Safety
/// `arr` must be empty or come from this module.
pub(crate) unsafe fn free_array<T>(arr: &mut VarArray<T>) {
    if !arr.sequence.is_null() {
        libc::free(arr.sequence.cast::<libc::c_void>());
    }
    *arr = VarArray::empty();
}

/// Fill a fresh sequence element by element. A failing element releases
/// the elements already converted and the sequence itself.
pub(crate) fn alloc_list<N, C: Zeroed>(
    items: Vec<N>,
    mut convert: impl FnMut(N) -> TangoResult<C>,
    release: unsafe fn(&mut VarArray<C>),
    origin: &str,
) -> TangoResult<VarArray<C>> {
    let mut list = Scratch::new(alloc_zeroed::<C>(items.len(), origin)?, release);
    // SAFETY: freshly allocated and exclusively owned by `list`.
    let slots = unsafe { list.as_mut_slice() };
    for (slot, item) in slots.iter_mut().zip(items) {
        *slot = convert(item)?;
    }
    Ok(list.publish())
}

/// Release every element with `release_item`, then the sequence.
///
/// # Safety
/// `list` must be empty or come from [`alloc_list`].
pub(crate) unsafe fn free_list<C>(list: &mut VarArray<C>, release_item: unsafe fn(&mut C)) {
    for item in list.as_mut_slice() {
        release_item(item);
    }
    free_array(list);
}

// =======================================================================
// Strings
// =======================================================================

/// `strdup` of `s`, truncated at the first interior NUL.
pub(crate) fn dup_string(s: &str, origin: &str) -> TangoResult<*mut c_char> {
    let bytes = s.as_bytes();
    let len = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    // SAFETY: plain allocation, checked for null below.
    let raw = unsafe { libc::malloc(len + 1) }.cast::<u8>();
    if raw.is_null() {
        return Err(TangoError::out_of_memory(len + 1, origin));
    }
    // SAFETY: `raw` holds `len + 1` bytes.
    unsafe {
        ptr::copy_nonoverlapping(bytes.as_ptr(), raw, len);
        *raw.add(len) = 0;
    }
    Ok(raw.cast::<c_char>())
}

/// # Safety
/// `s` must be null or come from [`dup_string`] (or `strdup`).
pub(crate) unsafe fn free_string(s: &mut *mut c_char) {
    if !s.is_null() {
        libc::free(s.cast::<libc::c_void>());
    }
    *s = ptr::null_mut();
}

/// Lossy copy of a foreign string. Null reads as empty.
///
/// # Safety
/// `s` must be null or a valid NUL-terminated string.
pub(crate) unsafe fn read_string(s: *const c_char) -> String {
    if s.is_null() {
        return String::new();
    }
    CStr::from_ptr(s).to_string_lossy().into_owned()
}

/// Required string argument of a boundary call.
///
/// # Safety
/// `s` must be null or a valid NUL-terminated string.
pub(crate) unsafe fn required_string(s: *const c_char, what: &str, origin: &str) -> TangoResult<String> {
    if s.is_null() {
        return Err(TangoError::invalid_args(format!("{what} is NULL"), origin));
    }
    Ok(read_string(s))
}

pub(crate) fn alloc_string_array(items: &[String], origin: &str) -> TangoResult<VarStringArray> {
    let mut arr = Scratch::new(alloc_zeroed::<*mut c_char>(items.len(), origin)?, free_string_array);
    // SAFETY: freshly allocated and exclusively owned by `arr`.
    let slots = unsafe { arr.as_mut_slice() };
    for (slot, item) in slots.iter_mut().zip(items) {
        *slot = dup_string(item, origin)?;
    }
    Ok(arr.publish())
}

/// # Safety
/// `arr` must be empty or come from [`alloc_string_array`].
pub(crate) unsafe fn free_string_array(arr: &mut VarStringArray) {
    for s in arr.as_mut_slice() {
        free_string(s);
    }
    free_array(arr);
}

/// # Safety
/// `sequence` must be null or hold `length` null-or-valid string pointers.
pub(crate) unsafe fn read_strings(length: u32, sequence: *const *mut c_char) -> Vec<String> {
    raw_slice(length, sequence)
        .iter()
        .map(|s| read_string(*s))
        .collect()
}

// =======================================================================
// Plain element reads
// =======================================================================

/// # Safety
/// `sequence` must be null or point to `length` elements.
pub(crate) unsafe fn read_array<T: Copy>(length: u32, sequence: *const T) -> Vec<T> {
    raw_slice(length, sequence).to_vec()
}

/// Foreign booleans are read byte-wise; any non-zero byte is `true`.
///
/// # Safety
/// `sequence` must be null or point to `length` bytes.
pub(crate) unsafe fn read_bools(length: u32, sequence: *const bool) -> Vec<bool> {
    raw_slice(length, sequence.cast::<u8>())
        .iter()
        .map(|b| *b != 0)
        .collect()
}

/// # Safety
/// `value` must point to at least one readable byte.
pub(crate) unsafe fn read_bool(value: *const bool) -> bool {
    *value.cast::<u8>() != 0
}

// =======================================================================
// Encoded blobs
// =======================================================================

pub(crate) fn alloc_encoded(value: &DevEncoded, origin: &str) -> TangoResult<TangoDevEncoded> {
    let mut enc = Scratch::new(TangoDevEncoded::default(), free_encoded);
    enc.encoded_format = dup_string(&value.format, origin)?;
    let data = alloc_array(&value.data, origin)?;
    enc.encoded_length = data.length;
    enc.encoded_data = data.sequence;
    Ok(enc.publish())
}

/// # Safety
/// `enc` must be zeroed or come from [`alloc_encoded`].
pub(crate) unsafe fn free_encoded(enc: &mut TangoDevEncoded) {
    free_string(&mut enc.encoded_format);
    let mut data = VarArray {
        length: enc.encoded_length,
        sequence: enc.encoded_data,
    };
    free_array(&mut data);
    enc.encoded_length = 0;
    enc.encoded_data = ptr::null_mut();
}

/// # Safety
/// Pointers in `enc` must be null or valid for their lengths.
pub(crate) unsafe fn read_encoded(enc: &TangoDevEncoded) -> DevEncoded {
    DevEncoded {
        format: read_string(enc.encoded_format),
        data: read_array(enc.encoded_length, enc.encoded_data),
    }
}

pub(crate) fn alloc_encoded_array(items: &[DevEncoded], origin: &str) -> TangoResult<VarEncodedArray> {
    alloc_list(
        items.to_vec(),
        |item| alloc_encoded(&item, origin),
        free_encoded_array,
        origin,
    )
}

/// # Safety
/// `arr` must be empty or come from [`alloc_encoded_array`].
pub(crate) unsafe fn free_encoded_array(arr: &mut VarEncodedArray) {
    free_list(arr, free_encoded);
}

/// # Safety
/// `arr` must be empty or hold valid encoded blobs.
pub(crate) unsafe fn read_encoded_array(arr: &VarEncodedArray) -> Vec<DevEncoded> {
    arr.as_slice().iter().map(|enc| read_encoded(enc)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_gives_null_sequence() {
        let arr = alloc_array::<i32>(&[], "test").unwrap();
        assert_eq!(arr.length, 0);
        assert!(arr.sequence.is_null());
        let strings = alloc_string_array(&[], "test").unwrap();
        assert!(strings.sequence.is_null());
    }

    #[test]
    fn array_round_trip_and_double_free() {
        let mut arr = alloc_array(&[1u64, 2, u64::MAX], "test").unwrap();
        assert_eq!(arr.length, 3);
        unsafe {
            assert_eq!(read_array(arr.length, arr.sequence), vec![1, 2, u64::MAX]);
            free_array(&mut arr);
            assert!(arr.sequence.is_null());
            assert_eq!(arr.length, 0);
            free_array(&mut arr);
        }
    }

    #[test]
    fn strings_truncate_at_nul() {
        let mut s = dup_string("ab\0cd", "test").unwrap();
        unsafe {
            assert_eq!(read_string(s), "ab");
            free_string(&mut s);
            assert!(s.is_null());
            free_string(&mut s);
            assert_eq!(read_string(s), "");
        }
    }

    #[test]
    fn string_array_keeps_empty_elements() {
        let items = vec![String::new(), "x".to_string(), String::new()];
        let mut arr = alloc_string_array(&items, "test").unwrap();
        unsafe {
            assert_eq!(arr.length, 3);
            assert!(arr.as_slice().iter().all(|p| !p.is_null()));
            assert_eq!(read_strings(arr.length, arr.sequence), items);
            free_string_array(&mut arr);
            assert!(arr.sequence.is_null());
        }
    }

    #[test]
    fn encoded_round_trip() {
        let blob = DevEncoded::new("gray8", vec![0u8, 127, 255]);
        let mut enc = alloc_encoded(&blob, "test").unwrap();
        unsafe {
            assert_eq!(read_encoded(&enc), blob);
            free_encoded(&mut enc);
            assert!(enc.encoded_format.is_null());
            assert!(enc.encoded_data.is_null());
            assert_eq!(enc.encoded_length, 0);
        }
    }

    #[test]
    fn encoded_with_empty_payload() {
        let blob = DevEncoded::new("", Vec::new());
        let mut arr = alloc_encoded_array(&[blob.clone(), blob.clone()], "test").unwrap();
        unsafe {
            assert_eq!(read_encoded_array(&arr), vec![blob.clone(), blob]);
            free_encoded_array(&mut arr);
        }
        assert!(arr.sequence.is_null());
    }

    #[test]
    fn booleans_read_bytewise() {
        let raw: [u8; 3] = [0, 1, 7];
        let got = unsafe { read_bools(3, raw.as_ptr().cast::<bool>()) };
        assert_eq!(got, vec![false, true, true]);
    }

    #[test]
    fn failed_list_releases_partial_work() {
        let result = alloc_list(
            vec!["a", "b", "c"],
            |item| {
                if item == "c" {
                    Err(TangoError::new("boom", "third element", "test"))
                } else {
                    dup_string(item, "test")
                }
            },
            free_string_array,
            "test",
        );
        assert_eq!(result.unwrap_err().reason(), "boom");
    }
}
