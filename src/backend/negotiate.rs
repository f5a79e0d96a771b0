// Capability negotiation
//
// Intersect the names a caller asks for with the names a provider reports,
// and marshal the result into a pointer array for a create-info struct.
// A requested name that is not supported is simply left out.

use ash::vk;
use std::collections::{BTreeSet, HashSet};
use std::ffi::{c_char, CStr};
use std::marker::PhantomData;
use std::ptr;

use super::NativeBuffer;

/// Something that carries a fixed-size, nul-terminated name
pub trait CapabilityName {
    fn name(&self) -> &CStr;
}

fn fixed_name(raw: &[c_char]) -> &CStr {
    // SAFETY: c_char and u8 have the same size and alignment
    let bytes = unsafe { std::slice::from_raw_parts(raw.as_ptr().cast::<u8>(), raw.len()) };
    CStr::from_bytes_until_nul(bytes).unwrap_or_default()
}

impl CapabilityName for vk::ExtensionProperties {
    fn name(&self) -> &CStr {
        fixed_name(&self.extension_name)
    }
}

impl CapabilityName for vk::LayerProperties {
    fn name(&self) -> &CStr {
        fixed_name(&self.layer_name)
    }
}

/// Negotiated name list.
///
/// The pointers reference memory owned by the supported list, which is why
/// this borrows it for `'a`.
pub struct Negotiated<'a> {
    names: NativeBuffer<*const c_char>,
    count: u32,
    _supported: PhantomData<&'a CStr>,
}

impl<'a> Negotiated<'a> {
    /// Number of names actually emitted
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Number of slots that were allocated (the requested set's size)
    pub fn capacity(&self) -> usize {
        self.names.len()
    }

    pub fn as_slice(&self) -> &[*const c_char] {
        &self.names.as_slice()[..self.count as usize]
    }

    pub fn as_ptr(&self) -> *const *const c_char {
        if self.count == 0 {
            ptr::null()
        } else {
            self.names.as_ptr()
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &'a CStr> + '_ {
        self.as_slice().iter().map(|&name| {
            // SAFETY: every emitted pointer came from a `&'a CStr`
            unsafe { CStr::from_ptr(name) }
        })
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.names()
            .map(|name| name.to_string_lossy().into_owned())
            .collect()
    }

    /// Requested names that did not make it into the list, sorted
    pub fn missing(&self, requested: &HashSet<String>) -> Vec<String> {
        let emitted: HashSet<&str> = self.names().filter_map(|name| name.to_str().ok()).collect();
        requested
            .iter()
            .filter(|name| !emitted.contains(name.as_str()))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Emit each supported name that was requested, once, in supported order.
///
/// The output has room for `requested.len()` entries; `count()` may be lower
/// when some requested names are unsupported.
pub fn negotiate<'a, I>(requested: &HashSet<String>, supported: I) -> Negotiated<'a>
where
    I: IntoIterator<Item = &'a CStr>,
{
    let mut names = NativeBuffer::filled(requested.len(), ptr::null::<c_char>());
    let mut seen: HashSet<&'a str> = HashSet::new();
    let mut count = 0usize;

    for name in supported {
        let Ok(text) = name.to_str() else {
            continue;
        };

        if requested.contains(text) && seen.insert(text) {
            names.as_mut_slice()[count] = name.as_ptr();
            count += 1;
        }
    }

    Negotiated {
        names,
        count: count as u32,
        _supported: PhantomData,
    }
}

/// Negotiate against a list of native property structs
pub fn negotiate_properties<'a, P>(requested: &HashSet<String>, supported: &'a [P]) -> Negotiated<'a>
where
    P: CapabilityName,
{
    negotiate(requested, supported.iter().map(CapabilityName::name))
}

/// Log what was enabled and warn about what was dropped
pub(crate) fn report(what: &str, requested: &HashSet<String>, negotiated: &Negotiated<'_>) {
    log::debug!(
        "Enabled {} {} of {} requested: {:?}",
        negotiated.count(),
        what,
        requested.len(),
        negotiated.to_strings()
    );
    for name in negotiated.missing(requested) {
        log::warn!("Requested {} not supported, skipping: {}", what, name);
    }
}
