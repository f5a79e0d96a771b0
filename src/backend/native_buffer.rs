// NativeBuffer - exclusively owned memory handed to native calls
//
// Backs negotiated name arrays and every "enumerate X" result. The buffer
// is released at most once, either explicitly or on drop.

use ash::vk;
use std::ptr;

pub struct NativeBuffer<T: Copy> {
    data: Option<Box<[T]>>,
}

impl<T: Copy> NativeBuffer<T> {
    /// Allocate `len` slots, each initialised to `value`
    pub fn filled(len: usize, value: T) -> Self {
        Self {
            data: Some(vec![value; len].into_boxed_slice()),
        }
    }

    pub fn empty() -> Self {
        Self {
            data: Some(Box::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, |data| data.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_released(&self) -> bool {
        self.data.is_none()
    }

    pub fn as_slice(&self) -> &[T] {
        self.data.as_deref().unwrap_or(&[])
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.data.as_deref_mut().unwrap_or(&mut [])
    }

    /// Pointer for native calls; null when there is nothing to point at
    pub fn as_ptr(&self) -> *const T {
        if self.is_empty() {
            ptr::null()
        } else {
            self.as_slice().as_ptr()
        }
    }

    pub fn as_mut_ptr(&mut self) -> *mut T {
        if self.is_empty() {
            ptr::null_mut()
        } else {
            self.as_mut_slice().as_mut_ptr()
        }
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.as_slice().get(index).copied()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Shrink to the first `len` slots (no-op if already shorter)
    pub fn truncate(&mut self, len: usize) {
        if let Some(data) = self.data.take() {
            let mut data = data.into_vec();
            data.truncate(len);
            self.data = Some(data.into_boxed_slice());
        }
    }

    /// Free the memory now. Returns `false` if it was already released.
    pub fn release(&mut self) -> bool {
        self.data.take().is_some()
    }
}

impl<'a, T: Copy> IntoIterator for &'a NativeBuffer<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Two-call enumeration: ask for the count with a null output pointer,
/// allocate that many slots, then ask again to fill them.
///
/// `VK_INCOMPLETE` on the second call means the set grew in between; the
/// whole sequence is retried. Any other non-success status is returned.
pub fn enumerate<T, F>(fill: T, mut query: F) -> Result<NativeBuffer<T>, vk::Result>
where
    T: Copy,
    F: FnMut(&mut u32, *mut T) -> vk::Result,
{
    loop {
        let mut count = 0u32;
        let result = query(&mut count, ptr::null_mut());
        if result != vk::Result::SUCCESS {
            return Err(result);
        }

        let mut buffer = NativeBuffer::filled(count as usize, fill);
        if count == 0 {
            return Ok(buffer);
        }

        match query(&mut count, buffer.as_mut_ptr()) {
            vk::Result::SUCCESS => {
                buffer.truncate(count as usize);
                return Ok(buffer);
            }
            vk::Result::INCOMPLETE => continue,
            err => return Err(err),
        }
    }
}
