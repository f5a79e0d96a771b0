// Host allocation callbacks
//
// The backend never picks an allocator itself. Callers may hand an
// AllocationCallbacks to any factory; the same value is used again for the
// matching destroy call. Passing None means the driver's default allocator.

use ash::vk;
use std::alloc::{self, Layout};
use std::ffi::c_void;
use std::fmt;
use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Host memory provider used by the driver for its own bookkeeping
pub trait HostAllocator {
    fn allocate(&self, size: usize, alignment: usize) -> *mut c_void;

    /// # Safety
    /// `original` must be null or a live pointer returned by this allocator.
    unsafe fn reallocate(&self, original: *mut c_void, size: usize, alignment: usize) -> *mut c_void;

    /// # Safety
    /// `memory` must be null or a live pointer returned by this allocator.
    unsafe fn free(&self, memory: *mut c_void);
}

/// `vk::AllocationCallbacks` bound to a [`HostAllocator`]
pub struct AllocationCallbacks {
    callbacks: vk::AllocationCallbacks,
    // Boxed twice so p_user_data is a thin pointer that never moves
    _host: Box<Box<dyn HostAllocator>>,
}

/// Optional allocator threaded through every create/destroy pair
pub type Allocator = Option<Arc<AllocationCallbacks>>;

impl AllocationCallbacks {
    pub fn new<A: HostAllocator + 'static>(host: A) -> Arc<Self> {
        let host: Box<Box<dyn HostAllocator>> = Box::new(Box::new(host));
        let user_data = &*host as *const Box<dyn HostAllocator> as *mut c_void;

        let callbacks = vk::AllocationCallbacks {
            p_user_data: user_data,
            pfn_allocation: Some(allocation_trampoline),
            pfn_reallocation: Some(reallocation_trampoline),
            pfn_free: Some(free_trampoline),
            pfn_internal_allocation: None,
            pfn_internal_free: None,
        };

        Arc::new(Self {
            callbacks,
            _host: host,
        })
    }

    pub fn callbacks(&self) -> &vk::AllocationCallbacks {
        &self.callbacks
    }
}

impl fmt::Debug for AllocationCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocationCallbacks")
            .field("p_user_data", &self.callbacks.p_user_data)
            .finish_non_exhaustive()
    }
}

/// Borrow the raw callbacks out of an optional allocator
pub(crate) fn callbacks(allocator: &Allocator) -> Option<&vk::AllocationCallbacks> {
    allocator.as_deref().map(AllocationCallbacks::callbacks)
}

unsafe fn host<'a>(user_data: *mut c_void) -> &'a dyn HostAllocator {
    // SAFETY: user_data is the pointer stored by AllocationCallbacks::new,
    // which outlives every native object created with it
    unsafe { &**(user_data as *const Box<dyn HostAllocator>) }
}

unsafe extern "system" fn allocation_trampoline(
    user_data: *mut c_void,
    size: usize,
    alignment: usize,
    _scope: vk::SystemAllocationScope,
) -> *mut c_void {
    // SAFETY: see host()
    unsafe { host(user_data) }.allocate(size, alignment)
}

unsafe extern "system" fn reallocation_trampoline(
    user_data: *mut c_void,
    original: *mut c_void,
    size: usize,
    alignment: usize,
    _scope: vk::SystemAllocationScope,
) -> *mut c_void {
    // SAFETY: the driver only passes pointers it got from this allocator
    unsafe { host(user_data).reallocate(original, size, alignment) }
}

unsafe extern "system" fn free_trampoline(user_data: *mut c_void, memory: *mut c_void) {
    // SAFETY: the driver only passes pointers it got from this allocator
    unsafe { host(user_data).free(memory) }
}

// =============================================================================
// SystemAllocator
// =============================================================================

const HEADER_WORDS: usize = 3;
const HEADER_SIZE: usize = HEADER_WORDS * mem::size_of::<usize>();

/// Aligned allocator on top of the global Rust allocator.
///
/// Each block carries a small header in front of the user pointer holding
/// (offset to block start, block size, block alignment).
#[derive(Debug, Default)]
pub struct SystemAllocator {
    live: AtomicUsize,
}

impl SystemAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks handed out and not yet freed
    pub fn live_allocations(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    unsafe fn header(memory: *mut c_void) -> (usize, Layout) {
        // SAFETY: memory came from allocate(), which wrote the header
        unsafe {
            let header = memory.cast::<usize>().sub(HEADER_WORDS);
            let offset = header.read();
            let size = header.add(1).read();
            let align = header.add(2).read();
            (offset, Layout::from_size_align_unchecked(size, align))
        }
    }
}

impl HostAllocator for SystemAllocator {
    fn allocate(&self, size: usize, alignment: usize) -> *mut c_void {
        if size == 0 {
            return ptr::null_mut();
        }

        let align = alignment.max(mem::align_of::<usize>()).next_power_of_two();
        let offset = HEADER_SIZE.next_multiple_of(align);
        let Some(total) = offset.checked_add(size) else {
            return ptr::null_mut();
        };
        let Ok(layout) = Layout::from_size_align(total, align) else {
            return ptr::null_mut();
        };

        // SAFETY: layout has a non-zero size
        let base = unsafe { alloc::alloc(layout) };
        if base.is_null() {
            return ptr::null_mut();
        }

        // SAFETY: offset >= HEADER_SIZE and offset + size == layout.size(),
        // the header words sit inside the block and are usize-aligned
        unsafe {
            let memory = base.add(offset);
            let header = memory.cast::<usize>().sub(HEADER_WORDS);
            header.write(offset);
            header.add(1).write(layout.size());
            header.add(2).write(layout.align());
            self.live.fetch_add(1, Ordering::Relaxed);
            memory.cast()
        }
    }

    unsafe fn reallocate(&self, original: *mut c_void, size: usize, alignment: usize) -> *mut c_void {
        if original.is_null() {
            return self.allocate(size, alignment);
        }
        if size == 0 {
            // SAFETY: forwarded caller contract
            unsafe { self.free(original) };
            return ptr::null_mut();
        }

        let memory = self.allocate(size, alignment);
        if memory.is_null() {
            return memory;
        }

        // SAFETY: original is live, both blocks hold at least `kept` bytes
        unsafe {
            let (offset, layout) = Self::header(original);
            let kept = (layout.size() - offset).min(size);
            ptr::copy_nonoverlapping(original.cast::<u8>(), memory.cast::<u8>(), kept);
            self.free(original);
        }
        memory
    }

    unsafe fn free(&self, memory: *mut c_void) {
        if memory.is_null() {
            return;
        }

        // SAFETY: memory is live and was produced by allocate()
        unsafe {
            let (offset, layout) = Self::header(memory);
            alloc::dealloc(memory.cast::<u8>().sub(offset), layout);
        }
        self.live.fetch_sub(1, Ordering::Relaxed);
    }
}

impl<A: HostAllocator + ?Sized> HostAllocator for Arc<A> {
    fn allocate(&self, size: usize, alignment: usize) -> *mut c_void {
        (**self).allocate(size, alignment)
    }

    unsafe fn reallocate(&self, original: *mut c_void, size: usize, alignment: usize) -> *mut c_void {
        // SAFETY: forwarded caller contract
        unsafe { (**self).reallocate(original, size, alignment) }
    }

    unsafe fn free(&self, memory: *mut c_void) {
        // SAFETY: forwarded caller contract
        unsafe { (**self).free(memory) }
    }
}
