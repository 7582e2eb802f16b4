//! This module manages the kernel's dynamic memory allocator: a buddy
//! allocator carved out of a fixed-size region placed after the kernel's
//! `.bss` section. Metadata (the size-class table and its bit arrays) lives
//! inside the managed region itself, laid out by [`buddy::Buddy::init`].

mod bitmap;
mod list;

#[cfg(feature = "module_tests")]
pub(crate) mod buddy;
#[cfg(not(feature = "module_tests"))]
mod buddy;

use core::alloc::{GlobalAlloc, Layout};

use crate::spin::Mutex;
use buddy::Buddy;

/// Minimum allocation granularity and required alignment. Must be a power of
/// two at least the size of an intrusive list node (two pointers).
pub const LEAF_SIZE: usize = 16;

const REGION_SIZE: usize = 4 * 1024 * 1024; // 4MB

#[global_allocator]
static ALLOCATOR: AllocWrapper = AllocWrapper(Mutex::new(Buddy::uninit()));

pub struct AllocWrapper(Mutex<Buddy>);

unsafe impl GlobalAlloc for AllocWrapper
{
    #[inline]
    unsafe fn alloc(&self, layout: Layout) -> *mut u8
    {
        let nbytes = if layout.align() <= LEAF_SIZE
        {
            layout.size()
        }
        else
        {
            layout.size().max(layout.align())
        };

        match self.0.lock().allocate(nbytes)
        {
            Some(ptr) => ptr.as_ptr(),
            None => core::ptr::null_mut(),
        }
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout)
    {
        if let Some(ptr) = core::ptr::NonNull::new(ptr)
        {
            self.0.lock().free(ptr);
        }
    }
}

pub fn init()
{
    unsafe extern "C" {
        static _end: u8;
    }

    let base = (core::ptr::addr_of!(_end) as usize + 0xF) & !0xF;
    let end = base + REGION_SIZE;

    unsafe { ALLOCATOR.0.lock().init(base, end) };
}
