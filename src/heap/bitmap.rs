//! Bit-vector primitives over a raw byte array living inside the managed
//! region. `get`/`set`/`clear`/`flip` are O(1) and never bounds-check; the
//! caller (the size-class table) is responsible for sizing each array
//! correctly at initialization.

use bit_field::BitField;

/// Number of bytes needed to hold `nbits` bits.
#[inline]
pub const fn bytes_for_bits(nbits: usize) -> usize
{
    (nbits + 7) / 8
}

/// A view over a byte array, one bit per logical index.
pub struct Bitmap
{
    bytes: *mut u8,
    nbits: usize,
}

impl Bitmap
{
    /// Wraps a zero-length bitmap. Used for the boundary levels (`alloc[K]`,
    /// `split[0]`) where the array is conceptually absent.
    pub const fn empty() -> Self
    {
        Self {
            bytes: core::ptr::null_mut(),
            nbits: 0,
        }
    }

    /// # Safety
    /// `bytes` must point to at least `bytes_for_bits(nbits)` writable bytes
    /// for the lifetime of this `Bitmap`, and no other alias may touch them.
    pub unsafe fn new(bytes: *mut u8, nbits: usize) -> Self
    {
        Self { bytes, nbits }
    }

    #[inline]
    pub fn len(&self) -> usize
    {
        self.nbits
    }

    #[inline]
    fn byte(&self, i: usize) -> &mut u8
    {
        debug_assert!(i < self.nbits);
        unsafe { &mut *self.bytes.add(i / 8) }
    }

    #[inline]
    pub fn get(&self, i: usize) -> bool
    {
        self.byte(i).get_bit(i % 8)
    }

    #[inline]
    pub fn set(&self, i: usize)
    {
        self.byte(i).set_bit(i % 8, true);
    }

    #[inline]
    pub fn clear(&self, i: usize)
    {
        self.byte(i).set_bit(i % 8, false);
    }

    /// Toggles bit `i` and returns its new value.
    #[inline]
    pub fn flip(&self, i: usize) -> bool
    {
        let byte = self.byte(i);
        let new = !byte.get_bit(i % 8);
        byte.set_bit(i % 8, new);
        new
    }
}

// The bitmap is just a raw pointer into allocator-owned memory; callers hold
// it behind the heap's own lock.
unsafe impl Send for Bitmap {}
