//! The buddy allocator core: size-class metadata table, index/address
//! mapping, allocation path, free path, and initialization/reservation.
//!
//! Blocks are powers of two times [`super::LEAF_SIZE`]. Level `k` holds
//! blocks of size `LEAF_SIZE << k`; level `K = nsizes - 1` is the top of the
//! virtual heap. Each level's `alloc` bit array packs two buddies per bit via
//! XOR (a bit flips on every allocation-state change of either buddy); `split`
//! records whether a block has been divided into its two children.

use core::ptr::NonNull;

use super::LEAF_SIZE;
use super::bitmap::{Bitmap, bytes_for_bits};
use super::list::List;

struct SizeInfo
{
    free: List,
    alloc: Bitmap,
    split: Bitmap,
}

/// Owns a `[base, base + heap_size)` virtual heap. Must be initialized with
/// [`Buddy::init`] exactly once before use.
pub struct Buddy
{
    base: usize,
    heap_size: usize,
    nsizes: usize,
    sizes: *mut SizeInfo,
}

// All mutation happens through the allocator's own lock; the raw pointer to
// the metadata table lives inside the managed region for the lifetime of the
// allocator.
unsafe impl Send for Buddy {}

#[inline]
const fn align_up(x: usize, align: usize) -> usize
{
    (x + align - 1) & !(align - 1)
}

#[inline]
const fn align_down(x: usize, align: usize) -> usize
{
    x & !(align - 1)
}

#[inline]
fn log2_floor(n: usize) -> usize
{
    (usize::BITS - 1 - n.leading_zeros()) as usize
}

impl Buddy
{
    pub const fn uninit() -> Self
    {
        Self {
            base: 0,
            heap_size: 0,
            nsizes: 0,
            sizes: core::ptr::null_mut(),
        }
    }

    #[inline]
    fn max_level(&self) -> usize
    {
        self.nsizes - 1
    }

    #[inline]
    fn blk_size(&self, k: usize) -> usize
    {
        LEAF_SIZE << k
    }

    #[inline]
    fn blk_index(&self, k: usize, p: usize) -> usize
    {
        (p - self.base) / self.blk_size(k)
    }

    #[inline]
    fn blk_index_next(&self, k: usize, p: usize) -> usize
    {
        (p - self.base).div_ceil(self.blk_size(k))
    }

    #[inline]
    fn addr(&self, k: usize, i: usize) -> usize
    {
        self.base + i * self.blk_size(k)
    }

    #[inline]
    fn info_mut(&mut self, k: usize) -> &mut SizeInfo
    {
        debug_assert!(k < self.nsizes);
        unsafe { &mut *self.sizes.add(k) }
    }

    fn first_level(&self, nbytes: usize) -> Option<usize>
    {
        let k_max = self.max_level();
        let mut k = 0;

        while k <= k_max && self.blk_size(k) < nbytes
        {
            k += 1;
        }

        if k > k_max { None } else { Some(k) }
    }

    /// Recovers the level a previously-allocated block `p` lives at: the
    /// smallest `k` such that `split[k+1][blk_index(k+1, p)]` is set, or the
    /// top level if no such `k` exists (a block allocated directly at the top
    /// level never sets any split bit below it).
    fn recover_level(&self, p: usize) -> usize
    {
        let k_max = self.max_level();

        for k in 0..k_max
        {
            if self.sizes_ref(k + 1).split.get(self.blk_index(k + 1, p))
            {
                return k;
            }
        }

        k_max
    }

    #[inline]
    fn sizes_ref(&self, k: usize) -> &SizeInfo
    {
        debug_assert!(k < self.nsizes);
        unsafe { &*self.sizes.add(k) }
    }

    /// Marks `[start, stop)` reserved: bulk-marks `split`/`alloc` bits at
    /// every level below the top, and sheds the free buddy immediately
    /// adjacent to the boundary onto its free list (skipping the top two
    /// levels, where the two sides of a reservation could otherwise shed the
    /// same pair twice — see [`Buddy::seed_top_level`]).
    ///
    /// Returns the bytes placed on free lists by the shedding step.
    fn mark(&mut self, start: usize, stop: usize, is_left: bool) -> usize
    {
        if start >= stop
        {
            return 0;
        }

        let k_max = self.max_level();
        let mut freed = 0;

        for k in 0..k_max
        {
            let bi = self.blk_index(k, start);
            let bj = self.blk_index_next(k, stop);

            if k + 1 < k_max
            {
                if is_left && bj % 2 == 1
                {
                    let addr = self.addr(k, bj);
                    unsafe { self.info_mut(k).free.push(NonNull::new_unchecked(addr as *mut u8)) };
                    freed += self.blk_size(k);
                }
                else if !is_left && bi % 2 == 1
                {
                    let addr = self.addr(k, bi - 1);
                    unsafe { self.info_mut(k).free.push(NonNull::new_unchecked(addr as *mut u8)) };
                    freed += self.blk_size(k);
                }
            }

            if bi >= bj
            {
                continue;
            }

            for i in bi..bj
            {
                if k > 0
                {
                    self.info_mut(k).split.set(i);
                }

                self.info_mut(k).alloc.flip(i / 2);
            }
        }

        freed
    }

    /// Populates the free lists for the top two levels, which [`Buddy::mark`]
    /// deliberately leaves unshed. Any block at the top level, or at the
    /// level below it, that lies entirely outside both the left and right
    /// reservations is genuinely free and whole; push it directly rather than
    /// inferring it from bits that only encode pairwise XOR state.
    fn seed_top_level(&mut self, left_end: usize, right_start: usize) -> usize
    {
        let k_max = self.max_level();
        let top_addr = self.base;
        let top_size = self.blk_size(k_max);

        if top_addr >= left_end && top_addr + top_size <= right_start
        {
            unsafe { self.info_mut(k_max).free.push(NonNull::new_unchecked(top_addr as *mut u8)) };
            return top_size;
        }

        if k_max == 0
        {
            return 0;
        }

        let half = self.blk_size(k_max - 1);
        let mut freed = 0;

        for i in 0..2
        {
            let a = self.base + i * half;

            if a >= left_end && a + half <= right_start
            {
                unsafe { self.info_mut(k_max - 1).free.push(NonNull::new_unchecked(a as *mut u8)) };
                freed += half;
            }
        }

        freed
    }

    /// Lays out the metadata table and bit arrays inside `[base, end)` by
    /// bump-pointer, then reserves the prefix they occupy and the suffix
    /// outside real memory. Aborts if the reconciled free-byte count disagrees
    /// with the arithmetic expectation.
    ///
    /// # Safety
    /// `[base, end)` must be valid, writable, and not otherwise in use; this
    /// must be called exactly once.
    pub unsafe fn init(&mut self, base: usize, end: usize)
    {
        assert!(end > base, "buddy heap: end must be greater than base");

        let bd_base = align_up(base, LEAF_SIZE);
        let span = end.saturating_sub(bd_base);
        let units = core::cmp::max(span / LEAF_SIZE, 1);
        let k = log2_floor(units);
        let mut nsizes = k + 1;

        if span > (LEAF_SIZE << k)
        {
            nsizes += 1;
        }

        let heap_size = LEAF_SIZE << (nsizes - 1);
        let k_max = nsizes - 1;

        let table_size = nsizes * core::mem::size_of::<SizeInfo>();
        let sizes_ptr = bd_base as *mut SizeInfo;
        unsafe { core::ptr::write_bytes(sizes_ptr as *mut u8, 0, table_size) };

        let mut p = bd_base + table_size;

        for lvl in 0..nsizes
        {
            let nblk_lvl = 1usize << (k_max - lvl);

            let alloc = if lvl == k_max
            {
                Bitmap::empty()
            }
            else
            {
                let nbits = nblk_lvl.div_ceil(2);
                let nbytes = bytes_for_bits(nbits);
                unsafe { core::ptr::write_bytes(p as *mut u8, 0, nbytes) };
                let bm = unsafe { Bitmap::new(p as *mut u8, nbits) };
                p += nbytes;
                bm
            };

            let split = if lvl == 0
            {
                Bitmap::empty()
            }
            else
            {
                let nbits = nblk_lvl;
                let nbytes = bytes_for_bits(nbits);
                unsafe { core::ptr::write_bytes(p as *mut u8, 0, nbytes) };
                let bm = unsafe { Bitmap::new(p as *mut u8, nbits) };
                p += nbytes;
                bm
            };

            unsafe { sizes_ptr.add(lvl).write(SizeInfo { free: List::new(), alloc, split }) };
        }

        p = align_up(p, LEAF_SIZE);

        self.base = bd_base;
        self.heap_size = heap_size;
        self.nsizes = nsizes;
        self.sizes = sizes_ptr;

        let right_start = align_down(end, LEAF_SIZE);
        assert!(right_start >= p, "buddy heap: region too small for its own metadata");

        let mut freed = self.mark(bd_base, p, true);
        freed += self.mark(right_start, bd_base + heap_size, false);
        freed += self.seed_top_level(p, right_start);

        let reserved = (p - bd_base) + (bd_base + heap_size - right_start);
        let expected = heap_size - reserved;

        assert_eq!(
            freed, expected,
            "buddy heap: metadata/reservation integrity check failed"
        );

        log::debug!(
            "heap: buddy allocator ready ({} levels, {} bytes usable of {} total)",
            nsizes,
            expected,
            heap_size
        );
    }

    /// Returns a `LEAF_SIZE`-aligned block of at least `max(nbytes, LEAF_SIZE)`
    /// bytes, or `None` on exhaustion. `allocate(0)` is treated the same as
    /// any request at or below `LEAF_SIZE` and returns a leaf block.
    pub fn allocate(&mut self, nbytes: usize) -> Option<NonNull<u8>>
    {
        let want = core::cmp::max(nbytes, LEAF_SIZE);
        let fk = self.first_level(want)?;
        let k_max = self.max_level();

        let mut k = fk;
        while k <= k_max && self.info_mut(k).free.is_empty()
        {
            k += 1;
        }

        if k > k_max
        {
            log::warn!("heap: out of memory allocating {} bytes", nbytes);
            return None;
        }

        let p = self.info_mut(k).free.pop().expect("free list checked non-empty above");
        let addr_p = p.as_ptr() as usize;

        // alloc[K] is absent: the top level has no buddy to pair with.
        if k < k_max
        {
            let bi = self.blk_index(k, addr_p);
            self.info_mut(k).alloc.flip(bi / 2);
        }

        while k > fk
        {
            let q_addr = addr_p + self.blk_size(k - 1);
            let bi_k = self.blk_index(k, addr_p);

            self.info_mut(k).split.set(bi_k);

            let bi_child = self.blk_index(k - 1, addr_p);
            self.info_mut(k - 1).alloc.flip(bi_child / 2);

            unsafe { self.info_mut(k - 1).free.push(NonNull::new_unchecked(q_addr as *mut u8)) };

            k -= 1;
        }

        log::debug!("heap: allocate({}) -> {:#x} (level {})", nbytes, addr_p, fk);

        Some(p)
    }

    /// Frees a block previously returned by [`Buddy::allocate`], coalescing
    /// with its buddy wherever possible.
    pub fn free(&mut self, p: NonNull<u8>)
    {
        let mut cur = p.as_ptr() as usize;

        debug_assert!(cur % LEAF_SIZE == 0, "buddy heap: misaligned free");
        debug_assert!(
            cur >= self.base && cur < self.base + self.heap_size,
            "buddy heap: address out of range"
        );

        let mut k = self.recover_level(cur);
        let k_max = self.max_level();

        while k < k_max
        {
            let bi = self.blk_index(k, cur);
            let still_allocated = self.info_mut(k).alloc.flip(bi / 2);

            if still_allocated
            {
                break;
            }

            let buddy_bi = bi ^ 1;
            let buddy_addr = self.addr(k, buddy_bi);

            unsafe { self.info_mut(k).free.remove(NonNull::new_unchecked(buddy_addr as *mut u8)) };

            if buddy_bi % 2 == 0
            {
                cur = buddy_addr;
            }

            let parent_bi = self.blk_index(k + 1, cur);
            self.info_mut(k + 1).split.clear(parent_bi);

            k += 1;
        }

        log::debug!("heap: free({:#x}) settled at level {}", cur, k);

        unsafe { self.info_mut(k).free.push(NonNull::new_unchecked(cur as *mut u8)) };
    }
}

#[cfg(feature = "module_tests")]
pub mod tests;
