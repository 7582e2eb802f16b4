//! Buddy allocator tests, run in-kernel under the `module_tests` feature.
//!
//! A fresh `Buddy` is built over a single static backing buffer for each
//! test (`init` is cheap and fully resets the metadata region), so tests
//! don't interfere with each other despite sharing memory.

use alloc::vec::Vec;
use core::ptr::NonNull;

use super::Buddy;
use crate::heap::LEAF_SIZE;
use crate::test::TestContext;
use crate::{check_eq, check_neq, check_none, check_not_none, execute_test};

const TEST_HEAP_SIZE: usize = 16 * 1024;

#[repr(align(16))]
struct TestHeap([u8; TEST_HEAP_SIZE]);

static mut TEST_HEAP: TestHeap = TestHeap([0; TEST_HEAP_SIZE]);

fn fresh() -> Buddy
{
    let mut heap = Buddy::uninit();

    unsafe {
        let base = core::ptr::addr_of_mut!(TEST_HEAP) as usize;
        heap.init(base, base + TEST_HEAP_SIZE);
    }

    heap
}

pub fn run_tests(context: &mut TestContext)
{
    execute_test!(context, test_basic_alloc_free);
    execute_test!(context, test_out_of_memory);
    execute_test!(context, test_midsize_alloc);
    execute_test!(context, test_round_trip_reverse);
    execute_test!(context, test_round_trip_forward);
    execute_test!(context, test_round_trip_adversarial);
}

fn test_basic_alloc_free(ctx: &mut TestContext)
{
    let mut heap = fresh();

    let a = heap.allocate(16);
    check_not_none!(ctx, a);
    let a = a.unwrap();
    check_eq!(ctx, a.as_ptr() as usize % 16, 0);

    let b = heap.allocate(16);
    check_not_none!(ctx, b);
    let b = b.unwrap();
    check_neq!(ctx, a.as_ptr(), b.as_ptr());

    heap.free(a);
    heap.free(b);

    // Neither allocation touched the untouched top-level free block, so it
    // should still be allocatable as a single chunk.
    let big = heap.allocate(TEST_HEAP_SIZE / 2);
    check_not_none!(ctx, big);
}

fn test_out_of_memory(ctx: &mut TestContext)
{
    let mut heap = fresh();

    let huge = heap.allocate(TEST_HEAP_SIZE * 2);
    check_none!(ctx, huge);
}

fn test_midsize_alloc(ctx: &mut TestContext)
{
    let mut heap = fresh();

    let p = heap.allocate(48);
    check_not_none!(ctx, p);
    let p = p.unwrap();
    check_eq!(ctx, p.as_ptr() as usize % 16, 0);

    heap.free(p);
}

/// Allocates leaves until exhaustion, returning every block obtained. The
/// count is however many leaves the heap actually has room for once its own
/// metadata is reserved — not assumed up front.
fn drain_leaves(heap: &mut Buddy) -> Vec<NonNull<u8>>
{
    let mut blocks = Vec::new();

    while let Some(p) = heap.allocate(LEAF_SIZE)
    {
        blocks.push(p);
    }

    blocks
}

/// Out-shuffle permutation of `0..n`: always a bijection regardless of `n`'s
/// parity, and non-monotonic once `n > 2`.
fn interleave_order(n: usize) -> Vec<usize>
{
    let half = n.div_ceil(2);
    (0..n).map(|i| if i < half { i * 2 } else { (i - half) * 2 + 1 }).collect()
}

fn churn(ctx: &mut TestContext, make_order: impl Fn(usize) -> Vec<usize>)
{
    let mut heap = fresh();

    let blocks = drain_leaves(&mut heap);
    let total = blocks.len();
    check_neq!(ctx, total, 0);

    let order = make_order(total);
    check_eq!(ctx, order.len(), total);

    for &i in &order
    {
        heap.free(blocks[i]);
    }

    // Full coalescing should let us drain exactly as many leaves again —
    // anything less would mean free space was lost to the round trip.
    let refilled = drain_leaves(&mut heap);
    check_eq!(ctx, refilled.len(), total);

    for p in refilled
    {
        heap.free(p);
    }
}

fn test_round_trip_reverse(ctx: &mut TestContext)
{
    churn(ctx, |n| (0..n).rev().collect());
}

fn test_round_trip_forward(ctx: &mut TestContext)
{
    churn(ctx, |n| (0..n).collect());
}

fn test_round_trip_adversarial(ctx: &mut TestContext)
{
    churn(ctx, interleave_order);
}
