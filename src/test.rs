//! Minimal in-kernel test harness for the `module_tests` feature.
//!
//! This kernel has no host test target: most modules compile only for
//! `riscv*` via inline/naked/global asm, so subsystem tests run inside the
//! booted kernel itself, reporting results over the UART rather than through
//! `cargo test`.

pub struct TestContext
{
    pub pass_count: u32,
    pub fail_count: u32,
}

impl TestContext
{
    pub const fn new() -> Self
    {
        Self {
            pass_count: 0,
            fail_count: 0,
        }
    }

    pub fn report(&self)
    {
        crate::println!(
            "module_tests: {} passed, {} failed",
            self.pass_count,
            self.fail_count
        );
    }
}

#[macro_export]
macro_rules! execute_test {
    ($ctx:ident, $fn:ident) => {{
        let before = $ctx.fail_count;
        $fn($ctx);
        crate::println!(
            "  {} ... {}",
            stringify!($fn),
            if $ctx.fail_count == before { "ok" } else { "FAILED" }
        );
    }};
}

#[macro_export]
macro_rules! check_eq {
    ($ctx:ident, $act:expr, $exp:expr) => {
        if $act != $exp
        {
            $ctx.fail_count += 1;
            crate::println!(
                "    FAIL: {:?} != {:?} ({}:{})",
                $act,
                $exp,
                file!(),
                line!()
            );
        }
        else
        {
            $ctx.pass_count += 1;
        }
    };
}

#[macro_export]
macro_rules! check_neq {
    ($ctx:ident, $act:expr, $exp:expr) => {
        if $act == $exp
        {
            $ctx.fail_count += 1;
            crate::println!(
                "    FAIL: {:?} == {:?} ({}:{})",
                $act,
                $exp,
                file!(),
                line!()
            );
        }
        else
        {
            $ctx.pass_count += 1;
        }
    };
}

#[macro_export]
macro_rules! check_not_none {
    ($ctx:ident, $act:expr) => {
        if $act.is_none()
        {
            $ctx.fail_count += 1;
            crate::println!(
                "    FAIL: {} is None ({}:{})",
                stringify!($act),
                file!(),
                line!()
            );
        }
        else
        {
            $ctx.pass_count += 1;
        }
    };
}

#[macro_export]
macro_rules! check_none {
    ($ctx:ident, $act:expr) => {
        if $act.is_some()
        {
            $ctx.fail_count += 1;
            crate::println!(
                "    FAIL: {} is not None ({}:{})",
                stringify!($act),
                file!(),
                line!()
            );
        }
        else
        {
            $ctx.pass_count += 1;
        }
    };
}
