//! Stopping when the loader's configuration cannot be trusted.

use crate::locate::Fatal;

/// What to do when the configuration blob is unusable. Implementations never
/// return.
pub trait Halt {
    fn halt(&self, fatal: &Fatal) -> !;
}

impl<H: Halt + ?Sized> Halt for &H {
    fn halt(&self, fatal: &Fatal) -> ! {
        (**self).halt(fatal)
    }
}

/// Logs the problem and parks the CPU forever.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeadLoop;

impl Halt for DeadLoop {
    fn halt(&self, fatal: &Fatal) -> ! {
        log::error!("{}", fatal);
        log::error!("cannot continue without a usable payload config");
        loop {
            cfg_if::cfg_if! {
                if #[cfg(target_arch = "x86_64")] {
                    x86_64::instructions::hlt();
                } else {
                    core::hint::spin_loop();
                }
            }
        }
    }
}
