use crate::TickSource;
use core::cell::Cell;
use critical_section::Mutex;
use embassy_stm32::{
    pac::timer::vals::Urs,
    timer::{CoreInstance, low_level::Timer},
};

/// A wrapping 32-bit tick counter extended from a free running 16-bit hardware timer.
///
/// The hardware counter must be read through [`TickSource::now_ticks`] at least once
/// every `u16::MAX` timer ticks, or whole counter periods are lost.
pub struct Stm32Ticks<'a, T: CoreInstance> {
    timer: Timer<'a, T>,
    /// Last hardware count and the extended count at that read.
    extended: Mutex<Cell<(u16, u32)>>,
}

impl<'a, T: CoreInstance> Stm32Ticks<'a, T> {
    /// Take over `timer` and start it free running. Set the tick frequency on the timer first.
    pub fn new(timer: Timer<'a, T>) -> Self {
        critical_section::with(|_| {
            timer.regs_core().cr1().modify(|reg| {
                reg.set_urs(Urs::COUNTER_ONLY);
                reg.set_opm(false);
                reg.set_udis(false);
            });

            timer.regs_core().arr().write(|reg| reg.set_arr(u16::MAX));
            // Generate an Update Request
            timer.regs_core().egr().write(|r| r.set_ug(true));
            timer.regs_core().sr().modify(|reg| reg.set_uif(false));

            timer.reset();
            timer.start();
        });

        Self {
            timer,
            extended: Mutex::new(Cell::new((0, 0))),
        }
    }

    pub fn into_inner(self) -> Timer<'a, T> {
        self.timer
    }
}

impl<'a, T: CoreInstance> TickSource for Stm32Ticks<'a, T> {
    fn now_ticks(&self) -> u32 {
        critical_section::with(|cs| {
            let extended = self.extended.borrow(cs);
            let (last, total) = extended.get();
            let count = self.timer.regs_core().cnt().read().cnt();
            let total = total.wrapping_add(count.wrapping_sub(last) as u32);
            extended.set((count, total));
            total
        })
    }

    fn tickrate(&self) -> u32 {
        self.timer.get_clock_frequency().0 / (self.timer.regs_core().psc().read() + 1) as u32
    }
}
