//! Indicator output drivers.
//!
//! The application task computes levels from blink patterns; this module only
//! pushes them to the two LEDs. The host build substitutes a recording driver
//! so tests can observe the levels.

/// Drives the status and lock indicator outputs.
pub trait IndicatorDriver {
    fn set_status(&mut self, level: bool);
    fn set_lock(&mut self, level: bool);
}

#[cfg(target_os = "none")]
pub use hardware::GpioIndicators;

#[cfg(target_os = "none")]
mod hardware {
    use embassy_stm32::gpio::{Level, Output};

    use super::IndicatorDriver;

    /// Push-pull GPIO outputs for the two panel LEDs.
    pub struct GpioIndicators<'d> {
        status: Output<'d>,
        lock: Output<'d>,
    }

    impl<'d> GpioIndicators<'d> {
        pub fn new(status: Output<'d>, lock: Output<'d>) -> Self {
            Self { status, lock }
        }
    }

    impl IndicatorDriver for GpioIndicators<'_> {
        fn set_status(&mut self, level: bool) {
            self.status
                .set_level(if level { Level::High } else { Level::Low });
        }

        fn set_lock(&mut self, level: bool) {
            self.lock
                .set_level(if level { Level::High } else { Level::Low });
        }
    }
}

/// Indicator stand-in for host builds; remembers the last driven levels.
#[cfg(not(target_os = "none"))]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct HostIndicators {
    pub status: bool,
    pub lock: bool,
}

#[cfg(not(target_os = "none"))]
impl IndicatorDriver for HostIndicators {
    fn set_status(&mut self, level: bool) {
        self.status = level;
    }

    fn set_lock(&mut self, level: bool) {
        self.lock = level;
    }
}
