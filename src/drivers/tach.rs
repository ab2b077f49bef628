//! Tachometer edge sources.
//!
//! On ESP-IDF, [`GpioEdgeSource`] registers a per-pin GPIO ISR whose only
//! job is [`PulseCounter::record_edge`].  The counter pointer handed to the
//! ISR is a leaked `Arc` strong reference, so it stays valid for the life
//! of the process.  On the host, [`SimEdgeSource`] injects edges directly.

use std::sync::{Arc, OnceLock};

use crate::app::ports::EdgeSource;
use crate::error::{InitError, Result};
use crate::sensors::tach::PulseCounter;

#[cfg(target_os = "espidf")]
pub use esp::GpioEdgeSource;

#[cfg(target_os = "espidf")]
mod esp {
    use std::sync::Arc;

    use esp_idf_svc::sys::*;
    use log::info;

    use crate::app::ports::EdgeSource;
    use crate::drivers::hw_init;
    use crate::error::{InitError, Result};
    use crate::sensors::tach::PulseCounter;

    /// Falling-edge interrupt on one tachometer pin.
    pub struct GpioEdgeSource {
        pin: i32,
        subscribed: bool,
    }

    impl GpioEdgeSource {
        /// [`hw_init::init_isr_service`] must have run first.
        pub fn new(pin: i32) -> Self {
            Self { pin, subscribed: false }
        }
    }

    unsafe extern "C" fn tach_isr(arg: *mut core::ffi::c_void) {
        // SAFETY: `arg` is the leaked Arc<PulseCounter> from subscribe();
        // it is never freed.
        let counter = unsafe { &*(arg as *const PulseCounter) };
        counter.record_edge();
    }

    impl EdgeSource for GpioEdgeSource {
        fn subscribe(&mut self, counter: Arc<PulseCounter>) -> Result<()> {
            if self.subscribed {
                return Err(InitError::EdgeSourceInUse.into());
            }
            hw_init::init_tach_input(self.pin)?;

            let arg = Arc::into_raw(counter) as *mut core::ffi::c_void;
            // SAFETY: the pin is configured as a NEGEDGE input and the ISR
            // service is installed.  `arg` is only reclaimed after the
            // handler was rejected or removed.
            unsafe {
                let ret = gpio_isr_handler_add(self.pin, Some(tach_isr), arg);
                if ret != ESP_OK as i32 {
                    drop(Arc::from_raw(arg as *const PulseCounter));
                    return Err(InitError::IsrHandlerFailed(ret).into());
                }
                let ret = gpio_intr_enable(self.pin);
                if ret != ESP_OK as i32 {
                    gpio_isr_handler_remove(self.pin);
                    drop(Arc::from_raw(arg as *const PulseCounter));
                    return Err(InitError::IsrHandlerFailed(ret).into());
                }
            }
            self.subscribed = true;
            info!("tach: ISR attached on GPIO{}", self.pin);
            Ok(())
        }
    }
}

/// Host edge source: tests call [`pulse`](Self::pulse) in place of the fan.
/// Clones share the subscription, so a test can keep one after handing
/// another to the controller.
#[derive(Clone, Default)]
pub struct SimEdgeSource {
    counter: Arc<OnceLock<Arc<PulseCounter>>>,
}

impl SimEdgeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `edges` falling edges.  No-op until subscribed.
    pub fn pulse(&self, edges: u32) {
        if let Some(counter) = self.counter.get() {
            for _ in 0..edges {
                counter.record_edge();
            }
        }
    }
}

impl EdgeSource for SimEdgeSource {
    fn subscribe(&mut self, counter: Arc<PulseCounter>) -> Result<()> {
        self.counter
            .set(counter)
            .map_err(|_| InitError::EdgeSourceInUse.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn sim_source_feeds_subscribed_counter() {
        let counter = Arc::new(PulseCounter::new());
        let mut source = SimEdgeSource::new();
        source.pulse(3);
        source.subscribe(Arc::clone(&counter)).unwrap();
        source.pulse(7);
        assert_eq!(counter.pending_edges(), 7);
    }

    #[test]
    fn second_subscription_is_rejected() {
        let mut source = SimEdgeSource::new();
        source.subscribe(Arc::new(PulseCounter::new())).unwrap();
        assert_eq!(
            source.subscribe(Arc::new(PulseCounter::new())),
            Err(Error::Init(InitError::EdgeSourceInUse))
        );
    }
}
