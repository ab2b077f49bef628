//! Core-pinned thread spawning for the ESP32 dual-core.
//!
//! Wraps `esp_pthread_set_cfg()` so that `std::thread::spawn` creates a
//! FreeRTOS task pinned to a specific CPU core with explicit priority
//! and stack size. On non-ESP targets, falls back to plain thread spawn.
//!
//! # ESP-IDF Threading Model
//!
//! ESP-IDF implements `std::thread` via pthreads, which are thin wrappers
//! around FreeRTOS tasks. `esp_pthread_set_cfg()` sets thread-local
//! configuration that applies to the *next* `pthread_create()` call from
//! the calling thread, so the config→spawn pair must not be interleaved
//! with other thread creation on the same thread.

use crate::error::{InitError, Result};

/// CPU core identifiers for the ESP32 Xtensa LX6/LX7 dual-core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU): protocol stacks.
    Pro = 0,
    /// Core 1 (APP_CPU): fan control and probe polling.
    App = 1,
}

impl Core {
    /// Core the control activities run on.
    pub const CONTROL: Core = if crate::pins::NON_WIFI_CORE == 0 { Core::Pro } else { Core::App };
}

/// Spawn a thread pinned to a specific core with explicit priority and stack.
#[cfg(target_os = "espidf")]
pub fn spawn_on_core(
    core: Core,
    priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> Result<std::thread::JoinHandle<()>> {
    let c_name = std::ffi::CString::new(name).map_err(|_| InitError::ThreadSpawnFailed)?;

    // SAFETY: the config struct is fully initialised by the default
    // constructor and `c_name` outlives the pthread_create inside spawn().
    let ret = unsafe {
        let mut cfg = esp_idf_svc::sys::esp_create_default_pthread_config();
        cfg.pin_to_core = core as i32;
        cfg.prio = i32::from(priority);
        cfg.stack_size = (stack_kb * 1024) as i32;
        cfg.thread_name = c_name.as_ptr();
        esp_idf_svc::sys::esp_pthread_set_cfg(&cfg)
    };
    if ret != esp_idf_svc::sys::ESP_OK as i32 {
        log::error!("esp_pthread_set_cfg failed for '{}': {}", name, ret);
        return Err(InitError::ThreadSpawnFailed.into());
    }

    log::info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        name,
        core,
        priority,
        stack_kb
    );

    let handle = std::thread::Builder::new()
        .name(name.into())
        .spawn(f)
        .map_err(|_| InitError::ThreadSpawnFailed)?;
    drop(c_name);
    Ok(handle)
}

/// Simulation fallback; ignores core affinity and priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_on_core(
    _core: Core,
    _priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> Result<std::thread::JoinHandle<()>> {
    log::info!("Spawning '{}' (sim, no core pinning, stack={}KB)", name, stack_kb);

    std::thread::Builder::new()
        .name(name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
        .map_err(|_| InitError::ThreadSpawnFailed.into())
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn sim_spawn_runs_closure_on_named_thread() {
        let handle = spawn_on_core(Core::App, 5, 64, "unit-task", || {
            assert_eq!(std::thread::current().name(), Some("unit-task"));
        })
        .unwrap();
        handle.join().unwrap();
    }
}
