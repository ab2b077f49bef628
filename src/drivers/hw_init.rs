//! One-shot hardware peripheral initialization.
//!
//! Configures the LEDC timer and fan PWM channels, the tachometer input
//! pins, and the per-pin GPIO ISR service using raw ESP-IDF sys calls.
//! Called once from `main()` before any activity starts.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::config::ControllerConfig;
use crate::error::{InitError, PwmError};

// ── LEDC PWM ─────────────────────────────────────────────────

/// Timer 0 at the fan carrier frequency, one channel per fan, both
/// starting at duty 0.
#[cfg(target_os = "espidf")]
pub fn init_fan_pwm(config: &ControllerConfig) -> Result<(), InitError> {
    let timer = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: u32::from(config.pwm_resolution_bits),
        freq_hz: config.pwm_frequency_hz,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    // SAFETY: called once from the single-threaded startup path.
    let ret = unsafe { ledc_timer_config(&timer) };
    if ret != ESP_OK as i32 {
        return Err(InitError::LedcTimerFailed(ret));
    }

    for fan in &config.fans {
        let channel = ledc_channel_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            channel: u32::from(fan.pwm_channel),
            timer_sel: ledc_timer_t_LEDC_TIMER_0,
            gpio_num: fan.pwm_gpio,
            duty: 0,
            hpoint: 0,
            ..Default::default()
        };
        // SAFETY: as above; the channel config struct outlives the call.
        let ret = unsafe { ledc_channel_config(&channel) };
        if ret != ESP_OK as i32 {
            return Err(InitError::LedcChannelFailed(ret));
        }
    }

    info!(
        "hw_init: LEDC {} Hz / {}-bit (fan1=CH{} GPIO{}, fan2=CH{} GPIO{})",
        config.pwm_frequency_hz,
        config.pwm_resolution_bits,
        config.fans[0].pwm_channel,
        config.fans[0].pwm_gpio,
        config.fans[1].pwm_channel,
        config.fans[1].pwm_gpio,
    );
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_fan_pwm(config: &ControllerConfig) -> Result<(), InitError> {
    log::info!(
        "hw_init(sim): LEDC skipped ({} Hz / {}-bit)",
        config.pwm_frequency_hz,
        config.pwm_resolution_bits
    );
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn ledc_set(channel: u8, duty: u32) -> Result<(), PwmError> {
    // SAFETY: the channel was configured in init_fan_pwm(); each channel is
    // written only by the control loop that owns its fan.
    unsafe {
        let ret = ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, u32::from(channel), duty);
        if ret != ESP_OK as i32 {
            return Err(PwmError::DutyWriteFailed(ret));
        }
        let ret = ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, u32::from(channel));
        if ret != ESP_OK as i32 {
            return Err(PwmError::DutyWriteFailed(ret));
        }
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set(_channel: u8, _duty: u32) -> Result<(), PwmError> {
    Ok(())
}

// ── Tachometer inputs ─────────────────────────────────────────

/// Input with pull-up, interrupt on the falling edge.
#[cfg(target_os = "espidf")]
pub fn init_tach_input(pin: i32) -> Result<(), InitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_NEGEDGE,
        ..Default::default()
    };
    // SAFETY: startup path only; the config struct outlives the call.
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(InitError::GpioConfigFailed(ret));
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_tach_input(_pin: i32) -> Result<(), InitError> {
    Ok(())
}

// ── GPIO ISR Service ──────────────────────────────────────────

/// Install the per-pin GPIO ISR service.  Handlers are added per fan by
/// the tachometer edge source.
#[cfg(target_os = "espidf")]
pub fn init_isr_service() -> Result<(), InitError> {
    // SAFETY: ESP_ERR_INVALID_STATE means it was already installed.
    let ret = unsafe { gpio_install_isr_service(0) };
    if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
        return Err(InitError::IsrInstallFailed(ret));
    }
    info!("hw_init: GPIO ISR service installed");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service() -> Result<(), InitError> {
    log::info!("hw_init(sim): ISR service skipped");
    Ok(())
}
