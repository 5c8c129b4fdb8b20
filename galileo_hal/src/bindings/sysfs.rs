//! Linux sysfs binding.
//!
//! GPIO through `class/gpio`, PWM through `class/pwm/pwmchip0` and ADC
//! reads through the IIO device. Paths are relative to a configurable
//! sysfs root. I2C is not available through this binding.

use galileo_common::binding::{BindingError, I2cHandleId, IoBinding};
use galileo_common::config::{BoardConfig, SysfsSection};
use galileo_common::io::{Direction, Level};
use galileo_common::platform::{PLATFORM_GALILEO_GEN1, PLATFORM_GALILEO_GEN2};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Factory registered as `"sysfs"`.
pub fn create_binding(config: &BoardConfig) -> Result<Box<dyn IoBinding>, BindingError> {
    Ok(Box::new(SysfsBinding::new(&config.sysfs)?))
}

/// DMI board name of the Galileo Gen 2.
const GEN2_BOARD_NAME: &str = "GalileoGen2";

pub struct SysfsBinding {
    root: PathBuf,
    board_name: String,
    platform_type: u32,
    pin_count: u32,
    gpio_exported: HashSet<u16>,
    pwm_exported: HashSet<u8>,
}

impl SysfsBinding {
    /// # Errors
    /// `BindingError::InitFailed` if the sysfs GPIO class is missing.
    pub fn new(config: &SysfsSection) -> Result<Self, BindingError> {
        let gpio_class = config.root.join("class/gpio");
        if !gpio_class.is_dir() {
            return Err(BindingError::InitFailed(format!(
                "{} not found",
                gpio_class.display()
            )));
        }
        let board_name = fs::read_to_string(config.root.join("devices/virtual/dmi/id/board_name"))
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let platform_type = config
            .platform_type
            .unwrap_or_else(|| platform_from_board_name(&board_name));
        info!(
            "sysfs binding rooted at {}, board '{}' (platform {})",
            config.root.display(),
            board_name,
            platform_type
        );
        Ok(Self {
            root: config.root.clone(),
            board_name,
            platform_type,
            pin_count: config.pin_count,
            gpio_exported: HashSet::new(),
            pwm_exported: HashSet::new(),
        })
    }

    fn gpio_path(&self, line: u16, file: &str) -> PathBuf {
        self.root.join(format!("class/gpio/gpio{line}/{file}"))
    }

    fn pwm_chip(&self) -> PathBuf {
        self.root.join("class/pwm/pwmchip0")
    }

    fn pwm_path(&self, channel: u8, file: &str) -> PathBuf {
        self.pwm_chip().join(format!("pwm{channel}/{file}"))
    }

    fn adc_path(&self, channel: u8) -> PathBuf {
        self.root
            .join(format!("bus/iio/devices/iio:device0/in_voltage{channel}_raw"))
    }
}

/// Gen 2 identifies itself by board name; every other Galileo is a Gen 1.
fn platform_from_board_name(name: &str) -> u32 {
    if name == GEN2_BOARD_NAME {
        PLATFORM_GALILEO_GEN2
    } else {
        PLATFORM_GALILEO_GEN1
    }
}

fn write_file(path: &Path, value: impl ToString) -> Result<(), BindingError> {
    fs::write(path, value.to_string())
        .map_err(|e| BindingError::Io(format!("{}: {}", path.display(), e)))
}

fn read_number<T: std::str::FromStr>(path: &Path) -> Result<T, BindingError> {
    let text = fs::read_to_string(path)
        .map_err(|e| BindingError::Io(format!("{}: {}", path.display(), e)))?;
    text.trim()
        .parse()
        .map_err(|_| BindingError::Io(format!("{}: unexpected value {:?}", path.display(), text.trim())))
}

impl IoBinding for SysfsBinding {
    fn name(&self) -> &'static str {
        "sysfs"
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn platform_type(&self) -> u32 {
        self.platform_type
    }

    fn platform_name(&self) -> String {
        self.board_name.clone()
    }

    fn pin_count(&self) -> u32 {
        self.pin_count
    }

    fn default_i2c_bus(&self) -> u8 {
        0
    }

    fn gpio_open(&mut self, line: u16) -> Result<(), BindingError> {
        if self.gpio_exported.contains(&line) {
            return Ok(());
        }
        if !self.root.join(format!("class/gpio/gpio{line}")).is_dir() {
            write_file(&self.root.join("class/gpio/export"), line)?;
            debug!("Exported gpio {}", line);
        }
        self.gpio_exported.insert(line);
        Ok(())
    }

    fn gpio_dir(&mut self, line: u16, direction: Direction) -> Result<(), BindingError> {
        write_file(&self.gpio_path(line, "direction"), direction.as_str())
    }

    fn gpio_read(&mut self, line: u16) -> Result<Level, BindingError> {
        read_number::<u32>(&self.gpio_path(line, "value")).map(Level::from_value)
    }

    fn gpio_write(&mut self, line: u16, level: Level) -> Result<(), BindingError> {
        write_file(&self.gpio_path(line, "value"), level.value())
    }

    fn aio_open(&mut self, channel: u8) -> Result<(), BindingError> {
        let path = self.adc_path(channel);
        if !path.exists() {
            return Err(BindingError::InvalidLine(format!("{} not found", path.display())));
        }
        Ok(())
    }

    fn aio_read(&mut self, channel: u8) -> Result<u16, BindingError> {
        read_number(&self.adc_path(channel))
    }

    fn pwm_open(&mut self, channel: u8) -> Result<(), BindingError> {
        if self.pwm_exported.contains(&channel) {
            return Ok(());
        }
        if !self.pwm_chip().join(format!("pwm{channel}")).is_dir() {
            write_file(&self.pwm_chip().join("export"), channel)?;
            debug!("Exported pwm {}", channel);
        }
        self.pwm_exported.insert(channel);
        Ok(())
    }

    fn pwm_enable(&mut self, channel: u8, enable: bool) -> Result<(), BindingError> {
        write_file(&self.pwm_path(channel, "enable"), u8::from(enable))
    }

    fn pwm_period_ns(&mut self, channel: u8, period_ns: u32) -> Result<(), BindingError> {
        // Gen 2 has one period register for the whole chip.
        let path = if self.platform_type == PLATFORM_GALILEO_GEN2 {
            self.pwm_chip().join("device/pwm_period")
        } else {
            self.pwm_path(channel, "period")
        };
        write_file(&path, period_ns)
    }

    fn pwm_duty_ns(&mut self, channel: u8, duty_ns: u32) -> Result<(), BindingError> {
        write_file(&self.pwm_path(channel, "duty_cycle"), duty_ns)
    }

    fn pwm_read(&mut self, channel: u8) -> Result<f32, BindingError> {
        let duty: u32 = read_number(&self.pwm_path(channel, "duty_cycle"))?;
        let period: u32 = read_number(&self.pwm_path(channel, "period"))?;
        Ok(if period == 0 {
            0.0
        } else {
            duty as f32 / period as f32
        })
    }

    fn i2c_open(&mut self, _bus: u8) -> Result<I2cHandleId, BindingError> {
        Err(BindingError::NotSupported("i2c".to_string()))
    }

    fn i2c_address(&mut self, _handle: I2cHandleId, _address: u8) -> Result<(), BindingError> {
        Err(BindingError::NotSupported("i2c".to_string()))
    }

    fn i2c_read(&mut self, _handle: I2cHandleId, _length: usize) -> Result<Vec<u8>, BindingError> {
        Err(BindingError::NotSupported("i2c".to_string()))
    }

    fn i2c_read_reg(
        &mut self,
        _handle: I2cHandleId,
        _register: u8,
        _length: usize,
    ) -> Result<Vec<u8>, BindingError> {
        Err(BindingError::NotSupported("i2c".to_string()))
    }

    fn i2c_write(&mut self, _handle: I2cHandleId, _bytes: &[u8]) -> Result<(), BindingError> {
        Err(BindingError::NotSupported("i2c".to_string()))
    }

    fn i2c_write_reg(
        &mut self,
        _handle: I2cHandleId,
        _register: u8,
        _value: u8,
    ) -> Result<(), BindingError> {
        Err(BindingError::NotSupported("i2c".to_string()))
    }
}
