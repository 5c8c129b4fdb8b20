//! I2C transaction manager.
//!
//! Bus contexts open lazily on first use. The device address is selected
//! before every transfer. Transfer failures are logged and never
//! propagated; reads still raise their reply event with whatever bytes
//! arrived.

use crate::events::{BoardEvent, EventBus, ListenerId};
use crate::scheduler::{Scheduler, Task, TimerId};
use galileo_common::binding::{BindingError, I2cHandleId, IoBinding};
use galileo_common::config::{I2cHandleMode, I2cSection};
use galileo_common::error::BoardError;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Payload of an I2C write request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum I2cWrite {
    /// Written as one transfer; an empty payload is not written.
    RawBytes(Vec<u8>),
    RegisterWrite { register: u8, value: u8 },
}

impl I2cWrite {
    /// Command byte followed by data bytes.
    pub fn command(cmd: u8, bytes: &[u8]) -> Self {
        let mut buf = Vec::with_capacity(bytes.len() + 1);
        buf.push(cmd);
        buf.extend_from_slice(bytes);
        Self::RawBytes(buf)
    }
}

/// `(register, value)` is a register write.
impl From<(u8, u8)> for I2cWrite {
    fn from((register, value): (u8, u8)) -> Self {
        Self::RegisterWrite { register, value }
    }
}

impl From<Vec<u8>> for I2cWrite {
    fn from(bytes: Vec<u8>) -> Self {
        Self::RawBytes(bytes)
    }
}

impl From<&[u8]> for I2cWrite {
    fn from(bytes: &[u8]) -> Self {
        Self::RawBytes(bytes.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for I2cWrite {
    fn from(bytes: [u8; N]) -> Self {
        Self::RawBytes(bytes.to_vec())
    }
}

/// A lone command byte.
impl From<u8> for I2cWrite {
    fn from(cmd: u8) -> Self {
        Self::RawBytes(vec![cmd])
    }
}

/// Overrides applied by `i2c_config`. Unset fields keep their value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct I2cOptions {
    pub bus: Option<u8>,
    pub delay_ms: Option<u32>,
    pub handles: Option<I2cHandleMode>,
}

/// A bare number sets the read delay.
impl From<u32> for I2cOptions {
    fn from(delay_ms: u32) -> Self {
        Self {
            delay_ms: Some(delay_ms),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ReadRequest {
    address: u8,
    register: Option<u8>,
    length: usize,
    continuous: bool,
    timer: TimerId,
    listener: Option<ListenerId>,
}

#[derive(Debug)]
pub struct I2cManager {
    bus: u8,
    delay: Duration,
    mode: I2cHandleMode,
    shared: Option<I2cHandleId>,
    per_address: HashMap<u8, I2cHandleId>,
    reads: HashMap<u32, ReadRequest>,
    next_read: u32,
}

impl I2cManager {
    /// `default_bus` applies unless the configuration names a bus.
    pub fn new(default_bus: u8, section: &I2cSection) -> Self {
        Self {
            bus: section.bus.unwrap_or(default_bus),
            delay: Duration::from_millis(u64::from(section.delay_ms)),
            mode: section.handles,
            shared: None,
            per_address: HashMap::new(),
            reads: HashMap::new(),
            next_read: 0,
        }
    }

    /// Apply overrides. A bus or sharing change drops opened contexts.
    pub fn configure(&mut self, options: I2cOptions) {
        if let Some(delay_ms) = options.delay_ms {
            self.delay = Duration::from_millis(u64::from(delay_ms));
        }
        let bus_changed = options.bus.is_some_and(|b| b != self.bus);
        let mode_changed = options.handles.is_some_and(|m| m != self.mode);
        if bus_changed || mode_changed {
            self.shared = None;
            self.per_address.clear();
        }
        self.bus = options.bus.unwrap_or(self.bus);
        self.mode = options.handles.unwrap_or(self.mode);
        debug!(
            "I2C config: bus {}, delay {:?}, handles {:?}",
            self.bus, self.delay, self.mode
        );
    }

    pub fn bus(&self) -> u8 {
        self.bus
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Open the bus context if nothing has been opened yet.
    ///
    /// # Errors
    /// `BoardError::NotImplemented` if the binding has no I2C support.
    pub fn ensure_open(&mut self, binding: &mut dyn IoBinding) -> Result<(), BoardError> {
        if self.mode == I2cHandleMode::Shared && self.shared.is_none() {
            self.shared = Some(self.open(binding)?);
        }
        Ok(())
    }

    /// Write to a device.
    ///
    /// # Errors
    /// Only if no bus context can be opened; transfer failures are logged.
    pub fn write(
        &mut self,
        binding: &mut dyn IoBinding,
        address: u8,
        request: I2cWrite,
    ) -> Result<(), BoardError> {
        let handle = self.handle(binding, address)?;
        let result = match &request {
            I2cWrite::RawBytes(bytes) if bytes.is_empty() => return Ok(()),
            I2cWrite::RawBytes(bytes) => select(binding, handle, address)
                .and_then(|()| binding.i2c_write(handle, bytes)),
            I2cWrite::RegisterWrite { register, value } => select(binding, handle, address)
                .and_then(|()| binding.i2c_write_reg(handle, *register, *value)),
        };
        if let Err(e) = result {
            warn!("I2C: write to peripheral with address 0x{:02x} failed: {}", address, e);
        }
        Ok(())
    }

    /// Schedule a read, repeating every delay when `continuous`.
    /// Returns the request id carried by `Task::I2cRead`.
    ///
    /// # Errors
    /// Only if no bus context can be opened.
    pub fn request_read(
        &mut self,
        binding: &mut dyn IoBinding,
        scheduler: &mut Scheduler,
        address: u8,
        register: Option<u8>,
        length: usize,
        continuous: bool,
    ) -> Result<u32, BoardError> {
        self.handle(binding, address)?;
        let id = self.next_read;
        self.next_read = self.next_read.wrapping_add(1);
        let timer = if continuous {
            scheduler.schedule_repeating(self.delay, Task::I2cRead(id))
        } else {
            scheduler.schedule_once(self.delay, Task::I2cRead(id))
        };
        self.reads.insert(
            id,
            ReadRequest {
                address,
                register,
                length,
                continuous,
                timer,
                listener: None,
            },
        );
        debug!(
            "I2C read {} scheduled: 0x{:02x} reg {:?} len {} continuous {}",
            id, address, register, length, continuous
        );
        Ok(id)
    }

    /// Run the transfer of read request `id` and raise its reply.
    pub fn perform_read(&mut self, binding: &mut dyn IoBinding, events: &mut EventBus, id: u32) {
        let Some(request) = self.reads.get(&id).copied() else {
            return;
        };
        if !request.continuous {
            self.reads.remove(&id);
        }

        let ReadRequest {
            address,
            register,
            length,
            ..
        } = request;
        let result = self
            .handle(binding, address)
            .map_err(|e| BindingError::Io(e.to_string()))
            .and_then(|handle| {
                select(binding, handle, address)?;
                match register {
                    Some(reg) => binding.i2c_read_reg(handle, reg, length),
                    None => binding.i2c_read(handle, length),
                }
            });

        let data = match result {
            Ok(data) if data.len() == length => data,
            Ok(data) => {
                warn!(
                    "I2C: Could not read {} bytes from peripheral with address 0x{:02x}",
                    length, address
                );
                data
            }
            Err(e) => {
                warn!(
                    "I2C: Could not read {} bytes from peripheral with address 0x{:02x}: {}",
                    length, address, e
                );
                Vec::new()
            }
        };

        events.emit(BoardEvent::I2cReply {
            address,
            register,
            data,
        });
    }

    /// Stop a read request.
    /// Bind the reply listener of read request `id` so cancelling drops it.
    pub fn attach_listener(&mut self, id: u32, listener: ListenerId) {
        if let Some(request) = self.reads.get_mut(&id) {
            request.listener = Some(listener);
        }
    }

    /// Cancel read request `id` and remove its reply listener.
    pub fn cancel_read(&mut self, scheduler: &mut Scheduler, events: &mut EventBus, id: u32) -> bool {
        match self.reads.remove(&id) {
            Some(request) => {
                if let Some(listener) = request.listener {
                    events.off(listener);
                }
                scheduler.cancel(request.timer)
            }
            None => false,
        }
    }

    /// Active read requests.
    pub fn read_count(&self) -> usize {
        self.reads.len()
    }

    fn handle(&mut self, binding: &mut dyn IoBinding, address: u8) -> Result<I2cHandleId, BoardError> {
        match self.mode {
            I2cHandleMode::Shared => {
                self.ensure_open(binding)?;
                self.shared
                    .ok_or_else(|| BoardError::Binding(BindingError::InitFailed("i2c".into())))
            }
            I2cHandleMode::PerAddress => {
                if let Some(handle) = self.per_address.get(&address) {
                    return Ok(*handle);
                }
                let handle = self.open(binding)?;
                self.per_address.insert(address, handle);
                Ok(handle)
            }
        }
    }

    fn open(&self, binding: &mut dyn IoBinding) -> Result<I2cHandleId, BoardError> {
        match binding.i2c_open(self.bus) {
            Ok(handle) => {
                info!("I2C bus {} opened", self.bus);
                Ok(handle)
            }
            Err(BindingError::NotSupported(_)) => Err(BoardError::NotImplemented("I2C")),
            Err(e) => Err(e.into()),
        }
    }
}

fn select(binding: &mut dyn IoBinding, handle: I2cHandleId, address: u8) -> Result<(), BindingError> {
    binding.i2c_address(handle, address)
}
