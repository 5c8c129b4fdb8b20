//! Board events and the subscription bus.
//!
//! Events are queued when raised and delivered when the board drains the
//! queue (after every scheduled task and on `poll`). Handlers run on the
//! caller's thread and need not be `Send`.

use galileo_common::io::PinId;
use serde::Serialize;
use std::collections::VecDeque;

/// Notification raised by the board.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum BoardEvent {
    /// The binding is open.
    Connect,
    /// Pins are initialized and the board accepts requests.
    Ready,
    /// Sampled digital value of a reporting pin.
    DigitalRead { pin: PinId, value: u8 },
    /// Sampled analog value of a reporting ADC channel.
    AnalogRead { channel: u8, value: u16 },
    /// Bytes read from an I2C peripheral.
    I2cReply {
        address: u8,
        register: Option<u8>,
        data: Vec<u8>,
    },
    /// A stepper finished its requested step count.
    StepperComplete { index: u8 },
}

impl BoardEvent {
    /// Subscription name of the event.
    ///
    /// | Event | Name |
    /// |-------|------|
    /// | `DigitalRead` | `digital-read-<pin as given>` |
    /// | `AnalogRead` | `analog-read-<channel>` |
    /// | `I2cReply` | `I2C-reply<address>-<register or 0>` |
    /// | `StepperComplete` | `stepper-done-<index>` |
    pub fn name(&self) -> String {
        match self {
            Self::Connect => "connect".to_string(),
            Self::Ready => "ready".to_string(),
            Self::DigitalRead { pin, .. } => digital_event(pin),
            Self::AnalogRead { channel, .. } => analog_event(*channel),
            Self::I2cReply {
                address, register, ..
            } => i2c_event(*address, *register),
            Self::StepperComplete { index } => stepper_event(*index),
        }
    }
}

pub fn digital_event(pin: &PinId) -> String {
    format!("digital-read-{pin}")
}

pub fn analog_event(channel: u8) -> String {
    format!("analog-read-{channel}")
}

pub fn i2c_event(address: u8, register: Option<u8>) -> String {
    format!("I2C-reply{}-{}", address, register.unwrap_or(0))
}

pub fn stepper_event(index: u8) -> String {
    format!("stepper-done-{index}")
}

/// Identifies a subscription for `off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Handler = Box<dyn FnMut(&BoardEvent)>;

struct Listener {
    id: ListenerId,
    /// `None` matches every event.
    name: Option<String>,
    once: bool,
    handler: Handler,
}

/// Named subscriptions plus a FIFO of undelivered events.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Listener>,
    queue: VecDeque<BoardEvent>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `handler` for every event named `name`.
    pub fn on(
        &mut self,
        name: impl Into<String>,
        handler: impl FnMut(&BoardEvent) + 'static,
    ) -> ListenerId {
        self.add(Some(name.into()), false, Box::new(handler))
    }

    /// Call `handler` for the next event named `name` only.
    pub fn once(
        &mut self,
        name: impl Into<String>,
        handler: impl FnMut(&BoardEvent) + 'static,
    ) -> ListenerId {
        self.add(Some(name.into()), true, Box::new(handler))
    }

    /// Call `handler` for every event.
    pub fn on_any(&mut self, handler: impl FnMut(&BoardEvent) + 'static) -> ListenerId {
        self.add(None, false, Box::new(handler))
    }

    /// Remove a subscription.
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        self.listeners.len() != before
    }

    /// Queue an event for delivery.
    pub fn emit(&mut self, event: BoardEvent) {
        self.queue.push_back(event);
    }

    /// Events waiting for delivery.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Subscriptions matching `name` (including catch-all ones).
    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners
            .iter()
            .filter(|l| l.name.as_deref().is_none_or(|n| n == name))
            .count()
    }

    /// Deliver every queued event in order. Returns the number delivered.
    pub fn dispatch(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(event) = self.queue.pop_front() {
            let name = event.name();
            let mut fired_once = Vec::new();
            for listener in &mut self.listeners {
                if listener.name.as_deref().is_none_or(|n| n == name) {
                    (listener.handler)(&event);
                    if listener.once {
                        fired_once.push(listener.id);
                    }
                }
            }
            if !fired_once.is_empty() {
                self.listeners.retain(|l| !fired_once.contains(&l.id));
            }
            delivered += 1;
        }
        delivered
    }

    fn add(&mut self, name: Option<String>, once: bool, handler: Handler) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push(Listener {
            id,
            name,
            once,
            handler,
        });
        id
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .field("queued", &self.queue.len())
            .finish()
    }
}
