// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Signals and the per-instance signal worker.
//!
//! Emitting never calls into the engine on the emitting thread. Every
//! instance with at least one signal owns a worker thread draining a bounded
//! queue; the worker forwards each payload through `Object.emit_signal`.
//! A full queue applies backpressure: `emit` waits for the worker rather than
//! dropping the payload.
//! The queue is closed when the instance is freed, which ends the worker once
//! the remaining payloads are drained.

use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};

use crate::engine;
use crate::method::Arg;
use crate::types::{InstanceId, ObjectPtr, StringName, ToVariant, Variant, VariantType};

/// Argument tuple of a signal.
pub trait SignalArgs: Send + 'static {
    fn types() -> Vec<VariantType>;
    fn into_variants(self) -> Vec<Variant>;
}

macro_rules! signal_args {
    ($($name:ident: $idx:tt),*) => {
        impl<$($name: Arg + ToVariant + Send),*> SignalArgs for ($($name,)*) {
            fn types() -> Vec<VariantType> {
                vec![$(<$name as Arg>::variant_type()),*]
            }

            fn into_variants(self) -> Vec<Variant> {
                vec![$(self.$idx.to_variant()),*]
            }
        }
    };
}

signal_args!();
signal_args!(A: 0);
signal_args!(A: 0, B: 1);
signal_args!(A: 0, B: 1, C: 2);
signal_args!(A: 0, B: 1, C: 2, D: 3);
signal_args!(A: 0, B: 1, C: 2, D: 3, E: 4);
signal_args!(A: 0, B: 1, C: 2, D: 3, E: 4, G: 5);

/// One queued emission.
struct Emission {
    signal: Arc<str>,
    args: Vec<Variant>,
}

/// Queue endpoint bound to one signal name.
#[derive(Clone)]
pub(crate) struct SignalSender {
    signal: Arc<str>,
    tx: Sender<Emission>,
}

/// Type-erased view of a [`Signal`] field, used to connect it to the
/// instance's worker.
pub(crate) trait SignalSlot: Send {
    fn connect(&mut self, sender: SignalSender);
    fn disconnect(&mut self);
}

/// A signal field. Unconnected until its instance is created.
pub struct Signal<A> {
    sender: Option<SignalSender>,
    _args: PhantomData<fn(A)>,
}

impl<A> Default for Signal<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Signal<A> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sender: None,
            _args: PhantomData,
        }
    }

    /// Bound to a live instance's worker.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.sender.is_some()
    }
}

impl<A: SignalArgs> Signal<A> {
    /// Queue an emission, waiting for room when the queue is full. Returns
    /// `false` only when the signal is not connected or its worker has stopped.
    pub fn emit(&self, args: A) -> bool {
        let Some(sender) = &self.sender else {
            log::debug!("[signal] emit on unconnected signal dropped");
            return false;
        };
        let emission = Emission {
            signal: Arc::clone(&sender.signal),
            args: args.into_variants(),
        };
        if sender.tx.send(emission).is_err() {
            log::debug!("[signal] worker gone, dropping `{}`", sender.signal);
            return false;
        }
        true
    }
}

impl<A: SignalArgs> SignalSlot for Signal<A> {
    fn connect(&mut self, sender: SignalSender) {
        self.sender = Some(sender);
    }

    fn disconnect(&mut self) {
        self.sender = None;
    }
}

impl<A> std::fmt::Debug for Signal<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.sender {
            Some(sender) => write!(f, "Signal({})", sender.signal),
            None => f.write_str("Signal(unconnected)"),
        }
    }
}

/// Background thread forwarding one instance's emissions to the engine.
pub(crate) struct SignalWorker {
    tx: Sender<Emission>,
    thread: JoinHandle<()>,
}

impl SignalWorker {
    /// Start the worker for the object `object_id`.
    pub(crate) fn spawn(object_id: InstanceId, capacity: usize) -> std::io::Result<Self> {
        let (tx, rx) = channel::bounded(capacity.max(1));
        let thread = thread::Builder::new()
            .name(format!("gdbridge-signals-{}", object_id.0))
            .spawn(move || Self::run(object_id, &rx))?;
        log::debug!("[signal] worker started for {object_id:?}");
        Ok(Self { tx, thread })
    }

    fn run(object_id: InstanceId, rx: &Receiver<Emission>) {
        for emission in rx {
            // The object may be gone while payloads are still queued.
            let Some(object) = ObjectPtr::from_instance_id(object_id) else {
                log::debug!("[signal] {object_id:?} freed, dropping `{}`", emission.signal);
                continue;
            };
            let name = StringName::new(&emission.signal);
            engine::emit_signal(object, &name, &emission.args);
        }
        log::debug!("[signal] worker for {object_id:?} stopped");
    }

    pub(crate) fn sender(&self, signal: &str) -> SignalSender {
        SignalSender {
            signal: Arc::from(signal),
            tx: self.tx.clone(),
        }
    }

    /// Close the worker's own queue endpoint. The thread exits once every
    /// connected signal has been disconnected and the queue is drained.
    pub(crate) fn close(self) -> JoinHandle<()> {
        drop(self.tx);
        self.thread
    }
}
