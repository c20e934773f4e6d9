// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::Arc;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;

use super::{SimClock, timeout_duration};
use crate::core::device::check_buffers;
use crate::core::{
    AsyncEventCode, AsyncMetadata, Result, SampleFormat, TimeSpec, TxMetadata, TxStreamer,
};

/// Async events buffered before new ones are dropped.
const ASYNC_QUEUE_DEPTH: usize = 256;

#[derive(Default)]
struct Burst {
    in_burst: bool,
    start: TimeSpec,
    sent: u64,
}

/// Transmit streamer that consumes samples and reports burst status.
pub struct SimTxStreamer {
    channels: Vec<usize>,
    clock: Arc<SimClock>,
    cpu_format: SampleFormat,
    rate: f64,
    frame_size: usize,
    burst: Mutex<Burst>,
    events_tx: Sender<AsyncMetadata>,
    events_rx: Receiver<AsyncMetadata>,
}

impl SimTxStreamer {
    pub(crate) fn new(
        channels: Vec<usize>,
        clock: Arc<SimClock>,
        cpu_format: SampleFormat,
        rate: f64,
        frame_size: usize,
    ) -> Self {
        let (events_tx, events_rx) = crossbeam_channel::bounded(ASYNC_QUEUE_DEPTH);
        Self {
            channels,
            clock,
            cpu_format,
            rate,
            frame_size,
            burst: Mutex::new(Burst::default()),
            events_tx,
            events_rx,
        }
    }

    pub fn channels(&self) -> &[usize] {
        &self.channels
    }

    fn post(&self, event_code: AsyncEventCode, time_spec: TimeSpec) {
        for channel in 0..self.channels.len() {
            let event = AsyncMetadata {
                channel,
                has_time_spec: true,
                time_spec,
                event_code,
            };
            if let Err(TrySendError::Full(_)) = self.events_tx.try_send(event) {
                tracing::debug!("tx async queue full, dropping {:?}", event_code);
            }
        }
    }
}

impl TxStreamer for SimTxStreamer {
    fn num_channels(&self) -> usize {
        self.channels.len()
    }

    fn max_num_samps(&self) -> usize {
        self.frame_size
    }

    fn item_size(&self) -> usize {
        self.cpu_format.item_size()
    }

    fn send(
        &self,
        buffs: &[&[u8]],
        nsamps_per_buff: usize,
        md: &TxMetadata,
        _timeout: f64,
    ) -> Result<usize> {
        check_buffers(
            buffs.len(),
            self.channels.len(),
            buffs.iter().map(|b| b.len()),
            nsamps_per_buff,
            self.item_size(),
        )?;

        let now = self.clock.now();
        let mut burst = self.burst.lock();

        if md.has_time_spec && md.time_spec < now {
            // Late packets are dropped and the rest of the burst with them.
            self.post(AsyncEventCode::TimeError, md.time_spec);
            *burst = Burst::default();
            return Ok(0);
        }

        if md.start_of_burst || !burst.in_burst {
            burst.in_burst = true;
            burst.start = if md.has_time_spec { md.time_spec } else { now };
            burst.sent = 0;
        }
        burst.sent += nsamps_per_buff as u64;

        if md.end_of_burst {
            let end = burst.start.add_secs(burst.sent as f64 / self.rate);
            self.post(AsyncEventCode::BurstAck, end);
            *burst = Burst::default();
        }
        Ok(nsamps_per_buff)
    }

    fn recv_async_msg(&self, md: &mut AsyncMetadata, timeout: f64) -> Result<bool> {
        match self.events_rx.recv_timeout(timeout_duration(timeout)) {
            Ok(event) => {
                *md = event;
                Ok(true)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => Ok(false),
        }
    }
}
