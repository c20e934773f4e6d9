// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::f64::consts::TAU;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::{SimClock, timeout_duration};
use crate::core::device::check_buffers;
use crate::core::{
    Result, RxErrorCode, RxMetadata, RxStreamer, SampleFormat, StreamCmd, StreamMode, TimeSpec,
};

const TONE_AMPLITUDE: f64 = 0.5;
const TONE_PERIOD: f64 = 64.0;

/// How often a multi-channel streamer rechecks its secondary channels while
/// blocked on the first one.
const SECONDARY_POLL: Duration = Duration::from_millis(2);

/// Issue order across every control in the process. Zero means "never".
static ISSUE_SEQ: AtomicU64 = AtomicU64::new(1);

#[derive(Default)]
struct PendingCmd {
    cmd: Option<StreamCmd>,
    late: bool,
    seq: u64,
}

/// Latest stream command for one receive DSP. Streamers on that channel
/// pick it up on their next `recv`.
#[derive(Default)]
pub(crate) struct StreamControl {
    pending: Mutex<PendingCmd>,
    changed: Condvar,
}

impl StreamControl {
    pub(crate) fn issue(&self, cmd: &StreamCmd, now: TimeSpec) {
        let mut pending = self.pending.lock();
        pending.late = !cmd.stream_now
            && cmd.mode != StreamMode::StopContinuous
            && cmd.time_spec < now;
        pending.cmd = Some(*cmd);
        pending.seq = ISSUE_SEQ.fetch_add(1, Ordering::Relaxed);
        self.changed.notify_all();
    }
}

enum RunMode {
    Idle,
    Continuous,
    Finite { remaining: usize, end_burst: bool },
}

struct RxRun {
    mode: RunMode,
    /// Last sequence number consumed from each control.
    seen: Vec<u64>,
    start_at: Option<TimeSpec>,
    stream_start: TimeSpec,
    produced: u64,
    first_packet: bool,
    late: bool,
}

/// Tone-generating receive streamer.
pub struct SimRxStreamer {
    controls: Vec<Arc<StreamControl>>,
    channels: Vec<usize>,
    clock: Arc<SimClock>,
    cpu_format: SampleFormat,
    rate: f64,
    frame_size: usize,
    run: Mutex<RxRun>,
}

impl SimRxStreamer {
    pub(crate) fn new(
        controls: Vec<Arc<StreamControl>>,
        channels: Vec<usize>,
        clock: Arc<SimClock>,
        cpu_format: SampleFormat,
        rate: f64,
        frame_size: usize,
    ) -> Self {
        // Only commands issued after construction apply to this streamer.
        let seen = controls.iter().map(|c| c.pending.lock().seq).collect();
        Self {
            controls,
            channels,
            clock,
            cpu_format,
            rate,
            frame_size,
            run: Mutex::new(RxRun {
                mode: RunMode::Idle,
                seen,
                start_at: None,
                stream_start: TimeSpec::default(),
                produced: 0,
                first_packet: true,
                late: false,
            }),
        }
    }

    pub fn channels(&self) -> &[usize] {
        &self.channels
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Consume whatever was issued on any channel since the last poll and
    /// return the most recent command with its lateness.
    fn take_command(&self, run: &mut RxRun) -> Option<(StreamCmd, bool)> {
        let mut newest: Option<(u64, StreamCmd, bool)> = None;
        for (control, seen) in self.controls.iter().zip(run.seen.iter_mut()) {
            let pending = control.pending.lock();
            if pending.seq == *seen {
                continue;
            }
            *seen = pending.seq;
            if let Some(cmd) = pending.cmd {
                if newest.is_none_or(|(seq, ..)| pending.seq > seq) {
                    newest = Some((pending.seq, cmd, pending.late));
                }
            }
        }
        newest.map(|(_, cmd, late)| (cmd, late))
    }

    fn has_new_command(&self, run: &RxRun) -> bool {
        self.controls
            .iter()
            .zip(&run.seen)
            .any(|(control, seen)| control.pending.lock().seq != *seen)
    }

    /// Apply a newly issued command, if any.
    fn poll_command(&self, run: &mut RxRun) {
        let Some((cmd, late)) = self.take_command(run) else {
            return;
        };
        if late {
            run.mode = RunMode::Idle;
            run.late = true;
            return;
        }
        run.mode = match cmd.mode {
            StreamMode::StartContinuous => RunMode::Continuous,
            StreamMode::StopContinuous => RunMode::Idle,
            StreamMode::NumSampsAndDone => RunMode::Finite {
                remaining: cmd.num_samps,
                end_burst: true,
            },
            StreamMode::NumSampsAndMore => RunMode::Finite {
                remaining: cmd.num_samps,
                end_burst: false,
            },
        };
        if cmd.mode == StreamMode::StopContinuous {
            return;
        }
        let start = if cmd.stream_now {
            self.clock.now()
        } else {
            cmd.time_spec
        };
        run.start_at = (!cmd.stream_now).then_some(cmd.time_spec);
        run.stream_start = start;
        run.produced = 0;
        run.first_packet = true;
    }

    /// Block until a new command arrives or `deadline` passes. Returns
    /// `false` on timeout.
    fn wait_for_command(&self, run: &RxRun, deadline: Instant) -> bool {
        let (Some(first), Some(&first_seen)) = (self.controls.first(), run.seen.first()) else {
            return false;
        };
        let multi = self.controls.len() > 1;
        loop {
            if multi && self.has_new_command(run) {
                return true;
            }
            let mut pending = first.pending.lock();
            if pending.seq != first_seen {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let mut wait = deadline - now;
            if multi {
                wait = wait.min(SECONDARY_POLL);
            }
            first.changed.wait_for(&mut pending, wait);
        }
    }

    fn fill(&self, buffs: &mut [&mut [u8]], start: u64, count: usize) {
        let item_size = self.cpu_format.item_size();
        for (idx, buff) in buffs.iter_mut().enumerate() {
            let tone = (idx + 1) as f64 / TONE_PERIOD;
            for n in 0..count {
                let phase = TAU * tone * (start + n as u64) as f64;
                let out = &mut buff[n * item_size..(n + 1) * item_size];
                write_sample(
                    out,
                    self.cpu_format,
                    TONE_AMPLITUDE * phase.cos(),
                    TONE_AMPLITUDE * phase.sin(),
                );
            }
        }
    }
}

impl RxStreamer for SimRxStreamer {
    fn num_channels(&self) -> usize {
        self.channels.len()
    }

    fn max_num_samps(&self) -> usize {
        self.frame_size
    }

    fn item_size(&self) -> usize {
        self.cpu_format.item_size()
    }

    fn recv(
        &self,
        buffs: &mut [&mut [u8]],
        nsamps_per_buff: usize,
        md: &mut RxMetadata,
        timeout: f64,
        one_packet: bool,
    ) -> Result<usize> {
        check_buffers(
            buffs.len(),
            self.channels.len(),
            buffs.iter().map(|b| b.len()),
            nsamps_per_buff,
            self.item_size(),
        )?;
        md.reset();
        let deadline = Instant::now() + timeout_duration(timeout);
        let mut run = self.run.lock();

        loop {
            self.poll_command(&mut run);

            if run.late {
                run.late = false;
                md.error_code = RxErrorCode::LateCommand;
                return Ok(0);
            }

            if matches!(run.mode, RunMode::Idle) {
                if !self.wait_for_command(&run, deadline) {
                    md.error_code = RxErrorCode::Timeout;
                    return Ok(0);
                }
                continue;
            }

            if let Some(start_at) = run.start_at {
                let wait = self.clock.now().secs_until(&start_at);
                if wait > 0.0 {
                    let until = Instant::now() + timeout_duration(wait);
                    if until > deadline {
                        self.wait_for_command(&run, deadline);
                        md.error_code = RxErrorCode::Timeout;
                        return Ok(0);
                    }
                    // A new command during the wait supersedes this one.
                    self.wait_for_command(&run, until);
                    continue;
                }
                run.start_at = None;
            }
            break;
        }

        let mut count = match run.mode {
            RunMode::Finite { remaining, .. } => nsamps_per_buff.min(remaining),
            _ => nsamps_per_buff,
        };
        if one_packet {
            count = count.min(self.frame_size);
        }

        self.fill(buffs, run.produced, count);
        md.has_time_spec = true;
        md.time_spec = run
            .stream_start
            .add_secs(run.produced as f64 / self.rate);
        md.start_of_burst = run.first_packet;
        run.first_packet = false;
        run.produced += count as u64;

        if let RunMode::Finite {
            remaining,
            end_burst,
        } = &mut run.mode
        {
            *remaining -= count;
            if *remaining == 0 {
                md.end_of_burst = *end_burst;
                run.mode = RunMode::Idle;
            }
        }
        Ok(count)
    }

    fn issue_stream_cmd(&self, cmd: &StreamCmd) -> Result<()> {
        let now = self.clock.now();
        for control in &self.controls {
            control.issue(cmd, now);
        }
        Ok(())
    }
}

/// Encode one complex sample in host byte order.
fn write_sample(out: &mut [u8], format: SampleFormat, re: f64, im: f64) {
    match format {
        SampleFormat::Fc64 => {
            out[..8].copy_from_slice(&re.to_ne_bytes());
            out[8..16].copy_from_slice(&im.to_ne_bytes());
        }
        SampleFormat::Fc32 => {
            out[..4].copy_from_slice(&(re as f32).to_ne_bytes());
            out[4..8].copy_from_slice(&(im as f32).to_ne_bytes());
        }
        SampleFormat::Sc16 => {
            out[..2].copy_from_slice(&((re * i16::MAX as f64) as i16).to_ne_bytes());
            out[2..4].copy_from_slice(&((im * i16::MAX as f64) as i16).to_ne_bytes());
        }
        SampleFormat::Sc8 => {
            out[0] = (re * i8::MAX as f64) as i8 as u8;
            out[1] = (im * i8::MAX as f64) as i8 as u8;
        }
    }
}
