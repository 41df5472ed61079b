//! Processing chain
//!
//! Sidechain filter -> compressor -> heat sink, driven by a shared
//! parameter store. Parameters are read once at the top of each block.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use log::info;

use super::compressor::CompressorCore;
use super::effect::Effect;
use super::heat_sink::HeatSink;
use super::sidechain_filter::SidechainFilter;
use crate::engine::AudioBuffer;
use crate::params::{
    response_density_attack_ms, response_density_release_ms, AtomicParam, GainReductionMeter,
    SharedParams, ATTACK, RELEASE,
};

/// Values the chain publishes for display
#[derive(Debug)]
pub struct ChainStatus {
    /// Attack in ms after Response Density, before the character scale
    pub effective_attack_ms: AtomicParam,
    /// Release in ms after Response Density, before the character scale
    pub effective_release_ms: AtomicParam,
}

impl Default for ChainStatus {
    fn default() -> Self {
        Self {
            effective_attack_ms: AtomicParam::new(ATTACK.default),
            effective_release_ms: AtomicParam::new(RELEASE.default),
        }
    }
}

/// Full Reactor signal path for one stream
pub struct ReactorChain {
    params: Arc<SharedParams>,
    status: Arc<ChainStatus>,
    sidechain_filter: SidechainFilter,
    compressor: CompressorCore,
    heat_sink: HeatSink,
    /// Filtered detection copy, sized at `prepare()`
    scratch: AudioBuffer,
    sample_rate: f64,
    max_block_size: usize,
}

impl ReactorChain {
    pub fn new(params: Arc<SharedParams>) -> Self {
        Self {
            params,
            status: Arc::new(ChainStatus::default()),
            sidechain_filter: SidechainFilter::new(),
            compressor: CompressorCore::new(),
            heat_sink: HeatSink::new(),
            scratch: AudioBuffer::default(),
            sample_rate: 44100.0,
            max_block_size: 512,
        }
    }

    /// Prepare every stage and preallocate the sidechain scratch buffer
    pub fn prepare(&mut self, sample_rate: f64, max_block_size: usize, num_channels: usize) {
        self.sample_rate = sample_rate;
        self.max_block_size = max_block_size;
        self.scratch = AudioBuffer::new(num_channels.max(1), max_block_size, sample_rate as u32);

        self.sidechain_filter.set_num_channels(num_channels);
        self.heat_sink.set_num_channels(num_channels);
        self.sidechain_filter.prepare(sample_rate, max_block_size);
        self.compressor.prepare(sample_rate, max_block_size);
        self.heat_sink.prepare(sample_rate, max_block_size);
        self.apply_params();

        info!(
            "Chain prepared: {} Hz, {} channels, block {}",
            sample_rate, num_channels, max_block_size
        );
    }

    /// Clear envelopes, smoothing and filter memory
    pub fn reset(&mut self) {
        self.sidechain_filter.reset();
        self.compressor.reset();
        self.heat_sink.reset();
    }

    /// Process one block in place
    ///
    /// `external_sidechain` replaces the main signal as the detection source.
    /// Blocks longer than the prepared size grow the scratch buffer once.
    pub fn process(&mut self, buffer: &mut AudioBuffer, external_sidechain: Option<&AudioBuffer>) {
        self.apply_params();

        if self.sidechain_filter.is_enabled() {
            let source = external_sidechain.unwrap_or(&*buffer);
            self.sidechain_filter.process_into(source, &mut self.scratch);
            self.compressor.process(buffer, Some(&self.scratch));
        } else {
            self.compressor.process(buffer, external_sidechain);
        }

        self.heat_sink.process(buffer);
    }

    /// Push the current shared values into every stage
    fn apply_params(&mut self) {
        let p = &*self.params;

        let character = p.character();
        if character != self.compressor.character() {
            self.compressor.set_character(character);
        }
        self.compressor.set_threshold(p.threshold_db.load());
        self.compressor.set_ratio(p.ratio.load());
        self.compressor.set_knee(p.knee_db.load());

        let (attack, release) = if p.response_density_enabled.load(Ordering::Relaxed) {
            let density = p.response_density.load();
            (
                response_density_attack_ms(density),
                response_density_release_ms(density),
            )
        } else {
            (p.attack_ms.load(), p.release_ms.load())
        };
        if attack != self.compressor.attack() {
            self.compressor.set_attack(attack);
        }
        if release != self.compressor.release() {
            self.compressor.set_release(release);
        }
        self.status.effective_attack_ms.store(attack);
        self.status.effective_release_ms.store(release);

        self.compressor.set_enabled(!p.bypass.load(Ordering::Relaxed));

        self.sidechain_filter
            .set_enabled(p.sidechain_enabled.load(Ordering::Relaxed));
        self.sidechain_filter.set_frequency(p.sidechain_frequency_hz.load());

        self.heat_sink
            .set_enabled(p.heat_sink_enabled.load(Ordering::Relaxed));
        self.heat_sink.set_amount(p.heat_sink_amount.load());
    }

    pub fn params(&self) -> Arc<SharedParams> {
        Arc::clone(&self.params)
    }

    pub fn status(&self) -> Arc<ChainStatus> {
        Arc::clone(&self.status)
    }

    /// Gain-reduction meter handle
    pub fn meter(&self) -> Arc<GainReductionMeter> {
        self.compressor.meter()
    }

    pub fn gain_reduction_db(&self) -> f32 {
        self.compressor.gain_reduction_db()
    }

    pub fn compressor(&self) -> &CompressorCore {
        &self.compressor
    }

    pub fn sidechain_filter(&self) -> &SidechainFilter {
        &self.sidechain_filter
    }

    pub fn heat_sink(&self) -> &HeatSink {
        &self.heat_sink
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }
}
