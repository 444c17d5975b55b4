use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::decode::{DecodedIsotherm, IsothermDecoder};
use crate::data::filter::AdsorbateSlot;
use crate::data::model::{IsothermRef, PressureGrid};
use crate::data::select::CombinedStats;

/// Label of the synthesized curve.
pub const MEDIAN_LABEL: &str = "median";

/// Everything one loader task needs, detached from the owner's state.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveRequest {
    pub material: String,
    pub slot: AdsorbateSlot,
    /// `(pressure, median loading)` for every bucket that has data.
    pub median: Vec<(f64, f64)>,
    pub temperature: f64,
    pub isotherms: Vec<IsothermRef>,
}

impl CurveRequest {
    /// Request for one slot of `stats`.
    ///
    /// Buckets whose median is missing are left out of the median curve, so
    /// its points are not evenly spaced when the data has gaps.
    pub fn from_stats(
        stats: &CombinedStats,
        slot: AdsorbateSlot,
        grid: &PressureGrid,
        temperature: f64,
    ) -> Self {
        let slot_stats = stats.slot(slot);
        let median = slot_stats
            .loading
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.median.is_nan())
            .map(|(i, s)| (grid.pressure(i), s.median))
            .collect();
        Self {
            material: stats.material.clone(),
            slot,
            median,
            temperature,
            isotherms: slot_stats.isotherms.clone(),
        }
    }

    fn median_curve(&self) -> DecodedIsotherm {
        let (pressure, loading) = self.median.iter().copied().unzip();
        DecodedIsotherm {
            label: MEDIAN_LABEL.to_string(),
            pressure,
            loading,
            citation: String::new(),
            temperature: self.temperature,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveSource {
    /// Synthesized from per-bucket medians; drawn in a fixed colour.
    Median,
    /// Decoded from a stored isotherm; drawn from the palette.
    Measured,
}

/// One curve on its way to the owner thread.
#[derive(Debug, Clone)]
pub struct CurveDelivery {
    pub generation: u64,
    pub material: String,
    pub slot: AdsorbateSlot,
    pub source: CurveSource,
    pub curve: DecodedIsotherm,
}

/// Generation stored once the loader is gone; no task matches it.
const CLOSED: u64 = u64::MAX;

/// Decrements the in-flight counter when a task ends, even on an early return.
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Decodes the stored isotherms of one `(material, slot)` on its own thread.
struct DecodeTask {
    generation: u64,
    current: Arc<AtomicU64>,
    decoder: Arc<dyn IsothermDecoder>,
    tx: Sender<CurveDelivery>,
    material: String,
    slot: AdsorbateSlot,
    isotherms: Vec<IsothermRef>,
    _in_flight: InFlight,
}

impl DecodeTask {
    fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
    }

    fn run(self) {
        for reference in &self.isotherms {
            if !self.is_current() {
                log::trace!(
                    "isotherm task for {} superseded (generation {})",
                    self.material,
                    self.generation
                );
                return;
            }
            let Some(curve) = self.decoder.decode(reference) else {
                log::info!(
                    "isotherm '{reference}' for {} could not be decoded, skipped",
                    self.material
                );
                continue;
            };
            if !self.is_current() {
                return;
            }
            let delivery = CurveDelivery {
                generation: self.generation,
                material: self.material.clone(),
                slot: self.slot,
                source: CurveSource::Measured,
                curve,
            };
            if self.tx.send(delivery).is_err() {
                return;
            }
        }
    }
}

/// Produces curves for a single consumer.
///
/// Every dispatch decodes on a thread of its own, so a stalled decode only
/// delays its own curves. Tasks stop before their next decode once
/// [`IsothermLoader::supersede`] moves past their generation; dropping the
/// loader stops them all without waiting.
pub struct IsothermLoader {
    decoder: Arc<dyn IsothermDecoder>,
    tx: Sender<CurveDelivery>,
    rx: Receiver<CurveDelivery>,
    current: Arc<AtomicU64>,
    /// Running tasks of the current generation.
    in_flight: Arc<AtomicUsize>,
}

impl IsothermLoader {
    pub fn new(decoder: Arc<dyn IsothermDecoder>) -> Self {
        let (tx, rx) = unbounded();
        Self {
            decoder,
            tx,
            rx,
            current: Arc::new(AtomicU64::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make `generation` the only one whose tasks keep decoding.
    pub fn supersede(&mut self, generation: u64) {
        self.current.store(generation, Ordering::SeqCst);
        self.in_flight = Arc::new(AtomicUsize::new(0));
    }

    pub fn generation(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    /// Queue the median curve right away, then decode every stored isotherm
    /// in order on a new thread. Everything is tagged with `generation`.
    pub fn dispatch(&self, request: CurveRequest, generation: u64) {
        let median = CurveDelivery {
            generation,
            material: request.material.clone(),
            slot: request.slot,
            source: CurveSource::Median,
            curve: request.median_curve(),
        };
        // The receiver lives in `self`, so this cannot fail.
        let _ = self.tx.send(median);
        if request.isotherms.is_empty() {
            return;
        }

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let task = DecodeTask {
            generation,
            current: Arc::clone(&self.current),
            decoder: Arc::clone(&self.decoder),
            tx: self.tx.clone(),
            material: request.material,
            slot: request.slot,
            isotherms: request.isotherms,
            _in_flight: InFlight(Arc::clone(&self.in_flight)),
        };
        let name = format!("isotherm-{}-{}", task.material, task.slot.index() + 1);
        // On failure the task is dropped here, which releases its in-flight slot.
        if let Err(e) = thread::Builder::new().name(name).spawn(move || task.run()) {
            log::warn!("could not start isotherm task: {e}");
        }
    }

    pub fn deliveries(&self) -> &Receiver<CurveDelivery> {
        &self.rx
    }

    /// Tasks of the current generation that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

impl Drop for IsothermLoader {
    fn drop(&mut self) {
        self.current.store(CLOSED, Ordering::SeqCst);
    }
}
