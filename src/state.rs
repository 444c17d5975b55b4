use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;

use crate::color::{CyclicPalette, Rgb};
use crate::config::SessionConfig;
use crate::data::filter::{AdsorbateSlot, FilterCriteria};
use crate::data::model::{DatasetProvider, IsothermType};
use crate::error::{Result, ScreenError};
use crate::isotherm::decode::IsothermDecoder;
use crate::isotherm::loader::{CurveDelivery, CurveRequest, CurveSource, IsothermLoader};
use crate::isotherm::{CurvePanel, IsothermCurve};
use crate::kpi::{KpiStore, QueryParameters, UptakePatch, WorkingCapacityPatch};
use crate::overlay::SelectionOverlay;

/// Longest single wait inside [`Session::wait_for_curves`].
const POLL_INTERVAL: Duration = Duration::from_millis(10);

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Every change the surrounding application can report.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Filter(FilterCriteria),
    DataType(Option<IsothermType>),
    Temperature { target: f64, tolerance: f64 },
    Adsorbates { first: String, second: String },
    /// All query parameters at once; recomputes like a filter change.
    Query(QueryParameters),
    UptakePressure(f64),
    WorkingCapacity { low: f64, high: f64 },
    Selection(Vec<usize>),
}

/// What changed in response to a [`SessionEvent`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    Recomputed { materials: usize },
    Uptake(UptakePatch),
    WorkingCapacity(WorkingCapacityPatch),
    Selection(SelectionUpdate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionUpdate {
    /// Generation every curve for this selection is tagged with.
    pub generation: u64,
    pub selected: usize,
    /// Whether curve loading was dispatched (single material only).
    pub loading_curves: bool,
}

type CurveObserver = Box<dyn FnMut(&str, AdsorbateSlot, &IsothermCurve, u64)>;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The single owner of all mutable screening state.
///
/// Loader tasks never touch this struct; their curves are applied by
/// [`Session::pump`] on the thread that owns the session.
pub struct Session {
    store: KpiStore,
    overlay: SelectionOverlay,
    selection: Vec<usize>,
    panels: [CurvePanel; 2],
    palette: CyclicPalette,
    generation: u64,
    loader: IsothermLoader,
    observer: Option<CurveObserver>,
}

impl Session {
    /// Build a session and run the initial recompute with `config.filter`.
    pub fn new(
        provider: Arc<dyn DatasetProvider>,
        decoder: Arc<dyn IsothermDecoder>,
        config: &SessionConfig,
    ) -> Result<Self> {
        let mut session = Self {
            store: KpiStore::new(provider, config.query)?,
            overlay: SelectionOverlay::default(),
            selection: Vec::new(),
            panels: Default::default(),
            palette: CyclicPalette::new(config.palette_size),
            generation: 0,
            loader: IsothermLoader::new(decoder),
            observer: None,
        };
        session.full_recompute(config.filter.clone())?;
        Ok(session)
    }

    /// Route one event to the matching operation.
    pub fn dispatch(&mut self, event: SessionEvent) -> Result<SessionUpdate> {
        let mut criteria = self.store.criteria().clone();
        match event {
            SessionEvent::Filter(new) => criteria = new,
            SessionEvent::DataType(kind) => criteria.kind = kind,
            SessionEvent::Temperature { target, tolerance } => {
                criteria.temperature_target = target;
                criteria.temperature_tolerance = tolerance;
            }
            SessionEvent::Adsorbates { first, second } => {
                criteria.adsorbate_1 = first;
                criteria.adsorbate_2 = second;
            }
            SessionEvent::Query(params) => {
                let materials = self.set_query(params)?;
                return Ok(SessionUpdate::Recomputed { materials });
            }
            SessionEvent::UptakePressure(p) => {
                return self.set_uptake_pressure(p).map(SessionUpdate::Uptake);
            }
            SessionEvent::WorkingCapacity { low, high } => {
                return self
                    .set_working_capacity(low, high)
                    .map(SessionUpdate::WorkingCapacity);
            }
            SessionEvent::Selection(indices) => {
                return self.set_selection(&indices).map(SessionUpdate::Selection);
            }
        }
        let materials = self.full_recompute(criteria)?;
        Ok(SessionUpdate::Recomputed { materials })
    }

    /// Recompute from the dataset. Selection, overlay and curves are cleared
    /// and any pending curve is invalidated.
    pub fn full_recompute(&mut self, criteria: FilterCriteria) -> Result<usize> {
        let materials = self.store.full_recompute(criteria)?.len();
        self.clear_selection();
        Ok(materials)
    }

    /// Replace every query parameter and recompute. Clears the selection
    /// exactly like [`Self::full_recompute`].
    pub fn set_query(&mut self, params: QueryParameters) -> Result<usize> {
        let materials = self.store.set_query(params)?.len();
        self.clear_selection();
        Ok(materials)
    }

    pub fn set_uptake_pressure(&mut self, pressure: f64) -> Result<UptakePatch> {
        let patch = self.store.patch_uptake(pressure)?;
        if !self.selection.is_empty() {
            self.overlay.uptake_overlay(&self.selection, &self.store)?;
        }
        Ok(patch)
    }

    pub fn set_working_capacity(&mut self, low: f64, high: f64) -> Result<WorkingCapacityPatch> {
        let patch = self.store.patch_working_capacity(low, high)?;
        if !self.selection.is_empty() {
            self.overlay
                .working_capacity_overlay(&self.selection, &self.store)?;
        }
        Ok(patch)
    }

    /// Replace the selection. Duplicate indices keep their first position.
    pub fn set_selection(&mut self, indices: &[usize]) -> Result<SelectionUpdate> {
        let mut selection: Vec<usize> = Vec::with_capacity(indices.len());
        for &index in indices {
            if index >= self.store.len() {
                return Err(ScreenError::RowOutOfRange {
                    index,
                    len: self.store.len(),
                });
            }
            if !selection.contains(&index) {
                selection.push(index);
            }
        }

        if selection.is_empty() {
            self.overlay.clear();
        } else {
            self.overlay.full_overlay(&selection, &self.store)?;
        }
        self.selection = selection;

        let single = match self.selection.as_slice() {
            [index] => Some(*index),
            _ => None,
        };
        let generation = match single {
            Some(index) => self.load_curves(index),
            None => self.reset_curves(None),
        };
        Ok(SelectionUpdate {
            generation,
            selected: self.selection.len(),
            loading_curves: single.is_some(),
        })
    }

    /// Register the callback run for every curve applied by [`Self::pump`].
    pub fn on_curve_ready<F>(&mut self, observer: F)
    where
        F: FnMut(&str, AdsorbateSlot, &IsothermCurve, u64) + 'static,
    {
        self.observer = Some(Box::new(observer));
    }

    /// Apply every queued curve without blocking. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(delivery) = self.loader.deliveries().try_recv() {
            applied += usize::from(self.apply(delivery));
        }
        applied
    }

    /// Wait up to `timeout` for a curve, then drain the queue.
    pub fn pump_timeout(&mut self, timeout: Duration) -> usize {
        match self.loader.deliveries().recv_timeout(timeout) {
            Ok(delivery) => usize::from(self.apply(delivery)) + self.pump(),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }

    /// Pump until no loader task is running. Returns `false` on timeout.
    pub fn wait_for_curves(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            if self.loader.in_flight() == 0 {
                self.pump();
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.pump_timeout(POLL_INTERVAL.min(deadline - now));
        }
    }

    pub fn store(&self) -> &KpiStore {
        &self.store
    }

    pub fn overlay(&self) -> &SelectionOverlay {
        &self.overlay
    }

    pub fn selection(&self) -> &[usize] {
        &self.selection
    }

    pub fn curves(&self, slot: AdsorbateSlot) -> &CurvePanel {
        &self.panels[slot.index()]
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn clear_selection(&mut self) {
        self.selection.clear();
        self.overlay.clear();
        self.reset_curves(None);
    }

    /// Clear both panels and invalidate every pending curve.
    fn reset_curves(&mut self, material: Option<&str>) -> u64 {
        self.generation += 1;
        self.loader.supersede(self.generation);
        for panel in &mut self.panels {
            panel.reset(material.map(str::to_string));
        }
        self.generation
    }

    fn load_curves(&mut self, index: usize) -> u64 {
        let Some(stats) = self.store.stats(index) else {
            return self.reset_curves(None);
        };
        let material = stats.material.clone();
        let generation = self.reset_curves(Some(&material));
        let temperature = self.store.criteria().temperature_target;
        for slot in AdsorbateSlot::BOTH {
            let Some(stats) = self.store.stats(index) else {
                continue;
            };
            let request = CurveRequest::from_stats(stats, slot, self.store.grid(), temperature);
            self.loader.dispatch(request, generation);
        }
        log::debug!("loading curves for {material} (generation {generation})");
        generation
    }

    /// Apply a delivery if it belongs to the current generation.
    fn apply(&mut self, delivery: CurveDelivery) -> bool {
        if delivery.generation != self.generation {
            log::trace!(
                "dropping stale curve '{}' for {} (generation {} != {})",
                delivery.curve.label,
                delivery.material,
                delivery.generation,
                self.generation
            );
            return false;
        }
        let color = match delivery.source {
            CurveSource::Median => Rgb::MEDIAN,
            CurveSource::Measured => self.palette.next_color(),
        };
        let decoded = delivery.curve;
        let curve = IsothermCurve {
            label: decoded.label,
            pressure: decoded.pressure,
            loading: decoded.loading,
            citation: decoded.citation,
            temperature: decoded.temperature,
            color,
        };
        if let Some(observer) = self.observer.as_mut() {
            observer(&delivery.material, delivery.slot, &curve, delivery.generation);
        }
        self.panels[delivery.slot.index()].push(curve);
        true
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crossbeam_channel::{bounded, Receiver};

    use super::*;
    use crate::color::{generate_palette, ISOTHERM_PALETTE_SIZE};
    use crate::data::model::{IsothermRef, PressureGrid, RawDataset, RawMeasurement};
    use crate::isotherm::decode::DecodedIsotherm;
    use crate::isotherm::loader::MEDIAN_LABEL;
    use crate::overlay::MetricFamily;

    const WAIT: Duration = Duration::from_secs(5);

    fn measurement(material: &str, adsorbate: &str, henry: f64, scale: f64) -> RawMeasurement {
        let grid = PressureGrid::default();
        RawMeasurement {
            material: material.into(),
            adsorbate: adsorbate.into(),
            temperature: 303.0,
            kind: IsothermType::Experimental,
            henry,
            loading: (0..grid.len()).map(|i| scale * i as f64).collect(),
            isotherm: IsothermRef(format!("{material}/{adsorbate}")),
        }
    }

    fn provider() -> Arc<dyn DatasetProvider> {
        let rows = vec![
            measurement("A", "propane", 1.0, 1.0),
            measurement("A", "propene", 3.0, 2.0),
            measurement("B", "propane", 2.0, 0.5),
            measurement("B", "propene", 2.0, 1.5),
        ];
        Arc::new(RawDataset::from_measurements(rows, PressureGrid::default()))
    }

    /// Decodes every reference; references of material A wait for the gate
    /// to open (a send or the sender being dropped).
    struct Gated {
        gate: Receiver<()>,
    }

    impl IsothermDecoder for Gated {
        fn decode(&self, reference: &IsothermRef) -> Option<DecodedIsotherm> {
            if reference.0.starts_with("A/") {
                let _ = self.gate.recv_timeout(WAIT);
            }
            Some(DecodedIsotherm {
                label: reference.0.clone(),
                pressure: vec![0.0, 2.0],
                loading: vec![0.0, 3.0],
                citation: format!("doi:{reference}"),
                temperature: 303.0,
            })
        }
    }

    fn open_session() -> Session {
        let (release, gate) = bounded(0);
        drop(release);
        session_with(Gated { gate })
    }

    fn session_with(decoder: Gated) -> Session {
        Session::new(provider(), Arc::new(decoder), &SessionConfig::default()).unwrap()
    }

    fn index(session: &Session, material: &str) -> usize {
        session.store().material_index(material).unwrap()
    }

    #[test]
    fn new_session_runs_the_initial_recompute() {
        let session = open_session();
        assert_eq!(session.store().len(), 2);
        assert!(session.selection().is_empty());
        assert!(session.overlay().is_empty());
        assert_eq!(session.curves(AdsorbateSlot::First).material, None);
    }

    #[test]
    fn single_selection_loads_median_then_stored_curves() {
        let mut session = open_session();
        let a = index(&session, "A");
        let update = session.set_selection(&[a]).unwrap();
        assert!(update.loading_curves);
        assert_eq!(update.generation, session.generation());
        assert!(session.wait_for_curves(WAIT));

        for (slot, adsorbate) in [
            (AdsorbateSlot::First, "propane"),
            (AdsorbateSlot::Second, "propene"),
        ] {
            let panel = session.curves(slot);
            assert_eq!(panel.material.as_deref(), Some("A"));
            let labels: Vec<&str> = panel.curves.iter().map(|c| c.label.as_str()).collect();
            assert_eq!(labels, [MEDIAN_LABEL, format!("A/{adsorbate}").as_str()]);
            assert_eq!(panel.curves[0].color, Rgb::MEDIAN);
            assert_ne!(panel.curves[1].color, Rgb::MEDIAN);
            assert_eq!(panel.x_end, 20.0);
        }
        // Medians end at bucket 40: 1.0 * 40 for propane, 2.0 * 40 for propene.
        assert_eq!(session.curves(AdsorbateSlot::First).y_end, 40.0);
        assert_eq!(session.curves(AdsorbateSlot::Second).y_end, 80.0);
    }

    #[test]
    fn superseded_selection_never_receives_stale_curves() {
        let (release, gate) = bounded(0);
        let mut session = session_with(Gated { gate });
        let applied = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&applied);
        session.on_curve_ready(move |material, slot, curve, generation| {
            sink.borrow_mut()
                .push((material.to_string(), slot, curve.label.clone(), generation));
        });
        let (a, b) = (index(&session, "A"), index(&session, "B"));

        let first = session.set_selection(&[a]).unwrap();
        let second = session.set_selection(&[b]).unwrap();
        assert!(second.generation > first.generation);

        // B completes while both A tasks are still blocked in the decoder.
        let deadline = Instant::now() + WAIT;
        while AdsorbateSlot::BOTH
            .iter()
            .any(|&slot| session.curves(slot).curves.len() < 2)
        {
            assert!(Instant::now() < deadline, "curves for B never arrived");
            session.pump_timeout(Duration::from_millis(10));
        }
        drop(release);
        assert!(session.wait_for_curves(WAIT));

        for slot in AdsorbateSlot::BOTH {
            let panel = session.curves(slot);
            assert_eq!(panel.material.as_deref(), Some("B"));
            assert_eq!(panel.curves.len(), 2);
            assert!(panel.curves.iter().all(|c| !c.label.starts_with("A/")));
        }
        let applied = applied.borrow();
        assert_eq!(applied.len(), 4);
        assert!(applied
            .iter()
            .all(|(material, _, _, generation)| material == "B" && *generation == second.generation));
    }

    #[test]
    fn dropped_curves_do_not_consume_palette_colours() {
        let (release, gate) = bounded(0);
        let mut session = session_with(Gated { gate });
        let palette = generate_palette(ISOTHERM_PALETTE_SIZE);
        let (a, b) = (index(&session, "A"), index(&session, "B"));

        session.set_selection(&[a]).unwrap();
        session.set_selection(&[b]).unwrap();
        let deadline = Instant::now() + WAIT;
        while AdsorbateSlot::BOTH
            .iter()
            .any(|&slot| session.curves(slot).curves.len() < 2)
        {
            assert!(Instant::now() < deadline, "curves for B never arrived");
            session.pump_timeout(Duration::from_millis(10));
        }
        drop(release);
        assert!(session.wait_for_curves(WAIT));

        let mut used: Vec<Rgb> = AdsorbateSlot::BOTH
            .iter()
            .map(|&slot| session.curves(slot).curves[1].color)
            .collect();
        session.set_selection(&[a]).unwrap();
        assert!(session.wait_for_curves(WAIT));
        used.extend(
            AdsorbateSlot::BOTH
                .iter()
                .map(|&slot| session.curves(slot).curves[1].color),
        );

        // Two colours for B, then the next two for A; A's dropped curves took none.
        for (n, color) in used.iter().enumerate() {
            let expected = if n < 2 { &palette[..2] } else { &palette[2..4] };
            assert!(expected.contains(color), "colour {n} is {color}");
        }
        assert_ne!(used[0], used[1]);
        assert_ne!(used[2], used[3]);
    }

    #[test]
    fn filter_change_clears_selection_overlay_and_curves() {
        let mut session = open_session();
        let a = index(&session, "A");
        session.set_selection(&[a]).unwrap();
        let before = session.generation();

        let update = session
            .dispatch(SessionEvent::Temperature {
                target: 303.0,
                tolerance: 5.0,
            })
            .unwrap();
        assert_eq!(update, SessionUpdate::Recomputed { materials: 2 });
        assert!(session.generation() > before);
        assert!(session.selection().is_empty());
        assert!(session.overlay().is_empty());

        // Anything still in flight for A is stale now.
        assert!(session.wait_for_curves(WAIT));
        for slot in AdsorbateSlot::BOTH {
            assert_eq!(session.curves(slot), &CurvePanel::default());
        }
    }

    #[test]
    fn adsorbate_change_without_common_material_empties_the_snapshot() {
        let mut session = open_session();
        let update = session
            .dispatch(SessionEvent::Adsorbates {
                first: "propane".into(),
                second: "ethane".into(),
            })
            .unwrap();
        assert_eq!(update, SessionUpdate::Recomputed { materials: 0 });
        assert!(session.store().is_empty());
        assert!(matches!(
            session.set_selection(&[0]),
            Err(ScreenError::RowOutOfRange { index: 0, len: 0 })
        ));
    }

    #[test]
    fn uptake_change_refreshes_only_the_uptake_overlay() {
        let mut session = open_session();
        let (a, b) = (index(&session, "A"), index(&session, "B"));
        let update = session.set_selection(&[a, b]).unwrap();
        assert!(!update.loading_curves);
        assert_eq!(update.selected, 2);
        let generation = session.generation();
        let henry = session.overlay().family(MetricFamily::Henry).to_vec();
        let capacity = session
            .overlay()
            .family(MetricFamily::WorkingCapacity)
            .to_vec();

        let patch = match session.dispatch(SessionEvent::UptakePressure(2.0)).unwrap() {
            SessionUpdate::Uptake(patch) => patch,
            other => panic!("expected an uptake patch, got {other:?}"),
        };
        assert_eq!(patch.pressure, 2.0);

        let uptake = session.overlay().family(MetricFamily::Uptake);
        // 2.0 bar is bucket 4; A/propane loads 1.0 per bucket.
        assert_eq!(uptake[0].label, "A");
        assert_eq!((uptake[0].x, uptake[0].y), (4.0, 8.0));
        assert_eq!((uptake[1].x, uptake[1].y), (2.0, 6.0));
        assert_eq!(session.overlay().family(MetricFamily::Henry), henry);
        assert_eq!(
            session.overlay().family(MetricFamily::WorkingCapacity),
            capacity
        );
        assert_eq!(session.generation(), generation);
        assert_eq!(session.selection(), &[a, b]);
    }

    #[test]
    fn working_capacity_change_refreshes_its_overlay() {
        let mut session = open_session();
        let b = index(&session, "B");
        session.set_selection(&[b, b]).unwrap();
        assert_eq!(session.selection(), &[b]);
        let uptake = session.overlay().family(MetricFamily::Uptake).to_vec();

        session
            .dispatch(SessionEvent::WorkingCapacity { low: 1.0, high: 3.0 })
            .unwrap();
        let capacity = session.overlay().family(MetricFamily::WorkingCapacity);
        // Buckets 2..6 for B: 0.5 * 4 and 1.5 * 4.
        assert_eq!((capacity[0].x, capacity[0].y), (2.0, 6.0));
        assert_eq!(session.overlay().family(MetricFamily::Uptake), uptake);
    }

    #[test]
    fn off_grid_pressure_is_rejected() {
        let mut session = open_session();
        assert!(matches!(
            session.dispatch(SessionEvent::UptakePressure(0.3)),
            Err(ScreenError::PressureOffGrid { .. })
        ));
        assert_eq!(session.store().params().uptake_pressure, 0.5);
    }

    #[test]
    fn empty_selection_clears_overlay_and_curves() {
        let mut session = open_session();
        let a = index(&session, "A");
        session.set_selection(&[a]).unwrap();
        assert!(session.wait_for_curves(WAIT));
        assert!(!session.overlay().is_empty());

        let update = session.dispatch(SessionEvent::Selection(Vec::new())).unwrap();
        assert_eq!(
            update,
            SessionUpdate::Selection(SelectionUpdate {
                generation: session.generation(),
                selected: 0,
                loading_curves: false,
            })
        );
        assert!(session.overlay().is_empty());
        assert!(session.curves(AdsorbateSlot::Second).curves.is_empty());
    }

    #[test]
    fn out_of_range_selection_keeps_the_previous_one() {
        let mut session = open_session();
        let a = index(&session, "A");
        session.set_selection(&[a]).unwrap();
        let generation = session.generation();
        assert!(matches!(
            session.set_selection(&[a, 9]),
            Err(ScreenError::RowOutOfRange { index: 9, len: 2 })
        ));
        assert_eq!(session.selection(), &[a]);
        assert_eq!(session.generation(), generation);
    }

    #[test]
    fn stalled_decodes_of_old_selections_do_not_delay_the_current_one() {
        let (release, gate) = bounded(0);
        let mut session = session_with(Gated { gate });
        let (a, b) = (index(&session, "A"), index(&session, "B"));

        // Two selections of A leave four decodes stuck behind the gate.
        session.set_selection(&[a]).unwrap();
        session.set_selection(&[]).unwrap();
        session.set_selection(&[a]).unwrap();
        let current = session.set_selection(&[b]).unwrap();

        let started = Instant::now();
        assert!(session.wait_for_curves(Duration::from_secs(2)));
        assert!(started.elapsed() < Duration::from_secs(2));
        for slot in AdsorbateSlot::BOTH {
            let panel = session.curves(slot);
            assert_eq!(panel.material.as_deref(), Some("B"));
            assert_eq!(panel.curves.len(), 2);
        }
        assert_eq!(session.generation(), current.generation);

        // Dropping the session does not wait for the stuck decodes either.
        let started = Instant::now();
        drop(session);
        assert!(started.elapsed() < Duration::from_secs(1));
        drop(release);
    }

    #[test]
    fn query_change_recomputes_and_clears_the_selection() {
        let mut session = open_session();
        let a = index(&session, "A");
        let before = session.set_selection(&[a]).unwrap().generation;

        let params = QueryParameters {
            uptake_pressure: 2.0,
            working_capacity_low: 1.0,
            working_capacity_high: 3.0,
        };
        let update = session.dispatch(SessionEvent::Query(params)).unwrap();
        assert_eq!(update, SessionUpdate::Recomputed { materials: 2 });
        assert_eq!(session.store().params(), &params);
        assert!(session.generation() > before);
        assert!(session.selection().is_empty());
        assert!(session.overlay().is_empty());

        let row = session.store().row(a).unwrap();
        assert_eq!((row.uptake.x, row.uptake.y), (4.0, 8.0));
        assert_eq!((row.working_capacity.x, row.working_capacity.y), (4.0, 8.0));

        assert!(session.wait_for_curves(WAIT));
        assert_eq!(session.curves(AdsorbateSlot::First), &CurvePanel::default());
    }

    #[test]
    fn off_grid_query_keeps_the_selection() {
        let mut session = open_session();
        let a = index(&session, "A");
        session.set_selection(&[a]).unwrap();
        let params = QueryParameters {
            uptake_pressure: 0.7,
            ..QueryParameters::default()
        };
        assert!(matches!(
            session.set_query(params),
            Err(ScreenError::PressureOffGrid { .. })
        ));
        assert_eq!(session.selection(), &[a]);
        assert_eq!(session.store().params(), &QueryParameters::default());
    }
}
