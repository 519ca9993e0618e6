use delegate::delegate;

use crate::{
    Event, EventKind, EventQueue, IntervalSource, Metrics, QueueState, Report, Result,
    SimulationParameters,
};

/// Rates of the three event chains, derived from the parameters once per run.
#[derive(Debug, Clone, Copy)]
struct Rates {
    arrival: f64,
    service: f64,
    observation: f64,
}

/// Discrete-event simulation of a single-server queue.
///
/// Both the unbounded (M/M/1) and the bounded (M/M/1/K) variants are handled by the same engine;
/// they differ only in the buffer [`Capacity`](crate::Capacity), which decides whether an
/// arriving packet is admitted or dropped.
///
/// A run starts by scheduling the first arrival and the first observer event. Each dispatched
/// event schedules its own successor, and an arrival finding the server idle also starts the
/// departure chain, which continues for as long as there are packets in the system.
/// Observer events occur at a rate much higher than arrivals and departures, and sample the
/// queue at instants independent of it; the time averages are computed from these samples.
pub struct Simulation<S> {
    params: SimulationParameters,
    rates: Rates,
    source: S,
    events: EventQueue,
    state: QueueState,
    metrics: Metrics,
    time: f64,
}

impl<S: IntervalSource> Simulation<S> {
    /// Constructs a simulation drawing time intervals from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`](crate::Error::InvalidParameter) if any parameter is
    /// out of range.
    pub fn new(params: SimulationParameters, source: S) -> Result<Self> {
        params.validate()?;
        let state = QueueState::new(params.buffer_capacity()?);
        Ok(Self {
            params,
            rates: Rates {
                arrival: params.arrival_rate(),
                service: params.service_rate(),
                observation: params.observation_rate(),
            },
            source,
            events: EventQueue::default(),
            state,
            metrics: Metrics::default(),
            time: 0.0,
        })
    }

    /// Runs the simulation until the horizon, and returns the final metrics.
    ///
    /// Any previous run is discarded, but the interval source continues its stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DegenerateRun`](crate::Error::DegenerateRun) if no observer event occurred
    /// before the horizon. The counters are still available through the accessors.
    pub fn execute(&mut self) -> Result<Report> {
        self.start()?;
        log::debug!(
            "Starting run: rho={} T={} K={} lambda={} mu={} gamma={}",
            self.params.traffic_intensity,
            self.params.horizon,
            self.state.capacity(),
            self.rates.arrival,
            self.rates.service,
            self.rates.observation,
        );
        while self.step()?.is_some() {}
        log::debug!(
            "Run finished: arrivals={} departures={} losses={} observations={} occupancy={}",
            self.metrics.arrivals(),
            self.metrics.departures(),
            self.metrics.losses(),
            self.metrics.observations(),
            self.state.occupancy(),
        );
        Report::new(&self.metrics, &self.state)
    }

    /// Resets the state, and schedules the first arrival and the first observer event.
    ///
    /// # Errors
    ///
    /// Propagates errors of the interval source.
    pub fn start(&mut self) -> Result<()> {
        self.events.clear();
        self.state = QueueState::new(self.state.capacity());
        self.metrics = Metrics::default();
        self.time = 0.0;
        self.schedule(EventKind::Arrival, self.rates.arrival)?;
        self.schedule(EventKind::Observer, self.rates.observation)?;
        Ok(())
    }

    /// Extracts and dispatches the earliest pending event.
    ///
    /// Returns the dispatched event, or `None` if the extracted event lies past the horizon,
    /// in which case it is discarded and the run is over.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyQueue`](crate::Error::EmptyQueue) if called before [`start`] or after
    /// the event chains were otherwise broken.
    ///
    /// [`start`]: Self::start
    pub fn step(&mut self) -> Result<Option<Event>> {
        let event = self.events.extract_min()?;
        if event.time > self.params.horizon {
            return Ok(None);
        }
        self.time = event.time;
        log::trace!(
            "[{:.6}] {} (occupancy={})",
            event.time,
            event.kind,
            self.state.occupancy()
        );
        match event.kind {
            EventKind::Arrival => self.arrive()?,
            EventKind::Departure => self.depart()?,
            EventKind::Observer => self.observe()?,
        }
        Ok(Some(event))
    }

    fn schedule(&mut self, kind: EventKind, rate: f64) -> Result<()> {
        let interval = self.source.next_interval(rate)?;
        self.events.insert(Event::new(kind, self.time + interval));
        Ok(())
    }

    fn arrive(&mut self) -> Result<()> {
        self.metrics.record_arrival();
        self.schedule(EventKind::Arrival, self.rates.arrival)?;
        match self.state.admit() {
            None => {
                log::trace!("[{:.6}] Packet dropped", self.time);
                self.metrics.record_loss();
            }
            Some(true) => self.schedule(EventKind::Departure, self.rates.service)?,
            Some(false) => {}
        }
        Ok(())
    }

    fn depart(&mut self) -> Result<()> {
        self.metrics.record_departure();
        if self.state.complete() {
            self.schedule(EventKind::Departure, self.rates.service)?;
        }
        Ok(())
    }

    fn observe(&mut self) -> Result<()> {
        self.metrics
            .record_observation(self.state.occupancy(), self.state.is_idle());
        self.schedule(EventKind::Observer, self.rates.observation)
    }

    /// Parameters of this simulation.
    pub fn params(&self) -> &SimulationParameters {
        &self.params
    }

    /// Counters collected so far.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Current state of the queue.
    pub fn state(&self) -> &QueueState {
        &self.state
    }

    /// Time of the most recently dispatched event.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Pending events.
    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    delegate! {
        to self.metrics {
            /// Number of packets that arrived, including the dropped ones.
            pub fn arrivals(&self) -> u64;
            /// Number of packets that finished transmission.
            pub fn departures(&self) -> u64;
            /// Number of packets dropped at arrival.
            pub fn losses(&self) -> u64;
            /// Number of observer events.
            pub fn observations(&self) -> u64;
            /// Number of observer events that found the server idle.
            pub fn idle_observations(&self) -> u64;
        }
    }

    delegate! {
        to self.state {
            /// Number of packets currently in the system.
            pub fn occupancy(&self) -> usize;
        }
    }
}
