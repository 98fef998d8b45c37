//! Simulation Clock
//!
//! Moves every non-live bus a fixed fraction of the way to its destination per
//! tick and nudges its speed. Buses approach the campus asymptotically and
//! never arrive.
//!
//! Ticks only run while the route view is the active display. A tick that
//! lands while it is hidden is dropped, not queued.

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use crate::broadcast::{UpdateSource, VehicleUpdate};
use crate::config::SimulationConfig;
use crate::fleet::VehicleStatus;
use crate::store::EntityStore;

/// Seeded driver for simulated movement and status changes
pub struct SimulationClock {
    config: SimulationConfig,
    rng: StdRng,
    active: bool,
    ticks: u64,
}

impl SimulationClock {
    /// Create a clock, seeded from `config.seed` when set
    pub fn new(config: &SimulationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config: config.clone(),
            rng,
            active: true,
            ticks: 0,
        }
    }

    /// Create a clock with an explicit seed
    pub fn with_seed(config: &SimulationConfig, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ..Self::new(config)
        }
    }

    /// Whether the route view is active
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Mark the route view shown or hidden
    pub fn set_active(&mut self, active: bool) {
        if self.active != active {
            tracing::debug!(active, "route view visibility changed");
        }
        self.active = active;
    }

    /// Ticks applied so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Advance every non-live vehicle one step.
    ///
    /// Returns one update per moved vehicle, or nothing while inactive.
    pub fn tick(&mut self, store: &mut EntityStore) -> Vec<VehicleUpdate> {
        if !self.active {
            tracing::trace!("route view hidden, tick skipped");
            return Vec::new();
        }

        let fraction = self.config.step_fraction;
        let jitter = self.config.speed_jitter;
        let (min, max) = (self.config.speed_min, self.config.speed_max);

        let mut updates = Vec::new();
        for vehicle in store.vehicles_mut().filter(|v| !v.is_live) {
            vehicle.position = vehicle.position.step_toward(vehicle.destination(), fraction);

            let delta = (self.rng.gen::<f64>() - 0.5) * jitter;
            vehicle.speed = (vehicle.speed + delta).clamp(min, max);

            updates.push(vehicle.snapshot(UpdateSource::Simulation));
        }

        self.ticks += 1;
        tracing::trace!(tick = self.ticks, moved = updates.len(), "simulation tick");
        updates
    }

    /// Give each non-live vehicle a chance to take a random status.
    ///
    /// Returns updates for the vehicles whose status actually changed.
    pub fn refresh_statuses(&mut self, store: &mut EntityStore) -> Vec<VehicleUpdate> {
        let probability = self.config.status_change_probability;

        let mut updates = Vec::new();
        for vehicle in store.vehicles_mut().filter(|v| !v.is_live) {
            if self.rng.gen::<f64>() >= probability {
                continue;
            }
            let status = VehicleStatus::ALL[self.rng.gen_range(0..VehicleStatus::ALL.len())];
            if status != vehicle.status {
                vehicle.status = status;
                updates.push(vehicle.snapshot(UpdateSource::StatusRefresh));
            }
        }

        if !updates.is_empty() {
            tracing::debug!(changed = updates.len(), "bus statuses refreshed");
        }
        updates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn store() -> EntityStore {
        EntityStore::open(Box::new(MemoryStore::new())).unwrap()
    }

    #[test]
    fn test_tick_moves_one_percent() {
        let mut store = store();
        let mut clock = SimulationClock::with_seed(&SimulationConfig::default(), 1);

        let before = store.vehicle(3).unwrap().position;
        let updates = clock.tick(&mut store);
        let after = store.vehicle(3).unwrap().position;

        assert_eq!(updates.len(), store.vehicle_count());
        assert!((after.lat - 16.990040).abs() < 1e-6);
        assert!((after.lng - 82.268934).abs() < 1e-6);
        assert_ne!(before, after);
    }

    #[test]
    fn test_inactive_tick_is_dropped() {
        let mut store = store();
        let mut clock = SimulationClock::with_seed(&SimulationConfig::default(), 1);
        clock.set_active(false);

        let before: Vec<_> = store.vehicles().map(|v| v.position).collect();
        assert!(clock.tick(&mut store).is_empty());
        let after: Vec<_> = store.vehicles().map(|v| v.position).collect();

        assert_eq!(before, after);
        assert_eq!(clock.ticks(), 0);
    }

    #[test]
    fn test_speed_stays_in_bounds() {
        let mut store = store();
        let mut clock = SimulationClock::with_seed(&SimulationConfig::default(), 99);
        for _ in 0..500 {
            clock.tick(&mut store);
        }
        assert!(store.vehicles().all(|v| (20.0..=60.0).contains(&v.speed)));
    }

    #[test]
    fn test_status_refresh_certain_change() {
        let config = SimulationConfig {
            status_change_probability: 1.0,
            ..SimulationConfig::default()
        };
        let mut store = store();
        let mut clock = SimulationClock::with_seed(&config, 5);

        let updates = clock.refresh_statuses(&mut store);
        for update in &updates {
            assert_eq!(update.source, UpdateSource::StatusRefresh);
            assert_eq!(store.vehicle(update.vehicle_id).unwrap().status, update.status);
        }

        let never = SimulationConfig {
            status_change_probability: 0.0,
            ..SimulationConfig::default()
        };
        let mut clock = SimulationClock::with_seed(&never, 5);
        assert!(clock.refresh_statuses(&mut store).is_empty());
    }
}
