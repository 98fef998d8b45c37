//! Tests for the simulation clock

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use fleettrack_core::broadcast::UpdateSource;
    use fleettrack_core::config::SimulationConfig;
    use fleettrack_core::geo::{LatLng, CAMPUS};
    use fleettrack_core::simulation::SimulationClock;
    use fleettrack_core::store::{EntityStore, MemoryStore};

    fn store() -> EntityStore {
        EntityStore::open(Box::new(MemoryStore::new())).unwrap()
    }

    #[test]
    fn test_vehicle_three_first_step() {
        let mut store = store();
        let mut clock = SimulationClock::with_seed(&SimulationConfig::default(), 42);

        let bus = store.vehicle(3).unwrap();
        assert_eq!(bus.position, LatLng::new(16.9891, 82.2711));
        assert_eq!(bus.destination(), CAMPUS);

        clock.tick(&mut store);
        let position = store.vehicle(3).unwrap().position;
        assert!((position.lat - 16.990040).abs() < 1e-6, "lat {}", position.lat);
        assert!((position.lng - 82.268934).abs() < 1e-6, "lng {}", position.lng);
    }

    #[test]
    fn test_distance_strictly_decreases_and_never_reaches_zero() {
        let mut store = store();
        let mut clock = SimulationClock::with_seed(&SimulationConfig::default(), 7);

        let mut last: Vec<f64> = store
            .vehicles()
            .map(|v| v.position.degrees_to(&v.destination()))
            .collect();

        for _ in 0..300 {
            clock.tick(&mut store);
            let now: Vec<f64> = store
                .vehicles()
                .map(|v| v.position.degrees_to(&v.destination()))
                .collect();
            for (before, after) in last.iter().zip(&now) {
                assert!(after < before);
                assert!(*after > 0.0);
            }
            last = now;
        }
    }

    #[test]
    fn test_live_vehicle_is_not_moved() {
        let mut store = store();
        let mut clock = SimulationClock::with_seed(&SimulationConfig::default(), 3);
        let live_at = LatLng::new(17.05, 82.1);
        store.apply_live_fix(8, live_at, Utc::now()).unwrap();
        let speed = store.vehicle(8).unwrap().speed;

        let updates = clock.tick(&mut store);

        assert!(updates.iter().all(|u| u.vehicle_id != 8));
        assert_eq!(updates.len(), store.vehicle_count() - 1);
        assert!(updates.iter().all(|u| u.source == UpdateSource::Simulation));
        assert_eq!(store.vehicle(8).unwrap().position, live_at);
        assert_eq!(store.vehicle(8).unwrap().speed, speed);

        assert!(clock.refresh_statuses(&mut store).iter().all(|u| u.vehicle_id != 8));
    }

    #[test]
    fn test_hidden_view_skips_without_catch_up() {
        let mut store = store();
        let mut clock = SimulationClock::with_seed(&SimulationConfig::default(), 11);

        clock.set_active(false);
        for _ in 0..5 {
            assert!(clock.tick(&mut store).is_empty());
        }
        assert_eq!(store.vehicle(3).unwrap().position, LatLng::new(16.9891, 82.2711));

        // One tick after reactivation moves exactly one step
        clock.set_active(true);
        clock.tick(&mut store);
        assert_eq!(clock.ticks(), 1);
        assert!((store.vehicle(3).unwrap().position.lat - 16.990040).abs() < 1e-6);
    }

    #[test]
    fn test_same_seed_same_speeds() {
        let run = |seed| {
            let mut store = store();
            let mut clock = SimulationClock::with_seed(&SimulationConfig::default(), seed);
            for _ in 0..20 {
                clock.tick(&mut store);
            }
            store.vehicles().map(|v| v.speed).collect::<Vec<_>>()
        };

        assert_eq!(run(1234), run(1234));
    }

    #[test]
    fn test_speed_delta_is_bounded() {
        let config = SimulationConfig::default();
        let mut store = store();
        let mut clock = SimulationClock::with_seed(&config, 8);

        for _ in 0..100 {
            let before: Vec<f64> = store.vehicles().map(|v| v.speed).collect();
            clock.tick(&mut store);
            for (old, vehicle) in before.iter().zip(store.vehicles()) {
                assert!((vehicle.speed - old).abs() <= config.speed_jitter / 2.0 + 1e-9);
                assert!((config.speed_min..=config.speed_max).contains(&vehicle.speed));
            }
        }
    }
}
