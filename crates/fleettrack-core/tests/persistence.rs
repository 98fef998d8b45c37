//! Tests for state surviving a restart through the file store

#[cfg(test)]
mod tests {
    use fleettrack_core::config::FleetConfig;
    use fleettrack_core::live::ChannelGeolocation;
    use fleettrack_core::profile::{Avatar, AvatarIcon, UserProfile};
    use fleettrack_core::roster::{EditorState, PaymentState};
    use fleettrack_core::runtime::FleetRuntime;
    use fleettrack_core::store::{keys, EntityStore, FileStore, KeyValueStore, StoreError};
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use std::sync::Arc;

    fn open(dir: &Path) -> FleetRuntime {
        let mut config = FleetConfig::default();
        config.storage.data_dir = Some(dir.to_path_buf());
        FleetRuntime::open(config, Arc::new(ChannelGeolocation::new())).unwrap()
    }

    #[test]
    fn test_first_open_seeds_sample_roster_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = open(dir.path());

        assert_eq!(runtime.store().vehicle_count(), 12);
        assert_eq!(runtime.roster_view().entries.len(), 7);
        assert_eq!(runtime.roster_view().editing, None);
        assert!(dir.path().join("roster.json").exists());
    }

    #[test]
    fn test_roster_edit_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut runtime = open(dir.path());
            let mut draft = runtime.begin_edit(5).unwrap();
            assert_eq!(runtime.roster_view().editing, Some(5));

            draft.payment_state = PaymentState::Paid;
            draft.vehicle_id = Some(30);
            runtime.save_roster_entry(5, &draft).unwrap();
            assert_eq!(runtime.editor_state(), EditorState::Viewing);

            runtime.delete_roster_entry(7, |_| true).unwrap();
        }

        let runtime = open(dir.path());
        let view = runtime.roster_view();
        assert_eq!(view.entries.len(), 6);
        let vikram = view.entries.iter().find(|e| e.id == 5).unwrap();
        assert_eq!(vikram.payment_state, PaymentState::Paid);
        assert_eq!(vikram.vehicle_id, 30);
        assert_eq!(runtime.search_roster("karthik").len(), 0);
    }

    #[test]
    fn test_unsaved_new_row_is_persisted_then_dropped_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let mut runtime = open(dir.path());

        let entry = runtime.add_roster_entry().unwrap();
        let stored = FileStore::open(dir.path()).unwrap();
        assert!(stored.get(keys::ROSTER).unwrap().unwrap().contains(&entry.identifier));

        runtime.cancel_edit().unwrap();
        assert!(!stored.get(keys::ROSTER).unwrap().unwrap().contains(&entry.identifier));
    }

    #[test]
    fn test_profile_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut runtime = open(dir.path());
            let mut profile = runtime.profile().unwrap();
            assert_eq!(profile, UserProfile::default());

            profile.rename("Dispatch Desk").unwrap();
            profile.set_avatar_image("image/jpeg", &[0xff, 0xd8, 0xff]).unwrap();
            runtime.save_profile(&profile).unwrap();
        }

        let runtime = open(dir.path());
        let profile = runtime.profile().unwrap();
        assert_eq!(profile.name(), "Dispatch Desk");
        assert!(matches!(profile.avatar(), Avatar::Image(url) if url.starts_with("data:image/jpeg;base64,")));
        assert_eq!(
            profile.image().unwrap(),
            Some(("image/jpeg".to_string(), vec![0xff, 0xd8, 0xff]))
        );
    }

    #[test]
    fn test_corrupt_profile_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut raw = FileStore::open(dir.path()).unwrap();
        raw.set(keys::USER_PROFILE, "not json".to_string()).unwrap();

        let runtime = open(dir.path());
        let profile = runtime.profile().unwrap();
        assert_eq!(profile.name(), "Operator");
        assert_eq!(profile.avatar(), &Avatar::Icon(AvatarIcon::Default));
    }

    #[test]
    fn test_corrupt_roster_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut raw = FileStore::open(dir.path()).unwrap();
        raw.set(keys::ROSTER, "[{\"id\":".to_string()).unwrap();

        let result = EntityStore::open(Box::new(raw));
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_session_marker_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let mut raw = FileStore::open(dir.path()).unwrap();
        raw.set(keys::LIVE_SESSION, "{\"busNumber\":3}".to_string()).unwrap();

        let mut runtime = open(dir.path());
        assert!(runtime.resume_tracking().unwrap().is_none());
        assert_eq!(raw.get(keys::LIVE_SESSION).unwrap(), None);
    }

    #[test]
    fn test_invalid_config_refused() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = FleetConfig::default();
        config.storage.data_dir = Some(dir.path().to_path_buf());
        config.simulation.speed_min = 80.0;

        assert!(FleetRuntime::open(config, Arc::new(ChannelGeolocation::new())).is_err());
    }
}
