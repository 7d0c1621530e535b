//! Behavioral tests for the playback state machine.
//!
//! These drive the controller against a recording backend and a manual
//! clock, covering transitions, atomicity on failure, track completion and
//! the seek/pause timing scenarios.

#[cfg(test)]
mod tests {
    use crate::{
        error::domain::PlaybackError,
        library::{models::Track, source::PlaylistSource},
        playback::{
            events::PlaybackEvent,
            session::PlaybackState::{Paused, Playing, Stopped},
            test_support::{BackendCall, Fixture, PLAYLIST, fixture, fixture_with},
            timeline::TimelineReporter,
        },
    };

    const TOLERANCE: f64 = 1e-9;

    fn elapsed(f: &Fixture) -> f64 {
        TimelineReporter::new(f.controller.session(), f.controller.clock())
            .timeline()
            .elapsed_seconds
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < TOLERANCE,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_play_valid_index() {
        let f = fixture(3);
        f.clock.advance(12.5);

        for index in 0..3 {
            f.controller.play(index).unwrap();
            let session = f.controller.session_snapshot();
            assert_eq!(session.state, Playing);
            assert_eq!(session.track_index, index);
            assert_eq!(session.duration_seconds, 180.0);
            assert_eq!(session.current_track.unwrap().name, format!("Track {index}"));
            assert_close(elapsed(&f), 0.0);
        }

        assert_eq!(
            &f.backend.calls()[..2],
            &[
                BackendCall::Load("/music/track_0.mp3".into()),
                BackendCall::Play
            ]
        );
    }

    #[test]
    fn test_play_uses_backend_duration() {
        let f = fixture(2);
        f.backend.set_duration("/music/track_1.mp3", 42.0);

        f.controller.play(1).unwrap();
        assert_eq!(f.controller.session_snapshot().duration_seconds, 42.0);
    }

    #[test]
    fn test_play_invalid_index_changes_nothing() {
        let f = fixture(2);
        f.controller.play(1).unwrap();
        f.backend.clear_calls();
        let before = f.controller.session_snapshot();

        let result = f.controller.play(2);
        assert!(matches!(
            result,
            Err(PlaybackError::InvalidTrackIndex { index: 2, len: 2 })
        ));
        assert_eq!(f.controller.session_snapshot(), before);
        assert!(f.backend.calls().is_empty());
    }

    #[test]
    fn test_play_on_empty_playlist() {
        let f = fixture(0);
        assert!(matches!(
            f.controller.play(0),
            Err(PlaybackError::InvalidTrackIndex { index: 0, len: 0 })
        ));
        assert_eq!(f.controller.session_snapshot().state, Stopped);
    }

    #[test]
    fn test_toggle_twice_excludes_paused_time() {
        let f = fixture(1);
        f.controller.play(0).unwrap();

        f.clock.advance(10.0);
        f.controller.toggle_play_pause().unwrap();
        assert_eq!(f.controller.session_snapshot().state, Paused);
        assert_close(elapsed(&f), 10.0);

        f.clock.advance(30.0);
        assert_close(elapsed(&f), 10.0);

        f.controller.toggle_play_pause().unwrap();
        assert_eq!(f.controller.session_snapshot().state, Playing);
        assert_close(elapsed(&f), 10.0);

        f.clock.advance(5.0);
        assert_close(elapsed(&f), 15.0);

        let calls = f.backend.calls();
        assert_eq!(&calls[2..], &[BackendCall::Pause, BackendCall::Resume]);
    }

    #[test]
    fn test_toggle_while_stopped_is_noop() {
        let f = fixture(1);
        let before = f.controller.session_snapshot();

        f.controller.toggle_play_pause().unwrap();
        assert_eq!(f.controller.session_snapshot(), before);
        assert!(f.backend.calls().is_empty());
    }

    #[test]
    fn test_seek_reports_position_regardless_of_play_time() {
        let f = fixture(1);
        f.controller.play(0).unwrap();
        f.clock.advance(150.0);

        f.controller.seek(30.0).unwrap();
        assert_close(elapsed(&f), 30.0);
        assert_eq!(f.backend.calls().last(), Some(&BackendCall::PlayFrom(30.0)));

        f.controller.seek(180.0).unwrap();
        assert_close(elapsed(&f), 180.0);
        f.controller.seek(0.0).unwrap();
        assert_close(elapsed(&f), 0.0);
    }

    #[test]
    fn test_seek_out_of_range_changes_nothing() {
        let f = fixture(1);
        f.controller.play(0).unwrap();
        f.clock.advance(20.0);
        f.backend.clear_calls();
        let before = f.controller.session_snapshot();

        for position in [-1.0, 180.5, f64::NAN, f64::INFINITY] {
            let result = f.controller.seek(position);
            assert!(matches!(
                result,
                Err(PlaybackError::SeekOutOfRange { duration, .. }) if duration == 180.0
            ));
            assert_eq!(f.controller.session_snapshot(), before);
        }
        assert!(f.backend.calls().is_empty());
    }

    #[test]
    fn test_seek_without_track() {
        let f = fixture(1);
        assert!(matches!(
            f.controller.seek(0.0),
            Err(PlaybackError::NoTrackLoaded)
        ));
    }

    #[test]
    fn test_seek_while_paused_resumes() {
        let f = fixture(1);
        f.controller.play(0).unwrap();
        f.controller.toggle_play_pause().unwrap();

        f.controller.seek(60.0).unwrap();
        assert_eq!(f.controller.session_snapshot().state, Playing);
        assert_close(elapsed(&f), 60.0);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let f = fixture(1);
        let mut events = f.controller.subscribe();
        let initial = f.controller.session_snapshot();

        f.controller.stop().unwrap();
        f.controller.stop().unwrap();
        assert_eq!(f.controller.session_snapshot(), initial);
        assert!(f.backend.calls().is_empty());
        assert!(events.try_recv().is_err());

        f.controller.begin_play_all().unwrap();
        f.controller.stop().unwrap();
        let stopped = f.controller.session_snapshot();
        assert_eq!(stopped.state, Stopped);
        assert!(!stopped.continuous_play);

        f.backend.clear_calls();
        f.controller.stop().unwrap();
        assert_eq!(f.controller.session_snapshot(), stopped);
        assert!(f.backend.calls().is_empty());
    }

    #[test]
    fn test_stop_from_paused() {
        let f = fixture(1);
        f.controller.play(0).unwrap();
        f.controller.toggle_play_pause().unwrap();

        f.controller.stop().unwrap();
        assert_eq!(f.controller.session_snapshot().state, Stopped);
        assert_close(elapsed(&f), 0.0);
        assert_eq!(f.backend.calls().last(), Some(&BackendCall::Stop));
    }

    #[test]
    fn test_prev_at_first_track_is_noop() {
        let f = fixture(3);
        f.controller.play(0).unwrap();
        f.backend.clear_calls();
        let before = f.controller.session_snapshot();

        f.controller.prev().unwrap();
        assert_eq!(f.controller.session_snapshot(), before);
        assert!(f.backend.calls().is_empty());
    }

    #[test]
    fn test_next_and_prev_navigate() {
        let f = fixture(3);
        f.controller.play(0).unwrap();

        f.controller.next().unwrap();
        assert_eq!(f.controller.session_snapshot().track_index, 1);
        f.controller.next().unwrap();
        assert_eq!(f.controller.session_snapshot().track_index, 2);
        f.controller.prev().unwrap();
        assert_eq!(f.controller.session_snapshot().track_index, 1);
        assert_eq!(f.controller.session_snapshot().state, Playing);
    }

    #[test]
    fn test_next_past_last_track_stops() {
        let f = fixture(2);
        f.controller.play(1).unwrap();

        f.controller.next().unwrap();
        let session = f.controller.session_snapshot();
        assert_eq!(session.state, Stopped);
        assert_eq!(session.track_index, 1);
        assert_eq!(f.backend.calls().last(), Some(&BackendCall::Stop));
    }

    #[test]
    fn test_next_from_stopped_plays_following_track() {
        let f = fixture(3);
        f.controller.play(0).unwrap();
        f.controller.stop().unwrap();

        f.controller.next().unwrap();
        let session = f.controller.session_snapshot();
        assert_eq!(session.state, Playing);
        assert_eq!(session.track_index, 1);
    }

    #[test]
    fn test_next_observes_external_removal() {
        let f = fixture(3);
        f.controller.play(1).unwrap();

        f.source.remove_track(PLAYLIST, 2).unwrap();
        f.controller.next().unwrap();
        assert_eq!(f.controller.session_snapshot().state, Stopped);
    }

    #[test]
    fn test_set_volume_clamps() {
        let f = fixture(1);

        f.controller.set_volume(0.25).unwrap();
        assert_eq!(f.controller.session_snapshot().volume, 0.25);

        f.controller.set_volume(4.0).unwrap();
        assert_eq!(f.controller.session_snapshot().volume, 1.0);

        f.controller.set_volume(-2.0).unwrap();
        assert_eq!(f.controller.session_snapshot().volume, 0.0);

        assert_eq!(
            f.backend.calls(),
            vec![
                BackendCall::SetVolume(0.25),
                BackendCall::SetVolume(1.0),
                BackendCall::SetVolume(0.0)
            ]
        );
    }

    #[test]
    fn test_set_volume_ignores_nan() {
        let f = fixture(1);
        f.controller.set_volume(f32::NAN).unwrap();
        assert_eq!(f.controller.session_snapshot().volume, 0.7);
        assert!(f.backend.calls().is_empty());
    }

    #[test]
    fn test_volume_survives_track_change() {
        let f = fixture(2);
        f.controller.set_volume(0.3).unwrap();
        f.controller.play(0).unwrap();
        f.controller.next().unwrap();

        assert_eq!(f.controller.session_snapshot().volume, 0.3);
        let volume_calls = f
            .backend
            .calls()
            .into_iter()
            .filter(|call| matches!(call, BackendCall::SetVolume(_)))
            .count();
        assert_eq!(volume_calls, 1);
    }

    #[test]
    fn test_begin_play_all() {
        let f = fixture(2);
        f.controller.begin_play_all().unwrap();

        let session = f.controller.session_snapshot();
        assert!(session.continuous_play);
        assert_eq!(session.track_index, 0);
        assert_eq!(session.state, Playing);
    }

    #[test]
    fn test_begin_play_all_rolls_back_on_failure() {
        let f = fixture(0);
        assert!(f.controller.begin_play_all().is_err());
        assert!(!f.controller.session_snapshot().continuous_play);
    }

    #[test]
    fn test_backend_failure_leaves_session_untouched() {
        let f = fixture(2);
        f.controller.play(0).unwrap();
        f.clock.advance(7.0);
        let before = f.controller.session_snapshot();
        f.backend.set_failing(true);

        assert!(matches!(
            f.controller.toggle_play_pause(),
            Err(PlaybackError::BackendUnavailable(_))
        ));
        assert!(f.controller.play(1).is_err());
        assert!(f.controller.seek(10.0).is_err());
        assert!(f.controller.stop().is_err());
        assert!(f.controller.set_volume(0.1).is_err());
        assert_eq!(f.controller.session_snapshot(), before);
        assert_close(elapsed(&f), 7.0);
    }

    #[test]
    fn test_track_end_advances_in_continuous_play() {
        let f = fixture(3);
        f.backend.set_duration("/music/track_1.mp3", 95.0);
        f.controller.begin_play_all().unwrap();
        f.clock.advance(180.0);
        f.backend.finish_track();

        assert!(f.controller.check_track_end().unwrap());
        let session = f.controller.session_snapshot();
        assert_eq!(session.state, Playing);
        assert_eq!(session.track_index, 1);
        assert_eq!(session.duration_seconds, 95.0);
        assert_close(elapsed(&f), 0.0);
    }

    #[test]
    fn test_track_end_stops_without_continuous_play() {
        let f = fixture(3);
        f.controller.play(1).unwrap();
        f.backend.finish_track();

        assert!(f.controller.check_track_end().unwrap());
        let session = f.controller.session_snapshot();
        assert_eq!(session.state, Stopped);
        assert_eq!(session.track_index, 1);
    }

    #[test]
    fn test_track_end_fires_once() {
        let f = fixture(3);
        f.controller.play(0).unwrap();
        f.backend.finish_track();

        assert!(f.controller.check_track_end().unwrap());
        f.backend.clear_calls();
        assert!(!f.controller.check_track_end().unwrap());
        assert!(f.backend.calls().is_empty());
    }

    #[test]
    fn test_track_end_ignored_while_paused_or_busy() {
        let f = fixture(2);
        f.controller.begin_play_all().unwrap();

        assert!(!f.controller.check_track_end().unwrap());

        f.controller.toggle_play_pause().unwrap();
        assert!(!f.controller.check_track_end().unwrap());
        assert_eq!(f.controller.session_snapshot().state, Paused);
        assert_eq!(f.controller.session_snapshot().track_index, 0);
    }

    #[test]
    fn test_track_end_ignored_while_stopped() {
        let f = fixture(2);
        assert!(!f.controller.check_track_end().unwrap());
        assert!(f.backend.calls().is_empty());
    }

    #[test]
    fn test_track_end_busy_query_failure_is_retryable() {
        let f = fixture(2);
        f.controller.begin_play_all().unwrap();
        f.backend.finish_track();
        f.backend.set_busy_query_fails(true);
        let before = f.controller.session_snapshot();

        assert!(f.controller.check_track_end().is_err());
        assert_eq!(f.controller.session_snapshot(), before);

        f.backend.set_busy_query_fails(false);
        assert!(f.controller.check_track_end().unwrap());
        assert_eq!(f.controller.session_snapshot().track_index, 1);
    }

    #[test]
    fn test_track_end_at_playlist_end_stops() {
        let f = fixture(2);
        f.controller.begin_play_all().unwrap();
        f.backend.finish_track();
        f.controller.check_track_end().unwrap();
        f.backend.finish_track();

        assert!(f.controller.check_track_end().unwrap());
        let session = f.controller.session_snapshot();
        assert_eq!(session.state, Stopped);
        assert_eq!(session.track_index, 1);
        assert!(!session.continuous_play);
    }

    #[test]
    fn test_failed_start_after_load_stops_session() {
        let f = fixture(3);
        f.controller.play(0).unwrap();
        f.clock.advance(30.0);
        f.backend.clear_calls();
        f.backend.set_start_fails(true);

        assert!(matches!(
            f.controller.play(2),
            Err(PlaybackError::BackendUnavailable(_))
        ));
        assert_eq!(
            f.backend.calls(),
            vec![
                BackendCall::Load("/music/track_2.mp3".into()),
                BackendCall::Stop
            ]
        );

        let session = f.controller.session_snapshot();
        assert_eq!(session.state, Stopped);
        assert_eq!(session.track_index, 0);
        assert!(!session.has_track());
        assert!(!f.controller.check_track_end().unwrap());
        assert!(matches!(
            f.controller.seek(10.0),
            Err(PlaybackError::NoTrackLoaded)
        ));
    }

    #[test]
    fn test_failed_start_leaves_continuous_play() {
        let f = fixture(3);
        f.controller.begin_play_all().unwrap();
        f.backend.set_start_fails(true);

        assert!(f.controller.next().is_err());
        let session = f.controller.session_snapshot();
        assert_eq!(session.state, Stopped);
        assert!(!session.continuous_play);

        f.backend.set_start_fails(false);
        f.backend.finish_track();
        assert!(!f.controller.check_track_end().unwrap());
    }

    #[test]
    fn test_failed_auto_advance_stops() {
        let f = fixture(3);
        f.backend.break_path("/music/track_1.mp3");
        f.controller.begin_play_all().unwrap();
        f.backend.finish_track();

        assert!(f.controller.check_track_end().unwrap());
        let session = f.controller.session_snapshot();
        assert_eq!(session.state, Stopped);
        assert_eq!(session.track_index, 0);
    }

    #[test]
    fn test_scenario_auto_advance_after_first_track() {
        let f = fixture_with(vec![
            Track::new("A", "A.mp3"),
            Track::new("B", "B.mp3"),
        ]);
        f.backend.set_duration("A.mp3", 180.0);
        f.backend.set_duration("B.mp3", 200.0);

        f.controller.begin_play_all().unwrap();
        assert_close(elapsed(&f), 0.0);
        assert_eq!(f.controller.session_snapshot().duration_seconds, 180.0);

        f.clock.advance(170.0);
        assert!(!f.controller.check_track_end().unwrap());
        assert_close(elapsed(&f), 170.0);

        f.backend.finish_track();
        assert!(f.controller.check_track_end().unwrap());

        let session = f.controller.session_snapshot();
        assert_eq!(session.track_index, 1);
        assert_eq!(session.state, Playing);
        assert_eq!(session.duration_seconds, 200.0);
        assert_close(elapsed(&f), 0.0);
    }

    #[test]
    fn test_scenario_seek_pause_resume() {
        let f = fixture_with(vec![Track::new("A", "A.mp3")]);
        f.controller.play(0).unwrap();
        f.clock.advance(3.0);

        f.controller.seek(90.0).unwrap();
        f.controller.toggle_play_pause().unwrap();
        f.clock.advance(5.0);
        f.controller.toggle_play_pause().unwrap();

        assert_close(elapsed(&f), 90.0);
    }

    #[test]
    fn test_select_playlist() {
        let f = fixture(1);
        f.source.set("Chill", vec![Track::new("Calm", "/music/calm.mp3")]);
        let mut events = f.controller.subscribe();

        f.controller.select_playlist("Chill");
        f.controller.select_playlist("Chill");
        assert_eq!(
            events.try_recv().unwrap(),
            PlaybackEvent::PlaylistChanged("Chill".to_string())
        );
        assert!(events.try_recv().is_err());

        f.controller.play(0).unwrap();
        let session = f.controller.session_snapshot();
        assert_eq!(session.active_playlist, "Chill");
        assert_eq!(session.current_track.unwrap().name, "Calm");
    }

    #[test]
    fn test_play_or_toggle() {
        let f = fixture(3);
        f.controller.begin_play_all().unwrap();

        f.controller.play_or_toggle(0).unwrap();
        let session = f.controller.session_snapshot();
        assert_eq!(session.state, Paused);
        assert!(!session.continuous_play);

        f.controller.play_or_toggle(2).unwrap();
        let session = f.controller.session_snapshot();
        assert_eq!(session.state, Playing);
        assert_eq!(session.track_index, 2);

        f.controller.play_or_toggle(2).unwrap();
        assert_eq!(f.controller.session_snapshot().state, Paused);
    }

    #[test]
    fn test_scrub_gesture() {
        let f = fixture(1);
        f.controller.play(0).unwrap();
        f.clock.advance(20.0);

        f.controller.begin_scrub();
        assert_close(elapsed(&f), 20.0);

        f.controller.scrub_to(400.0);
        assert_close(elapsed(&f), 180.0);
        f.controller.scrub_to(75.0);
        f.clock.advance(10.0);
        assert_close(elapsed(&f), 75.0);

        f.controller.end_scrub().unwrap();
        let session = f.controller.session_snapshot();
        assert!(!session.user_is_scrubbing);
        assert_eq!(f.backend.calls().last(), Some(&BackendCall::PlayFrom(75.0)));
        assert_close(elapsed(&f), 75.0);
    }

    #[test]
    fn test_scrub_without_gesture_is_ignored() {
        let f = fixture(1);
        f.controller.play(0).unwrap();
        f.backend.clear_calls();

        f.controller.scrub_to(50.0);
        f.controller.end_scrub().unwrap();
        assert_eq!(f.controller.session_snapshot().scrub_position_seconds, 0.0);
        assert!(f.backend.calls().is_empty());
    }

    #[test]
    fn test_events_for_play_and_pause() {
        let f = fixture(2);
        let mut events = f.controller.subscribe();

        f.controller.play(1).unwrap();
        f.controller.toggle_play_pause().unwrap();
        f.controller.set_volume(0.5).unwrap();

        assert_eq!(
            events.try_recv().unwrap(),
            PlaybackEvent::TrackChanged {
                index: 1,
                track: Track::new("Track 1", "/music/track_1.mp3"),
            }
        );
        assert_eq!(
            events.try_recv().unwrap(),
            PlaybackEvent::PlaybackStateChanged(Playing)
        );
        assert_eq!(
            events.try_recv().unwrap(),
            PlaybackEvent::PlaybackStateChanged(Paused)
        );
        assert_eq!(events.try_recv().unwrap(), PlaybackEvent::VolumeChanged(0.5));
    }
}
