use super::*;
use crate::host::{EmbedEvent, InboundMessage, MediaEvent};
use crate::sim::{SimEmbedHost, SimFrameHost, SimHost, SimMediaHost};
use crate::video::VideoSource;
use serde_json::{Value, json};
use std::time::Duration;

const FRAME_ORIGIN: &str = "https://app.veo.co";

#[derive(Debug, Clone, PartialEq)]
enum Seen {
    Ready,
    Time(f64),
    State(PlayerState),
    Play,
    Pause,
    Error(PlayerError),
}

/// Collects every callback invocation in order
#[derive(Clone, Default)]
struct Recorder {
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl Recorder {
    fn callbacks(&self) -> PlayerCallbacks {
        let push = |seen: &Arc<Mutex<Vec<Seen>>>| {
            let seen = Arc::clone(seen);
            move |event: Seen| seen.lock().push(event)
        };
        let (ready, time, state, play, pause, error) = (
            push(&self.seen),
            push(&self.seen),
            push(&self.seen),
            push(&self.seen),
            push(&self.seen),
            push(&self.seen),
        );
        PlayerCallbacks::new()
            .on_ready(move || ready(Seen::Ready))
            .on_time_update(move |t| time(Seen::Time(t)))
            .on_state_change(move |s| state(Seen::State(s)))
            .on_play(move || play(Seen::Play))
            .on_pause(move || pause(Seen::Pause))
            .on_error(move |e| error(Seen::Error(e)))
    }

    fn count(&self, wanted: &Seen) -> usize {
        self.seen.lock().iter().filter(|s| *s == wanted).count()
    }

    fn times(&self) -> Vec<f64> {
        self.seen
            .lock()
            .iter()
            .filter_map(|s| match s {
                Seen::Time(t) => Some(*t),
                _ => None,
            })
            .collect()
    }

    fn states(&self) -> Vec<PlayerState> {
        self.seen
            .lock()
            .iter()
            .filter_map(|s| match s {
                Seen::State(state) => Some(*state),
                _ => None,
            })
            .collect()
    }

    fn errors(&self) -> Vec<PlayerError> {
        self.seen
            .lock()
            .iter()
            .filter_map(|s| match s {
                Seen::Error(e) => Some(e.clone()),
                _ => None,
            })
            .collect()
    }
}

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn video(id: &str, source: VideoSource, resource_url: Option<&str>) -> Video {
    Video {
        id: id.to_string(),
        source_video_id: format!("{}-src", id),
        title: format!("Video {}", id),
        source,
        duration_seconds: None,
        resource_url: resource_url.map(str::to_string),
    }
}

fn embedded(id: &str) -> Video {
    video(id, VideoSource::Embedded, None)
}

fn direct(id: &str) -> Video {
    video(id, VideoSource::Direct, Some("https://cdn.example/clip.mp4"))
}

fn cross_document(id: &str) -> Video {
    video(
        id,
        VideoSource::CrossDocument,
        Some("https://app.veo.co/matches/20240302-final/"),
    )
}

fn player(sim: &SimHost, recorder: &Recorder) -> VideoPlayer {
    VideoPlayer::with_script_loader(
        sim.player_host(),
        PlayerConfig::default(),
        recorder.callbacks(),
        Arc::new(ScriptLoader::new()),
    )
}

async fn settle(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

fn posted_json(posted: &[(String, String)]) -> Vec<Value> {
    posted
        .iter()
        .map(|(message, _)| serde_json::from_str(message).unwrap())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_embedded_commands_before_ready_are_dropped() {
    init();
    let sim = SimHost::new().with_scripts(SimEmbedHost::new().with_manual_ready());
    let recorder = Recorder::default();
    let player = player(&sim, &recorder);

    player.load(Some(embedded("a")));
    settle(100).await;
    let probe = sim.scripts.last_probe().unwrap();

    player.play();
    player.pause();
    player.seek(30.0, true);
    settle(50).await;

    assert_eq!(probe.play_calls(), 0);
    assert_eq!(probe.pause_calls(), 0);
    assert!(probe.seeks().is_empty());
    assert!(!player.is_ready());
    assert_eq!(player.current_time(), 0.0);
    assert_eq!(player.state(), StateReport::Unstarted);
    assert_eq!(recorder.count(&Seen::Ready), 0);
}

#[tokio::test(start_paused = true)]
async fn test_embedded_becomes_ready_and_polls_time() {
    init();
    let sim = SimHost::new();
    let recorder = Recorder::default();
    let player = player(&sim, &recorder);

    player.load(Some(embedded("a")));
    settle(200).await;
    assert!(player.is_ready());
    assert_eq!(recorder.count(&Seen::Ready), 1);

    let before = recorder.times().len();
    settle(1000).await;
    assert!(recorder.times().len() >= before + 4);
    assert!(sim.scripts.last_probe().unwrap().time_queries() > 0);
}

#[tokio::test(start_paused = true)]
async fn test_embedded_seek_is_reflected_in_current_time() {
    init();
    let sim = SimHost::new();
    let player = player(&sim, &Recorder::default());

    player.load(Some(embedded("a")));
    settle(200).await;
    player.seek(30.0, true);

    assert!(player.current_time() >= 30.0);
    assert_eq!(sim.scripts.last_probe().unwrap().seeks(), vec![(30.0, true)]);
}

#[tokio::test(start_paused = true)]
async fn test_switch_before_ready_ignores_stale_readiness() {
    init();
    let sim = SimHost::new().with_scripts(SimEmbedHost::new().with_manual_ready());
    let recorder = Recorder::default();
    let player = player(&sim, &recorder);

    player.load(Some(embedded("a")));
    settle(100).await;
    let first = sim.scripts.last_probe().unwrap();

    player.load(Some(embedded("b")));
    settle(100).await;
    let second = sim.scripts.last_probe().unwrap();
    assert_ne!(first.container_id(), second.container_id());
    assert!(first.is_destroyed());

    first.fire(EmbedEvent::Ready);
    settle(500).await;
    assert!(!player.is_ready());
    assert_eq!(recorder.count(&Seen::Ready), 0);
    assert_eq!(first.time_queries(), 0);

    second.fire(EmbedEvent::Ready);
    settle(10).await;
    assert!(player.is_ready());
    assert_eq!(recorder.count(&Seen::Ready), 1);
}

#[tokio::test(start_paused = true)]
async fn test_play_notifies_once_across_polls() {
    init();
    let sim = SimHost::new();
    let recorder = Recorder::default();
    let player = player(&sim, &recorder);

    player.load(Some(embedded("a")));
    settle(200).await;
    player.play();
    settle(1000).await;

    assert_eq!(recorder.count(&Seen::Play), 1);
    assert_eq!(recorder.states(), vec![PlayerState::Playing]);
    assert_eq!(player.state(), StateReport::Known(PlayerState::Playing));
}

#[tokio::test(start_paused = true)]
async fn test_repeated_commands_are_not_reissued() {
    init();
    let sim = SimHost::new();
    let player = player(&sim, &Recorder::default());

    player.load(Some(embedded("a")));
    settle(200).await;
    let probe = sim.scripts.last_probe().unwrap();

    player.play();
    player.play();
    assert_eq!(probe.play_calls(), 1);

    player.pause();
    player.pause();
    assert_eq!(probe.pause_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_ended_counts_as_pause() {
    init();
    let sim = SimHost::new().with_scripts(SimEmbedHost::new().with_duration(2.0));
    let recorder = Recorder::default();
    let player = player(&sim, &recorder);

    player.load(Some(embedded("a")));
    settle(200).await;
    player.play();
    settle(3000).await;

    assert_eq!(recorder.count(&Seen::Play), 1);
    assert_eq!(recorder.count(&Seen::Pause), 1);
    assert_eq!(player.state(), StateReport::Known(PlayerState::Ended));
}

#[tokio::test(start_paused = true)]
async fn test_toggle_alternates_play_and_pause() {
    init();
    let sim = SimHost::new();
    let player = player(&sim, &Recorder::default());

    player.load(Some(embedded("a")));
    settle(200).await;
    let probe = sim.scripts.last_probe().unwrap();

    player.toggle();
    assert_eq!(probe.play_calls(), 1);
    player.toggle();
    assert_eq!(probe.pause_calls(), 1);
    player.toggle();
    assert_eq!(probe.play_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_backend_panic_reported_as_error() {
    init();
    let sim = SimHost::new().with_scripts(SimEmbedHost::new().panicking_on_play());
    let recorder = Recorder::default();
    let player = player(&sim, &recorder);

    player.load(Some(embedded("a")));
    settle(200).await;
    player.play();
    settle(10).await;

    let errors = recorder.errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors[0],
        PlayerError::Panicked {
            operation: "play",
            ..
        }
    ));
    assert!(player.is_ready());
}

#[tokio::test(start_paused = true)]
async fn test_script_failure_reported() {
    init();
    let sim = SimHost::new().with_scripts(SimEmbedHost::new().failing_script_loads(1));
    let recorder = Recorder::default();
    let player = player(&sim, &recorder);

    player.load(Some(embedded("a")));
    settle(200).await;

    assert!(!player.is_ready());
    assert!(matches!(recorder.errors().as_slice(), [PlayerError::ScriptLoad(_)]));
}

#[tokio::test(start_paused = true)]
async fn test_construction_failure_reported() {
    init();
    let sim =
        SimHost::new().with_scripts(SimEmbedHost::new().failing_construction("no container"));
    let recorder = Recorder::default();
    let player = player(&sim, &recorder);

    player.load(Some(embedded("a")));
    settle(200).await;

    assert!(!player.is_ready());
    assert_eq!(
        recorder.errors(),
        vec![PlayerError::Construction {
            backend: "embedded",
            message: "no container".to_string(),
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_script_requested_once_across_players() {
    init();
    let sim = SimHost::new()
        .with_scripts(SimEmbedHost::new().with_load_delay(Duration::from_millis(80)));
    let loader = Arc::new(ScriptLoader::new());
    let players: Vec<VideoPlayer> = (0..3)
        .map(|_| {
            VideoPlayer::with_script_loader(
                sim.player_host(),
                PlayerConfig::default(),
                PlayerCallbacks::default(),
                Arc::clone(&loader),
            )
        })
        .collect();

    for (i, player) in players.iter().enumerate() {
        player.load(Some(embedded(&format!("v{}", i))));
    }
    settle(300).await;

    assert_eq!(sim.scripts.script_requests(), 1);
    assert!(players.iter().all(VideoPlayer::is_ready));
}

#[tokio::test(start_paused = true)]
async fn test_direct_ready_on_metadata() {
    init();
    let sim = SimHost::new().with_media(SimMediaHost::new().with_manual_metadata());
    let recorder = Recorder::default();
    let player = player(&sim, &recorder);

    player.load(Some(direct("d")));
    settle(100).await;
    let probe = sim.media.last_probe().unwrap();
    assert_eq!(probe.src().as_deref(), Some("https://cdn.example/clip.mp4"));
    assert_eq!(player.state(), StateReport::Unknown);

    player.play();
    assert_eq!(probe.play_attempts(), 0);

    probe.fire(MediaEvent::LoadedMetadata {
        duration: Some(90.0),
    });
    settle(10).await;
    assert!(player.is_ready());
    assert_eq!(recorder.count(&Seen::Ready), 1);
    assert_eq!(recorder.times(), vec![0.0]);
}

#[tokio::test(start_paused = true)]
async fn test_direct_playback_reports_time_and_transitions() {
    init();
    let sim = SimHost::new();
    let recorder = Recorder::default();
    let player = player(&sim, &recorder);

    player.load(Some(direct("d")));
    settle(100).await;
    player.play();
    settle(1000).await;

    assert_eq!(recorder.count(&Seen::Play), 1);
    assert_eq!(player.state(), StateReport::Known(PlayerState::Playing));
    assert!(recorder.times().iter().any(|t| *t > 0.5));

    player.pause();
    player.pause();
    settle(10).await;
    assert_eq!(recorder.count(&Seen::Pause), 1);
    assert_eq!(player.state(), StateReport::Known(PlayerState::Paused));
    assert!(recorder.errors().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_autoplay_rejection_is_not_an_error() {
    init();
    let sim = SimHost::new().with_media(SimMediaHost::new().with_autoplay_blocked());
    let recorder = Recorder::default();
    let player = player(&sim, &recorder);

    player.load(Some(direct("d")));
    settle(100).await;
    player.play();
    settle(10).await;

    assert_eq!(sim.media.last_probe().unwrap().play_attempts(), 1);
    assert!(recorder.errors().is_empty());
    assert_eq!(recorder.count(&Seen::Play), 0);
}

#[tokio::test(start_paused = true)]
async fn test_missing_resource_url_shows_placeholder() {
    init();
    let sim = SimHost::new();
    let recorder = Recorder::default();
    let player = player(&sim, &recorder);

    player.load(Some(video("d", VideoSource::Direct, Some("  "))));
    settle(10).await;

    assert_eq!(
        recorder.errors(),
        vec![PlayerError::MissingResourceUrl {
            video_id: "d".to_string()
        }]
    );
    assert!(matches!(player.view().surface, Surface::Placeholder(_)));
    assert!(sim.media.probes().is_empty());
    assert!(!player.is_ready());
    assert_eq!(player.state(), StateReport::Unknown);

    player.play();
    assert_eq!(player.current_time(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_source_shows_placeholder() {
    init();
    let sim = SimHost::new();
    let recorder = Recorder::default();
    let player = player(&sim, &recorder);

    let video: Video = serde_json::from_value(json!({
        "id": "x",
        "sourceVideoId": "123",
        "title": "Elsewhere",
        "source": "vimeo"
    }))
    .unwrap();
    player.load(Some(video));
    settle(10).await;

    assert!(matches!(
        recorder.errors().as_slice(),
        [PlayerError::UnsupportedSource { .. }]
    ));
    assert_eq!(
        player.view().surface,
        Surface::Placeholder(UNPLAYABLE.to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn test_unload_releases_media_element() {
    init();
    let sim = SimHost::new();
    let player = player(&sim, &Recorder::default());

    player.load(Some(direct("d")));
    settle(100).await;
    player.play();
    let probe = sim.media.last_probe().unwrap();

    player.unload();
    assert!(probe.released());
    assert!(probe.is_paused());
    assert!(!player.is_ready());
    assert_eq!(player.view().surface, Surface::Placeholder(NO_VIDEO.to_string()));
    assert_eq!(player.video(), None);
}

#[tokio::test(start_paused = true)]
async fn test_events_from_replaced_backend_are_dropped() {
    init();
    let sim = SimHost::new();
    let recorder = Recorder::default();
    let player = player(&sim, &recorder);

    player.load(Some(direct("d")));
    settle(100).await;
    let media = sim.media.last_probe().unwrap();

    player.load(Some(cross_document("c")));
    media.fire(MediaEvent::TimeUpdate(99.0));
    settle(10).await;

    assert!(!recorder.times().contains(&99.0));
    assert!(media.released());
}

#[tokio::test(start_paused = true)]
async fn test_cross_document_ready_after_delay() {
    init();
    let sim = SimHost::new();
    let recorder = Recorder::default();
    let player = player(&sim, &recorder);

    player.load(Some(cross_document("c")));
    let probe = sim.frames.last_probe().unwrap();
    assert!(probe.src().starts_with("https://app.veo.co/embed/matches/?url="));
    assert_eq!(player.view().surface, Surface::Frame { src: probe.src().to_string() });

    settle(2900).await;
    assert!(!player.is_ready());
    assert_eq!(player.state(), StateReport::Unknown);

    settle(200).await;
    assert!(player.is_ready());
    assert_eq!(recorder.count(&Seen::Ready), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cross_document_ready_message_wins_race() {
    init();
    let sim = SimHost::new()
        .with_frames(SimFrameHost::new().announcing_ready_after(Duration::from_millis(400)));
    let recorder = Recorder::default();
    let player = player(&sim, &recorder);

    player.load(Some(cross_document("c")));
    settle(500).await;
    assert!(player.is_ready());

    settle(4000).await;
    assert_eq!(recorder.count(&Seen::Ready), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cross_document_foreign_origin_ignored() {
    init();
    let sim = SimHost::new();
    let recorder = Recorder::default();
    let player = player(&sim, &recorder);

    player.load(Some(cross_document("c")));
    settle(3100).await;
    let probe = sim.frames.last_probe().unwrap();

    probe.inject(InboundMessage::structured(
        "https://evil.example",
        json!({"event": "playing", "currentTime": 42}),
    ));
    settle(10).await;
    assert_eq!(player.current_time(), 0.0);
    assert_eq!(player.state(), StateReport::Unknown);
    assert!(recorder.states().is_empty());

    probe.inject(InboundMessage::structured(
        format!("{}/", FRAME_ORIGIN),
        json!({"event": "playing", "currentTime": 42}),
    ));
    settle(10).await;
    assert_eq!(player.current_time(), 42.0);
    assert_eq!(player.state(), StateReport::Known(PlayerState::Playing));
    assert_eq!(recorder.count(&Seen::Play), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cross_document_malformed_messages_ignored() {
    init();
    let sim = SimHost::new();
    let recorder = Recorder::default();
    let player = player(&sim, &recorder);

    player.load(Some(cross_document("c")));
    settle(3100).await;
    let probe = sim.frames.last_probe().unwrap();

    probe.inject(InboundMessage::text(FRAME_ORIGIN, "not json"));
    probe.inject(InboundMessage::text(FRAME_ORIGIN, r#"{"event": 5}"#));
    probe.inject(InboundMessage::structured(FRAME_ORIGIN, json!([1, 2, 3])));
    settle(10).await;

    assert_eq!(player.current_time(), 0.0);
    assert_eq!(player.state(), StateReport::Unknown);
    assert!(recorder.errors().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cross_document_commands_are_optimistic() {
    init();
    let sim = SimHost::new();
    let recorder = Recorder::default();
    let player = player(&sim, &recorder);

    player.load(Some(cross_document("c")));
    settle(3100).await;
    let probe = sim.frames.last_probe().unwrap();

    player.play();
    assert_eq!(player.state(), StateReport::Known(PlayerState::Playing));
    player.seek(12.0, true);
    assert_eq!(player.current_time(), 12.0);
    player.pause();
    settle(10).await;

    assert_eq!(
        posted_json(&probe.posted()),
        vec![
            json!({"method": "play"}),
            json!({"method": "seekTo", "value": 12.0}),
            json!({"method": "pause"}),
        ]
    );
    assert!(probe.posted().iter().all(|(_, origin)| origin == FRAME_ORIGIN));
    assert_eq!(recorder.count(&Seen::Play), 1);
    assert_eq!(recorder.count(&Seen::Pause), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cross_document_fallback_reemits_cached_time() {
    init();
    let sim = SimHost::new();
    let recorder = Recorder::default();
    let player = player(&sim, &recorder);

    player.load(Some(cross_document("c")));
    settle(3100).await;
    player.seek(7.0, true);
    let before = recorder.times().len();

    settle(3000).await;
    let times = recorder.times();
    assert!(times.len() >= before + 2);
    assert!(times[before..].iter().all(|t| *t == 7.0));
}

#[tokio::test(start_paused = true)]
async fn test_cross_document_commands_before_ready_are_dropped() {
    init();
    let sim = SimHost::new().with_frames(SimFrameHost::new().responsive());
    let recorder = Recorder::default();
    let player = player(&sim, &recorder);

    player.load(Some(cross_document("c")));
    settle(100).await;
    let probe = sim.frames.last_probe().unwrap();

    player.play();
    player.pause();
    player.seek(10.0, true);
    settle(10).await;

    assert!(!player.is_ready());
    assert!(probe.posted().is_empty());
    assert_eq!(player.current_time(), 0.0);
    assert_eq!(player.state(), StateReport::Unknown);
    assert_eq!(recorder.count(&Seen::Play), 0);
    assert_eq!(recorder.count(&Seen::Pause), 0);
    assert_eq!(recorder.count(&Seen::Time(10.0)), 0);
    assert!(recorder.states().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cross_document_state_announced_while_starting_is_reported_on_ready() {
    init();
    let sim = SimHost::new();
    let recorder = Recorder::default();
    let player = player(&sim, &recorder);

    player.load(Some(cross_document("c")));
    settle(1000).await;
    let probe = sim.frames.last_probe().unwrap();
    probe.inject(InboundMessage::structured(
        FRAME_ORIGIN,
        json!({"event": "playing", "currentTime": 5}),
    ));
    settle(10).await;
    assert!(recorder.states().is_empty());
    assert_eq!(recorder.count(&Seen::Play), 0);

    settle(2100).await;
    assert!(player.is_ready());
    assert_eq!(recorder.states(), vec![PlayerState::Playing]);
    assert_eq!(recorder.count(&Seen::Play), 1);
    assert_eq!(player.state(), StateReport::Known(PlayerState::Playing));
    assert_eq!(player.current_time(), 5.0);

    // The frame keeps saying the same thing; no second notification
    probe.inject(InboundMessage::structured(FRAME_ORIGIN, json!({"event": "playing"})));
    settle(10).await;
    assert_eq!(recorder.count(&Seen::Play), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cross_document_origin_compared_by_url_rules() {
    init();
    let sim = SimHost::new().with_frames(
        SimFrameHost::new()
            .responsive()
            .announcing_ready_after(Duration::from_millis(400)),
    );
    let recorder = Recorder::default();
    let config = PlayerConfig {
        frame_origin: "https://App.Veo.co:443/embed/".to_string(),
        ..Default::default()
    };
    let player = VideoPlayer::with_script_loader(
        sim.player_host(),
        config,
        recorder.callbacks(),
        Arc::new(ScriptLoader::new()),
    );

    player.load(Some(cross_document("c")));
    settle(500).await;
    assert!(player.is_ready());

    player.play();
    settle(10).await;
    let probe = sim.frames.last_probe().unwrap();
    assert_eq!(
        probe.posted(),
        vec![(r#"{"method":"play"}"#.to_string(), FRAME_ORIGIN.to_string())]
    );
    assert_eq!(recorder.count(&Seen::Play), 1);

    probe.inject(InboundMessage::structured(FRAME_ORIGIN, json!({"currentTime": 31})));
    settle(10).await;
    assert_eq!(player.current_time(), 31.0);
}

#[tokio::test(start_paused = true)]
async fn test_switching_videos_forgets_released_backends() {
    init();
    let sim = SimHost::new();
    let player = player(&sim, &Recorder::default());

    for id in ["a", "b", "c"] {
        player.load(Some(embedded(id)));
        settle(200).await;
    }
    let live = sim.scripts.probes();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].video_id(), "c-src");

    for id in ["d", "e"] {
        player.load(Some(cross_document(id)));
        settle(100).await;
    }
    assert_eq!(sim.frames.probes().len(), 1);

    player.load(Some(direct("f")));
    settle(100).await;
    player.load(Some(direct("g")));
    settle(100).await;
    assert_eq!(sim.media.probes().len(), 1);
    assert!(sim.frames.last_probe().unwrap().is_released());
}

#[tokio::test(start_paused = true)]
async fn test_keyboard_seek_is_debounced_and_clamped() {
    init();
    let (keys, _) = broadcast::channel(16);
    let sim = SimHost::new();
    let host = sim.player_host().with_keys(keys.clone());
    let player = VideoPlayer::with_script_loader(
        host,
        PlayerConfig::default(),
        PlayerCallbacks::default(),
        Arc::new(ScriptLoader::new()),
    );

    player.load(Some(embedded("a")));
    settle(200).await;
    let probe = sim.scripts.last_probe().unwrap();
    player.seek(20.0, false);

    keys.send(KeyPress::SeekBack).unwrap();
    keys.send(KeyPress::SeekBack).unwrap();
    settle(10).await;
    assert_eq!(probe.seeks(), vec![(20.0, false), (15.0, true)]);

    settle(250).await;
    keys.send(KeyPress::SeekForward).unwrap();
    settle(10).await;
    assert_eq!(probe.seeks().last(), Some(&(20.0, true)));

    player.seek(2.0, false);
    settle(250).await;
    keys.send(KeyPress::SeekBack).unwrap();
    settle(10).await;
    assert_eq!(probe.seeks().last(), Some(&(0.0, true)));
}

#[tokio::test(start_paused = true)]
async fn test_keyboard_listener_removed_on_teardown() {
    init();
    let (keys, _) = broadcast::channel(16);
    let sim = SimHost::new();
    let player = VideoPlayer::with_script_loader(
        sim.player_host().with_keys(keys.clone()),
        PlayerConfig::default(),
        PlayerCallbacks::default(),
        Arc::new(ScriptLoader::new()),
    );

    player.load(Some(embedded("a")));
    settle(10).await;
    assert_eq!(keys.receiver_count(), 1);

    player.unload();
    settle(10).await;
    assert_eq!(keys.receiver_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_same_video_props_do_not_reinitialize() {
    init();
    let sim = SimHost::new();
    let player = player(&sim, &Recorder::default());

    player.load(Some(embedded("a")));
    settle(200).await;

    player.set_props(PlayerProps {
        video: Some(embedded("a")),
        width: Some(640),
        height: Some(360),
        class_name: Some("wide".to_string()),
    });
    settle(10).await;

    assert_eq!(sim.scripts.probes().len(), 1);
    assert!(player.is_ready());
    let view = player.view();
    assert_eq!(view.width, Some(640));
    assert_eq!(view.class_name.as_deref(), Some("wide"));
    assert!(matches!(view.surface, Surface::EmbedContainer { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_drop_destroys_backend() {
    init();
    let sim = SimHost::new();
    let player = player(&sim, &Recorder::default());

    player.load(Some(embedded("a")));
    settle(200).await;
    let probe = sim.scripts.last_probe().unwrap();

    drop(player);
    assert!(probe.is_destroyed());
}

#[tokio::test(start_paused = true)]
async fn test_panicking_callback_does_not_stop_dispatch() {
    init();
    let sim = SimHost::new();
    let ready = Arc::new(Mutex::new(0));
    let callbacks = {
        let ready = Arc::clone(&ready);
        PlayerCallbacks::new()
            .on_time_update(|_| panic!("observer bug"))
            .on_ready(move || *ready.lock() += 1)
    };
    let player = VideoPlayer::with_script_loader(
        sim.player_host(),
        PlayerConfig::default(),
        callbacks,
        Arc::new(ScriptLoader::new()),
    );

    player.load(Some(direct("d")));
    settle(100).await;
    player.load(Some(embedded("a")));
    settle(200).await;

    assert_eq!(*ready.lock(), 2);
}
