use async_trait::async_trait;
use croissant_bot::audio::{
    InsertPosition, MoveOutcome, Notice, PlaybackSession, RemoveOutcome, SessionState, Song,
    SongQueue, TrackEndNotice, TransportError, VoiceTransport,
};
use pretty_assertions::assert_eq;
use serenity::model::id::{ChannelId, GuildId};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use tokio::sync::mpsc;

fn song(name: &str) -> Song {
    Song::new(
        name,
        format!("file_{name}"),
        format!("https://example.com/{name}"),
        format!("https://example.com/{name}.jpg"),
    )
}

fn queue_of(names: &[&str]) -> SongQueue {
    let mut queue = SongQueue::new();
    for name in names {
        queue.push(song(name));
    }
    queue
}

fn titles(queue: &SongQueue) -> Vec<String> {
    queue.iter().map(|s| s.title().to_string()).collect()
}

const FIVE: [&str; 5] = ["A", "B", "C", "D", "E"];

#[test]
fn skip_then_pop_returns_the_next_song() {
    for n in 0..FIVE.len() {
        let mut queue = queue_of(&FIVE);
        queue.skip(n as i64).unwrap();
        assert_eq!(queue.pop_front().map(|s| s.title().to_string()), Some(FIVE[n].to_string()));
    }

    let mut queue = queue_of(&FIVE);
    queue.skip(5).unwrap();
    assert!(queue.pop_front().is_none());
}

#[test]
fn skip_two_then_pop_yields_c() {
    let mut queue = queue_of(&FIVE);

    queue.skip(2).unwrap();

    assert_eq!(queue.pop_front(), Some(song("C")));
    assert_eq!(titles(&queue), vec!["D", "E"]);
}

#[test]
fn insert_then_remove_restores_size() {
    for i in 1..=FIVE.len() as i64 + 1 {
        let mut queue = queue_of(&FIVE);

        assert_eq!(queue.insert(song("X"), i), InsertPosition::At(i as usize));
        assert_eq!(queue.remove(i).into_status(), (true, "X".to_string()));
        assert_eq!(titles(&queue), FIVE.to_vec());
    }
}

#[test]
fn insert_into_empty_queue_reports_was_empty() {
    for index in [-3, 0, 1, 7] {
        let mut queue = SongQueue::new();
        assert_eq!(queue.insert(song("X"), index), InsertPosition::WasEmpty);
        assert_eq!(queue.len(), 1);
    }
}

#[test]
fn move_to_same_index_changes_nothing() {
    for i in 1..=FIVE.len() as i64 {
        let mut queue = queue_of(&FIVE);
        queue.move_song(i, i);
        assert_eq!(titles(&queue), FIVE.to_vec());
    }
}

#[test]
fn move_first_to_last_and_back() {
    let mut queue = queue_of(&["A", "B", "C"]);

    assert_eq!(
        queue.move_song(1, 3),
        MoveOutcome::Moved {
            title: "A".to_string(),
            position: 3
        }
    );
    assert_eq!(titles(&queue), vec!["B", "C", "A"]);

    queue.move_song(3, 1);
    assert_eq!(titles(&queue), vec!["A", "B", "C"]);
}

#[test]
fn remove_on_empty_queue_never_fails() {
    let mut queue = SongQueue::new();
    for index in [-1, 0, 1, 100] {
        assert_eq!(queue.remove(index), RemoveOutcome::Empty);
        assert_eq!(
            queue.remove(index).into_status(),
            (false, "The queue is empty.".to_string())
        );
    }
}

#[test]
fn clear_empties_the_queue() {
    let mut queue = queue_of(&FIVE);
    queue.clear();
    assert!(queue.is_empty());
    assert_eq!(queue.len(), 0);
}

/// Counts what the session asks of the voice side.
#[derive(Default)]
struct CountingTransport {
    plays: AtomicUsize,
    stops: AtomicUsize,
    gains: Mutex<Vec<f32>>,
}

#[async_trait]
impl VoiceTransport for CountingTransport {
    async fn connect(&self, _: GuildId, _: ChannelId) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&self, _: GuildId) -> Result<(), TransportError> {
        Ok(())
    }

    async fn play(
        &self,
        _: GuildId,
        _: &Song,
        _: f32,
        _: TrackEndNotice,
    ) -> Result<(), TransportError> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self, _: GuildId) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    async fn pause(&self, _: GuildId) -> Result<(), TransportError> {
        Ok(())
    }

    async fn resume(&self, _: GuildId) -> Result<(), TransportError> {
        Ok(())
    }

    fn set_gain(&self, _: GuildId, volume: f32) -> Result<(), TransportError> {
        self.gains.lock().unwrap().push(volume);
        Ok(())
    }
}

async fn playing_session() -> (PlaybackSession, Arc<CountingTransport>) {
    let transport = Arc::new(CountingTransport::default());
    let (events, _) = mpsc::unbounded_channel();
    let mut session = PlaybackSession::new(GuildId::new(1), 0.5, transport.clone(), events);

    session.join(Some(ChannelId::new(2))).await;
    session.enqueue(song("A")).await;
    assert_eq!(session.state(), SessionState::Playing);

    (session, transport)
}

#[tokio::test]
async fn volume_out_of_range_is_only_reported() {
    let (mut session, transport) = playing_session().await;

    assert_eq!(session.set_volume(150), Notice::VolumeLevel { percent: 50 });
    assert!((session.volume() - 0.5).abs() < f32::EPSILON);

    assert_eq!(session.set_volume(40), Notice::VolumeChanged { percent: 40 });
    assert!((session.volume() - 0.40).abs() < f32::EPSILON);
    assert_eq!(*transport.gains.lock().unwrap(), vec![0.40]);
}

#[tokio::test]
async fn play_next_on_empty_queue_stops_exactly_once() {
    let (mut session, transport) = playing_session().await;

    assert_eq!(session.play_next().await, Notice::QueueEmpty);
    assert_eq!(session.play_next().await, Notice::QueueEmpty);

    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(transport.stops.load(Ordering::SeqCst), 1);
    assert_eq!(transport.plays.load(Ordering::SeqCst), 1);
}
