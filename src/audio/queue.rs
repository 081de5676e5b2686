use std::{collections::VecDeque, fmt};
use thiserror::Error;
use tracing::{debug, info};

use super::song::Song;

/// Fallos "estrictos" de la cola: solo `skip` e `insert_at` los devuelven.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("the queue is empty")]
    EmptyQueue,
    #[error("index {index} is out of range, the queue has {size} songs")]
    IndexOutOfRange { index: i64, size: usize },
}

/// Result of a user-facing [`SongQueue::remove`]. Never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed(Song),
    Empty,
    BelowRange,
    AboveRange { size: usize },
}

impl RemoveOutcome {
    pub fn is_removed(&self) -> bool {
        matches!(self, Self::Removed(_))
    }

    /// `(status, message)`: the removed title on success, the reason otherwise.
    pub fn into_status(self) -> (bool, String) {
        let removed = self.is_removed();
        (removed, self.to_string())
    }
}

impl fmt::Display for RemoveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Removed(song) => write!(f, "{}", song.title()),
            Self::Empty => write!(f, "The queue is empty."),
            Self::BelowRange => write!(f, "Index can't be lower than 1."),
            Self::AboveRange { size } => write!(
                f,
                "There's no song with that index! The queue has {} songs.",
                size
            ),
        }
    }
}

/// Where a clamped [`SongQueue::insert`] put the song.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    /// The queue had nothing in it, the song is now the only entry.
    WasEmpty,
    At(usize),
}

impl InsertPosition {
    /// Legacy encoding: `0` stands for [`InsertPosition::WasEmpty`].
    pub fn index(self) -> usize {
        match self {
            Self::WasEmpty => 0,
            Self::At(position) => position,
        }
    }
}

/// Result of [`SongQueue::move_song`], rendered as the user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Empty,
    OutOfRange { size: usize },
    WasEmpty { title: String },
    Moved { title: String, position: usize },
}

impl fmt::Display for MoveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "The queue is empty!"),
            Self::OutOfRange { size } => write!(
                f,
                "There's no song with that index! The current size of the queue is {}.",
                size
            ),
            Self::WasEmpty { .. } => write!(f, "The queue was empty, added in first place."),
            Self::Moved { title, position } => {
                write!(f, "Moved \"{}\" to position {}.", title, position)
            }
        }
    }
}

/// Ordered list of upcoming songs. Every index that crosses this API is
/// 1-based; `0` and negatives never address a song.
///
/// The song currently sounding is not in here: it was popped when it started,
/// so index 1 is always the next song to play.
#[derive(Debug, Default, Clone)]
pub struct SongQueue {
    songs: VecDeque<Song>,
}

impl SongQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega al final de la cola
    pub fn push(&mut self, song: Song) {
        debug!("➕ Agregado a la cola: {}", song.title());
        self.songs.push_back(song);
    }

    /// Pops the song at `index`, `None` for an empty queue or any index
    /// outside `[1, len]`.
    pub fn pop(&mut self, index: i64) -> Option<Song> {
        if self.songs.is_empty() {
            return None;
        }

        match index {
            1 => self.songs.pop_front(),
            i if i > 1 && (i as usize) <= self.songs.len() => self.songs.remove(i as usize - 1),
            _ => None,
        }
    }

    /// Orden FIFO para la reproducción normal
    pub fn pop_front(&mut self) -> Option<Song> {
        self.pop(1)
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn clear(&mut self) {
        self.songs.clear();
        info!("🗑️ Cola limpiada");
    }

    pub fn iter(&self) -> impl Iterator<Item = &Song> {
        self.songs.iter()
    }

    /// Discards the first `count` songs.
    ///
    /// Unlike [`remove`](Self::remove) this is strict: skipping from an empty
    /// queue or past its end is an error and nothing is discarded.
    pub fn skip(&mut self, count: i64) -> Result<(), QueueError> {
        if count > 0 && self.is_empty() {
            return Err(QueueError::EmptyQueue);
        }

        if count < 0 || count as usize > self.songs.len() {
            return Err(QueueError::IndexOutOfRange {
                index: count,
                size: self.songs.len(),
            });
        }

        self.songs.drain(..count as usize);
        debug!("⏭️ Descartadas {} canciones", count);
        Ok(())
    }

    /// User-facing removal, reports the reason instead of failing.
    pub fn remove(&mut self, index: i64) -> RemoveOutcome {
        let size = self.len();

        if self.is_empty() {
            RemoveOutcome::Empty
        } else if index < 1 {
            RemoveOutcome::BelowRange
        } else if index as usize > size {
            RemoveOutcome::AboveRange { size }
        } else {
            match self.pop(index) {
                Some(song) => RemoveOutcome::Removed(song),
                None => RemoveOutcome::AboveRange { size },
            }
        }
    }

    /// Clamped insert: `index <= 1` goes to the head, anything past the end
    /// is appended. `len + 1` is therefore always a valid tail target, which
    /// [`move_song`](Self::move_song) relies on after its pop.
    pub fn insert(&mut self, song: Song, index: i64) -> InsertPosition {
        if self.is_empty() {
            self.push(song);
            return InsertPosition::WasEmpty;
        }

        if index <= 1 {
            self.songs.push_front(song);
            InsertPosition::At(1)
        } else if index as usize <= self.songs.len() {
            self.songs.insert(index as usize - 1, song);
            InsertPosition::At(index as usize)
        } else {
            self.songs.push_back(song);
            InsertPosition::At(self.songs.len())
        }
    }

    /// Strict insert for explicit positions: only `[1, len + 1]` is accepted.
    pub fn insert_at(&mut self, song: Song, index: i64) -> Result<usize, QueueError> {
        let size = self.songs.len();
        if index < 1 || index as usize > size + 1 {
            return Err(QueueError::IndexOutOfRange { index, size });
        }

        let position = index as usize;
        self.songs.insert(position - 1, song);
        Ok(position)
    }

    /// Moves the song at `from` to `to`. Only `from` is validated (against the
    /// size before popping); `to` follows [`insert`](Self::insert)'s clamping.
    pub fn move_song(&mut self, from: i64, to: i64) -> MoveOutcome {
        let size = self.len();

        if self.is_empty() {
            return MoveOutcome::Empty;
        }

        if from < 1 || from as usize > size {
            return MoveOutcome::OutOfRange { size };
        }

        let Some(song) = self.pop(from) else {
            return MoveOutcome::OutOfRange { size };
        };
        let title = song.title().to_string();

        match self.insert(song, to) {
            InsertPosition::WasEmpty => MoveOutcome::WasEmpty { title },
            InsertPosition::At(position) => {
                debug!("📍 Track movido de posición {} a {}", from, position);
                MoveOutcome::Moved { title, position }
            }
        }
    }
}
