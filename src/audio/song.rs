use std::fmt;

/// One playable item, as handed over by a [`SongResolver`](crate::sources::SongResolver).
///
/// `source` is whatever the voice transport knows how to open (a page URL
/// for yt-dlp, a local path, ...). `url` is the canonical link shown to users
/// and used as a natural key by collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    title: String,
    source: String,
    url: String,
    thumbnail: String,
}

impl Song {
    pub fn new(
        title: impl Into<String>,
        source: impl Into<String>,
        url: impl Into<String>,
        thumbnail: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            source: source.into(),
            url: url.into(),
            thumbnail: thumbnail.into(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn thumbnail(&self) -> &str {
        &self.thumbnail
    }
}

impl fmt::Display for Song {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.title, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_joins_title_and_url() {
        let song = Song::new("Song 1", "file_1", "https://example.com/1", "thumb_1");
        assert_eq!(song.to_string(), "Song 1 - https://example.com/1");
        assert_eq!(song.source(), "file_1");
        assert_eq!(song.thumbnail(), "thumb_1");
    }
}
