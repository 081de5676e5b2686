use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};

use crate::audio::{Notice, Song};

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const MUSIC_PURPLE: Colour = Colour::from_rgb(138, 43, 226);
    pub const NEUTRAL_GRAY: Colour = Colour::from_rgb(108, 117, 125);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🥐 Croissant Bot";

/// Canciones listadas por embed de cola
const QUEUE_PAGE_SIZE: usize = 20;

/// `title - <url>`, the angle brackets keep Discord from unfurling the link.
fn song_line(song: &Song) -> String {
    format!("{} - <{}>", song.title(), song.url())
}

fn song_embed(title: &str, song: &Song) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title(title)
        .description(song_line(song))
        .color(colors::MUSIC_PURPLE)
        .url(song.url())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
        .timestamp(Timestamp::now());

    if !song.thumbnail().is_empty() {
        embed = embed.thumbnail(song.thumbnail());
    }

    embed
}

/// Renders whatever a session operation reported.
pub fn notice_embed(notice: &Notice) -> CreateEmbed {
    match notice {
        Notice::NowPlaying { song } => song_embed("Now playing:", song),
        Notice::SkippingTo { song } => song_embed("Skipping to:", song),
        Notice::Queued { song } => song_embed("Queued:", song),
        Notice::QueuedAt { song, position } => {
            song_embed(&format!("Queued at position {}:", position), song)
        }
        Notice::ResumingFromQueue(inner) if inner.song().is_some() => notice_embed(inner)
            .title("Resuming from queue:"),
        _ => {
            let color = if notice.is_error() {
                colors::ERROR_RED
            } else {
                colors::SUCCESS_GREEN
            };
            CreateEmbed::default()
                .description(notice.to_string())
                .color(color)
                .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
        }
    }
}

pub fn now_playing_embed(song: Option<&Song>) -> CreateEmbed {
    match song {
        Some(song) => song_embed("Now playing:", song),
        None => CreateEmbed::default()
            .description("The bot is not currently playing something.")
            .color(colors::NEUTRAL_GRAY)
            .footer(CreateEmbedFooter::new(STANDARD_FOOTER)),
    }
}

/// Numbered listing, 1-based like the `/remove` and `/move` indices.
fn queue_listing(upcoming: &[Song]) -> String {
    let mut output = String::new();
    for (i, song) in upcoming.iter().take(QUEUE_PAGE_SIZE).enumerate() {
        output.push_str(&format!("{}. {}\n", i + 1, song.title()));
    }
    if upcoming.len() > QUEUE_PAGE_SIZE {
        output.push_str(&format!("... y {} más", upcoming.len() - QUEUE_PAGE_SIZE));
    }
    output
}

/// `None` means there is no queue at all (bot not connected).
pub fn queue_embed(current: Option<&Song>, upcoming: Option<&[Song]>) -> CreateEmbed {
    let Some(upcoming) = upcoming else {
        return notice_embed(&Notice::NotConnected);
    };

    let mut embed = CreateEmbed::default()
        .color(colors::INFO_BLUE)
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
        .timestamp(Timestamp::now());

    if let Some(current) = current {
        embed = embed.field("▶️ Now playing", song_line(current), false);
    }

    if upcoming.is_empty() {
        embed
            .title("The queue is empty.")
            .color(colors::NEUTRAL_GRAY)
    } else {
        embed
            .title("Song queue:")
            .description(queue_listing(upcoming))
    }
}

/// Header plus one embed per result, numbered from 1 so a user can pick
/// one and pass its URL to `/play`.
pub fn search_embeds(query: &str, results: &[Song]) -> Vec<CreateEmbed> {
    let header = CreateEmbed::default()
        .title(format!("Search results for \"{}\"", query))
        .color(colors::INFO_BLUE)
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER));

    let entries = results.iter().enumerate().map(|(i, song)| {
        let embed = CreateEmbed::default()
            .description(format!("{}. {}\n<{}>\n", i + 1, song.title(), song.url()))
            .color(colors::MUSIC_PURPLE);

        if song.thumbnail().is_empty() {
            embed
        } else {
            embed.thumbnail(song.thumbnail())
        }
    });

    std::iter::once(header).chain(entries).collect()
}
