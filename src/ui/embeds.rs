use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};

use crate::{player::QueueItem, sources::RadioStation};

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const MUSIC_PURPLE: Colour = Colour::from_rgb(138, 43, 226);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🎵 Ritmo Bot";

/// Crea un embed para mostrar que se agregó una canción
pub fn create_track_added_embed(track: &QueueItem) -> CreateEmbed {
    CreateEmbed::default()
        .title("🎶 Agregada a la Cola")
        .description(format!("**{}**", track.title))
        .color(colors::SUCCESS_GREEN)
        .field("👤 Solicitado por", format!("<@{}>", track.requested_by), true)
        .url(&track.url)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(
            "🎵 Se reproducirá automáticamente si no hay música sonando",
        ))
}

/// Crea un embed para mostrar que una playlist fue agregada
pub fn create_playlist_added_embed(track_count: usize, playlist_url: &str) -> CreateEmbed {
    let description = if track_count == 1 {
        "Se agregó **1 canción** de la playlist a la cola".to_string()
    } else {
        format!("Se agregaron **{} canciones** de la playlist a la cola", track_count)
    };

    let mut embed = CreateEmbed::default()
        .title("📋 Playlist Agregada")
        .description(description)
        .color(colors::MUSIC_PURPLE);

    // Mostrar el ID de la playlist si se puede extraer
    if let Some(list_start) = playlist_url.find("list=") {
        let list_id = &playlist_url[list_start + 5..];
        let clean_list_id = list_id.split('&').next().unwrap_or(list_id);
        embed = embed.field("🆔 Playlist ID", format!("`{}`", clean_list_id), true);
    }

    embed
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea un embed con la cola de reproducción actual
pub fn create_queue_embed(now_playing: Option<&str>, items: &[QueueItem]) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("🎵 Cola de Reproducción")
        .color(colors::INFO_BLUE);

    if let Some(title) = now_playing {
        embed = embed.field("▶️ Sonando ahora", format!("**{}**", title), false);
    }

    let description = if items.is_empty() {
        "🎵 La cola está vacía.".to_string()
    } else {
        items
            .iter()
            .enumerate()
            .map(|(index, track)| format_queue_line(index, track))
            .collect::<Vec<_>>()
            .join("\n")
    };

    embed
        .description(description)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Línea de la cola: posición, título, quién la pidió y hace cuánto
/// (timestamp relativo nativo de Discord)
fn format_queue_line(index: usize, track: &QueueItem) -> String {
    format!(
        "{}. **{}** — <@{}> (<t:{}:R>)",
        index + 1,
        track.title,
        track.requested_by,
        track.added_at.timestamp()
    )
}

/// Crea un embed para la radio sintonizada
pub fn create_radio_embed(station: &RadioStation) -> CreateEmbed {
    CreateEmbed::default()
        .title("📻 Sonando Ahora")
        .description(format!("**{}**", station.name))
        .color(colors::INFO_BLUE)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea el embed de ayuda con todos los comandos
pub fn create_help_embed() -> CreateEmbed {
    CreateEmbed::default()
        .title("📖 Comandos de Ritmo Bot")
        .color(colors::MUSIC_PURPLE)
        .field("/play query", "Reproduce una canción o playlist (URL o búsqueda)", false)
        .field("/queue", "Muestra la cola de reproducción", false)
        .field("/skip", "Salta a la siguiente canción", false)
        .field("/stop", "Detiene la reproducción y limpia la cola", false)
        .field("/join", "Conecta el bot a tu canal de voz", false)
        .field("/clear", "Limpia la cola de reproducción", false)
        .field("/radio station", "Sintoniza una estación de radio", false)
        .field("/help", "Muestra esta ayuda", false)
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::TrackInfo;
    use serenity::model::id::UserId;

    #[test]
    fn test_queue_line_shows_requester_and_age() {
        let track = QueueItem::new(
            TrackInfo::new("https://example.com/a", "Mi Canción"),
            UserId::new(42),
        );

        let line = format_queue_line(0, &track);
        assert!(line.starts_with("1. **Mi Canción**"));
        assert!(line.contains("<@42>"));
        assert!(line.contains(&format!("<t:{}:R>", track.added_at.timestamp())));
    }
}
