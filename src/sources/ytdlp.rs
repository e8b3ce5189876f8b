use async_process::Command;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{ResolveError, TrackInfo};

/// Cliente para resolver URLs, búsquedas y playlists con yt-dlp
pub struct StreamResolver {
    // Limitar requests concurrentes para evitar rate limiting
    rate_limiter: tokio::sync::Semaphore,
}

/// Información extraída de yt-dlp (--dump-json)
#[derive(Debug, Deserialize)]
struct YtDlpEntry {
    id: String,
    title: Option<String>,
    webpage_url: Option<String>,
}

impl YtDlpEntry {
    fn into_track(self) -> TrackInfo {
        let url = self
            .webpage_url
            .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", self.id));
        TrackInfo::new(url, self.title.unwrap_or_else(|| "Unknown Title".to_string()))
    }
}

impl StreamResolver {
    pub fn new() -> Self {
        Self {
            rate_limiter: tokio::sync::Semaphore::new(3),
        }
    }

    /// Resuelve una query de usuario: URL directa o término de búsqueda
    pub async fn resolve_query(&self, query: &str) -> Result<TrackInfo, ResolveError> {
        if query.starts_with("http") {
            // URL directa: buscar el título real, con fallback si yt-dlp no lo da
            match self.get_info(query).await {
                Ok(track) => Ok(track),
                Err(e) => {
                    warn!("⚠️ No se pudo obtener título de {}: {}", query, e);
                    Ok(TrackInfo::new(query, "Unknown Title"))
                }
            }
        } else {
            self.search(query).await
        }
    }

    /// Obtiene metadata de una URL específica
    pub async fn get_info(&self, url: &str) -> Result<TrackInfo, ResolveError> {
        let _permit = self.rate_limiter.acquire().await.ok();

        debug!("📊 Obteniendo info de: {}", url);

        let output = Command::new("yt-dlp")
            .args(["--no-playlist", "--dump-json", "--no-warnings", url])
            .output()
            .await?;

        if !output.status.success() {
            return Err(ResolveError::Tool(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let entry: YtDlpEntry = serde_json::from_str(stdout.trim())?;

        Ok(entry.into_track())
    }

    /// Busca el primer resultado en YouTube
    pub async fn search(&self, query: &str) -> Result<TrackInfo, ResolveError> {
        let _permit = self.rate_limiter.acquire().await.ok();

        info!("🔍 Buscando en YouTube: {}", query);

        let search_query = format!("ytsearch1:{}", query);

        let output = Command::new("yt-dlp")
            .args([
                "--dump-json",
                "--flat-playlist",
                "--skip-download",
                "--no-warnings",
                &search_query,
            ])
            .output()
            .await?;

        if !output.status.success() {
            return Err(ResolveError::Tool(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .lines()
            .find_map(|line| serde_json::from_str::<YtDlpEntry>(line).ok())
            .map(YtDlpEntry::into_track)
            .ok_or(ResolveError::NoResults)
    }

    /// Obtiene los videos de una playlist, limitado a max_items
    pub async fn playlist_items(
        &self,
        url: &str,
        max_items: usize,
    ) -> Result<Vec<TrackInfo>, ResolveError> {
        let _permit = self.rate_limiter.acquire().await.ok();

        info!("📋 Obteniendo playlist: {}", url);

        let output = Command::new("yt-dlp")
            .args([
                "--flat-playlist",
                "--dump-json",
                "--playlist-end",
                &max_items.to_string(),
                "--no-warnings",
                url,
            ])
            .output()
            .await?;

        if !output.status.success() {
            return Err(ResolveError::Tool(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let tracks: Vec<TrackInfo> = stdout
            .lines()
            .filter_map(|line| serde_json::from_str::<YtDlpEntry>(line).ok())
            .map(YtDlpEntry::into_track)
            .collect();

        if tracks.is_empty() {
            return Err(ResolveError::EmptyPlaylist);
        }

        info!("✅ Playlist resuelta: {} videos", tracks.len());
        Ok(tracks)
    }

    /// Obtiene la URL directa del stream de audio
    pub async fn stream_url(&self, url: &str) -> Result<String, ResolveError> {
        let _permit = self.rate_limiter.acquire().await.ok();

        debug!("🎵 Obteniendo URL de stream para: {}", url);

        let output = Command::new("yt-dlp")
            .args([
                "--no-playlist",
                "-f",
                "bestaudio/best",
                "--get-url",
                "--force-ipv4",
                "--geo-bypass",
                "--no-warnings",
                url,
            ])
            .output()
            .await?;

        if !output.status.success() {
            return Err(ResolveError::Tool(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let stream_url = String::from_utf8_lossy(&output.stdout).trim().to_string();

        if stream_url.is_empty() {
            return Err(ResolveError::EmptyStreamUrl);
        }

        Ok(stream_url)
    }

    /// Verifica que yt-dlp esté disponible en el sistema
    pub async fn verify_dependencies(&self) -> Result<(), ResolveError> {
        let output = Command::new("yt-dlp").arg("--version").output().await?;

        if !output.status.success() {
            return Err(ResolveError::Tool("yt-dlp --version falló".to_string()));
        }

        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!("✅ yt-dlp disponible: {}", version);
        Ok(())
    }

    /// Detecta URLs de playlist (parámetro list=)
    pub fn is_playlist_url(raw: &str) -> bool {
        url::Url::parse(raw)
            .map(|parsed| parsed.query_pairs().any(|(key, _)| key == "list"))
            .unwrap_or(false)
    }

    /// Clasifica errores de reproducción como expiración transitoria de stream.
    /// Las URLs directas de audio caducan; un 410/403 se resuelve
    /// re-obteniendo la URL con yt-dlp.
    pub fn is_stream_expired(error_msg: &str) -> bool {
        error_msg.contains("410")
            || error_msg.contains("403")
            || error_msg.to_lowercase().contains("expired")
    }
}

impl Default for StreamResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_playlist_url_detection() {
        assert!(StreamResolver::is_playlist_url(
            "https://www.youtube.com/playlist?list=PLx0sYbCqOb8TBPRdmBHs5Iftvv9TPboYG"
        ));
        assert!(StreamResolver::is_playlist_url(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PLabc123"
        ));
        assert!(!StreamResolver::is_playlist_url(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        ));
        assert!(!StreamResolver::is_playlist_url("lofi list= beats"));
    }

    #[test]
    fn test_stream_expired_classification() {
        assert!(StreamResolver::is_stream_expired("Status code: 410"));
        assert!(StreamResolver::is_stream_expired("HTTP error 403 Forbidden"));
        assert!(StreamResolver::is_stream_expired("signed URL Expired"));
        assert!(!StreamResolver::is_stream_expired("connection reset by peer"));
        assert!(!StreamResolver::is_stream_expired("Status code: 404"));
    }

    #[test]
    fn test_entry_into_track_prefers_webpage_url() {
        let entry: YtDlpEntry = serde_json::from_str(
            r#"{"id":"dQw4w9WgXcQ","title":"Test Video","webpage_url":"https://youtu.be/dQw4w9WgXcQ"}"#,
        )
        .unwrap();
        let track = entry.into_track();
        assert_eq!(track.url, "https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(track.title, "Test Video");
    }

    #[test]
    fn test_entry_into_track_builds_watch_url_from_id() {
        // Las entradas de --flat-playlist suelen traer solo el id
        let entry: YtDlpEntry = serde_json::from_str(r#"{"id":"abc123"}"#).unwrap();
        let track = entry.into_track();
        assert_eq!(track.url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(track.title, "Unknown Title");
    }
}
