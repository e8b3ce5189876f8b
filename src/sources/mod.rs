pub mod radio;
pub mod ytdlp;

pub use radio::RadioStation;
pub use ytdlp::StreamResolver;

use thiserror::Error;

/// Track resuelto desde una fuente externa, listo para encolar
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub url: String,
    pub title: String,
}

impl TrackInfo {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
        }
    }
}

/// Errores de resolución de streams vía yt-dlp
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("yt-dlp falló: {0}")]
    Tool(String),

    #[error("no se encontraron resultados para la búsqueda")]
    NoResults,

    #[error("la playlist no contiene videos")]
    EmptyPlaylist,

    #[error("no se pudo obtener URL de stream")]
    EmptyStreamUrl,

    #[error("respuesta de yt-dlp inválida: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no se pudo ejecutar yt-dlp: {0}")]
    Io(#[from] std::io::Error),
}
