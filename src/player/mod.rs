//! Control de reproducción por guild.
//!
//! El registro de sesiones es el dueño de todas las sesiones activas y
//! garantiza la invariante de una sola conexión/reproductor por guild.

pub mod queue;
pub mod session;

pub use queue::QueueItem;
pub use session::PlaybackSession;

use anyhow::Result;
use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use songbird::Songbird;
use std::sync::Arc;
use tracing::info;

use crate::{config::Config, sources::StreamResolver};

/// Registro de sesiones de reproducción: guild → sesión activa
pub struct SessionRegistry {
    sessions: DashMap<GuildId, Arc<PlaybackSession>>,
    resolver: Arc<StreamResolver>,
    http: reqwest::Client,
    default_volume: f32,
    max_queue_size: usize,
}

impl SessionRegistry {
    pub fn new(config: &Config) -> Self {
        Self {
            sessions: DashMap::new(),
            resolver: Arc::new(StreamResolver::new()),
            http: reqwest::Client::new(),
            default_volume: config.default_volume,
            max_queue_size: config.max_queue_size,
        }
    }

    pub fn resolver(&self) -> &Arc<StreamResolver> {
        &self.resolver
    }

    /// Sesión activa de una guild, si existe
    pub fn get(&self, guild_id: GuildId) -> Option<Arc<PlaybackSession>> {
        self.sessions
            .get(&guild_id)
            .map(|s| s.clone())
            .filter(|s| !s.is_ended())
    }

    /// Conecta al canal de voz y devuelve la sesión de la guild,
    /// creándola si no existe o si la anterior ya terminó.
    pub async fn connect(
        &self,
        songbird: Arc<Songbird>,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<PlaybackSession>> {
        if let Some(session) = self.get(guild_id) {
            // Reutilizar la sesión viva; join es idempotente si ya
            // estamos en el canal
            songbird.join(guild_id, channel_id).await?;
            return Ok(session);
        }

        let call = songbird.join(guild_id, channel_id).await?;
        info!("🔊 Conectado al canal de voz en guild {}", guild_id);

        let session = Arc::new(PlaybackSession::new(
            guild_id,
            songbird,
            call,
            self.resolver.clone(),
            self.http.clone(),
            self.default_volume,
            self.max_queue_size,
        ));

        self.sessions.insert(guild_id, session.clone());
        Ok(session)
    }

    /// Detiene la sesión y la elimina del registro (comando /stop)
    pub async fn disconnect(&self, guild_id: GuildId) -> Result<()> {
        if let Some((_, session)) = self.sessions.remove(&guild_id) {
            session.stop().await?;
        }
        Ok(())
    }

    /// Limpieza cuando el bot fue expulsado del canal de voz
    pub fn handle_forced_disconnect(&self, guild_id: GuildId) {
        if let Some((_, session)) = self.sessions.remove(&guild_id) {
            session.mark_ended();
            info!("🔌 Sesión eliminada tras desconexión forzada en guild {}", guild_id);
        }
    }
}
