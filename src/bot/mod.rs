//! Implementación del bot de Discord.
//!
//! [`RitmoBot`] implementa el [`EventHandler`] de Serenity y conecta el
//! sistema de interacciones con el registro de sesiones de reproducción.

pub mod commands;
pub mod handlers;

use serenity::{
    all::{Context, EventHandler, GuildId, Interaction, Ready, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{config::Config, player::SessionRegistry};

pub struct RitmoBot {
    /// Configuración cargada desde variables de entorno
    config: Arc<Config>,
    /// Registro de sesiones: una sesión de voz/reproductor por guild
    pub registry: Arc<SessionRegistry>,
}

impl RitmoBot {
    pub fn new(config: Config) -> Self {
        let registry = Arc::new(SessionRegistry::new(&config));

        Self {
            config: Arc::new(config),
            registry,
        }
    }

    /// Registra los comandos slash, globales o por guild según config
    async fn register_commands(&self, ctx: &Context) -> anyhow::Result<()> {
        info!("📝 Registrando comandos slash...");

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::from(guild_id);
                info!("🏠 Registrando comandos para guild de desarrollo: {}", guild_id);

                if !ctx.cache.guilds().contains(&guild_id) {
                    warn!("⚠️ El bot no está en la guild especificada: {}", guild_id);
                    return Ok(());
                }

                commands::register_guild_commands(ctx, guild_id).await?;
                info!("✅ Comandos de guild registrados");
            }
            None => {
                info!("🌐 Registrando comandos globalmente");
                commands::register_global_commands(ctx).await?;
                info!("✅ Comandos globales registrados");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for RitmoBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }

        // Verificar yt-dlp al arrancar; los errores en runtime se
        // manejan por track
        let resolver = self.registry.resolver().clone();
        tokio::spawn(async move {
            if let Err(e) = resolver.verify_dependencies().await {
                warn!("⚠️ yt-dlp no disponible: {}", e);
            }
        });
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            if let Err(e) = handlers::handle_command(&ctx, command, self).await {
                error!("Error manejando comando: {:?}", e);
            }
        }
    }

    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        // Detectar si el bot fue desconectado del canal de voz
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id == current_user_id && old.is_some() && new.channel_id.is_none() {
            if let Some(guild_id) = new.guild_id {
                info!("🔌 Bot desconectado en guild {}", guild_id);
                self.registry.handle_forced_disconnect(guild_id);
            }
        }
    }
}
