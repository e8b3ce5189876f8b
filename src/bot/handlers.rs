use anyhow::Result;
use serenity::{
    builder::{
        CreateInteractionResponse, CreateInteractionResponseMessage, EditInteractionResponse,
    },
    model::{
        application::CommandInteraction,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use std::sync::Arc;
use tracing::info;

use crate::{
    bot::RitmoBot,
    player::{PlaybackSession, QueueItem},
    sources::{radio, StreamResolver},
    ui::embeds,
};

/// Maneja comandos slash
pub async fn handle_command(
    ctx: &Context,
    command: CommandInteraction,
    bot: &RitmoBot,
) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Comando usado fuera de un servidor"))?;

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    match command.data.name.as_str() {
        "play" => handle_play(ctx, command, bot).await?,
        "queue" => handle_queue(ctx, command, bot).await?,
        "skip" => handle_skip(ctx, command, bot).await?,
        "stop" => handle_stop(ctx, command, bot).await?,
        "join" => handle_join(ctx, command, bot).await?,
        "clear" => handle_clear(ctx, command, bot).await?,
        "radio" => handle_radio(ctx, command, bot).await?,
        "help" => handle_help(ctx, command).await?,
        _ => {
            respond_text(ctx, &command, "❌ Comando no reconocido", true).await?;
        }
    }

    Ok(())
}

// Handlers específicos para cada comando

async fn handle_play(ctx: &Context, command: CommandInteraction, bot: &RitmoBot) -> Result<()> {
    let guild_id = command.guild_id.unwrap();
    let query = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "query")
        .and_then(|opt| opt.value.as_str())
        .ok_or_else(|| anyhow::anyhow!("Query no proporcionado"))?
        .to_string();

    // Defer la respuesta ya que resolver con yt-dlp puede tomar tiempo
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;

    // Verificar que el usuario esté en un canal de voz
    let voice_channel_id = match get_user_voice_channel(ctx, guild_id, command.user.id) {
        Ok(id) => id,
        Err(_) => {
            command
                .edit_response(
                    &ctx.http,
                    EditInteractionResponse::new()
                        .content("❌ Debes estar en un canal de voz para usar este comando"),
                )
                .await?;
            return Ok(());
        }
    };

    let session = connect_session(ctx, bot, guild_id, voice_channel_id).await?;

    if StreamResolver::is_playlist_url(&query) {
        // URL de playlist: expandir y encolar en bloque
        info!("🔗 Playlist detectada: {}", query);

        let tracks = match bot
            .registry
            .resolver()
            .playlist_items(&query, bot.config.max_playlist_size)
            .await
        {
            Ok(tracks) => tracks,
            Err(e) => {
                command
                    .edit_response(
                        &ctx.http,
                        EditInteractionResponse::new().content(format!("❌ {}", e)),
                    )
                    .await?;
                return Ok(());
            }
        };

        let items: Vec<QueueItem> = tracks
            .into_iter()
            .map(|track| QueueItem::new(track, command.user.id))
            .collect();

        let added = session.enqueue_all(items);
        session.ensure_playing().await?;

        command
            .edit_response(
                &ctx.http,
                EditInteractionResponse::new()
                    .embed(embeds::create_playlist_added_embed(added, &query)),
            )
            .await?;
    } else {
        // URL suelta o término de búsqueda
        let track = match bot.registry.resolver().resolve_query(&query).await {
            Ok(track) => track,
            Err(e) => {
                command
                    .edit_response(
                        &ctx.http,
                        EditInteractionResponse::new().content(format!("❌ {}", e)),
                    )
                    .await?;
                return Ok(());
            }
        };
        let item = QueueItem::new(track, command.user.id);
        let embed = embeds::create_track_added_embed(&item);

        if let Err(e) = session.enqueue(item) {
            command
                .edit_response(
                    &ctx.http,
                    EditInteractionResponse::new().content(format!("❌ {}", e)),
                )
                .await?;
            return Ok(());
        }

        session.ensure_playing().await?;

        command
            .edit_response(&ctx.http, EditInteractionResponse::new().embed(embed))
            .await?;
    }

    Ok(())
}

async fn handle_queue(ctx: &Context, command: CommandInteraction, bot: &RitmoBot) -> Result<()> {
    let guild_id = command.guild_id.unwrap();

    let (now_playing, items) = match bot.registry.get(guild_id) {
        Some(session) => (session.now_playing_title(), session.queue_snapshot()),
        None => (None, Vec::new()),
    };

    let embed = embeds::create_queue_embed(now_playing.as_deref(), &items);

    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().embed(embed),
            ),
        )
        .await?;

    Ok(())
}

async fn handle_skip(ctx: &Context, command: CommandInteraction, bot: &RitmoBot) -> Result<()> {
    let guild_id = command.guild_id.unwrap();

    match bot.registry.get(guild_id) {
        Some(session) if session.is_playing() => {
            session.skip()?;
            respond_text(ctx, &command, "⏭️ Saltando a la siguiente canción", false).await?;
        }
        _ => {
            respond_text(ctx, &command, "❌ No hay música reproduciéndose", true).await?;
        }
    }

    Ok(())
}

async fn handle_stop(ctx: &Context, command: CommandInteraction, bot: &RitmoBot) -> Result<()> {
    let guild_id = command.guild_id.unwrap();

    if bot.registry.get(guild_id).is_none() {
        respond_text(ctx, &command, "❌ No hay música reproduciéndose", true).await?;
        return Ok(());
    }

    bot.registry.disconnect(guild_id).await?;
    respond_text(ctx, &command, "⏹️ Reproducción detenida y cola limpiada", false).await?;

    Ok(())
}

async fn handle_join(ctx: &Context, command: CommandInteraction, bot: &RitmoBot) -> Result<()> {
    let guild_id = command.guild_id.unwrap();

    let voice_channel_id = match get_user_voice_channel(ctx, guild_id, command.user.id) {
        Ok(id) => id,
        Err(_) => {
            respond_text(
                ctx,
                &command,
                "❌ Debes estar en un canal de voz para usar este comando",
                true,
            )
            .await?;
            return Ok(());
        }
    };

    connect_session(ctx, bot, guild_id, voice_channel_id).await?;
    respond_text(ctx, &command, "🔊 Conectado al canal de voz", false).await?;

    Ok(())
}

async fn handle_clear(ctx: &Context, command: CommandInteraction, bot: &RitmoBot) -> Result<()> {
    let guild_id = command.guild_id.unwrap();

    match bot.registry.get(guild_id) {
        Some(session) => {
            session.clear();
            respond_text(ctx, &command, "🧹 Cola limpiada", false).await?;
        }
        None => {
            respond_text(ctx, &command, "❌ No hay una sesión activa", true).await?;
        }
    }

    Ok(())
}

async fn handle_radio(ctx: &Context, command: CommandInteraction, bot: &RitmoBot) -> Result<()> {
    let guild_id = command.guild_id.unwrap();
    let station_name = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "station")
        .and_then(|opt| opt.value.as_str())
        .ok_or_else(|| anyhow::anyhow!("Estación no proporcionada"))?;

    let Some(station) = radio::find_station(station_name) else {
        respond_text(
            ctx,
            &command,
            &format!(
                "❌ Estación \"{}\" no encontrada. Disponibles:\n{}",
                station_name,
                radio::available_stations()
            ),
            true,
        )
        .await?;
        return Ok(());
    };

    let voice_channel_id = match get_user_voice_channel(ctx, guild_id, command.user.id) {
        Ok(id) => id,
        Err(_) => {
            respond_text(
                ctx,
                &command,
                "❌ Debes estar en un canal de voz para usar este comando",
                true,
            )
            .await?;
            return Ok(());
        }
    };

    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;

    let session = connect_session(ctx, bot, guild_id, voice_channel_id).await?;
    session.play_radio(station).await?;

    command
        .edit_response(
            &ctx.http,
            EditInteractionResponse::new().embed(embeds::create_radio_embed(&station)),
        )
        .await?;

    Ok(())
}

async fn handle_help(ctx: &Context, command: CommandInteraction) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .embed(embeds::create_help_embed())
                    .ephemeral(true),
            ),
        )
        .await?;

    Ok(())
}

// Funciones auxiliares

async fn respond_text(
    ctx: &Context,
    command: &CommandInteraction,
    content: &str,
    ephemeral: bool,
) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(ephemeral),
            ),
        )
        .await?;

    Ok(())
}

/// Conecta (o reutiliza) la sesión de la guild en el canal del usuario
async fn connect_session(
    ctx: &Context,
    bot: &RitmoBot,
    guild_id: GuildId,
    channel_id: ChannelId,
) -> Result<Arc<PlaybackSession>> {
    let songbird = songbird::get(ctx)
        .await
        .ok_or_else(|| anyhow::anyhow!("Songbird no inicializado"))?;

    bot.registry.connect(songbird, guild_id, channel_id).await
}

fn get_user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Result<ChannelId> {
    let guild = guild_id
        .to_guild_cached(&ctx.cache)
        .ok_or_else(|| anyhow::anyhow!("Guild no encontrada en caché"))?;

    let channel_id = guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
        .ok_or_else(|| anyhow::anyhow!("Debes estar en un canal de voz"))?;

    Ok(channel_id)
}
