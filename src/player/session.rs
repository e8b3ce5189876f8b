use anyhow::Result;
use serenity::model::id::GuildId;
use songbird::{
    input::{HttpRequest, Input},
    tracks::{PlayMode, TrackHandle, TrackState},
    Call, Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    player::queue::{QueueItem, TrackQueue},
    sources::{RadioStation, StreamResolver},
};

/// Qué está sonando en la sesión
#[derive(Debug, Clone)]
pub enum PlayingKind {
    Track(QueueItem),
    Radio(RadioStation),
}

struct NowPlaying {
    kind: PlayingKind,
    handle: TrackHandle,
    // Un track solo se reintenta una vez tras expirar su stream
    retried: bool,
}

/// Decisión de la máquina de estados ante el fin de un track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackAction {
    /// Re-resolver el stream y reproducir el mismo track en su lugar
    Retry,
    /// Pasar al siguiente track de la cola
    Advance,
}

/// Solo los tracks de cola admiten reintento, una única vez, y solo
/// cuando el error fue una expiración transitoria del stream.
fn next_action(kind: &PlayingKind, retried: bool, expired: bool) -> TrackAction {
    match kind {
        PlayingKind::Track(_) if expired && !retried => TrackAction::Retry,
        _ => TrackAction::Advance,
    }
}

/// Sesión de reproducción por guild: una conexión de voz y un
/// track activo como máximo. Reemplaza el estado global del diseño
/// original por un objeto inyectado desde el registro de sesiones.
pub struct PlaybackSession {
    guild_id: GuildId,
    songbird: Arc<Songbird>,
    call: Arc<Mutex<Call>>,
    queue: parking_lot::Mutex<TrackQueue>,
    current: parking_lot::Mutex<Option<NowPlaying>>,
    resolver: Arc<StreamResolver>,
    http: reqwest::Client,
    volume: f32,
    ended: AtomicBool,
    // Un solo avance de cola a la vez; mientras se resuelve el stream
    // del siguiente track, current está vacío y otro comando podría
    // disparar un segundo avance sobre la misma llamada
    advancing: AtomicBool,
}

impl PlaybackSession {
    pub fn new(
        guild_id: GuildId,
        songbird: Arc<Songbird>,
        call: Arc<Mutex<Call>>,
        resolver: Arc<StreamResolver>,
        http: reqwest::Client,
        volume: f32,
        max_queue_size: usize,
    ) -> Self {
        Self {
            guild_id,
            songbird,
            call,
            queue: parking_lot::Mutex::new(TrackQueue::new(max_queue_size)),
            current: parking_lot::Mutex::new(None),
            resolver,
            http,
            volume,
            ended: AtomicBool::new(false),
            advancing: AtomicBool::new(false),
        }
    }

    /// La sesión terminó (stop explícito o cola vacía); su conexión
    /// de voz ya no es válida y el registro debe crear una nueva.
    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    pub fn mark_ended(&self) {
        self.ended.store(true, Ordering::SeqCst);
    }

    pub fn is_playing(&self) -> bool {
        self.current.lock().is_some()
    }

    /// Título de lo que suena actualmente, si hay algo
    pub fn now_playing_title(&self) -> Option<String> {
        self.current.lock().as_ref().map(|np| match &np.kind {
            PlayingKind::Track(item) => item.title.clone(),
            PlayingKind::Radio(station) => format!("📻 {}", station.name),
        })
    }

    /// Agrega un track a la cola
    pub fn enqueue(&self, item: QueueItem) -> Result<()> {
        self.queue.lock().push(item)
    }

    /// Agrega una playlist completa; devuelve cuántos tracks entraron
    pub fn enqueue_all(&self, items: Vec<QueueItem>) -> usize {
        self.queue.lock().push_many(items)
    }

    /// Copia de los tracks pendientes
    pub fn queue_snapshot(&self) -> Vec<QueueItem> {
        self.queue.lock().snapshot()
    }

    /// Arranca la reproducción si no hay nada sonando
    pub async fn ensure_playing(self: &Arc<Self>) -> Result<()> {
        if !self.is_playing() {
            self.play_next().await?;
        }
        Ok(())
    }

    /// Salta el track actual; el evento de fin avanza la cola
    pub fn skip(&self) -> Result<()> {
        let current = self.current.lock();
        match current.as_ref() {
            Some(np) => {
                let _ = np.handle.stop();
                info!("⏭️ Track saltado en guild {}", self.guild_id);
                Ok(())
            }
            None => anyhow::bail!("No hay nada reproduciéndose"),
        }
    }

    /// Vacía la cola y detiene el track actual. La sesión pasa a Idle:
    /// el evento de fin encuentra la cola vacía y libera la conexión.
    pub fn clear(&self) -> usize {
        let removed = self.queue.lock().clear();

        if let Some(np) = self.current.lock().as_ref() {
            let _ = np.handle.stop();
        }

        removed
    }

    /// Detiene todo y libera la conexión de voz inmediatamente
    pub async fn stop(&self) -> Result<()> {
        self.queue.lock().clear();

        // current se vacía primero para que el evento End del track
        // detenido no dispare otro avance
        if let Some(np) = self.current.lock().take() {
            let _ = np.handle.stop();
        }

        self.mark_ended();
        self.songbird.remove(self.guild_id).await?;

        info!("⏹️ Reproducción detenida en guild {}", self.guild_id);
        Ok(())
    }

    /// Sintoniza una estación de radio, reemplazando lo que suene
    pub async fn play_radio(self: &Arc<Self>, station: RadioStation) -> Result<()> {
        info!("📻 Sintonizando: {}", station.name);

        // Detener lo actual sin disparar avance (el uuid ya no coincidirá)
        if let Some(np) = self.current.lock().take() {
            let _ = np.handle.stop();
        }

        let input: Input = HttpRequest::new(self.http.clone(), station.url.to_string()).into();
        let handle = self.start_input(input).await?;

        *self.current.lock() = Some(NowPlaying {
            kind: PlayingKind::Radio(station),
            handle,
            retried: false,
        });

        Ok(())
    }

    /// Avanza la cola: saca el siguiente track y lo reproduce, o libera
    /// la conexión si no queda nada.
    async fn play_next(self: &Arc<Self>) -> Result<()> {
        if self.advancing.swap(true, Ordering::SeqCst) {
            debug!("Avance ya en curso en guild {}, ignorado", self.guild_id);
            return Ok(());
        }

        let result = self.advance_queue().await;
        self.advancing.store(false, Ordering::SeqCst);
        result
    }

    async fn advance_queue(self: &Arc<Self>) -> Result<()> {
        loop {
            let next = self.queue.lock().pop_next();

            let Some(item) = next else {
                info!("📭 Cola vacía en guild {}, liberando conexión", self.guild_id);
                self.mark_ended();
                if let Err(e) = self.songbird.remove(self.guild_id).await {
                    debug!("Conexión ya liberada: {:?}", e);
                }
                return Ok(());
            };

            // Resolver la URL del stream; si falla, saltar al siguiente
            let stream_url = match self.resolver.stream_url(&item.url).await {
                Ok(url) => url,
                Err(e) => {
                    warn!("❌ No se pudo resolver '{}', saltando: {}", item.title, e);
                    continue;
                }
            };

            info!("🎵 Reproduciendo: {}", item.title);

            let input: Input = HttpRequest::new(self.http.clone(), stream_url).into();
            let handle = self.start_input(input).await?;

            *self.current.lock() = Some(NowPlaying {
                kind: PlayingKind::Track(item),
                handle,
                retried: false,
            });

            return Ok(());
        }
    }

    /// Reproduce un input en la llamada de voz y registra los eventos
    /// de fin y error de la sesión.
    async fn start_input(self: &Arc<Self>, input: Input) -> Result<TrackHandle> {
        let handle = {
            let mut call = self.call.lock().await;
            call.play_input(input)
        };

        let _ = handle.set_volume(self.volume);

        handle
            .add_event(
                Event::Track(TrackEvent::End),
                SessionEvents {
                    session: self.clone(),
                },
            )
            .map_err(|e| anyhow::anyhow!("Error al registrar evento End: {}", e))?;

        handle
            .add_event(
                Event::Track(TrackEvent::Error),
                SessionEvents {
                    session: self.clone(),
                },
            )
            .map_err(|e| anyhow::anyhow!("Error al registrar evento Error: {}", e))?;

        Ok(handle)
    }

    /// Transición de la máquina de estados ante un evento de track.
    async fn on_track_event(self: &Arc<Self>, state: &TrackState, handle: &TrackHandle) {
        // Ignorar eventos de tracks que ya no son el actual (saltados,
        // reemplazados por radio, o detenidos por stop)
        let is_current = self
            .current
            .lock()
            .as_ref()
            .map(|np| np.handle.uuid() == handle.uuid())
            .unwrap_or(false);

        if !is_current {
            debug!("Evento de track obsoleto en guild {}, ignorado", self.guild_id);
            return;
        }

        if let PlayMode::Errored(e) = &state.playing {
            let error_msg = e.to_string();
            error!("❌ Error de reproducción: {}", error_msg);

            let expired = StreamResolver::is_stream_expired(&error_msg);
            let retry_item = {
                let current = self.current.lock();
                current.as_ref().and_then(|np| {
                    match (next_action(&np.kind, np.retried, expired), &np.kind) {
                        (TrackAction::Retry, PlayingKind::Track(item)) => Some(item.clone()),
                        _ => None,
                    }
                })
            };

            if let Some(item) = retry_item {
                info!("🔄 Stream expirado, reintentando: {}", item.title);
                match self.retry_current(&item).await {
                    Ok(()) => return,
                    Err(retry_err) => {
                        warn!("❌ Reintento falló para '{}': {}", item.title, retry_err);
                    }
                }
            }
        } else {
            debug!("⏸️ Track terminado en guild {}", self.guild_id);
        }

        // Fin normal, stop, o error no recuperable: avanzar
        self.current.lock().take();
        if let Err(e) = self.play_next().await {
            error!("Error al reproducir siguiente track: {:?}", e);
        }
    }

    /// Re-resuelve la URL del stream y reproduce el mismo track en el
    /// mismo lugar de la cola.
    async fn retry_current(self: &Arc<Self>, item: &QueueItem) -> Result<()> {
        let stream_url = self.resolver.stream_url(&item.url).await?;

        let input: Input = HttpRequest::new(self.http.clone(), stream_url).into();
        let handle = self.start_input(input).await?;

        *self.current.lock() = Some(NowPlaying {
            kind: PlayingKind::Track(item.clone()),
            handle,
            retried: true,
        });

        Ok(())
    }
}

/// Handler de eventos de songbird para la sesión
struct SessionEvents {
    session: Arc<PlaybackSession>,
}

#[async_trait::async_trait]
impl VoiceEventHandler for SessionEvents {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track(tracks) = ctx {
            for (state, handle) in *tracks {
                self.session.on_track_event(state, handle).await;
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{radio, TrackInfo};
    use serenity::model::id::UserId;

    fn item(title: &str) -> QueueItem {
        QueueItem::new(
            TrackInfo::new(format!("https://example.com/{title}"), title),
            UserId::new(1),
        )
    }

    fn test_session() -> Arc<PlaybackSession> {
        let songbird = Songbird::serenity();
        songbird.initialise_client_data(1, UserId::new(1));
        let guild_id = GuildId::new(99);
        let call = songbird.get_or_insert(guild_id);

        Arc::new(PlaybackSession::new(
            guild_id,
            songbird,
            call,
            Arc::new(StreamResolver::new()),
            reqwest::Client::new(),
            0.5,
            4,
        ))
    }

    #[test]
    fn test_expired_track_is_retried_once() {
        let kind = PlayingKind::Track(item("cancion"));

        // Primer error por stream expirado: reintento en el mismo lugar
        assert_eq!(next_action(&kind, false, true), TrackAction::Retry);
        // Segundo error del mismo track: avanzar
        assert_eq!(next_action(&kind, true, true), TrackAction::Advance);
    }

    #[test]
    fn test_radio_errors_never_retry() {
        let kind = PlayingKind::Radio(radio::STATIONS[0]);

        assert_eq!(next_action(&kind, false, true), TrackAction::Advance);
        assert_eq!(next_action(&kind, false, false), TrackAction::Advance);
    }

    #[test]
    fn test_non_expiry_error_advances() {
        let kind = PlayingKind::Track(item("cancion"));

        assert_eq!(next_action(&kind, false, false), TrackAction::Advance);
    }

    #[tokio::test]
    async fn test_empty_queue_transitions_to_idle() {
        let session = test_session();

        // Sin tracks pendientes, el avance libera la sesión
        session.ensure_playing().await.unwrap();

        assert!(session.is_ended());
        assert!(!session.is_playing());
    }

    #[tokio::test]
    async fn test_enqueue_respects_capacity() {
        let session = test_session();

        for i in 0..4 {
            session.enqueue(item(&format!("track-{i}"))).unwrap();
        }
        assert!(session.enqueue(item("desbordada")).is_err());
        assert_eq!(session.queue_snapshot().len(), 4);
    }

    #[tokio::test]
    async fn test_clear_empties_queue_without_panicking_when_idle() {
        let session = test_session();

        session.enqueue(item("a")).unwrap();
        session.enqueue(item("b")).unwrap();

        assert_eq!(session.clear(), 2);
        assert!(session.queue_snapshot().is_empty());
        assert_eq!(session.clear(), 0);
    }
}
