use anyhow::Result;
use chrono::{DateTime, Utc};
use serenity::model::id::UserId;
use std::collections::VecDeque;
use tracing::info;

use crate::sources::TrackInfo;

/// Track pendiente en la cola de reproducción
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub url: String,
    pub title: String,
    pub requested_by: UserId,
    pub added_at: DateTime<Utc>,
}

impl QueueItem {
    pub fn new(track: TrackInfo, requested_by: UserId) -> Self {
        Self {
            url: track.url,
            title: track.title,
            requested_by,
            added_at: Utc::now(),
        }
    }
}

/// Cola FIFO de tracks pendientes, con tamaño máximo
#[derive(Debug)]
pub struct TrackQueue {
    items: VecDeque<QueueItem>,
    max_size: usize,
}

impl TrackQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            items: VecDeque::new(),
            max_size,
        }
    }

    /// Agrega un track al final de la cola
    pub fn push(&mut self, item: QueueItem) -> Result<()> {
        if self.items.len() >= self.max_size {
            anyhow::bail!("La cola está llena (máximo {} canciones)", self.max_size);
        }

        info!("➕ Agregado a la cola: {}", item.title);
        self.items.push_back(item);

        Ok(())
    }

    /// Agrega múltiples tracks (playlist); devuelve cuántos entraron
    pub fn push_many(&mut self, items: Vec<QueueItem>) -> usize {
        let available_space = self.max_size.saturating_sub(self.items.len());
        let to_add = items.len().min(available_space);

        for item in items.into_iter().take(to_add) {
            self.items.push_back(item);
        }

        info!("➕ Agregadas {} canciones a la cola", to_add);
        to_add
    }

    /// Obtiene el siguiente track (FIFO)
    pub fn pop_next(&mut self) -> Option<QueueItem> {
        let next = self.items.pop_front();
        if let Some(ref item) = next {
            info!("➡️ Siguiente en cola: {}", item.title);
        }
        next
    }

    /// Vacía la cola; devuelve cuántos tracks se descartaron
    pub fn clear(&mut self) -> usize {
        let removed = self.items.len();
        self.items.clear();
        if removed > 0 {
            info!("🗑️ Cola limpiada ({} canciones)", removed);
        }
        removed
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Copia de los tracks pendientes, en orden
    pub fn snapshot(&self) -> Vec<QueueItem> {
        self.items.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(title: &str) -> QueueItem {
        QueueItem::new(
            TrackInfo::new(format!("https://example.com/{title}"), title),
            UserId::new(1),
        )
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = TrackQueue::new(10);
        queue.push(item("primera")).unwrap();
        queue.push(item("segunda")).unwrap();
        queue.push(item("tercera")).unwrap();

        assert_eq!(queue.pop_next().unwrap().title, "primera");
        assert_eq!(queue.pop_next().unwrap().title, "segunda");
        assert_eq!(queue.pop_next().unwrap().title, "tercera");
        assert!(queue.pop_next().is_none());
    }

    #[test]
    fn test_push_rejects_when_full() {
        let mut queue = TrackQueue::new(2);
        queue.push(item("a")).unwrap();
        queue.push(item("b")).unwrap();
        assert!(queue.push(item("c")).is_err());
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_push_many_truncates_to_capacity() {
        let mut queue = TrackQueue::new(3);
        queue.push(item("ya-encolada")).unwrap();

        let added = queue.push_many(vec![item("a"), item("b"), item("c"), item("d")]);
        assert_eq!(added, 2);
        assert_eq!(queue.len(), 3);

        // El orden FIFO se mantiene tras el push masivo
        assert_eq!(queue.pop_next().unwrap().title, "ya-encolada");
        assert_eq!(queue.pop_next().unwrap().title, "a");
    }

    #[test]
    fn test_clear_reports_discarded() {
        let mut queue = TrackQueue::new(10);
        queue.push(item("a")).unwrap();
        queue.push(item("b")).unwrap();

        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
        assert_eq!(queue.clear(), 0);
    }

    #[test]
    fn test_snapshot_preserves_order() {
        let mut queue = TrackQueue::new(10);
        queue.push(item("a")).unwrap();
        queue.push(item("b")).unwrap();

        let snapshot = queue.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].title, "a");
        assert_eq!(snapshot[1].title, "b");
        // La cola no se consume al listar
        assert_eq!(queue.len(), 2);
    }
}
