use std::collections::HashMap;
use std::sync::Arc;

use crate::{Evaluation, PositionKey};

/// In-memory cache of finished evaluations keyed by position.
///
/// Entries are shared as `Arc`s so callers never see a value change under
/// them. There is no eviction; the coordinator clears the cache when the game
/// context changes.
#[derive(Debug, Default)]
pub struct EvaluationCache {
    entries: HashMap<PositionKey, Arc<Evaluation>>,
}

impl EvaluationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &PositionKey) -> Option<Arc<Evaluation>> {
        self.entries.get(key).cloned()
    }

    /// Store an evaluation, silently replacing any previous one.
    pub fn set(&mut self, key: PositionKey, evaluation: Arc<Evaluation>) {
        self.entries.insert(key, evaluation);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::Score;

    fn key() -> PositionKey {
        PositionKey::new("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1").unwrap()
    }

    fn eval(best: &str, cp: i32) -> Arc<Evaluation> {
        Arc::new(Evaluation {
            best_move: Some(best.into()),
            score: Score::Centipawns(cp),
        })
    }

    #[test]
    fn test_set_and_get_share_the_same_value() {
        let mut cache = EvaluationCache::new();
        assert!(cache.get(&key()).is_none());

        let stored = eval("e7e5", 20);
        cache.set(key(), stored.clone());

        let hit = cache.get(&key()).unwrap();
        assert!(Arc::ptr_eq(&hit, &stored));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_set_overwrites() {
        let mut cache = EvaluationCache::new();
        cache.set(key(), eval("e7e5", 20));
        cache.set(key(), eval("c7c5", 35));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key()).unwrap().best_move.as_deref(), Some("c7c5"));
    }

    #[test]
    fn test_clear() {
        let mut cache = EvaluationCache::new();
        cache.set(key(), eval("e7e5", 20));
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get(&key()).is_none());
    }
}
