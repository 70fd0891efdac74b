use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::classifier::SpeechError;

/// Speech recognizer that emits SenseVoice-style tagged transcripts
pub trait Transcriber: Send + Sync {
    fn name(&self) -> &str;

    /// Transcribe mono samples. Returns zero or more transcript entries.
    fn transcribe(&self, samples: &[f32], sample_rate: u32) -> Result<Vec<String>, SpeechError>;
}

/// Transcriber that hears nothing: one untagged, empty transcript
#[derive(Debug, Default, Clone, Copy)]
pub struct StubTranscriber;

impl Transcriber for StubTranscriber {
    fn name(&self) -> &str {
        "stub"
    }

    fn transcribe(&self, _samples: &[f32], _sample_rate: u32) -> Result<Vec<String>, SpeechError> {
        Ok(vec![String::new()])
    }
}

/// Factory invoked to load the transcriber on first use
pub type TranscriberLoader =
    Box<dyn Fn() -> Result<Arc<dyn Transcriber>, SpeechError> + Send + Sync>;

/// Time a failed load is remembered before the loader is called again
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(10);

#[derive(Default)]
struct Slot {
    model: Option<Arc<dyn Transcriber>>,
    last_failure: Option<(Instant, String)>,
}

/// Process-wide transcriber, loaded on first use.
///
/// The slot lock is held across the load, so concurrent first callers wait
/// for a single initialization. A failed load leaves the slot empty; callers
/// within `retry_backoff` of the failure get the same error without waiting
/// on the loader again.
pub struct LazyModel {
    loader: TranscriberLoader,
    slot: Mutex<Slot>,
    retry_backoff: Duration,
}

impl LazyModel {
    pub fn new(loader: TranscriberLoader) -> Self {
        Self::with_retry_backoff(loader, DEFAULT_RETRY_BACKOFF)
    }

    pub fn with_retry_backoff(loader: TranscriberLoader, retry_backoff: Duration) -> Self {
        Self {
            loader,
            slot: Mutex::new(Slot::default()),
            retry_backoff,
        }
    }

    /// Already-loaded transcriber, never triggers a load
    pub fn preloaded(transcriber: Arc<dyn Transcriber>) -> Self {
        let model = Self::new(Box::new(|| {
            Err(SpeechError::ModelLoadError("no loader configured".to_string()))
        }));
        if let Ok(mut slot) = model.slot.lock() {
            slot.model = Some(transcriber);
        }
        model
    }

    /// Get the transcriber, loading it if this is the first use
    pub fn get(&self) -> Result<Arc<dyn Transcriber>, SpeechError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| SpeechError::ModelLoadError("model lock poisoned".to_string()))?;

        if let Some(model) = slot.model.as_ref() {
            return Ok(Arc::clone(model));
        }

        if let Some((failed_at, reason)) = slot.last_failure.as_ref() {
            if failed_at.elapsed() < self.retry_backoff {
                return Err(SpeechError::ModelLoadError(reason.clone()));
            }
        }

        let start = Instant::now();
        let model = match (self.loader)() {
            Ok(model) => model,
            Err(e) => {
                let reason = match &e {
                    SpeechError::ModelLoadError(msg) => msg.clone(),
                    other => other.to_string(),
                };
                warn!(
                    "Speech model load failed, next attempt in {:?}: {}",
                    self.retry_backoff, reason
                );
                slot.last_failure = Some((Instant::now(), reason));
                return Err(e);
            }
        };
        info!(
            "Speech model '{}' loaded in {:?}",
            model.name(),
            start.elapsed()
        );

        slot.model = Some(Arc::clone(&model));
        slot.last_failure = None;
        Ok(model)
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.lock().map(|s| s.model.is_some()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn counting_loader(calls: Arc<AtomicUsize>, delay: Duration) -> TranscriberLoader {
        Box::new(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(delay);
            Ok(Arc::new(StubTranscriber) as Arc<dyn Transcriber>)
        })
    }

    #[test]
    fn test_not_loaded_until_first_use() {
        let calls = Arc::new(AtomicUsize::new(0));
        let model = LazyModel::new(counting_loader(calls.clone(), Duration::ZERO));
        assert!(!model.is_loaded());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        model.get().unwrap();
        assert!(model.is_loaded());
        model.get().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_first_use_loads_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let model = Arc::new(LazyModel::new(counting_loader(
            calls.clone(),
            Duration::from_millis(50),
        )));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let model = Arc::clone(&model);
                std::thread::spawn(move || model.get().map(|m| m.name().to_string()))
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), "stub");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_load_is_retried() {
        let fail = Arc::new(AtomicBool::new(true));
        let fail_flag = fail.clone();
        let model = LazyModel::with_retry_backoff(
            Box::new(move || {
                if fail_flag.load(Ordering::SeqCst) {
                    Err(SpeechError::ModelLoadError("weights missing".to_string()))
                } else {
                    Ok(Arc::new(StubTranscriber) as Arc<dyn Transcriber>)
                }
            }),
            Duration::ZERO,
        );

        assert!(matches!(model.get(), Err(SpeechError::ModelLoadError(_))));
        assert!(!model.is_loaded());

        fail.store(false, Ordering::SeqCst);
        assert!(model.get().is_ok());
        assert!(model.is_loaded());
    }

    #[test]
    fn test_failed_load_backs_off() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let model = LazyModel::with_retry_backoff(
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SpeechError::ModelLoadError("server unreachable".to_string()))
            }),
            Duration::from_millis(50),
        );

        assert!(model.get().is_err());
        match model.get() {
            Err(SpeechError::ModelLoadError(reason)) => assert_eq!(reason, "server unreachable"),
            other => panic!("expected ModelLoadError, got {:?}", other.map(|m| m.name().to_string())),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        std::thread::sleep(Duration::from_millis(60));
        assert!(model.get().is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_callers_share_failed_load() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let model = Arc::new(LazyModel::with_retry_backoff(
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(50));
                Err(SpeechError::ModelLoadError("health check timed out".to_string()))
            }),
            Duration::from_secs(60),
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let model = Arc::clone(&model);
                std::thread::spawn(move || model.get().is_err())
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!model.is_loaded());
    }

    #[test]
    fn test_preloaded() {
        let model = LazyModel::preloaded(Arc::new(StubTranscriber));
        assert!(model.is_loaded());
        assert_eq!(model.get().unwrap().name(), "stub");
    }

    #[test]
    fn test_stub_returns_single_empty_transcript() {
        let out = StubTranscriber.transcribe(&[0.0; 16], 16000).unwrap();
        assert_eq!(out, vec![String::new()]);
    }
}
