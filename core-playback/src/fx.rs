//! Entry point that owns the host capabilities and the shared buffer cache.

use crate::cache::BufferCache;
use crate::config::SoundOptions;
use crate::error::Result;
use crate::sound::{Sound, SoundCallback};
use bridge_traits::{AudioBackend, HttpClient};
use core_runtime::config::AudioFxConfig;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Factory for sounds that share one engine, one transport and one cache.
///
/// ```ignore
/// let fx = AudioFx::new(AudioFxConfig::builder().build()?);
/// let laser = fx.load("https://cdn.example.com/laser.ogg", SoundOptions::default()).await?;
/// laser.change_volume(0.5)?.play()?;
/// ```
#[derive(Clone)]
pub struct AudioFx {
    backend: Arc<dyn AudioBackend>,
    http: Arc<dyn HttpClient>,
    cache: Arc<BufferCache>,
}

impl AudioFx {
    pub fn new(config: AudioFxConfig) -> Self {
        Self::with_cache(config, Arc::new(BufferCache::new()))
    }

    /// Use an existing cache, so several instances share decoded buffers.
    pub fn with_cache(config: AudioFxConfig, cache: Arc<BufferCache>) -> Self {
        Self {
            backend: config.backend,
            http: config.http_client,
            cache,
        }
    }

    /// Create a sound without loading it.
    ///
    /// The sound stays `Loading` until [`Sound::load`] is awaited; `on_ready`
    /// runs once the buffer is in place.
    pub fn create(
        &self,
        url: &str,
        on_ready: Option<SoundCallback>,
        options: SoundOptions,
    ) -> Result<Sound> {
        Sound::new(
            url,
            on_ready,
            options,
            Arc::clone(&self.backend),
            Arc::clone(&self.http),
            Arc::clone(&self.cache),
        )
    }

    /// Create a sound and wait until its buffer is ready.
    pub async fn load(&self, url: &str, options: SoundOptions) -> Result<Sound> {
        let sound = self.create(url, None, options)?;
        sound.load().await?;
        Ok(sound)
    }

    /// Apply a volume fraction to every loaded, live sound.
    pub fn change_volume_all(&self, fraction: f32) -> &Self {
        let mut count = 0usize;
        self.cache.for_each_member(|sound| match sound.change_volume(fraction) {
            Ok(_) => count += 1,
            Err(err) => debug!(sound_id = %sound.id(), error = %err, "Skipping sound"),
        });
        debug!(fraction, sounds = count, "Changed volume of all sounds");
        self
    }

    /// Destroy every loaded, live sound. Cached buffers are kept.
    pub fn destroy_all(&self) -> &Self {
        let mut count = 0usize;
        self.cache.for_each_member(|sound| {
            if let Err(err) = sound.destroy() {
                warn!(sound_id = %sound.id(), error = %err, "Failed to stop sound while destroying");
            }
            count += 1;
        });
        info!(sounds = count, "Destroyed all sounds");
        self
    }

    pub fn cache(&self) -> &Arc<BufferCache> {
        &self.cache
    }

    pub fn backend(&self) -> &Arc<dyn AudioBackend> {
        &self.backend
    }
}

impl std::fmt::Debug for AudioFx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioFx")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
