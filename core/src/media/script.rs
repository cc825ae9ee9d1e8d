use std::sync::Arc;

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::PlayerError;
use crate::host::EmbedScriptHost;

type Waiter = oneshot::Sender<Result<(), PlayerError>>;

enum LoadState {
    Idle,
    Loading(Vec<Waiter>),
    Loaded,
}

static GLOBAL_LOADER: Lazy<Arc<ScriptLoader>> = Lazy::new(|| Arc::new(ScriptLoader::new()));

/// Initialize-once guard for the shared embed script.
///
/// The script is requested at most once; callers arriving while it loads
/// join the waiter list. The load runs on its own task, so it completes
/// even if the adapter that triggered it is torn down in the meantime.
pub struct ScriptLoader {
    state: Mutex<LoadState>,
}

impl Default for ScriptLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptLoader {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LoadState::Idle),
        }
    }

    /// The process-wide loader every facade uses by default
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL_LOADER)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(*self.state.lock(), LoadState::Loaded)
    }

    /// Resolve once the script API is available
    pub async fn ensure_loaded(
        self: &Arc<Self>,
        host: Arc<dyn EmbedScriptHost>,
        src: &str,
    ) -> Result<(), PlayerError> {
        let (tx, rx) = oneshot::channel();
        let start_load = {
            let mut state = self.state.lock();
            match &mut *state {
                LoadState::Loaded => return Ok(()),
                LoadState::Loading(waiters) => {
                    debug!("Embed script already loading, waiting");
                    waiters.push(tx);
                    false
                }
                LoadState::Idle => {
                    if host.api_available() {
                        debug!("Embed API already present, skipping script request");
                        *state = LoadState::Loaded;
                        return Ok(());
                    }
                    *state = LoadState::Loading(vec![tx]);
                    true
                }
            }
        };

        if start_load {
            info!("Requesting embed script: {}", src);
            let load = host.load_script(src);
            let loader = Arc::clone(self);
            tokio::spawn(async move {
                let result = load.await;
                loader.finish(result);
            });
        }

        rx.await
            .unwrap_or_else(|_| Err(PlayerError::ScriptLoad("script loader went away".to_string())))
    }

    fn finish(&self, result: Result<(), PlayerError>) {
        let waiters = {
            let mut state = self.state.lock();
            let next = if result.is_ok() {
                LoadState::Loaded
            } else {
                LoadState::Idle
            };
            match std::mem::replace(&mut *state, next) {
                LoadState::Loading(waiters) => waiters,
                _ => Vec::new(),
            }
        };

        match &result {
            Ok(()) => info!("Embed script loaded, releasing {} waiter(s)", waiters.len()),
            Err(e) => warn!("Embed script failed to load: {}", e),
        }
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
    }
}
