#[derive(Clone)]
struct AppState {
    inner: std::sync::Arc<Mutex<ServerInner>>,
    stream_tx: broadcast::Sender<StreamMessage>,
}

impl AppState {
    fn new() -> Self {
        let (stream_tx, _) = broadcast::channel(4096);
        Self {
            inner: std::sync::Arc::new(Mutex::new(ServerInner::default())),
            stream_tx,
        }
    }
}

#[derive(Debug, Default)]
struct ServerInner {
    api: Option<EngineApi>,
    stream_seq: u64,
}

impl ServerInner {
    fn next_stream_seq(&mut self) -> u64 {
        self.stream_seq = self.stream_seq.wrapping_add(1);
        self.stream_seq
    }
}

/// Get the facade, creating it (with the default store) on first use.
fn ensure_api<'a>(
    inner: &'a mut ServerInner,
    sqlite_path: Option<String>,
) -> Result<&'a mut EngineApi, HttpApiError> {
    match inner.api {
        Some(ref mut api) => Ok(api),
        None => {
            let path = sqlite_path
                .filter(|path| !path.trim().is_empty())
                .unwrap_or_else(default_sqlite_path);
            let mut api = EngineApi::new();
            api.attach_sqlite_store(path)
                .map_err(HttpApiError::from_persistence)?;
            Ok(inner.api.insert(api))
        }
    }
}

fn broadcast_messages(state: &AppState, messages: Vec<StreamMessage>) {
    for message in messages {
        let _ = state.stream_tx.send(message);
    }
}
