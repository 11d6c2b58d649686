async fn stream_profile(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, HttpApiError> {
    let initial_message = {
        let mut inner = state.inner.lock().await;
        let api = ensure_api(&mut inner, None)?;
        let snapshot = api
            .open_profile(&user_id)
            .map_err(HttpApiError::from_facade)?
            .clone();
        let seq = inner.next_stream_seq();
        StreamMessage::profile_updated(&snapshot, seq)
    };

    Ok(ws.on_upgrade(move |socket| stream_socket(socket, state, user_id, initial_message)))
}

async fn stream_socket(
    mut socket: WebSocket,
    state: AppState,
    user_id: String,
    initial_message: StreamMessage,
) {
    if send_stream_message(&mut socket, &initial_message)
        .await
        .is_err()
    {
        return;
    }

    let mut rx = state.stream_tx.subscribe();

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {
                        break;
                    }
                    _ => {}
                }
            }
            outgoing = rx.recv() => {
                match outgoing {
                    Ok(message) => {
                        if message.user_id != user_id {
                            continue;
                        }

                        if send_stream_message(&mut socket, &message).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        let warning = StreamMessage::warning(
                            &user_id,
                            0,
                            format!("stream client lagged and skipped {skipped} message(s)"),
                        );

                        if send_stream_message(&mut socket, &warning).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        }
    }
}

async fn send_stream_message(
    socket: &mut WebSocket,
    message: &StreamMessage,
) -> Result<(), axum::Error> {
    let payload = serde_json::to_string(message).map_err(axum::Error::new)?;
    socket.send(Message::Text(payload.into())).await
}

#[derive(Debug, Clone, Serialize)]
struct StreamMessage {
    schema_version: String,
    #[serde(rename = "type")]
    message_type: String,
    user_id: String,
    seq: u64,
    reconnect_token: String,
    payload: Value,
}

impl StreamMessage {
    fn profile_updated(snapshot: &ProgressionSnapshot, seq: u64) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            message_type: "profile.updated".to_string(),
            user_id: snapshot.user_id.clone(),
            seq,
            reconnect_token: reconnect_token(seq, "profile"),
            payload: json!(snapshot),
        }
    }

    fn reward_unlocked(user_id: &str, reward: &UnlockedReward, seq: u64) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            message_type: "reward.unlocked".to_string(),
            user_id: user_id.to_string(),
            seq,
            reconnect_token: reconnect_token(seq, "reward"),
            payload: json!(reward),
        }
    }

    fn notification_raised(user_id: &str, notification: &Notification, seq: u64) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            message_type: "notification.raised".to_string(),
            user_id: user_id.to_string(),
            seq,
            reconnect_token: reconnect_token(seq, "notification"),
            payload: json!(notification),
        }
    }

    fn warning(user_id: &str, seq: u64, warning: String) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            message_type: "warning".to_string(),
            user_id: user_id.to_string(),
            seq,
            reconnect_token: reconnect_token(seq, "warning"),
            payload: json!({ "message": warning }),
        }
    }
}
