#[derive(Debug, Deserialize)]
struct CreateProfileRequest {
    user_id: String,
    created_at: Option<DateTime<Utc>>,
    sqlite_path: Option<String>,
    replace_existing: Option<bool>,
}

#[derive(Debug, Serialize)]
struct CreateProfileResponse {
    schema_version: String,
    user_id: String,
    snapshot: ProgressionSnapshot,
}

async fn create_profile(
    State(state): State<AppState>,
    Json(request): Json<CreateProfileRequest>,
) -> Result<Json<CreateProfileResponse>, HttpApiError> {
    if request.user_id.trim().is_empty() {
        return Err(HttpApiError::invalid_query("user_id must not be empty", None));
    }

    let (response, messages) = {
        let mut inner = state.inner.lock().await;
        let api = ensure_api(&mut inner, request.sqlite_path.clone())?;

        let created_at = request.created_at.unwrap_or_else(Utc::now);
        let snapshot = api
            .create_profile(
                &request.user_id,
                created_at,
                request.replace_existing.unwrap_or(false),
            )
            .map_err(HttpApiError::from_persistence)?;
        let persistence_error = api.last_persistence_error().map(str::to_string);

        let mut messages = Vec::new();
        let seq = inner.next_stream_seq();
        messages.push(StreamMessage::profile_updated(&snapshot, seq));
        if let Some(error) = persistence_error {
            tracing::warn!(user_id = %request.user_id, %error, "profile persistence failed");
            let seq = inner.next_stream_seq();
            messages.push(StreamMessage::warning(&request.user_id, seq, error));
        }

        (
            CreateProfileResponse {
                schema_version: SCHEMA_VERSION_V1.to_string(),
                user_id: snapshot.user_id.clone(),
                snapshot,
            },
            messages,
        )
    };

    broadcast_messages(&state, messages);

    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum CompleteRequest {
    Task {
        category: TaskCategory,
        difficulty: Option<TaskDifficulty>,
        xp_amount: Option<i64>,
        occurred_at: Option<DateTime<Utc>>,
        event_id: Option<String>,
    },
    QuestStep {
        category: TaskCategory,
        difficulty: Option<QuestDifficulty>,
        step_count: Option<u32>,
        xp_amount: Option<i64>,
        occurred_at: Option<DateTime<Utc>>,
        quest_completed: Option<bool>,
        event_id: Option<String>,
    },
}

/// Resolve the XP for a completion request: explicit amount wins, otherwise
/// it is derived from the difficulty the same way the task/quest builders
/// derive it.
fn resolve_task_xp(
    xp_amount: Option<i64>,
    difficulty: Option<TaskDifficulty>,
) -> Result<i64, HttpApiError> {
    match (xp_amount, difficulty) {
        (Some(amount), _) => Ok(amount),
        (None, Some(difficulty)) => Ok(difficulty.xp_value()),
        (None, None) => Err(HttpApiError::invalid_query(
            "either xp_amount or difficulty is required",
            None,
        )),
    }
}

fn resolve_quest_step_xp(
    xp_amount: Option<i64>,
    difficulty: Option<QuestDifficulty>,
    step_count: Option<u32>,
) -> Result<i64, HttpApiError> {
    match (xp_amount, difficulty) {
        (Some(amount), _) => Ok(amount),
        (None, Some(difficulty)) => Ok(difficulty.step_xp(step_count.unwrap_or(1))),
        (None, None) => Err(HttpApiError::invalid_query(
            "either xp_amount or difficulty is required",
            None,
        )),
    }
}

async fn complete_step(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<CompleteRequest>,
) -> Result<Json<contracts::CompletionOutcome>, HttpApiError> {
    let (outcome, messages) = {
        let mut inner = state.inner.lock().await;
        let api = ensure_api(&mut inner, None)?;
        api.open_profile(&user_id).map_err(HttpApiError::from_facade)?;
        let completion_count = api.completions(&user_id).map(<[_]>::len).unwrap_or(0);

        let event = build_completion_event(&user_id, completion_count, request)?;
        let outcome = api.complete(&event).map_err(HttpApiError::from_facade)?;
        let persistence_error = api.last_persistence_error().map(str::to_string);

        let mut messages = Vec::new();
        let seq = inner.next_stream_seq();
        messages.push(StreamMessage::profile_updated(&outcome.snapshot, seq));
        for reward in &outcome.newly_unlocked {
            let seq = inner.next_stream_seq();
            messages.push(StreamMessage::reward_unlocked(&user_id, reward, seq));
        }
        for notification in &outcome.notifications {
            let seq = inner.next_stream_seq();
            messages.push(StreamMessage::notification_raised(&user_id, notification, seq));
        }
        if let Some(error) = persistence_error {
            tracing::warn!(%user_id, %error, "profile persistence failed");
            let seq = inner.next_stream_seq();
            messages.push(StreamMessage::warning(&user_id, seq, error));
        }

        (outcome, messages)
    };

    broadcast_messages(&state, messages);

    Ok(Json(outcome))
}

fn build_completion_event(
    user_id: &str,
    completion_count: usize,
    request: CompleteRequest,
) -> Result<CompletionEvent, HttpApiError> {
    match request {
        CompleteRequest::Task {
            category,
            difficulty,
            xp_amount,
            occurred_at,
            event_id,
        } => {
            let occurred_at = occurred_at.unwrap_or_else(Utc::now);
            let xp = resolve_task_xp(xp_amount, difficulty)?;
            let event_id = event_id
                .unwrap_or_else(|| default_event_id(occurred_at, completion_count));
            Ok(CompletionEvent::task(
                event_id, user_id, category, xp, occurred_at,
            ))
        }
        CompleteRequest::QuestStep {
            category,
            difficulty,
            step_count,
            xp_amount,
            occurred_at,
            quest_completed,
            event_id,
        } => {
            let occurred_at = occurred_at.unwrap_or_else(Utc::now);
            let xp = resolve_quest_step_xp(xp_amount, difficulty, step_count)?;
            let event_id = event_id
                .unwrap_or_else(|| default_event_id(occurred_at, completion_count));
            Ok(CompletionEvent::quest_step(
                event_id,
                user_id,
                category,
                xp,
                occurred_at,
                quest_completed.unwrap_or(false),
            ))
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct RollDayRequest {
    today: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
struct RollDayResponse {
    schema_version: String,
    user_id: String,
    snapshot: ProgressionSnapshot,
}

async fn roll_day(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<RollDayRequest>,
) -> Result<Json<RollDayResponse>, HttpApiError> {
    let (response, messages) = {
        let mut inner = state.inner.lock().await;
        let api = ensure_api(&mut inner, None)?;

        let today = request.today.unwrap_or_else(|| Utc::now().date_naive());
        let snapshot = api
            .roll_day(&user_id, today)
            .map_err(HttpApiError::from_facade)?;
        let persistence_error = api.last_persistence_error().map(str::to_string);

        let mut messages = Vec::new();
        let seq = inner.next_stream_seq();
        messages.push(StreamMessage::profile_updated(&snapshot, seq));
        if let Some(error) = persistence_error {
            tracing::warn!(%user_id, %error, "profile persistence failed");
            let seq = inner.next_stream_seq();
            messages.push(StreamMessage::warning(&user_id, seq, error));
        }

        (
            RollDayResponse {
                schema_version: SCHEMA_VERSION_V1.to_string(),
                user_id: snapshot.user_id.clone(),
                snapshot,
            },
            messages,
        )
    };

    broadcast_messages(&state, messages);

    Ok(Json(response))
}

fn default_event_id(occurred_at: DateTime<Utc>, completion_count: usize) -> String {
    format!(
        "evt_{}_{:06}",
        occurred_at.timestamp_millis(),
        completion_count + 1
    )
}
