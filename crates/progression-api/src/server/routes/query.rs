async fn get_profile(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<contracts::QueryResponse>, HttpApiError> {
    let response = {
        let mut inner = state.inner.lock().await;
        let api = ensure_api(&mut inner, None)?;
        let snapshot = api
            .open_profile(&user_id)
            .map_err(HttpApiError::from_facade)?;

        contracts::QueryResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            query_type: "profile.snapshot".to_string(),
            user_id: user_id.clone(),
            data: json!({ "snapshot": snapshot }),
        }
    };

    Ok(Json(response))
}

#[derive(Debug, Deserialize, Default)]
struct ListProfilesQuery {
    page_size: Option<usize>,
    sqlite_path: Option<String>,
}

#[derive(Debug, Serialize)]
struct ListProfilesResponse {
    schema_version: String,
    resident_profiles: Vec<String>,
    profiles: Vec<PersistedProfileSummary>,
}

async fn list_profiles(
    State(state): State<AppState>,
    Query(query): Query<ListProfilesQuery>,
) -> Result<Json<ListProfilesResponse>, HttpApiError> {
    let page_size = query.page_size.unwrap_or(200).max(1).min(MAX_PAGE_SIZE);

    let sqlite_path = query
        .sqlite_path
        .filter(|path| !path.trim().is_empty())
        .unwrap_or_else(default_sqlite_path);

    let resident_profiles = {
        let inner = state.inner.lock().await;
        inner
            .api
            .as_ref()
            .map(EngineApi::resident_profiles)
            .unwrap_or_default()
    };

    // Listing reads the store directly so it also sees profiles that were
    // never loaded into this server instance.
    let store = crate::persistence::SqliteProfileStore::open(sqlite_path)
        .map_err(HttpApiError::from_persistence)?;
    let profiles = store
        .list_profiles(page_size)
        .map_err(HttpApiError::from_persistence)?;

    Ok(Json(ListProfilesResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        resident_profiles,
        profiles,
    }))
}

async fn get_rewards(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<contracts::QueryResponse>, HttpApiError> {
    let response = {
        let mut inner = state.inner.lock().await;
        let api = ensure_api(&mut inner, None)?;
        api.open_profile(&user_id)
            .map_err(HttpApiError::from_facade)?;
        let unlocks = api.unlocks(&user_id).unwrap_or(&[]);

        contracts::QueryResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            query_type: "profile.rewards".to_string(),
            user_id: user_id.clone(),
            data: json!({
                "count": unlocks.len(),
                "unlocks": unlocks,
            }),
        }
    };

    Ok(Json(response))
}

#[derive(Debug, Deserialize, Default)]
struct HistoryQuery {
    cursor: Option<usize>,
    page_size: Option<usize>,
}

async fn get_history(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<contracts::QueryResponse>, HttpApiError> {
    let response = {
        let mut inner = state.inner.lock().await;
        let api = ensure_api(&mut inner, None)?;
        api.open_profile(&user_id)
            .map_err(HttpApiError::from_facade)?;
        let history = api.history(&user_id).unwrap_or(&[]);

        let (start, end, next_cursor) = paginate(history.len(), query.cursor, query.page_size)?;

        contracts::QueryResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            query_type: "profile.history".to_string(),
            user_id: user_id.clone(),
            data: json!({
                "cursor": start,
                "next_cursor": next_cursor,
                "total": history.len(),
                "records": history[start..end].to_vec(),
            }),
        }
    };

    Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct CatalogEntry {
    reward_id: String,
    kind: RewardKind,
    name: String,
    description: String,
    icon: String,
}

#[derive(Debug, Serialize)]
struct CatalogResponse {
    schema_version: String,
    count: usize,
    rewards: Vec<CatalogEntry>,
}

async fn get_catalog(
    State(state): State<AppState>,
) -> Result<Json<CatalogResponse>, HttpApiError> {
    let response = {
        let mut inner = state.inner.lock().await;
        let api = ensure_api(&mut inner, None)?;

        let rewards = api
            .catalog()
            .iter()
            .map(|definition| CatalogEntry {
                reward_id: definition.reward_id.to_string(),
                kind: definition.kind,
                name: definition.name.to_string(),
                description: definition.description.to_string(),
                icon: definition.icon.to_string(),
            })
            .collect::<Vec<_>>();

        CatalogResponse {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            count: rewards.len(),
            rewards,
        }
    };

    Ok(Json(response))
}
