use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use research_hub_core::adapters::DatabaseAdapter;
use research_hub_core::{ApiError, ApiResult, ApiRoute, HubContext, HubPlugin};
use research_hub_core::{
    ApiRequest, ApiResponse, CreateActivity, CreateEvent, Event, EventFilter, HttpMethod, UserCard,
};

use super::helpers::{non_blank, parse_query, trimmed, user_card};

/// Conferences, workshops and seminars under `/events`.
pub struct EventsPlugin;

/// Accepts RFC 3339, a `datetime-local` value (`2025-03-01T09:30`) or a
/// bare date; the latter two are taken as UTC.
fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn event_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_datetime(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", raw)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateEventRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    title: String,
    description: Option<String>,
    #[serde(deserialize_with = "event_date")]
    start_date: DateTime<Utc>,
    #[serde(deserialize_with = "event_date")]
    end_date: DateTime<Utc>,
    location: Option<String>,
    #[serde(rename = "type")]
    event_type: Option<String>,
    #[validate(range(min = 1, message = "Max participants must be at least 1"))]
    max_participants: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListEventsQuery {
    #[serde(rename = "type")]
    event_type: Option<String>,
    search: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventView {
    #[serde(flatten)]
    event: Event,
    creator: Option<UserCard>,
    participant_count: usize,
    is_registered: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ParticipantView {
    user_id: String,
    name: String,
    email: String,
    avatar: Option<String>,
    registered_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventDetail {
    #[serde(flatten)]
    summary: EventView,
    participants: Vec<ParticipantView>,
}

impl EventsPlugin {
    async fn view<DB: DatabaseAdapter>(
        ctx: &HubContext<DB>,
        event: Event,
        viewer_id: &str,
    ) -> ApiResult<EventView> {
        let registrations = ctx.database.list_event_registrations(&event.id).await?;
        let creator = user_card(ctx, &event.created_by).await?;
        Ok(EventView {
            participant_count: registrations.len(),
            is_registered: registrations.iter().any(|r| r.user_id == viewer_id),
            creator,
            event,
        })
    }

    async fn handle_create<DB: DatabaseAdapter>(
        &self,
        req: &ApiRequest,
        ctx: &HubContext<DB>,
    ) -> ApiResult<ApiResponse> {
        let user = ctx.require_user(req).await?;
        let body: CreateEventRequest = match research_hub_core::validate_request_body(req) {
            Ok(v) => v,
            Err(resp) => return Ok(resp),
        };

        if body.end_date < body.start_date {
            return Err(ApiError::bad_request("End date must be after start date"));
        }

        let event = ctx
            .database
            .create_event(CreateEvent {
                title: body.title,
                description: non_blank(body.description),
                start_date: body.start_date,
                end_date: body.end_date,
                location: non_blank(body.location),
                event_type: non_blank(body.event_type),
                max_participants: body.max_participants,
                created_by: user.id.clone(),
            })
            .await?;

        ctx.audit(CreateActivity::new(&user.id, "create", "event", &event.id))
            .await;

        let view = Self::view(ctx, event, &user.id).await?;
        Ok(ApiResponse::json(201, &view)?)
    }

    async fn handle_list<DB: DatabaseAdapter>(
        &self,
        req: &ApiRequest,
        ctx: &HubContext<DB>,
    ) -> ApiResult<ApiResponse> {
        let user = ctx.require_user(req).await?;
        let query: ListEventsQuery = parse_query(&req.query);

        let bound = |raw: Option<String>| -> ApiResult<Option<DateTime<Utc>>> {
            match non_blank(raw) {
                Some(raw) => parse_datetime(&raw)
                    .map(Some)
                    .ok_or_else(|| ApiError::bad_request(format!("Invalid date: {}", raw))),
                None => Ok(None),
            }
        };
        let filter = EventFilter {
            event_type: non_blank(query.event_type),
            search: non_blank(query.search),
            starts_after: bound(query.start_date)?,
            ends_before: bound(query.end_date)?,
        };

        let events = ctx.database.list_events(filter).await?;
        let mut views = Vec::with_capacity(events.len());
        for event in events {
            views.push(Self::view(ctx, event, &user.id).await?);
        }
        Ok(ApiResponse::json(200, &views)?)
    }

    async fn handle_upcoming<DB: DatabaseAdapter>(
        &self,
        req: &ApiRequest,
        ctx: &HubContext<DB>,
    ) -> ApiResult<ApiResponse> {
        let user = ctx.require_user(req).await?;
        let events = ctx
            .database
            .list_upcoming_events(&user.id, Utc::now())
            .await?;

        let mut views = Vec::with_capacity(events.len());
        for event in events {
            views.push(Self::view(ctx, event, &user.id).await?);
        }
        Ok(ApiResponse::json(200, &views)?)
    }

    async fn handle_get<DB: DatabaseAdapter>(
        &self,
        req: &ApiRequest,
        ctx: &HubContext<DB>,
        id: &str,
    ) -> ApiResult<ApiResponse> {
        let user = ctx.require_user(req).await?;
        let event = ctx
            .database
            .get_event(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Event not found"))?;

        let mut participants = Vec::new();
        for registration in ctx.database.list_event_registrations(id).await? {
            if let Some(card) = user_card(ctx, &registration.user_id).await? {
                participants.push(ParticipantView {
                    user_id: card.id,
                    name: card.name,
                    email: card.email,
                    avatar: card.avatar,
                    registered_at: registration.registered_at,
                });
            }
        }

        let summary = Self::view(ctx, event, &user.id).await?;
        Ok(ApiResponse::json(
            200,
            &EventDetail {
                summary,
                participants,
            },
        )?)
    }

    async fn handle_register<DB: DatabaseAdapter>(
        &self,
        req: &ApiRequest,
        ctx: &HubContext<DB>,
        id: &str,
    ) -> ApiResult<ApiResponse> {
        let user = ctx.require_user(req).await?;
        let registration = ctx.database.register_for_event(id, &user.id).await?;

        ctx.audit(CreateActivity::new(&user.id, "register", "event", id))
            .await;
        Ok(ApiResponse::json(201, &registration)?)
    }

    async fn handle_unregister<DB: DatabaseAdapter>(
        &self,
        req: &ApiRequest,
        ctx: &HubContext<DB>,
        id: &str,
    ) -> ApiResult<ApiResponse> {
        let user = ctx.require_user(req).await?;
        ctx.database.unregister_from_event(id, &user.id).await?;

        ctx.audit(CreateActivity::new(&user.id, "unregister", "event", id))
            .await;
        Ok(ApiResponse::message(
            200,
            "Registration cancelled successfully",
        )?)
    }
}

#[async_trait]
impl<DB: DatabaseAdapter> HubPlugin<DB> for EventsPlugin {
    fn name(&self) -> &'static str {
        "events"
    }

    fn routes(&self) -> Vec<ApiRoute> {
        vec![
            ApiRoute::post("/events", "create_event"),
            ApiRoute::get("/events", "list_events"),
            ApiRoute::get("/events/user/upcoming", "upcoming_events"),
            ApiRoute::get("/events/{id}", "get_event"),
            ApiRoute::post("/events/{id}/register", "register_for_event"),
            ApiRoute::delete("/events/{id}/register", "unregister_from_event"),
        ]
    }

    async fn on_request(
        &self,
        req: &ApiRequest,
        ctx: &HubContext<DB>,
    ) -> ApiResult<Option<ApiResponse>> {
        let segments = req.segments();
        let response = match (req.method(), segments.as_slice()) {
            (HttpMethod::Post, ["events"]) => self.handle_create(req, ctx).await?,
            (HttpMethod::Get, ["events"]) => self.handle_list(req, ctx).await?,
            (HttpMethod::Get, ["events", "user", "upcoming"]) => {
                self.handle_upcoming(req, ctx).await?
            }
            (HttpMethod::Get, ["events", id]) => self.handle_get(req, ctx, id).await?,
            (HttpMethod::Post, ["events", id, "register"]) => {
                self.handle_register(req, ctx, id).await?
            }
            (HttpMethod::Delete, ["events", id, "register"]) => {
                self.handle_unregister(req, ctx, id).await?
            }
            _ => return Ok(None),
        };
        Ok(Some(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::test_helpers::{
        self, add_user, create_request, create_request_with_query, json_body,
    };
    use chrono::Duration;
    use research_hub_core::MemoryDatabaseAdapter;
    use serde_json::json;
    use std::collections::HashMap;

    async fn call(
        ctx: &HubContext<MemoryDatabaseAdapter>,
        req: ApiRequest,
    ) -> ApiResult<ApiResponse> {
        EventsPlugin
            .on_request(&req, ctx)
            .await
            .map(|r| r.expect("route handled"))
    }

    async fn create_event(
        ctx: &HubContext<MemoryDatabaseAdapter>,
        token: &str,
        body: serde_json::Value,
    ) -> serde_json::Value {
        let req = create_request(HttpMethod::Post, "/events", Some(token), Some(body));
        let response = call(ctx, req).await.unwrap();
        assert_eq!(response.status, 201);
        json_body(&response)
    }

    fn days_from_now(days: i64) -> String {
        (Utc::now() + Duration::days(days)).to_rfc3339()
    }

    #[test]
    fn test_parse_datetime_formats() {
        let rfc = parse_datetime("2025-03-01T09:30:00+02:00").unwrap();
        assert_eq!(rfc.to_rfc3339(), "2025-03-01T07:30:00+00:00");
        let local = parse_datetime("2025-03-01T09:30").unwrap();
        assert_eq!(local.to_rfc3339(), "2025-03-01T09:30:00+00:00");
        let day = parse_datetime("2025-03-01").unwrap();
        assert_eq!(day.to_rfc3339(), "2025-03-01T00:00:00+00:00");
        assert!(parse_datetime("next tuesday").is_none());
    }

    #[tokio::test]
    async fn test_create_event() {
        let (ctx, user, token) =
            test_helpers::create_test_context_with_user("host@lab.org").await;
        let event = create_event(
            &ctx,
            &token,
            json!({
                "title": "Quantum Workshop",
                "startDate": "2030-05-01T09:00",
                "endDate": "2030-05-02",
                "type": "workshop",
                "maxParticipants": 2
            }),
        )
        .await;
        assert_eq!(event["title"], "Quantum Workshop");
        assert_eq!(event["type"], "workshop");
        assert_eq!(event["participantCount"], 0);
        assert_eq!(event["isRegistered"], false);
        assert_eq!(event["creator"]["id"], user.id.as_str());
    }

    #[tokio::test]
    async fn test_end_before_start_is_rejected() {
        let (ctx, _, token) = test_helpers::create_test_context_with_user("host@lab.org").await;
        let req = create_request(
            HttpMethod::Post,
            "/events",
            Some(&token),
            Some(json!({
                "title": "Backwards",
                "startDate": "2030-05-02",
                "endDate": "2030-05-01"
            })),
        );
        let err = call(&ctx, req).await.unwrap_err();
        assert_eq!(err.status_code(), 400);

        let req = create_request(
            HttpMethod::Post,
            "/events",
            Some(&token),
            Some(json!({"title": "Undated"})),
        );
        assert_eq!(call(&ctx, req).await.unwrap().status, 400);
    }

    #[tokio::test]
    async fn test_registration_lifecycle() {
        let (ctx, _, host_token) =
            test_helpers::create_test_context_with_user("host@lab.org").await;
        let (_, a_token) = add_user(&ctx, "a@lab.org", "Alpha").await;
        let (_, b_token) = add_user(&ctx, "b@lab.org", "Beta").await;
        let event = create_event(
            &ctx,
            &host_token,
            json!({
                "title": "Seminar",
                "startDate": days_from_now(3),
                "endDate": days_from_now(4),
                "maxParticipants": 1
            }),
        )
        .await;
        let register_path = format!("/events/{}/register", event["id"].as_str().unwrap());

        let req = create_request(HttpMethod::Post, &register_path, Some(&a_token), None);
        let response = call(&ctx, req).await.unwrap();
        assert_eq!(response.status, 201);

        let req = create_request(HttpMethod::Post, &register_path, Some(&a_token), None);
        let err = call(&ctx, req).await.unwrap_err();
        assert_eq!(err.to_string(), "Already registered for this event");

        let req = create_request(HttpMethod::Post, &register_path, Some(&b_token), None);
        let err = call(&ctx, req).await.unwrap_err();
        assert_eq!(err.to_string(), "Event is full");

        let req = create_request(
            HttpMethod::Get,
            &format!("/events/{}", event["id"].as_str().unwrap()),
            Some(&a_token),
            None,
        );
        let detail = json_body(&call(&ctx, req).await.unwrap());
        assert_eq!(detail["participantCount"], 1);
        assert_eq!(detail["isRegistered"], true);
        assert_eq!(detail["participants"][0]["email"], "a@lab.org");

        let req = create_request(HttpMethod::Get, "/events/user/upcoming", Some(&a_token), None);
        let upcoming = json_body(&call(&ctx, req).await.unwrap());
        assert_eq!(upcoming.as_array().unwrap().len(), 1);

        let req = create_request(HttpMethod::Delete, &register_path, Some(&a_token), None);
        let body = json_body(&call(&ctx, req).await.unwrap());
        assert_eq!(body["message"], "Registration cancelled successfully");

        let req = create_request(HttpMethod::Delete, &register_path, Some(&a_token), None);
        let err = call(&ctx, req).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.to_string(), "Registration not found");
    }

    #[tokio::test]
    async fn test_missing_event() {
        let (ctx, _, token) = test_helpers::create_test_context_with_user("host@lab.org").await;
        for (method, path) in [
            (HttpMethod::Get, "/events/missing"),
            (HttpMethod::Post, "/events/missing/register"),
        ] {
            let req = create_request(method, path, Some(&token), None);
            let err = call(&ctx, req).await.unwrap_err();
            assert_eq!(err.status_code(), 404);
            assert_eq!(err.to_string(), "Event not found");
        }
    }

    #[tokio::test]
    async fn test_list_filters_and_order() {
        let (ctx, _, token) = test_helpers::create_test_context_with_user("host@lab.org").await;
        create_event(
            &ctx,
            &token,
            json!({"title": "Late talk", "startDate": days_from_now(10),
                   "endDate": days_from_now(10), "type": "seminar"}),
        )
        .await;
        create_event(
            &ctx,
            &token,
            json!({"title": "Early workshop", "startDate": days_from_now(2),
                   "endDate": days_from_now(3), "type": "workshop"}),
        )
        .await;

        let req = create_request(HttpMethod::Get, "/events", Some(&token), None);
        let all = json_body(&call(&ctx, req).await.unwrap());
        assert_eq!(all[0]["title"], "Early workshop");
        assert_eq!(all[1]["title"], "Late talk");

        let mut query = HashMap::new();
        query.insert("type".to_string(), "seminar".to_string());
        let req = create_request_with_query(HttpMethod::Get, "/events", Some(&token), None, query);
        let seminars = json_body(&call(&ctx, req).await.unwrap());
        assert_eq!(seminars.as_array().unwrap().len(), 1);
        assert_eq!(seminars[0]["title"], "Late talk");

        let mut query = HashMap::new();
        query.insert(
            "startDate".to_string(),
            (Utc::now() + Duration::days(5)).format("%Y-%m-%d").to_string(),
        );
        let req = create_request_with_query(HttpMethod::Get, "/events", Some(&token), None, query);
        let later = json_body(&call(&ctx, req).await.unwrap());
        assert_eq!(later.as_array().unwrap().len(), 1);

        let mut query = HashMap::new();
        query.insert("startDate".to_string(), "soon".to_string());
        let req = create_request_with_query(HttpMethod::Get, "/events", Some(&token), None, query);
        assert_eq!(call(&ctx, req).await.unwrap_err().status_code(), 400);
    }
}
