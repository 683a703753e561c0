//! Shared helpers for plugin implementations.

use rand::RngCore;
use rand::rngs::OsRng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;

use research_hub_core::adapters::DatabaseAdapter;
use research_hub_core::{
    ApiError, ApiResult, HubContext, InvitationEmail, Project, Team, TeamMember, User, UserCard,
    Visibility,
};

/// Deserialize query parameters into `T`, falling back to `T::default()`
/// when they do not fit.
pub fn parse_query<T: Default + DeserializeOwned>(query: &HashMap<String, String>) -> T {
    let json_value =
        serde_json::to_value(query).unwrap_or(serde_json::Value::Object(Default::default()));
    serde_json::from_value(json_value).unwrap_or_default()
}

/// Trimmed string, blank treated as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Deserialize a string field with surrounding whitespace removed, so a
/// blank value fails `length(min = 1)` validation.
pub fn trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(String::deserialize(deserializer)?.trim().to_string())
}

/// Invitation token: 32 random bytes, hex encoded.
pub fn generate_invitation_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Compact reference to a user, `None` if the user is gone.
pub async fn user_card<DB: DatabaseAdapter>(
    ctx: &HubContext<DB>,
    user_id: &str,
) -> ApiResult<Option<UserCard>> {
    Ok(ctx
        .database
        .get_user_by_id(user_id)
        .await?
        .map(|u| u.card()))
}

/// Membership of `user_id` in the (optional) team.
pub async fn team_membership<DB: DatabaseAdapter>(
    ctx: &HubContext<DB>,
    team_id: Option<&str>,
    user_id: &str,
) -> ApiResult<Option<TeamMember>> {
    match team_id {
        Some(team_id) => ctx.database.get_team_member(team_id, user_id).await,
        None => Ok(None),
    }
}

/// Public, created by the user, or belonging to one of the user's teams.
pub async fn can_view_project<DB: DatabaseAdapter>(
    ctx: &HubContext<DB>,
    project: &Project,
    user_id: &str,
) -> ApiResult<bool> {
    if project.visibility == Visibility::Public || project.created_by == user_id {
        return Ok(true);
    }
    Ok(team_membership(ctx, project.team_id.as_deref(), user_id)
        .await?
        .is_some())
}

/// Created by the user, or the user leads the project's team.
pub async fn can_manage_project<DB: DatabaseAdapter>(
    ctx: &HubContext<DB>,
    project: &Project,
    user_id: &str,
) -> ApiResult<bool> {
    if project.created_by == user_id {
        return Ok(true);
    }
    Ok(team_membership(ctx, project.team_id.as_deref(), user_id)
        .await?
        .is_some_and(|m| m.is_leader()))
}

/// Created by the user, or the user is on the project's team.
pub async fn can_contribute<DB: DatabaseAdapter>(
    ctx: &HubContext<DB>,
    project: &Project,
    user_id: &str,
) -> ApiResult<bool> {
    if project.created_by == user_id {
        return Ok(true);
    }
    Ok(team_membership(ctx, project.team_id.as_deref(), user_id)
        .await?
        .is_some())
}

/// Fetch a project the user may contribute to, or fail with 403 `message`.
/// A missing project is reported the same way.
pub async fn require_contributor<DB: DatabaseAdapter>(
    ctx: &HubContext<DB>,
    project_id: &str,
    user_id: &str,
    message: &str,
) -> ApiResult<Project> {
    let project = ctx
        .database
        .get_project(project_id)
        .await?
        .ok_or_else(|| ApiError::forbidden(message))?;
    if !can_contribute(ctx, &project, user_id).await? {
        return Err(ApiError::forbidden(message));
    }
    Ok(project)
}

/// Mail an invitation link. Delivery problems are logged, not returned:
/// the invitation row already exists and can be resent.
pub async fn send_invitation_email<DB: DatabaseAdapter>(
    ctx: &HubContext<DB>,
    team: &Team,
    inviter: &User,
    email: &str,
    token: &str,
) {
    let link = ctx.config.invitation_link(token);
    let Some(provider) = ctx.email_provider.as_deref() else {
        ctx.config.logger.info(&format!(
            "No email provider configured; invitation for {} to team {}: {}",
            email, team.name, link
        ));
        return;
    };

    let message =
        InvitationEmail::render(&ctx.config.app_name, &team.name, &inviter.full_name(), &link);
    match provider
        .send(email, &message.subject, &message.html, &message.text)
        .await
    {
        Ok(()) => ctx
            .config
            .logger
            .info(&format!("Invitation sent to {} for team {}", email, team.id)),
        Err(e) => ctx.config.logger.warn(&format!(
            "Failed to send invitation to {} for team {}: {}",
            email, team.id, e
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invitation_token_shape() {
        let a = generate_invitation_token();
        let b = generate_invitation_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  x ".into())).as_deref(), Some("x"));
        assert_eq!(non_blank(Some("   ".into())), None);
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn test_trimmed_field() {
        #[derive(serde::Deserialize)]
        struct Body {
            #[serde(deserialize_with = "trimmed")]
            title: String,
        }
        let body: Body = serde_json::from_str(r#"{"title": "  Dark matter  "}"#).unwrap();
        assert_eq!(body.title, "Dark matter");
    }

    #[test]
    fn test_parse_query_defaults_on_mismatch() {
        #[derive(Debug, Default, serde::Deserialize, PartialEq)]
        struct Q {
            search: Option<String>,
        }
        let mut query = HashMap::new();
        query.insert("search".to_string(), "optics".to_string());
        let q: Q = parse_query(&query);
        assert_eq!(q.search.as_deref(), Some("optics"));

        let empty: Q = parse_query(&HashMap::new());
        assert_eq!(empty, Q::default());
    }
}
