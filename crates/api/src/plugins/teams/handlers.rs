use research_hub_core::adapters::DatabaseAdapter;
use research_hub_core::{
    ApiError, ApiRequest, ApiResponse, ApiResult, CreateActivity, CreateTeam,
    CreateTeamInvitation, CreateTeamMember, HubContext, Team, TeamInvitation, TeamRole,
    UpdateTeam, User,
};

use super::TeamsConfig;
use super::types::{
    AddMemberRequest, CreateTeamRequest, InvitationSentResponse, InvitationView,
    JoinedTeamResponse, MemberView, MyTeamView, TeamDetail, UpdateTeamRequest,
};
use crate::plugins::helpers::{
    generate_invitation_token, non_blank, send_invitation_email, user_card,
};

async fn require_team<DB: DatabaseAdapter>(ctx: &HubContext<DB>, team_id: &str) -> ApiResult<Team> {
    ctx.database
        .get_team(team_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Team not found"))
}

async fn require_leader<DB: DatabaseAdapter>(
    ctx: &HubContext<DB>,
    team_id: &str,
    user_id: &str,
    message: &str,
) -> ApiResult<()> {
    let is_leader = ctx
        .database
        .get_team_member(team_id, user_id)
        .await?
        .is_some_and(|m| m.is_leader());
    if !is_leader {
        return Err(ApiError::forbidden(message));
    }
    Ok(())
}

/// Team with its member list, resolved to user cards.
async fn team_detail<DB: DatabaseAdapter>(
    ctx: &HubContext<DB>,
    team: Team,
    viewer_id: &str,
) -> ApiResult<TeamDetail> {
    let rows = ctx.database.list_team_members(&team.id).await?;
    let is_leader = rows
        .iter()
        .any(|m| m.user_id == viewer_id && m.is_leader());

    let mut members = Vec::with_capacity(rows.len());
    for row in &rows {
        if let Some(card) = user_card(ctx, &row.user_id).await? {
            members.push(MemberView::new(row, card));
        }
    }

    let creator = user_card(ctx, &team.created_by).await?;
    Ok(TeamDetail {
        member_count: rows.len(),
        team,
        creator,
        members,
        is_leader,
    })
}

/// Create a pending invitation for `email` and mail the link.
///
/// An existing pending invitation to the same team is reused and its link
/// mailed again.
async fn invite<DB: DatabaseAdapter>(
    ctx: &HubContext<DB>,
    team: &Team,
    inviter: &User,
    email: &str,
    role: TeamRole,
) -> ApiResult<TeamInvitation> {
    let pending = ctx.database.list_pending_invitations(email).await?;
    if let Some(existing) = pending.into_iter().find(|i| i.team_id == team.id) {
        send_invitation_email(ctx, team, inviter, &existing.email, &existing.token).await;
        return Ok(existing);
    }

    let invitation = ctx
        .database
        .create_invitation(CreateTeamInvitation {
            team_id: team.id.clone(),
            email: email.to_string(),
            role,
            token: generate_invitation_token(),
            invited_by: inviter.id.clone(),
        })
        .await?;

    ctx.audit(CreateActivity::new(&inviter.id, "invite", "team", &team.id))
        .await;
    send_invitation_email(ctx, team, inviter, &invitation.email, &invitation.token).await;
    Ok(invitation)
}

pub(super) async fn handle_create_team<DB: DatabaseAdapter>(
    req: &ApiRequest,
    ctx: &HubContext<DB>,
) -> ApiResult<ApiResponse> {
    let user = ctx.require_user(req).await?;
    let body: CreateTeamRequest = match research_hub_core::validate_request_body(req) {
        Ok(v) => v,
        Err(resp) => return Ok(resp),
    };

    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Team name is required"));
    }

    let mut create = CreateTeam::new(name, &user.id)
        .with_description(non_blank(body.description))
        .with_max_members(body.max_members);

    for member_id in &body.member_ids {
        create = create.with_member(member_id, TeamRole::Member);
    }

    let mut invited: Vec<String> = Vec::new();
    for entry in &body.members {
        let email = entry.email.trim().to_lowercase();
        let role = entry.role.unwrap_or_default();
        if email == user.email || invited.contains(&email) {
            continue;
        }
        match ctx.database.get_user_by_email(&email).await? {
            Some(existing) => create = create.with_member(&existing.id, role),
            None => {
                create = create.with_invitee(&email, role, generate_invitation_token());
                invited.push(email);
            }
        }
    }

    let invitees = create.invitations.clone();
    let team = ctx.database.create_team(create).await?;

    ctx.audit(CreateActivity::new(&user.id, "create", "team", &team.id))
        .await;
    ctx.config
        .logger
        .info(&format!("Team {} created by {}", team.id, user.id));

    for invitee in &invitees {
        send_invitation_email(ctx, &team, &user, &invitee.email, &invitee.token).await;
    }

    let detail = team_detail(ctx, team, &user.id).await?;
    Ok(ApiResponse::json(201, &detail)?)
}

pub(super) async fn handle_list_teams<DB: DatabaseAdapter>(
    req: &ApiRequest,
    ctx: &HubContext<DB>,
) -> ApiResult<ApiResponse> {
    let user = ctx.require_user(req).await?;
    let teams = ctx
        .database
        .list_user_teams(&user.id, req.query_param("search"))
        .await?;

    let mut details = Vec::with_capacity(teams.len());
    for team in teams {
        details.push(team_detail(ctx, team, &user.id).await?);
    }
    Ok(ApiResponse::json(200, &details)?)
}

pub(super) async fn handle_my_teams<DB: DatabaseAdapter>(
    req: &ApiRequest,
    ctx: &HubContext<DB>,
) -> ApiResult<ApiResponse> {
    let user = ctx.require_user(req).await?;
    let teams = ctx.database.list_user_teams(&user.id, None).await?;

    let mut views = Vec::with_capacity(teams.len());
    for team in teams {
        let members = ctx.database.list_team_members(&team.id).await?;
        let role = members
            .iter()
            .find(|m| m.user_id == user.id)
            .map(|m| m.role)
            .unwrap_or_default();
        views.push(MyTeamView {
            team,
            member_count: members.len(),
            member_role: role,
            is_leader: role == TeamRole::Leader,
        });
    }
    Ok(ApiResponse::json(200, &views)?)
}

pub(super) async fn handle_search_users<DB: DatabaseAdapter>(
    req: &ApiRequest,
    ctx: &HubContext<DB>,
    config: &TeamsConfig,
) -> ApiResult<ApiResponse> {
    let user = ctx.require_user(req).await?;
    let query = req
        .query_param("q")
        .ok_or_else(|| ApiError::bad_request("Search query is required"))?;

    let cards: Vec<_> = ctx
        .database
        .search_users(query, &user.id, config.user_search_limit)
        .await?
        .iter()
        .map(|u| u.card())
        .collect();
    Ok(ApiResponse::json(200, &cards)?)
}

pub(super) async fn handle_list_invitations<DB: DatabaseAdapter>(
    req: &ApiRequest,
    ctx: &HubContext<DB>,
) -> ApiResult<ApiResponse> {
    let user = ctx.require_user(req).await?;
    let invitations = ctx.database.list_pending_invitations(&user.email).await?;

    let mut views = Vec::with_capacity(invitations.len());
    for invitation in invitations {
        let team_name = ctx
            .database
            .get_team(&invitation.team_id)
            .await?
            .map(|t| t.name);
        let invited_by_user = user_card(ctx, &invitation.invited_by).await?;
        views.push(InvitationView {
            invitation,
            team_name,
            invited_by_user,
        });
    }
    Ok(ApiResponse::json(200, &views)?)
}

pub(super) async fn handle_get_team<DB: DatabaseAdapter>(
    req: &ApiRequest,
    ctx: &HubContext<DB>,
    team_id: &str,
) -> ApiResult<ApiResponse> {
    let user = ctx.require_user(req).await?;
    let team = require_team(ctx, team_id).await?;
    // Non-members cannot tell a hidden team from a missing one.
    if ctx
        .database
        .get_team_member(team_id, &user.id)
        .await?
        .is_none()
    {
        return Err(ApiError::not_found("Team not found"));
    }
    let detail = team_detail(ctx, team, &user.id).await?;
    Ok(ApiResponse::json(200, &detail)?)
}

pub(super) async fn handle_update_team<DB: DatabaseAdapter>(
    req: &ApiRequest,
    ctx: &HubContext<DB>,
    team_id: &str,
) -> ApiResult<ApiResponse> {
    let user = ctx.require_user(req).await?;
    let body: UpdateTeamRequest = match research_hub_core::validate_request_body(req) {
        Ok(v) => v,
        Err(resp) => return Ok(resp),
    };

    require_team(ctx, team_id).await?;
    require_leader(
        ctx,
        team_id,
        &user.id,
        "Only team leaders can update team details",
    )
    .await?;

    let name = match body.name {
        Some(name) if name.trim().is_empty() => {
            return Err(ApiError::bad_request("Team name is required"));
        }
        other => other.map(|n| n.trim().to_string()),
    };

    let team = ctx
        .database
        .update_team(
            team_id,
            UpdateTeam {
                name,
                description: body.description,
                max_members: body.max_members,
            },
        )
        .await?;

    ctx.audit(CreateActivity::new(&user.id, "update", "team", team_id))
        .await;

    let detail = team_detail(ctx, team, &user.id).await?;
    Ok(ApiResponse::json(200, &detail)?)
}

pub(super) async fn handle_add_member<DB: DatabaseAdapter>(
    req: &ApiRequest,
    ctx: &HubContext<DB>,
    team_id: &str,
) -> ApiResult<ApiResponse> {
    let user = ctx.require_user(req).await?;
    let body: AddMemberRequest = match research_hub_core::validate_request_body(req) {
        Ok(v) => v,
        Err(resp) => return Ok(resp),
    };

    let team = require_team(ctx, team_id).await?;
    require_leader(ctx, team_id, &user.id, "Only team leaders can add members").await?;

    let role = body.role.unwrap_or_default();
    let target = match (non_blank(body.user_id), non_blank(body.email)) {
        (Some(user_id), _) => ctx
            .database
            .get_user_by_id(&user_id)
            .await?
            .ok_or(ApiError::UserNotFound)?,
        (None, Some(email)) => match ctx.database.get_user_by_email(&email).await? {
            Some(existing) => existing,
            None => {
                let invitation = invite(ctx, &team, &user, &email.to_lowercase(), role).await?;
                return Ok(ApiResponse::json(
                    201,
                    &InvitationSentResponse {
                        message: "Invitation sent successfully",
                        invitation,
                    },
                )?);
            }
        },
        (None, None) => {
            return Err(ApiError::bad_request("Email or user ID is required"));
        }
    };

    let member = ctx
        .database
        .add_team_member(CreateTeamMember {
            team_id: team.id.clone(),
            user_id: target.id.clone(),
            role,
        })
        .await?;

    ctx.audit(
        CreateActivity::new(&user.id, "add_member", "team", &team.id).with_target(&target.id),
    )
    .await;

    Ok(ApiResponse::json(201, &MemberView::new(&member, target.card()))?)
}

pub(super) async fn handle_remove_member<DB: DatabaseAdapter>(
    req: &ApiRequest,
    ctx: &HubContext<DB>,
    team_id: &str,
    target_user_id: &str,
) -> ApiResult<ApiResponse> {
    let user = ctx.require_user(req).await?;
    require_team(ctx, team_id).await?;

    if target_user_id != user.id {
        require_leader(
            ctx,
            team_id,
            &user.id,
            "Only team leaders can remove other members",
        )
        .await?;
    }

    ctx.database
        .remove_team_member(team_id, target_user_id)
        .await?;

    ctx.audit(
        CreateActivity::new(&user.id, "remove_member", "team", team_id)
            .with_target(target_user_id),
    )
    .await;

    Ok(ApiResponse::message(200, "Member removed successfully")?)
}

pub(super) async fn handle_accept_invitation<DB: DatabaseAdapter>(
    req: &ApiRequest,
    ctx: &HubContext<DB>,
    token: &str,
) -> ApiResult<ApiResponse> {
    let user = ctx.require_user(req).await?;

    let invitation = ctx
        .database
        .get_invitation_by_token(token)
        .await?
        .filter(|i| i.is_pending())
        .ok_or_else(|| ApiError::not_found("Invalid or expired invitation"))?;

    if !invitation.email.eq_ignore_ascii_case(&user.email) {
        return Err(ApiError::forbidden(
            "Invitation is for a different email address",
        ));
    }

    let member = ctx.database.accept_invitation(token, &user.id).await?;

    ctx.audit(CreateActivity::new(&user.id, "join", "team", &member.team_id))
        .await;

    Ok(ApiResponse::json(
        200,
        &JoinedTeamResponse {
            message: "Successfully joined team",
            team_id: member.team_id,
        },
    )?)
}
