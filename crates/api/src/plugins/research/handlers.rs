use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use research_hub_core::adapters::DatabaseAdapter;
use research_hub_core::uploads::parse_multipart;
use research_hub_core::{
    ApiError, ApiRequest, ApiResponse, ApiResult, Citation, CreateActivity, CreateCitation,
    CreateDataset, CreatePaper, DatasetFilter, HubContext, MultipartForm, Paper, PaperFilter,
    StoredFile, UploadKind, UserCard,
};

use crate::plugins::helpers::{
    can_view_project, non_blank, parse_query, require_contributor, trimmed, user_card,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CitationRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "Cited title is required"))]
    cited_title: String,
    cited_authors: Option<String>,
    cited_year: Option<i32>,
    doi: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPapersQuery {
    project_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PaperDetail {
    #[serde(flatten)]
    paper: Paper,
    uploader: Option<UserCard>,
    citation_count: usize,
    citations: Vec<Citation>,
}

/// Read a submission as multipart, or as a flat JSON object whose string
/// and number members become text fields.
async fn read_form<DB: DatabaseAdapter>(
    req: &ApiRequest,
    ctx: &HubContext<DB>,
) -> ApiResult<MultipartForm> {
    if req.is_multipart() {
        return parse_multipart(req, ctx.uploads.max_file_size()).await;
    }

    let body: serde_json::Map<String, Value> = req
        .body_as_json()
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON: {}", e)))?;
    let fields = body
        .into_iter()
        .filter_map(|(name, value)| match value {
            Value::String(s) => Some((name, s)),
            Value::Number(n) => Some((name, n.to_string())),
            _ => None,
        })
        .collect();
    Ok(MultipartForm { fields, file: None })
}

/// Run `write` and remove `stored` again if it fails.
async fn commit_or_discard<DB, T, F>(
    ctx: &HubContext<DB>,
    stored: Option<&StoredFile>,
    write: F,
) -> ApiResult<T>
where
    DB: DatabaseAdapter,
    F: std::future::Future<Output = ApiResult<T>>,
{
    let result = write.await;
    if result.is_err()
        && let Some(stored) = stored
    {
        ctx.uploads.discard(stored).await;
    }
    result
}

pub(super) async fn handle_create_paper<DB: DatabaseAdapter>(
    req: &ApiRequest,
    ctx: &HubContext<DB>,
) -> ApiResult<ApiResponse> {
    let user = ctx.require_user(req).await?;
    let form = read_form(req, ctx).await?;

    let (Some(title), Some(project_id)) = (form.text("title"), form.text("projectId")) else {
        return Err(ApiError::bad_request("Title and project ID are required"));
    };

    require_contributor(
        ctx,
        &project_id,
        &user.id,
        "Not authorized to add papers to this project",
    )
    .await?;

    let stored = match &form.file {
        Some(file) => Some(ctx.uploads.save(UploadKind::Paper, file).await?),
        None => None,
    };

    let create = CreatePaper {
        title,
        abstract_text: form.text("abstract"),
        file_url: stored.as_ref().map(|s| s.url.clone()),
        project_id,
        uploaded_by: user.id.clone(),
    };
    let paper =
        commit_or_discard(ctx, stored.as_ref(), ctx.database.create_paper(create)).await?;

    ctx.audit(CreateActivity::new(&user.id, "create", "paper", &paper.id))
        .await;
    tracing::info!(paper_id = %paper.id, has_file = stored.is_some(), "paper added");

    Ok(ApiResponse::json(201, &paper)?)
}

pub(super) async fn handle_list_papers<DB: DatabaseAdapter>(
    req: &ApiRequest,
    ctx: &HubContext<DB>,
) -> ApiResult<ApiResponse> {
    let user = ctx.require_user(req).await?;
    let query: ListPapersQuery = parse_query(&req.query);

    let papers = ctx
        .database
        .list_papers(PaperFilter {
            viewer_id: user.id,
            project_id: non_blank(query.project_id),
        })
        .await?;
    Ok(ApiResponse::json(200, &papers)?)
}

pub(super) async fn handle_get_paper<DB: DatabaseAdapter>(
    req: &ApiRequest,
    ctx: &HubContext<DB>,
    paper_id: &str,
) -> ApiResult<ApiResponse> {
    let user = ctx.require_user(req).await?;
    let not_found = || ApiError::not_found("Paper not found");

    let paper = ctx.database.get_paper(paper_id).await?.ok_or_else(not_found)?;
    let project = ctx
        .database
        .get_project(&paper.project_id)
        .await?
        .ok_or_else(not_found)?;
    if !can_view_project(ctx, &project, &user.id).await? {
        return Err(not_found());
    }

    let citations = ctx.database.list_citations(&paper.id).await?;
    let uploader = user_card(ctx, &paper.uploaded_by).await?;
    Ok(ApiResponse::json(
        200,
        &PaperDetail {
            paper,
            uploader,
            citation_count: citations.len(),
            citations,
        },
    )?)
}

pub(super) async fn handle_add_citation<DB: DatabaseAdapter>(
    req: &ApiRequest,
    ctx: &HubContext<DB>,
    paper_id: &str,
) -> ApiResult<ApiResponse> {
    let user = ctx.require_user(req).await?;
    let body: CitationRequest = match research_hub_core::validate_request_body(req) {
        Ok(v) => v,
        Err(resp) => return Ok(resp),
    };

    let paper = ctx
        .database
        .get_paper(paper_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Paper not found"))?;
    require_contributor(
        ctx,
        &paper.project_id,
        &user.id,
        "Not authorized to add citations to this paper",
    )
    .await?;

    let citation = ctx
        .database
        .create_citation(CreateCitation {
            paper_id: paper.id,
            cited_title: body.cited_title,
            cited_authors: non_blank(body.cited_authors),
            cited_year: body.cited_year,
            doi: non_blank(body.doi),
        })
        .await?;

    Ok(ApiResponse::json(201, &citation)?)
}

pub(super) async fn handle_create_dataset<DB: DatabaseAdapter>(
    req: &ApiRequest,
    ctx: &HubContext<DB>,
) -> ApiResult<ApiResponse> {
    let user = ctx.require_user(req).await?;
    let form = read_form(req, ctx).await?;

    let (Some(name), Some(project_id)) = (form.text("name"), form.text("projectId")) else {
        return Err(ApiError::bad_request("Name and project ID are required"));
    };

    require_contributor(
        ctx,
        &project_id,
        &user.id,
        "Not authorized to add datasets to this project",
    )
    .await?;

    let file = form
        .file
        .as_ref()
        .ok_or_else(|| ApiError::bad_request("No file uploaded"))?;
    let stored = ctx.uploads.save(UploadKind::Dataset, file).await?;

    let create = CreateDataset {
        name,
        description: form.text("description"),
        file_url: stored.url.clone(),
        project_id,
        uploaded_by: user.id.clone(),
    };
    let dataset =
        commit_or_discard(ctx, Some(&stored), ctx.database.create_dataset(create)).await?;

    ctx.audit(CreateActivity::new(&user.id, "create", "dataset", &dataset.id))
        .await;

    Ok(ApiResponse::json(201, &dataset)?)
}

/// All viewable datasets, or those of one project. A project the caller
/// cannot see yields an empty list.
pub(super) async fn handle_list_datasets<DB: DatabaseAdapter>(
    req: &ApiRequest,
    ctx: &HubContext<DB>,
    project_id: Option<&str>,
) -> ApiResult<ApiResponse> {
    let user = ctx.require_user(req).await?;
    let datasets = ctx
        .database
        .list_datasets(DatasetFilter {
            viewer_id: user.id,
            project_id: project_id.map(str::to_string),
        })
        .await?;
    Ok(ApiResponse::json(200, &datasets)?)
}
