use async_trait::async_trait;

use research_hub_core::adapters::DatabaseAdapter;
use research_hub_core::{ApiRequest, ApiResponse, ApiResult, ApiRoute, HttpMethod};
use research_hub_core::{HubContext, HubPlugin};

mod handlers;

#[cfg(test)]
mod tests;

/// Papers, citations and datasets under `/research`.
///
/// Papers and datasets may be submitted as `multipart/form-data` with the
/// file in the `file` field, or as a JSON object of the same fields.
pub struct ResearchPlugin;

#[async_trait]
impl<DB: DatabaseAdapter> HubPlugin<DB> for ResearchPlugin {
    fn name(&self) -> &'static str {
        "research"
    }

    fn routes(&self) -> Vec<ApiRoute> {
        vec![
            ApiRoute::post("/research/papers", "create_paper"),
            ApiRoute::get("/research/papers", "list_papers"),
            ApiRoute::get("/research/papers/{id}", "get_paper"),
            ApiRoute::post("/research/papers/{id}/citations", "add_citation"),
            ApiRoute::post("/research/datasets", "create_dataset"),
            ApiRoute::get("/research/datasets", "list_datasets"),
            ApiRoute::get("/research/projects/{projectId}/datasets", "project_datasets"),
        ]
    }

    async fn on_request(
        &self,
        req: &ApiRequest,
        ctx: &HubContext<DB>,
    ) -> ApiResult<Option<ApiResponse>> {
        let segments = req.segments();
        let response = match (req.method(), segments.as_slice()) {
            (HttpMethod::Post, ["research", "papers"]) => {
                handlers::handle_create_paper(req, ctx).await?
            }
            (HttpMethod::Get, ["research", "papers"]) => {
                handlers::handle_list_papers(req, ctx).await?
            }
            (HttpMethod::Get, ["research", "papers", id]) => {
                handlers::handle_get_paper(req, ctx, id).await?
            }
            (HttpMethod::Post, ["research", "papers", id, "citations"]) => {
                handlers::handle_add_citation(req, ctx, id).await?
            }
            (HttpMethod::Post, ["research", "datasets"]) => {
                handlers::handle_create_dataset(req, ctx).await?
            }
            (HttpMethod::Get, ["research", "datasets"]) => {
                handlers::handle_list_datasets(req, ctx, None).await?
            }
            (HttpMethod::Get, ["research", "projects", project_id, "datasets"]) => {
                handlers::handle_list_datasets(req, ctx, Some(*project_id)).await?
            }
            _ => return Ok(None),
        };
        Ok(Some(response))
    }
}
