use super::*;
use crate::plugins::test_helpers::{self, add_user, create_request, json_body};
use research_hub_core::{CreateProject, MemoryDatabaseAdapter, Project, User, Visibility};
use research_hub_core::adapters::{ProjectOps, ResearchOps};
use serde_json::json;

const BOUNDARY: &str = "research-hub-test-boundary";

/// `(name, filename, bytes)`; a filename marks the part as a file.
fn multipart_request(
    path: &str,
    token: &str,
    parts: &[(&str, Option<&str>, &[u8])],
) -> ApiRequest {
    let mut body = Vec::new();
    for (name, file_name, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let disposition = match file_name {
            Some(f) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                name, f
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name),
        };
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    let mut req = create_request(HttpMethod::Post, path, Some(token), None);
    req.headers.insert(
        "content-type".to_string(),
        format!("multipart/form-data; boundary={}", BOUNDARY),
    );
    req.body = Some(body);
    req
}

async fn call(ctx: &HubContext<MemoryDatabaseAdapter>, req: ApiRequest) -> ApiResult<ApiResponse> {
    ResearchPlugin
        .on_request(&req, ctx)
        .await
        .map(|r| r.expect("route handled"))
}

async fn project_for(
    ctx: &HubContext<MemoryDatabaseAdapter>,
    owner: &User,
    visibility: Visibility,
) -> Project {
    ctx.database
        .create_project(CreateProject {
            title: "Dark matter".into(),
            description: None,
            category: None,
            visibility,
            team_id: None,
            created_by: owner.id.clone(),
        })
        .await
        .unwrap()
}

fn stored_files(dir: &std::path::Path, kind: &str) -> usize {
    std::fs::read_dir(dir.join(kind))
        .map(|entries| entries.count())
        .unwrap_or(0)
}

#[tokio::test]
async fn test_json_paper_without_file() {
    let (ctx, owner, token) = test_helpers::create_test_context_with_user("owner@lab.org").await;
    let project = project_for(&ctx, &owner, Visibility::Private).await;

    let req = create_request(
        HttpMethod::Post,
        "/research/papers",
        Some(&token),
        Some(json!({"title": "Rotation curves", "abstract": "Flat.", "projectId": project.id})),
    );
    let response = call(&ctx, req).await.unwrap();
    assert_eq!(response.status, 201);
    let paper = json_body(&response);
    assert_eq!(paper["title"], "Rotation curves");
    assert_eq!(paper["abstract"], "Flat.");
    assert_eq!(paper["fileUrl"], serde_json::Value::Null);
    assert_eq!(paper["uploadedBy"], owner.id.as_str());
}

#[tokio::test]
async fn test_multipart_paper_is_stored() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_helpers::create_test_context_in(dir.path());
    let (owner, token) = add_user(&ctx, "owner@lab.org", "Owner").await;
    let project = project_for(&ctx, &owner, Visibility::Private).await;

    let req = multipart_request(
        "/research/papers",
        &token,
        &[
            ("title", None, b"Rotation curves"),
            ("projectId", None, project.id.as_bytes()),
            ("file", Some("curves.PDF"), b"%PDF-1.7"),
        ],
    );
    let paper = json_body(&call(&ctx, req).await.unwrap());
    let url = paper["fileUrl"].as_str().unwrap();
    assert!(url.starts_with("/uploads/papers/"));
    assert!(url.ends_with(".pdf"));
    assert_eq!(stored_files(dir.path(), "papers"), 1);
}

#[tokio::test]
async fn test_paper_rejects_bad_extension_and_missing_fields() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_helpers::create_test_context_in(dir.path());
    let (owner, token) = add_user(&ctx, "owner@lab.org", "Owner").await;
    let project = project_for(&ctx, &owner, Visibility::Private).await;

    let req = multipart_request(
        "/research/papers",
        &token,
        &[
            ("title", None, b"Rotation curves"),
            ("projectId", None, project.id.as_bytes()),
            ("file", Some("curves.exe"), b"MZ"),
        ],
    );
    let err = call(&ctx, req).await.unwrap_err();
    assert_eq!(err.status_code(), 400);
    assert_eq!(err.to_string(), "Invalid file type");
    assert_eq!(stored_files(dir.path(), "papers"), 0);

    let req = create_request(
        HttpMethod::Post,
        "/research/papers",
        Some(&token),
        Some(json!({"title": "   ", "projectId": project.id})),
    );
    let err = call(&ctx, req).await.unwrap_err();
    assert_eq!(err.to_string(), "Title and project ID are required");
}

#[tokio::test]
async fn test_only_contributors_add_papers() {
    let (ctx, owner, _) = test_helpers::create_test_context_with_user("owner@lab.org").await;
    let (_, stranger_token) = add_user(&ctx, "stranger@lab.org", "Stranger").await;
    let project = project_for(&ctx, &owner, Visibility::Public).await;

    for project_id in [project.id.as_str(), "missing"] {
        let req = create_request(
            HttpMethod::Post,
            "/research/papers",
            Some(&stranger_token),
            Some(json!({"title": "Intrusion", "projectId": project_id})),
        );
        let err = call(&ctx, req).await.unwrap_err();
        assert_eq!(err.status_code(), 403);
        assert_eq!(
            err.to_string(),
            "Not authorized to add papers to this project"
        );
    }
}

#[tokio::test]
async fn test_citations_and_paper_detail() {
    let (ctx, owner, token) = test_helpers::create_test_context_with_user("owner@lab.org").await;
    let (_, stranger_token) = add_user(&ctx, "stranger@lab.org", "Stranger").await;
    let project = project_for(&ctx, &owner, Visibility::Private).await;

    let req = create_request(
        HttpMethod::Post,
        "/research/papers",
        Some(&token),
        Some(json!({"title": "Rotation curves", "projectId": project.id})),
    );
    let paper_id = json_body(&call(&ctx, req).await.unwrap())["id"]
        .as_str()
        .unwrap()
        .to_string();
    let citations_path = format!("/research/papers/{}/citations", paper_id);

    let req = create_request(
        HttpMethod::Post,
        &citations_path,
        Some(&token),
        Some(json!({"citedTitle": "Galactic Dynamics", "citedYear": 1987, "doi": " "})),
    );
    let response = call(&ctx, req).await.unwrap();
    assert_eq!(response.status, 201);
    let citation = json_body(&response);
    assert_eq!(citation["citedYear"], 1987);
    assert_eq!(citation["doi"], serde_json::Value::Null);

    let req = create_request(
        HttpMethod::Post,
        &citations_path,
        Some(&stranger_token),
        Some(json!({"citedTitle": "Spam"})),
    );
    let err = call(&ctx, req).await.unwrap_err();
    assert_eq!(err.to_string(), "Not authorized to add citations to this paper");

    let req = create_request(
        HttpMethod::Post,
        "/research/papers/missing/citations",
        Some(&token),
        Some(json!({"citedTitle": "Lost"})),
    );
    let err = call(&ctx, req).await.unwrap_err();
    assert_eq!(err.status_code(), 404);

    let req = create_request(
        HttpMethod::Get,
        &format!("/research/papers/{}", paper_id),
        Some(&token),
        None,
    );
    let detail = json_body(&call(&ctx, req).await.unwrap());
    assert_eq!(detail["citationCount"], 1);
    assert_eq!(detail["citations"][0]["citedTitle"], "Galactic Dynamics");
    assert_eq!(detail["uploader"]["email"], "owner@lab.org");

    let req = create_request(
        HttpMethod::Get,
        &format!("/research/papers/{}", paper_id),
        Some(&stranger_token),
        None,
    );
    let err = call(&ctx, req).await.unwrap_err();
    assert_eq!(err.to_string(), "Paper not found");

    let req = create_request(HttpMethod::Get, "/research/papers", Some(&token), None);
    let listed = json_body(&call(&ctx, req).await.unwrap());
    assert_eq!(listed[0]["citationCount"], 1);

    let req = create_request(HttpMethod::Get, "/research/papers", Some(&stranger_token), None);
    let listed = json_body(&call(&ctx, req).await.unwrap());
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn test_dataset_requires_file() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_helpers::create_test_context_in(dir.path());
    let (owner, token) = add_user(&ctx, "owner@lab.org", "Owner").await;
    let (_, stranger_token) = add_user(&ctx, "stranger@lab.org", "Stranger").await;
    let project = project_for(&ctx, &owner, Visibility::Private).await;

    let req = multipart_request(
        "/research/datasets",
        &token,
        &[
            ("name", None, b"Survey"),
            ("projectId", None, project.id.as_bytes()),
        ],
    );
    let err = call(&ctx, req).await.unwrap_err();
    assert_eq!(err.to_string(), "No file uploaded");

    let req = multipart_request(
        "/research/datasets",
        &token,
        &[
            ("name", None, b"Survey"),
            ("description", None, b"Raw counts"),
            ("projectId", None, project.id.as_bytes()),
            ("file", Some("survey.csv"), b"a,b\n1,2\n"),
        ],
    );
    let response = call(&ctx, req).await.unwrap();
    assert_eq!(response.status, 201);
    let dataset = json_body(&response);
    assert_eq!(dataset["description"], "Raw counts");
    assert!(
        dataset["fileUrl"]
            .as_str()
            .unwrap()
            .starts_with("/uploads/datasets/")
    );
    assert_eq!(stored_files(dir.path(), "datasets"), 1);

    let own_path = format!("/research/projects/{}/datasets", project.id);
    let req = create_request(HttpMethod::Get, &own_path, Some(&token), None);
    let listed = json_body(&call(&ctx, req).await.unwrap());
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let req = create_request(HttpMethod::Get, &own_path, Some(&stranger_token), None);
    let listed = json_body(&call(&ctx, req).await.unwrap());
    assert_eq!(listed, json!([]));

    let req = multipart_request(
        "/research/datasets",
        &stranger_token,
        &[
            ("name", None, b"Spam"),
            ("projectId", None, project.id.as_bytes()),
            ("file", Some("spam.csv"), b"x"),
        ],
    );
    let err = call(&ctx, req).await.unwrap_err();
    assert_eq!(err.status_code(), 403);
    assert_eq!(
        err.to_string(),
        "Not authorized to add datasets to this project"
    );
}

#[tokio::test]
async fn test_list_datasets_across_projects() {
    let (ctx, owner, token) = test_helpers::create_test_context_with_user("owner@lab.org").await;
    let open = project_for(&ctx, &owner, Visibility::Public).await;
    let closed = project_for(&ctx, &owner, Visibility::Private).await;
    for (project, name) in [(&open, "open.csv"), (&closed, "closed.csv")] {
        ctx.database
            .create_dataset(research_hub_core::CreateDataset {
                name: name.into(),
                description: None,
                file_url: format!("/uploads/datasets/{}", name),
                project_id: project.id.clone(),
                uploaded_by: owner.id.clone(),
            })
            .await
            .unwrap();
    }
    let (_, other_token) = add_user(&ctx, "other@lab.org", "Other").await;

    let req = create_request(HttpMethod::Get, "/research/datasets", Some(&token), None);
    let mine = json_body(&call(&ctx, req).await.unwrap());
    assert_eq!(mine[0]["name"], "closed.csv");
    assert_eq!(mine[1]["name"], "open.csv");

    let req = create_request(HttpMethod::Get, "/research/datasets", Some(&other_token), None);
    let theirs = json_body(&call(&ctx, req).await.unwrap());
    assert_eq!(theirs.as_array().unwrap().len(), 1);
    assert_eq!(theirs[0]["name"], "open.csv");
}
