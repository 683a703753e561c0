use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who may see a project besides its creator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
    Team,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Team => "team",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            "team" => Some(Self::Team),
            _ => None,
        }
    }
}

impl From<String> for Visibility {
    fn from(s: String) -> Self {
        Self::parse(&s).unwrap_or_default()
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-postgres", derive(sqlx::FromRow))]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    #[cfg_attr(feature = "sqlx-postgres", sqlx(try_from = "String"))]
    pub visibility: Visibility,
    pub progress: i32,
    #[serde(rename = "teamId")]
    pub team_id: Option<String>,
    #[serde(rename = "createdBy")]
    pub created_by: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateProject {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub visibility: Visibility,
    pub team_id: Option<String>,
    pub created_by: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateProject {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub visibility: Option<Visibility>,
    pub progress: Option<i32>,
}

/// Listing filter. Only projects `viewer_id` can see are returned.
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub viewer_id: String,
    pub category: Option<String>,
    /// Case-insensitive substring of title or description.
    pub search: Option<String>,
    pub visibility: Option<Visibility>,
}

impl ProjectFilter {
    pub fn for_viewer(viewer_id: impl Into<String>) -> Self {
        Self {
            viewer_id: viewer_id.into(),
            ..Default::default()
        }
    }

    /// Attribute filters only; the viewer rule is checked separately.
    pub fn matches(&self, project: &Project) -> bool {
        if let Some(category) = &self.category
            && project.category.as_deref() != Some(category.as_str())
        {
            return false;
        }
        if let Some(visibility) = self.visibility
            && project.visibility != visibility
        {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_title = project.title.to_lowercase().contains(&needle);
            let in_description = project
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !in_title && !in_description {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-postgres", derive(sqlx::FromRow))]
pub struct Paper {
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    #[cfg_attr(feature = "sqlx-postgres", sqlx(rename = "abstract"))]
    pub abstract_text: Option<String>,
    #[serde(rename = "fileUrl")]
    pub file_url: Option<String>,
    #[serde(rename = "projectId")]
    pub project_id: String,
    #[serde(rename = "uploadedBy")]
    pub uploaded_by: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Paper plus the number of citations recorded against it.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "sqlx-postgres", derive(sqlx::FromRow))]
pub struct PaperWithCitations {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx-postgres", sqlx(flatten))]
    pub paper: Paper,
    #[serde(rename = "citationCount")]
    pub citation_count: i64,
}

#[derive(Debug, Clone)]
pub struct CreatePaper {
    pub title: String,
    pub abstract_text: Option<String>,
    pub file_url: Option<String>,
    pub project_id: String,
    pub uploaded_by: String,
}

#[derive(Debug, Clone, Default)]
pub struct PaperFilter {
    pub viewer_id: String,
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-postgres", derive(sqlx::FromRow))]
pub struct Citation {
    pub id: String,
    #[serde(rename = "paperId")]
    pub paper_id: String,
    #[serde(rename = "citedTitle")]
    pub cited_title: String,
    #[serde(rename = "citedAuthors")]
    pub cited_authors: Option<String>,
    #[serde(rename = "citedYear")]
    pub cited_year: Option<i32>,
    pub doi: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateCitation {
    pub paper_id: String,
    pub cited_title: String,
    pub cited_authors: Option<String>,
    pub cited_year: Option<i32>,
    pub doi: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-postgres", derive(sqlx::FromRow))]
pub struct Dataset {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "fileUrl")]
    pub file_url: String,
    #[serde(rename = "projectId")]
    pub project_id: String,
    #[serde(rename = "uploadedBy")]
    pub uploaded_by: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateDataset {
    pub name: String,
    pub description: Option<String>,
    pub file_url: String,
    pub project_id: String,
    pub uploaded_by: String,
}

#[derive(Debug, Clone, Default)]
pub struct DatasetFilter {
    pub viewer_id: String,
    pub project_id: Option<String>,
}
