//! GraphQL response shapes and their mapping into domain snapshots.

use chrono::{DateTime, Utc};
use prcheck_domain::{
    Commit, CommitId, IssueComment, PrimitiveError, PullRequest, PullRequestNumber, TimelineEvent,
    TimelineEventKind,
};
use serde::Deserialize;

/// Top-level GraphQL envelope.
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

#[derive(Debug, Deserialize)]
pub struct Edges<T> {
    #[serde(default = "Vec::new")]
    pub edges: Vec<Edge<T>>,
}

#[derive(Debug, Deserialize)]
pub struct Edge<T> {
    pub node: Option<T>,
}

impl<T> Edges<T> {
    fn into_nodes(self) -> impl Iterator<Item = T> {
        self.edges.into_iter().filter_map(|edge| edge.node)
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchData {
    pub search: SearchConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConnection {
    #[serde(default)]
    pub edges: Vec<Edge<PullRequestNode>>,
    pub page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestNode {
    pub id: String,
    pub number: u64,
    pub title: String,
    pub url: String,
    pub base_ref_name: String,
    pub base_ref_oid: Option<String>,
    pub head_ref_name: String,
    pub is_cross_repository: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub repository: RepositoryNode,
    pub head_ref: Option<HeadRefNode>,
    pub labels: Option<Edges<LabelNode>>,
    pub reviews: Option<TotalCount>,
    pub timeline_items: Option<Edges<TimelineNode>>,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryNode {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct HeadRefNode {
    pub target: Option<CommitNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitNode {
    pub oid: String,
    pub abbreviated_oid: String,
    pub authored_date: Option<DateTime<Utc>>,
    pub committed_date: Option<DateTime<Utc>>,
    pub pushed_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message: String,
    pub author: Option<AuthorNode>,
}

#[derive(Debug, Deserialize)]
pub struct AuthorNode {
    pub user: Option<UserNode>,
}

#[derive(Debug, Deserialize)]
pub struct UserNode {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct LabelNode {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalCount {
    pub total_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventNode {
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub body_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
pub enum TimelineNode {
    BaseRefChangedEvent(EventNode),
    BaseRefForcePushedEvent(EventNode),
    HeadRefForcePushedEvent(EventNode),
    ReopenedEvent(EventNode),
    IssueComment(CommentNode),
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangedFilesData {
    pub repository: Option<ChangedFilesRepository>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangedFilesRepository {
    pub pull_request: Option<ChangedFilesPullRequest>,
}

#[derive(Debug, Deserialize)]
pub struct ChangedFilesPullRequest {
    pub files: Option<FilesConnection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesConnection {
    #[serde(default)]
    pub edges: Vec<Edge<FileNode>>,
    pub page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
pub struct FileNode {
    pub path: String,
}

impl FilesConnection {
    pub fn paths(self) -> (Vec<Box<str>>, PageInfo) {
        let paths = self
            .edges
            .into_iter()
            .filter_map(|edge| edge.node)
            .map(|node| node.path.into_boxed_str())
            .collect();
        (paths, self.page_info)
    }
}

/// Why a search result could not become a snapshot.
#[derive(Debug)]
pub enum Unmappable {
    /// The head branch was deleted; there is no commit to report.
    MissingHeadCommit,
    /// An identifier failed domain validation.
    Invalid(PrimitiveError),
}

impl From<PrimitiveError> for Unmappable {
    fn from(error: PrimitiveError) -> Self {
        Self::Invalid(error)
    }
}

impl PullRequestNode {
    pub fn into_snapshot(self) -> Result<PullRequest, Unmappable> {
        let commit = self
            .head_ref
            .and_then(|head_ref| head_ref.target)
            .ok_or(Unmappable::MissingHeadCommit)?;

        let mut events = Vec::new();
        let mut comments = Vec::new();
        for node in self.timeline_items.map(Edges::into_nodes).into_iter().flatten() {
            let (kind, created_at) = match node {
                TimelineNode::BaseRefChangedEvent(event) => {
                    (TimelineEventKind::BaseRefChanged, event.created_at)
                },
                TimelineNode::BaseRefForcePushedEvent(event) => {
                    (TimelineEventKind::BaseRefForcePushed, event.created_at)
                },
                TimelineNode::HeadRefForcePushedEvent(event) => {
                    (TimelineEventKind::HeadRefForcePushed, event.created_at)
                },
                TimelineNode::ReopenedEvent(event) => {
                    (TimelineEventKind::Reopened, event.created_at)
                },
                TimelineNode::IssueComment(comment) => {
                    comments.push(IssueComment {
                        body: comment.body_text.into_boxed_str(),
                        created_at: comment.created_at,
                    });
                    (TimelineEventKind::IssueComment, comment.created_at)
                },
                TimelineNode::Other => continue,
            };
            events.push(TimelineEvent { kind, created_at });
        }

        Ok(PullRequest {
            number: PullRequestNumber::new(self.number)?,
            node_id: self.id.into_boxed_str(),
            title: self.title.into_boxed_str(),
            url: self.url.into_boxed_str(),
            repository_url: self.repository.url.into_boxed_str(),
            base_ref_name: self.base_ref_name.into_boxed_str(),
            base_ref_oid: self.base_ref_oid.map(CommitId::parse).transpose()?,
            head_ref_name: self.head_ref_name.into_boxed_str(),
            is_cross_repository: self.is_cross_repository,
            created_at: self.created_at,
            updated_at: self.updated_at,
            head_commit: Commit {
                id: CommitId::parse(commit.oid)?,
                abbreviated_id: commit.abbreviated_oid.into_boxed_str(),
                authored_at: commit.authored_date,
                committed_at: commit.committed_date,
                pushed_at: commit.pushed_date,
                message: commit.message.into_boxed_str(),
                author: commit
                    .author
                    .and_then(|author| author.user)
                    .map(|user| user.login.into_boxed_str()),
            },
            events,
            comments,
            approved_review_count: self.reviews.map_or(0, |reviews| reviews.total_count),
            labels: self
                .labels
                .map(Edges::into_nodes)
                .into_iter()
                .flatten()
                .map(|label| label.name.into_boxed_str())
                .collect(),
            changed_files: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::error::Error;

    fn node_json() -> serde_json::Value {
        json!({
            "id": "PR_kwDOA",
            "number": 1,
            "title": "Add feature",
            "url": "https://github.com/itsdalmo/test-repository/pull/1",
            "baseRefName": "master",
            "baseRefOid": "93eeeedb8a16e6662062d1eca5655108977cc59a",
            "headRefName": "my_branch",
            "isCrossRepository": true,
            "createdAt": "2024-05-01T10:00:00Z",
            "updatedAt": "2024-05-02T10:00:00Z",
            "repository": { "url": "https://github.com/itsdalmo/test-repository" },
            "headRef": { "target": {
                "oid": "commit1",
                "abbreviatedOid": "comm1",
                "authoredDate": "2024-05-01T11:00:00Z",
                "committedDate": "2024-05-01T11:00:00Z",
                "pushedDate": null,
                "message": "commit message1",
                "author": { "user": { "login": "testuser" } }
            }},
            "labels": { "edges": [ { "node": { "name": "enhancement" } } ] },
            "reviews": { "totalCount": 2 },
            "timelineItems": { "edges": [
                { "node": { "__typename": "ReopenedEvent", "createdAt": "2024-05-02T09:00:00Z" } },
                { "node": { "__typename": "IssueComment", "createdAt": "2024-05-02T09:30:00Z", "bodyText": "[build ci]" } },
                { "node": { "__typename": "LabeledEvent" } }
            ]}
        })
    }

    #[test]
    fn maps_node_into_snapshot() -> Result<(), Box<dyn Error>> {
        let node: PullRequestNode = serde_json::from_value(node_json())?;
        let Ok(snapshot) = node.into_snapshot() else {
            return Err("node should map".into());
        };

        assert_eq!(snapshot.number.get(), 1);
        assert_eq!(snapshot.head_commit.id.as_str(), "commit1");
        assert_eq!(snapshot.head_commit.author.as_deref(), Some("testuser"));
        assert_eq!(snapshot.head_commit.pushed_at, None);
        assert!(snapshot.is_cross_repository);
        assert_eq!(snapshot.approved_review_count, 2);
        assert!(snapshot.has_label("enhancement"));
        assert_eq!(snapshot.events.len(), 2);
        assert_eq!(snapshot.events[0].kind, TimelineEventKind::Reopened);
        assert_eq!(snapshot.comments.len(), 1);
        assert_eq!(snapshot.comments[0].body.as_ref(), "[build ci]");
        Ok(())
    }

    #[test]
    fn connections_without_edges_map_to_empty_lists() -> Result<(), Box<dyn Error>> {
        let mut value = node_json();
        value["labels"] = json!({});
        value["timelineItems"] = json!({});
        let node: PullRequestNode = serde_json::from_value(value)?;
        let Ok(snapshot) = node.into_snapshot() else {
            return Err("node should map".into());
        };

        assert!(snapshot.labels.is_empty());
        assert!(snapshot.events.is_empty());
        assert!(snapshot.comments.is_empty());
        Ok(())
    }

    #[test]
    fn deleted_head_ref_is_unmappable() -> Result<(), Box<dyn Error>> {
        let mut value = node_json();
        value["headRef"] = serde_json::Value::Null;
        let node: PullRequestNode = serde_json::from_value(value)?;
        assert!(matches!(node.into_snapshot(), Err(Unmappable::MissingHeadCommit)));
        Ok(())
    }
}
