use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;
use tokio::time::sleep;

use crate::utils::http_client::{Fetch, FetchError};

const REDDIT_BASE_URL: &str = "https://www.reddit.com";
const PAGE_LIMIT: u32 = 100;
const COMMENT_LIMIT: u32 = 500;
const COMMENT_DEPTH: u32 = 10;

/// Envelope kind of a real comment; `more` stubs and anything else are ignored.
pub const COMMENT_KIND: &str = "t1";

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("http error: {0}")]
    Transport(reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<FetchError> for FeedError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Transport(e) => FeedError::Transport(e),
            FetchError::Status(code) => FeedError::Status(code),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedPost {
    pub id: String,
    pub title: String,
    pub author: String,
    pub selftext: String,
    pub created_at: DateTime<Utc>,
    pub url: String,
    pub source: String,
    pub num_comments: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedComment {
    pub id: String,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub post_id: String,
    pub parent_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentNode {
    pub comment: FeedComment,
    pub replies: Vec<CommentNode>,
}

#[derive(Debug, Default)]
pub struct CrawlResult {
    pub posts: Vec<FeedPost>,
    pub comments: Vec<FeedComment>,
}

#[derive(Debug, Deserialize)]
struct Listing<T> {
    data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
struct ListingData<T> {
    #[serde(default = "Vec::new")]
    children: Vec<T>,
    #[serde(default)]
    after: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostThing {
    data: PostData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PostData {
    id: String,
    title: String,
    author: String,
    selftext: String,
    created_utc: f64,
    permalink: String,
    subreddit: String,
    num_comments: u32,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Default, Deserialize)]
struct CommentData {
    #[serde(default)]
    id: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    parent_id: String,
    #[serde(default, deserialize_with = "deserialize_replies")]
    replies: Replies,
}

/// `replies` is absent, `""`, `null` or a nested listing depending on the node.
#[derive(Debug, Default)]
enum Replies {
    #[default]
    None,
    Listing(Vec<Value>),
}

fn deserialize_replies<'de, D>(deserializer: D) -> Result<Replies, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Shape {
        Listing(Listing<Value>),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Option::<Shape>::deserialize(deserializer)? {
        Some(Shape::Listing(listing)) => Replies::Listing(listing.data.children),
        Some(Shape::Other(_)) | None => Replies::None,
    })
}

fn from_epoch(secs: f64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs as i64, 0).unwrap_or_default()
}

impl PostData {
    fn into_post(self) -> FeedPost {
        FeedPost {
            id: self.id,
            title: self.title,
            author: self.author,
            selftext: self.selftext,
            created_at: from_epoch(self.created_utc),
            url: format!("{}{}", REDDIT_BASE_URL, self.permalink),
            source: self.subreddit,
            num_comments: self.num_comments,
        }
    }
}

/// Only `t1` envelopes whose data matches the comment schema survive.
///
/// Children are decoded one by one so a broken sibling never hides the rest.
fn parse_comment_nodes(children: Vec<Value>, post_id: &str) -> Vec<CommentNode> {
    let mut nodes = Vec::with_capacity(children.len());
    for raw in children {
        let child: RawNode = match serde_json::from_value(raw) {
            Ok(child) => child,
            Err(e) => {
                tracing::debug!("skip malformed node under post {}: {}", post_id, e);
                continue;
            }
        };
        if child.kind != COMMENT_KIND {
            continue;
        }
        let data: CommentData = match serde_json::from_value(child.data) {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!("skip malformed comment under post {}: {}", post_id, e);
                continue;
            }
        };
        let replies = match data.replies {
            Replies::Listing(children) => parse_comment_nodes(children, post_id),
            Replies::None => Vec::new(),
        };
        nodes.push(CommentNode {
            comment: FeedComment {
                id: data.id,
                author: data.author,
                body: data.body,
                created_at: from_epoch(data.created_utc),
                post_id: post_id.to_string(),
                parent_id: data.parent_id,
            },
            replies,
        });
    }
    nodes
}

/// Pre-order walk; parent ids keep the shape recoverable.
pub fn flatten(tree: &[CommentNode]) -> Vec<FeedComment> {
    fn walk(nodes: &[CommentNode], out: &mut Vec<FeedComment>) {
        for node in nodes {
            out.push(node.comment.clone());
            walk(&node.replies, out);
        }
    }

    let mut flat = Vec::new();
    walk(tree, &mut flat);
    flat
}

pub struct FeedCollector {
    fetcher: Arc<dyn Fetch>,
    base_url: String,
    page_delay: Duration,
    post_delay: Duration,
}

impl FeedCollector {
    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            fetcher,
            base_url: REDDIT_BASE_URL.to_string(),
            page_delay: Duration::from_secs(2),
            post_delay: Duration::from_secs(2),
        }
    }

    pub fn with_delays(mut self, page_delay: Duration, post_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self.post_delay = post_delay;
        self
    }

    fn listing_url(&self, source: &str, after: Option<&str>) -> String {
        let mut url = format!("{}/r/{}/new.json?limit={}", self.base_url, source, PAGE_LIMIT);
        if let Some(cursor) = after {
            url.push_str("&after=");
            url.push_str(cursor);
        }
        url
    }

    fn comments_url(&self, source: &str, post_id: &str) -> String {
        format!(
            "{}/r/{}/comments/{}.json?limit={}&depth={}",
            self.base_url, source, post_id, COMMENT_LIMIT, COMMENT_DEPTH
        )
    }

    /// Newest-first listing down to `cutoff`.
    ///
    /// Any page failure aborts the whole listing: without every page the
    /// cutoff cannot be located.
    pub async fn fetch_posts(&self, source: &str, cutoff: DateTime<Utc>) -> Result<Vec<FeedPost>, FeedError> {
        let mut posts = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let url = self.listing_url(source, after.as_deref());
            let body = self.fetcher.get_text(&url).await?;
            let page: Listing<PostThing> = serde_json::from_str(&body)?;

            let mut reached_cutoff = false;
            for child in page.data.children {
                let post = child.data.into_post();
                if post.created_at < cutoff {
                    reached_cutoff = true;
                    break;
                }
                posts.push(post);
            }

            let next = page.data.after.filter(|cursor| !cursor.is_empty());
            match next {
                Some(cursor) if !reached_cutoff => {
                    after = Some(cursor);
                    sleep(self.page_delay).await;
                }
                _ => break,
            }
        }

        Ok(posts)
    }

    pub async fn fetch_comments(&self, source: &str, post_id: &str) -> Result<Vec<CommentNode>, FeedError> {
        let url = self.comments_url(source, post_id);
        let body = self.fetcher.get_text(&url).await?;
        let listings: Vec<Listing<Value>> = serde_json::from_str(&body)?;

        // [0] is the post itself, [1] the comment forest
        Ok(listings
            .into_iter()
            .nth(1)
            .map(|listing| parse_comment_nodes(listing.data.children, post_id))
            .unwrap_or_default())
    }

    pub async fn crawl(&self, source: &str, cutoff: DateTime<Utc>) -> Result<CrawlResult, FeedError> {
        tracing::info!("starting crawl for r/{}", source);

        let posts = self.fetch_posts(source, cutoff).await?;
        tracing::info!("found {} posts in r/{} since {}", posts.len(), source, cutoff);

        let mut comments = Vec::new();
        for (index, post) in posts.iter().enumerate() {
            if post.num_comments == 0 {
                continue;
            }

            match self.fetch_comments(source, &post.id).await {
                Ok(tree) => {
                    let flat = flatten(&tree);
                    tracing::debug!(
                        "post {}/{} ({}): fetched {} comments",
                        index + 1,
                        posts.len(),
                        post.id,
                        flat.len()
                    );
                    comments.extend(flat);
                }
                Err(e) => {
                    tracing::warn!("failed to fetch comments for post {}: {}", post.id, e);
                }
            }

            sleep(self.post_delay).await;
        }

        tracing::info!(
            "completed r/{}: {} posts, {} comments",
            source,
            posts.len(),
            comments.len()
        );

        Ok(CrawlResult { posts, comments })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::http_client::testing::ScriptedFetch;
    use serde_json::json;

    fn post(id: &str, created: DateTime<Utc>, num_comments: u32) -> Value {
        json!({
            "kind": "t3",
            "data": {
                "id": id,
                "title": format!("title {id}"),
                "author": "poster",
                "selftext": "",
                "created_utc": created.timestamp() as f64,
                "permalink": format!("/r/stocks/comments/{id}/"),
                "subreddit": "stocks",
                "num_comments": num_comments
            }
        })
    }

    fn page(children: Vec<Value>, after: Value) -> String {
        json!({ "kind": "Listing", "data": { "children": children, "after": after } }).to_string()
    }

    fn collector(fetch: ScriptedFetch) -> (FeedCollector, Arc<ScriptedFetch>) {
        let fetch = Arc::new(fetch);
        let collector = FeedCollector::new(fetch.clone()).with_delays(Duration::ZERO, Duration::ZERO);
        (collector, fetch)
    }

    const NESTED_COMMENTS: &str = r##"[
        {"kind": "Listing", "data": {"children": [{"kind": "t3", "data": {"id": "p1"}}]}},
        {"kind": "Listing", "data": {"children": [
            {"kind": "t1", "data": {"id": "c1", "author": "a", "body": "one", "created_utc": 1700000000.0, "parent_id": "t3_p1",
                "replies": {"kind": "Listing", "data": {"children": [
                    {"kind": "t1", "data": {"id": "c2", "author": "b", "body": "two", "created_utc": 1700000100.0, "parent_id": "t1_c1",
                        "replies": {"kind": "Listing", "data": {"children": [
                            {"kind": "t1", "data": {"id": "c3", "author": "c", "body": "three", "created_utc": 1700000200.0, "parent_id": "t1_c2", "replies": ""}}
                        ]}}}},
                    {"kind": "more", "data": {"id": "m1", "count": 4, "children": ["x1", "x2"]}}
                ]}}}},
            {"kind": "t1", "data": {"id": "c4", "author": "d", "body": "four", "created_utc": 1700000300.0, "parent_id": "t3_p1",
                "replies": {"kind": "Listing", "data": {"children": [
                    {"kind": "t1", "data": {"id": "c5", "author": "e", "body": "five", "created_utc": 1700000400.0, "parent_id": "t1_c4"}}
                ]}}}}
        ]}}
    ]"##;

    #[tokio::test]
    async fn listing_stops_at_first_post_older_than_cutoff() {
        let now = Utc::now();
        let cutoff = now - chrono::Duration::hours(24);
        let first = page(
            vec![post("a", now - chrono::Duration::hours(1), 0), post("b", now - chrono::Duration::hours(2), 0)],
            json!("t3_b"),
        );
        let second = page(
            vec![
                post("c", now - chrono::Duration::hours(3), 0),
                post("d", now - chrono::Duration::hours(30), 0),
                post("e", now - chrono::Duration::hours(2), 0),
            ],
            json!("t3_e"),
        );
        let (collector, fetch) = collector(
            ScriptedFetch::new()
                .respond("after=t3_b", second)
                .respond("new.json", first),
        );

        let posts = collector.fetch_posts("stocks", cutoff).await.unwrap();

        let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        let requested = fetch.requested();
        assert_eq!(requested.len(), 2);
        assert!(requested.iter().all(|url| !url.contains("after=t3_e")));
    }

    #[tokio::test]
    async fn listing_stops_when_cursor_is_exhausted() {
        let now = Utc::now();
        let cutoff = now - chrono::Duration::hours(24);
        for last_cursor in [Value::Null, json!("")] {
            let (collector, fetch) = collector(ScriptedFetch::new().respond(
                "new.json",
                page(vec![post("a", now, 0), post("b", now, 0)], last_cursor),
            ));

            let posts = collector.fetch_posts("stocks", cutoff).await.unwrap();

            assert_eq!(posts.len(), 2);
            assert_eq!(fetch.requested().len(), 1);
        }
    }

    #[tokio::test]
    async fn page_failure_aborts_the_listing() {
        let now = Utc::now();
        let (collector, _) = collector(
            ScriptedFetch::new()
                .fail("after=t3_a", StatusCode::TOO_MANY_REQUESTS)
                .respond("new.json", page(vec![post("a", now, 0)], json!("t3_a"))),
        );

        let err = collector
            .fetch_posts("stocks", now - chrono::Duration::hours(24))
            .await
            .unwrap_err();

        assert!(matches!(err, FeedError::Status(code) if code == StatusCode::TOO_MANY_REQUESTS));
    }

    #[tokio::test]
    async fn malformed_page_is_a_decode_failure() {
        let (collector, _) = collector(ScriptedFetch::new().respond("new.json", "<html>blocked</html>"));

        let err = collector.fetch_posts("stocks", Utc::now()).await.unwrap_err();

        assert!(matches!(err, FeedError::Decode(_)));
    }

    #[tokio::test]
    async fn nested_tree_flattens_in_pre_order() {
        let (collector, _) = collector(ScriptedFetch::new().respond("comments/p1", NESTED_COMMENTS));

        let tree = collector.fetch_comments("stocks", "p1").await.unwrap();
        let flat = flatten(&tree);

        let ids: Vec<&str> = flat.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3", "c4", "c5"]);
        assert_eq!(flat[2].parent_id, "t1_c2");
        assert!(flat.iter().all(|c| c.post_id == "p1"));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn unrecognised_reply_shapes_mean_no_replies() {
        for replies in [json!(""), json!(null), json!(42), json!({"kind": "Listing"}), json!([1, 2])] {
            let node = json!({"id": "c1", "body": "hi", "replies": replies});
            let data: CommentData = serde_json::from_value(node).unwrap();
            assert!(matches!(data.replies, Replies::None));
        }
    }

    #[test]
    fn malformed_comment_data_is_skipped() {
        let children = vec![
            json!({"kind": "t1", "data": {"id": 7, "body": ["not", "text"]}}),
            json!({"kind": "t1", "data": {"id": "ok", "body": "fine"}}),
        ];

        let nodes = parse_comment_nodes(children, "p1");

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].comment.id, "ok");
    }

    #[test]
    fn broken_reply_envelope_keeps_its_siblings() {
        let node = json!({
            "id": "c1",
            "body": "parent",
            "replies": {"kind": "Listing", "data": {"children": [
                "not an object",
                {"kind": null, "data": {"id": "bad"}},
                {"kind": "t1", "data": {"id": "c2", "body": "kept", "parent_id": "t1_c1"}}
            ]}}
        });
        let data: CommentData = serde_json::from_value(node).unwrap();
        let Replies::Listing(children) = data.replies else {
            panic!("replies listing should decode");
        };

        let nodes = parse_comment_nodes(children, "p1");

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].comment.id, "c2");
    }

    #[tokio::test]
    async fn post_and_comment_listings_decode() {
        let now = Utc::now();
        let (collector, _) = collector(
            ScriptedFetch::new()
                .respond("comments/p1", NESTED_COMMENTS)
                .respond("new.json", page(vec![post("p1", now, 5)], Value::Null)),
        );

        let posts = collector.fetch_posts("stocks", now - chrono::Duration::hours(1)).await.unwrap();
        let tree = collector.fetch_comments("stocks", "p1").await.unwrap();

        assert_eq!(posts[0].id, "p1");
        assert_eq!(tree[0].replies[0].comment.id, "c2");
    }

    #[tokio::test]
    async fn single_comment_response_yields_nothing() {
        let (collector, _) = collector(ScriptedFetch::new().respond(
            "comments/p1",
            r#"[{"kind": "Listing", "data": {"children": []}}]"#,
        ));

        assert!(collector.fetch_comments("stocks", "p1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn crawl_skips_posts_whose_comments_fail() {
        let now = Utc::now();
        let listing = page(
            vec![post("p1", now, 5), post("p2", now, 0), post("p3", now, 2)],
            Value::Null,
        );
        let (collector, fetch) = collector(
            ScriptedFetch::new()
                .respond("new.json", listing)
                .respond("comments/p1", NESTED_COMMENTS)
                .fail("comments/p3", StatusCode::SERVICE_UNAVAILABLE),
        );

        let result = collector
            .crawl("stocks", now - chrono::Duration::hours(24))
            .await
            .unwrap();

        assert_eq!(result.posts.len(), 3);
        assert_eq!(result.comments.len(), 5);
        let requested = fetch.requested();
        assert!(requested.iter().all(|url| !url.contains("comments/p2")));
        assert!(requested.iter().any(|url| url.contains("comments/p3")));
    }
}
