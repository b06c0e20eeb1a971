use anyhow::Context;
use chrono::Utc;
use serde_json::json;

use super::execution::JobReport;
use crate::services::feed_collector::FeedCollector;
use crate::services::mention_extractor::MentionExtractor;

/// 抓取单个社区最近的帖子与评论，交给提及识别入库
pub async fn run_feed_crawl(
    feed: &FeedCollector,
    extractor: &dyn MentionExtractor,
    source: &str,
    lookback: chrono::Duration,
) -> anyhow::Result<JobReport> {
    let cutoff = Utc::now() - lookback;
    let crawl = feed
        .crawl(source, cutoff)
        .await
        .with_context(|| format!("crawl of r/{} failed", source))?;

    tracing::info!(
        "r/{} 抓取完成：{} 个帖子，{} 条评论",
        source,
        crawl.posts.len(),
        crawl.comments.len()
    );

    let mut report = JobReport {
        total: crawl.posts.len() + crawl.comments.len(),
        ..Default::default()
    };

    let post_mentions = match extractor.process_posts(&crawl.posts).await {
        Ok(stored) => {
            report.success += crawl.posts.len();
            stored
        }
        Err(e) => {
            tracing::error!("处理 r/{} 帖子失败: {:#}", source, e);
            report.failed += crawl.posts.len();
            0
        }
    };

    let comment_mentions = match extractor.process_comments(&crawl.comments).await {
        Ok(stored) => {
            report.success += crawl.comments.len();
            stored
        }
        Err(e) => {
            tracing::error!("处理 r/{} 评论失败: {:#}", source, e);
            report.failed += crawl.comments.len();
            0
        }
    };

    tracing::info!(
        "r/{} 处理完成，新增提及：帖子 {}，评论 {}",
        source,
        post_mentions,
        comment_mentions
    );
    report.details = Some(json!({
        "source": source,
        "posts": crawl.posts.len(),
        "comments": crawl.comments.len(),
        "post_mentions": post_mentions,
        "comment_mentions": comment_mentions,
    }));
    Ok(report)
}
