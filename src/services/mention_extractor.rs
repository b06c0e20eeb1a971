use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::feed_collector::{FeedComment, FeedPost};
use super::market_data::MarketDataClient;
use crate::models::mentions::{SOURCE_COMMENT, SOURCE_POST};
use crate::models::NewMention;
use crate::repositories::MarketStore;
use crate::utils::bigdecimal_parser::decimal_from_f64;

const MAX_CASHTAG_LEN: usize = 5;

/// 将抓取到的帖子/评论转换为股票提及记录，返回写入条数
#[async_trait]
pub trait MentionExtractor: Send + Sync {
    async fn process_posts(&self, posts: &[FeedPost]) -> anyhow::Result<usize>;

    async fn process_comments(&self, comments: &[FeedComment]) -> anyhow::Result<usize>;
}

/// `$` + 1..=5 ASCII letters, trailing punctuation ignored, upper-cased, first occurrence order.
pub fn extract_cashtags(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut tags = Vec::new();

    for token in text.split_whitespace() {
        let Some(rest) = token.strip_prefix('$') else {
            continue;
        };
        let candidate = rest.trim_end_matches(|c: char| c.is_ascii_punctuation());
        if candidate.is_empty()
            || candidate.len() > MAX_CASHTAG_LEN
            || !candidate.chars().all(|c| c.is_ascii_alphabetic())
        {
            continue;
        }
        let symbol = candidate.to_ascii_uppercase();
        if seen.insert(symbol.clone()) {
            tags.push(symbol);
        }
    }

    tags
}

struct Candidate<'a> {
    kind: &'static str,
    id: &'a str,
    author: &'a str,
    text: String,
    created_at: DateTime<Utc>,
}

/// 基于 $TICKER 写法的提及识别
pub struct CashtagExtractor {
    store: Arc<dyn MarketStore>,
    market: Arc<MarketDataClient>,
}

impl CashtagExtractor {
    pub fn new(store: Arc<dyn MarketStore>, market: Arc<MarketDataClient>) -> Self {
        Self { store, market }
    }

    async fn price_at(&self, symbol: &str, at: DateTime<Utc>) -> Option<f64> {
        match self.market.historical_quote(symbol, at).await {
            Ok(quote) => Some(quote.price),
            Err(e) => {
                tracing::debug!("historical quote for {} unavailable ({}), using current", symbol, e);
                match self.market.current_quote(symbol).await {
                    Ok(quote) => Some(quote.price),
                    Err(e) => {
                        tracing::warn!("no price for {} at {}: {}", symbol, at, e);
                        None
                    }
                }
            }
        }
    }

    async fn process_one(&self, item: Candidate<'_>) -> anyhow::Result<usize> {
        let mut stored = 0;
        for symbol in extract_cashtags(&item.text) {
            let Some(ticker) = self.store.find_ticker(&symbol).await? else {
                continue;
            };
            if !ticker.is_tradable() {
                continue;
            }
            let Some(price) = self.price_at(&ticker.symbol, item.created_at).await.and_then(decimal_from_f64)
            else {
                continue;
            };

            let inserted = self
                .store
                .insert_mention(NewMention {
                    ticker_id: ticker.id,
                    username: item.author.to_string(),
                    source_kind: item.kind.to_string(),
                    source_id: item.id.to_string(),
                    price,
                    mentioned_at: item.created_at,
                })
                .await?;
            if inserted {
                stored += 1;
            }
        }
        Ok(stored)
    }

    async fn process_all<'a>(&self, items: impl Iterator<Item = Candidate<'a>> + Send) -> usize {
        let mut stored = 0;
        for item in items {
            let kind = item.kind;
            let id = item.id;
            match self.process_one(item).await {
                Ok(count) => stored += count,
                Err(e) => tracing::warn!("failed to extract mentions from {} {}: {:#}", kind, id, e),
            }
        }
        stored
    }
}

#[async_trait]
impl MentionExtractor for CashtagExtractor {
    async fn process_posts(&self, posts: &[FeedPost]) -> anyhow::Result<usize> {
        let items = posts.iter().map(|post| Candidate {
            kind: SOURCE_POST,
            id: &post.id,
            author: &post.author,
            text: format!("{} {}", post.title, post.selftext),
            created_at: post.created_at,
        });
        Ok(self.process_all(items).await)
    }

    async fn process_comments(&self, comments: &[FeedComment]) -> anyhow::Result<usize> {
        let items = comments.iter().map(|comment| Candidate {
            kind: SOURCE_COMMENT,
            id: &comment.id,
            author: &comment.author,
            text: comment.body.clone(),
            created_at: comment.created_at,
        });
        Ok(self.process_all(items).await)
    }
}
