//! HTTP client for the document table holding article rows.
//!
//! The table speaks a single-endpoint JSON protocol: every operation is a
//! POST to the endpoint root with the operation named in the target header.
//! Rows are maps of typed attribute values keyed by the composite
//! `(type, publishDate)` pair.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use inkpost_core::article::{Article, Slug, Timestamp};
use inkpost_core::auth::CredentialsCell;
use inkpost_core::store::{
    ARTICLE_PARTITION, ArticlePage, ArticleQuery, ArticleStore, PageToken, StoreError,
};

use super::error::{RemoteError, map_response_error};
use super::shared::{ServiceClient, TARGET_HEADER};

const QUERY_TARGET: &str = "TableService.Query";
const PUT_ITEM_TARGET: &str = "TableService.PutItem";
const DELETE_ITEM_TARGET: &str = "TableService.DeleteItem";

/// Configuration for the table client.
#[derive(Clone, Debug)]
pub struct TableConfig {
    pub(crate) service: super::shared::ServiceConfig,
    pub(crate) table_name: String,
}

impl TableConfig {
    pub fn new(base_url: &str, table_name: impl Into<String>) -> Result<Self, RemoteError> {
        let table_name = table_name.into();
        if table_name.is_empty() {
            return Err(RemoteError::InvalidConfiguration(
                "Table name cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            service: super::shared::ServiceConfig::new(base_url)?,
            table_name,
        })
    }

    #[must_use]
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.service = self.service.timeout(timeout);
        self
    }
}

/// Article table client.
///
/// Two instances usually exist side by side: an [`anonymous`] reader whose
/// queries go out unsigned, and a writer sharing the login flow's
/// [`CredentialsCell`] so its puts and deletes pick up credentials the
/// moment a login succeeds.
///
/// [`anonymous`]: TableClient::anonymous
#[derive(Clone, Debug)]
pub struct TableClient {
    shared: ServiceClient,
    table_name: String,
}

impl TableClient {
    pub fn new(config: TableConfig, credentials: CredentialsCell) -> Result<Self, RemoteError> {
        let shared = ServiceClient::new(config.service, credentials)?;
        debug!(base_url = %shared.base_url(), table = %config.table_name, "Table client initialized.");
        Ok(Self {
            shared,
            table_name: config.table_name,
        })
    }

    /// A client with an empty credentials cell, for read-only use.
    pub fn anonymous(config: TableConfig) -> Result<Self, RemoteError> {
        Self::new(config, CredentialsCell::new())
    }

    /// Posts `request` under `target` and deserializes the response body.
    async fn call<Req, Resp>(&self, target: &str, request: &Req) -> Result<Resp, RemoteError>
    where
        Req: Serialize + ?Sized,
        Resp: for<'de> Deserialize<'de>,
    {
        let url = self.shared.url("")?;
        trace!(target, url = %url, "Sending table request");

        let builder = self
            .shared
            .http_client()
            .post(url)
            .header(TARGET_HEADER, target)
            .json(request);
        let response = self.shared.authorize(builder).await.send().await?;

        if !response.status().is_success() {
            return Err(map_response_error(response).await);
        }

        let body_text = response.text().await?;
        serde_json::from_str(&body_text).map_err(|source| RemoteError::ResponseParsing {
            context: format!("{} response", target),
            source,
        })
    }

    /// Posts `request` under `target`, discarding the response body.
    async fn execute<Req>(&self, target: &str, request: &Req) -> Result<(), RemoteError>
    where
        Req: Serialize + ?Sized,
    {
        let url = self.shared.url("")?;
        trace!(target, url = %url, "Sending table request");

        let builder = self
            .shared
            .http_client()
            .post(url)
            .header(TARGET_HEADER, target)
            .json(request);
        let response = self.shared.authorize(builder).await.send().await?;

        if !response.status().is_success() {
            return Err(map_response_error(response).await);
        }
        Ok(())
    }
}

#[async_trait]
impl ArticleStore for TableClient {
    #[instrument(skip(self, query), fields(table = %self.table_name))]
    async fn query(&self, query: &ArticleQuery) -> Result<ArticlePage, StoreError> {
        let start = match &query.start {
            Some(token) => Some(decode_page_token(token)?),
            None => None,
        };
        let request = QueryRequest {
            table_name: &self.table_name,
            limit: query.limit,
            scan_index_forward: !query.newest_first,
            key_conditions: KeyConditions {
                kind: Condition::eq_string(ARTICLE_PARTITION),
                publish_date: Condition::ge_number(query.min_publish_date.as_millis()),
            },
            exclusive_start_key: start,
        };

        let response: QueryResponse = self.call(QUERY_TARGET, &request).await.map_err(StoreError::from)?;
        debug!(count = response.items.len(), "Queried article rows");

        let items = response
            .items
            .into_iter()
            .map(ArticleRecord::into_article)
            .collect::<Result<Vec<Article>, RemoteError>>()
            .map_err(StoreError::from)?;
        let next = response.last_evaluated_key.map(encode_page_token);

        Ok(ArticlePage { items, next })
    }

    #[instrument(skip(self, article), fields(table = %self.table_name, slug = %article.slug))]
    async fn put(&self, article: &Article) -> Result<(), StoreError> {
        let request = PutItemRequest {
            table_name: &self.table_name,
            item: ArticleRecord::from(article),
        };
        self.execute(PUT_ITEM_TARGET, &request)
            .await
            .map_err(StoreError::from)
    }

    #[instrument(skip(self), fields(table = %self.table_name))]
    async fn delete(&self, publish_date: Timestamp) -> Result<(), StoreError> {
        let request = DeleteItemRequest {
            table_name: &self.table_name,
            key: KeyRecord::article(publish_date),
        };
        self.execute(DELETE_ITEM_TARGET, &request)
            .await
            .map_err(StoreError::from)
    }
}

// ============== Wire Structures ==============

/// Typed attribute value. Numbers travel as strings on the wire.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
enum AttributeValue {
    S(String),
    N(String),
}

impl AttributeValue {
    fn number(value: i64) -> Self {
        AttributeValue::N(value.to_string())
    }

    fn as_string(&self, attribute: &str) -> Result<String, RemoteError> {
        match self {
            AttributeValue::S(s) => Ok(s.clone()),
            AttributeValue::N(_) => Err(RemoteError::UnexpectedResponse(format!(
                "Attribute '{}' holds a number, expected a string",
                attribute
            ))),
        }
    }

    fn as_number(&self, attribute: &str) -> Result<i64, RemoteError> {
        match self {
            AttributeValue::N(n) => n.parse::<i64>().map_err(|e| {
                RemoteError::UnexpectedResponse(format!(
                    "Attribute '{}' holds unparsable number '{}': {}",
                    attribute, n, e
                ))
            }),
            AttributeValue::S(_) => Err(RemoteError::UnexpectedResponse(format!(
                "Attribute '{}' holds a string, expected a number",
                attribute
            ))),
        }
    }
}

/// A full article row.
#[derive(Serialize, Deserialize, Debug, Clone)]
struct ArticleRecord {
    #[serde(rename = "type")]
    kind: AttributeValue,
    #[serde(rename = "publishDate")]
    publish_date: AttributeValue,
    title: AttributeValue,
    body: AttributeValue,
    slug: AttributeValue,
}

impl ArticleRecord {
    fn into_article(self) -> Result<Article, RemoteError> {
        Ok(Article {
            slug: Slug::from_raw(self.slug.as_string("slug")?),
            publish_date: Timestamp::from_millis(self.publish_date.as_number("publishDate")?),
            title: self.title.as_string("title")?,
            body: self.body.as_string("body")?,
        })
    }
}

impl From<&Article> for ArticleRecord {
    fn from(article: &Article) -> Self {
        ArticleRecord {
            kind: AttributeValue::S(ARTICLE_PARTITION.to_string()),
            publish_date: AttributeValue::number(article.publish_date.as_millis()),
            title: AttributeValue::S(article.title.clone()),
            body: AttributeValue::S(article.body.clone()),
            slug: AttributeValue::S(article.slug.to_string()),
        }
    }
}

/// The composite key identifying a row.
#[derive(Serialize, Deserialize, Debug, Clone)]
struct KeyRecord {
    #[serde(rename = "type")]
    kind: AttributeValue,
    #[serde(rename = "publishDate")]
    publish_date: AttributeValue,
}

impl KeyRecord {
    fn article(publish_date: Timestamp) -> Self {
        KeyRecord {
            kind: AttributeValue::S(ARTICLE_PARTITION.to_string()),
            publish_date: AttributeValue::number(publish_date.as_millis()),
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct Condition {
    attribute_value_list: Vec<AttributeValue>,
    comparison_operator: &'static str,
}

impl Condition {
    fn eq_string(value: &str) -> Self {
        Condition {
            attribute_value_list: vec![AttributeValue::S(value.to_string())],
            comparison_operator: "EQ",
        }
    }

    fn ge_number(value: i64) -> Self {
        Condition {
            attribute_value_list: vec![AttributeValue::number(value)],
            comparison_operator: "GE",
        }
    }
}

#[derive(Serialize, Debug)]
struct KeyConditions {
    #[serde(rename = "type")]
    kind: Condition,
    #[serde(rename = "publishDate")]
    publish_date: Condition,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct QueryRequest<'a> {
    table_name: &'a str,
    limit: usize,
    scan_index_forward: bool,
    key_conditions: KeyConditions,
    #[serde(skip_serializing_if = "Option::is_none")]
    exclusive_start_key: Option<KeyRecord>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct QueryResponse {
    #[serde(default)]
    items: Vec<ArticleRecord>,
    #[serde(default)]
    last_evaluated_key: Option<KeyRecord>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct PutItemRequest<'a> {
    table_name: &'a str,
    item: ArticleRecord,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct DeleteItemRequest<'a> {
    table_name: &'a str,
    key: KeyRecord,
}

// Continuation tokens are the serialized last-evaluated key.

fn encode_page_token(key: KeyRecord) -> PageToken {
    // KeyRecord serialization cannot fail: string keys, no non-string maps.
    let raw = serde_json::to_string(&key).unwrap_or_default();
    PageToken::new(raw)
}

fn decode_page_token(token: &PageToken) -> Result<KeyRecord, StoreError> {
    serde_json::from_str(token.as_str())
        .map_err(|e| StoreError::InvalidRequest(format!("Malformed page token: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_request_matches_wire_shape() {
        let request = QueryRequest {
            table_name: "blog",
            limit: 20,
            scan_index_forward: false,
            key_conditions: KeyConditions {
                kind: Condition::eq_string(ARTICLE_PARTITION),
                publish_date: Condition::ge_number(0),
            },
            exclusive_start_key: None,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "TableName": "blog",
                "Limit": 20,
                "ScanIndexForward": false,
                "KeyConditions": {
                    "type": {
                        "AttributeValueList": [{"S": "article"}],
                        "ComparisonOperator": "EQ"
                    },
                    "publishDate": {
                        "AttributeValueList": [{"N": "0"}],
                        "ComparisonOperator": "GE"
                    }
                }
            })
        );
    }

    #[test]
    fn put_request_carries_the_full_typed_row() {
        let article = Article::new("Hello, World!", "body text", Timestamp::from_millis(42));
        let request = PutItemRequest {
            table_name: "blog",
            item: ArticleRecord::from(&article),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "TableName": "blog",
                "Item": {
                    "type": {"S": "article"},
                    "publishDate": {"N": "42"},
                    "title": {"S": "Hello, World!"},
                    "body": {"S": "body text"},
                    "slug": {"S": "hello--world-"}
                }
            })
        );
    }

    #[test]
    fn delete_request_keys_on_partition_and_date() {
        let request = DeleteItemRequest {
            table_name: "blog",
            key: KeyRecord::article(Timestamp::from_millis(42)),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "TableName": "blog",
                "Key": {
                    "type": {"S": "article"},
                    "publishDate": {"N": "42"}
                }
            })
        );
    }

    #[test]
    fn query_response_rows_become_articles() {
        let body = json!({
            "Items": [{
                "type": {"S": "article"},
                "publishDate": {"N": "42"},
                "title": {"S": "Hello"},
                "body": {"S": "text"},
                "slug": {"S": "hello"}
            }],
            "LastEvaluatedKey": {
                "type": {"S": "article"},
                "publishDate": {"N": "42"}
            }
        });

        let response: QueryResponse = serde_json::from_value(body).unwrap();
        let article = response.items[0].clone().into_article().unwrap();
        assert_eq!(article.title, "Hello");
        assert_eq!(article.publish_date.as_millis(), 42);
        assert_eq!(article.slug.as_str(), "hello");

        let token = encode_page_token(response.last_evaluated_key.unwrap());
        let key = decode_page_token(&token).unwrap();
        assert_eq!(key.publish_date, AttributeValue::N("42".to_string()));
    }

    #[test]
    fn mistyped_attribute_is_an_unexpected_response() {
        let record = ArticleRecord {
            kind: AttributeValue::S("article".to_string()),
            publish_date: AttributeValue::S("not a number".to_string()),
            title: AttributeValue::S("Hello".to_string()),
            body: AttributeValue::S("text".to_string()),
            slug: AttributeValue::S("hello".to_string()),
        };
        assert!(matches!(
            record.into_article(),
            Err(RemoteError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn malformed_page_token_is_an_invalid_request() {
        let result = decode_page_token(&PageToken::new("{not json"));
        assert!(matches!(result, Err(StoreError::InvalidRequest(_))));
    }
}
