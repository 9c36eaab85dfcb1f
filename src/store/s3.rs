use crate::error::StoreError;
use crate::store::{GetOutcome, ObjectStore};
use anyhow::{Context, Result};
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use std::fmt::Debug;
use tokio::runtime::Runtime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub bucket: String,
    pub endpoint_url: Option<String>,
    pub region: String,
    pub force_path_style: bool,
}

/// S3-compatible bucket (AWS, DigitalOcean Spaces, MinIO). Credentials come
/// from the SDK's default provider chain; retries and timeouts are the SDK's.
pub struct S3Store {
    runtime: Runtime,
    client: Client,
    bucket: String,
    endpoint: String,
}

fn classify<E, R>(key: &str, err: SdkError<E, R>) -> StoreError
where
    E: std::error::Error + 'static,
    R: Debug,
{
    let reason = format!("{}", DisplayErrorContext(&err));
    match err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            StoreError::Unavailable(format!("{key}: {reason}"))
        }
        _ => StoreError::Backend {
            key: key.to_string(),
            reason,
        },
    }
}

impl S3Store {
    pub fn connect(settings: &S3Settings) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start runtime for the S3 client")?;

        let client = runtime.block_on(async {
            let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(Region::new(settings.region.clone()));
            if let Some(endpoint) = settings.endpoint_url.as_deref() {
                loader = loader.endpoint_url(endpoint);
            }
            let shared = loader.load().await;
            let conf = aws_sdk_s3::config::Builder::from(&shared)
                .force_path_style(settings.force_path_style)
                .build();
            Client::from_conf(conf)
        });

        let endpoint = settings
            .endpoint_url
            .clone()
            .unwrap_or_else(|| format!("aws:{}", settings.region));
        Ok(Self::from_client(runtime, client, &settings.bucket, endpoint))
    }

    fn from_client(runtime: Runtime, client: Client, bucket: &str, endpoint: String) -> Self {
        Self {
            runtime,
            client,
            bucket: bucket.to_string(),
            endpoint,
        }
    }
}

impl ObjectStore for S3Store {
    fn get(&self, key: &str) -> Result<GetOutcome, StoreError> {
        let sent = self.runtime.block_on(
            self.client
                .get_object()
                .bucket(&self.bucket)
                .key(key)
                .send(),
        );
        let output = match sent {
            Ok(output) => output,
            Err(err) => {
                let missing = err
                    .as_service_error()
                    .is_some_and(|service| service.is_no_such_key())
                    || err
                        .raw_response()
                        .is_some_and(|raw| raw.status().as_u16() == 404);
                if missing {
                    return Ok(GetOutcome::NotFound);
                }
                return Err(classify(key, err));
            }
        };

        let body = self
            .runtime
            .block_on(output.body.collect())
            .map_err(|err| StoreError::Unavailable(format!("{key}: body read failed: {err}")))?;
        Ok(GetOutcome::Found(body.into_bytes().to_vec()))
    }

    fn put(&self, key: &str, body: &[u8]) -> Result<(), StoreError> {
        self.runtime
            .block_on(
                self.client
                    .put_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .body(ByteStream::from(body.to_vec()))
                    .send(),
            )
            .map_err(|err| classify(key, err))?;
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self
                .runtime
                .block_on(
                    self.client
                        .list_objects_v2()
                        .bucket(&self.bucket)
                        .prefix(prefix)
                        .set_continuation_token(token.take())
                        .send(),
                )
                .map_err(|err| classify(prefix, err))?;

            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key().map(ToOwned::to_owned)),
            );

            match page.next_continuation_token() {
                Some(next) if page.is_truncated().unwrap_or(false) => {
                    token = Some(next.to_string());
                }
                _ => break,
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn describe(&self) -> String {
        format!("s3://{} ({})", self.bucket, self.endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::S3Store;
    use crate::error::StoreError;
    use crate::store::{GetOutcome, ObjectStore};
    use aws_sdk_s3::Client;
    use aws_sdk_s3::config::retry::RetryConfig;
    use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
    use aws_smithy_http_client::test_util::{ReplayEvent, StaticReplayClient};
    use aws_smithy_types::body::SdkBody;

    fn request(uri: &str) -> http::Request<SdkBody> {
        http::Request::builder()
            .uri(uri)
            .body(SdkBody::empty())
            .expect("request")
    }

    fn response(status: u16, body: &str) -> http::Response<SdkBody> {
        http::Response::builder()
            .status(status)
            .header("content-type", "application/xml")
            .body(SdkBody::from(body.to_string()))
            .expect("response")
    }

    fn replay_store(events: Vec<ReplayEvent>) -> S3Store {
        let conf = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("AKIDTEST", "secret", None, None, "test"))
            .retry_config(RetryConfig::disabled())
            .force_path_style(true)
            .http_client(StaticReplayClient::new(events))
            .build();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        S3Store::from_client(
            runtime,
            Client::from_conf(conf),
            "offers",
            "replay".to_string(),
        )
    }

    fn list_page(keys: &[&str], next_token: Option<&str>) -> String {
        let contents: String = keys
            .iter()
            .map(|key| format!("<Contents><Key>{key}</Key><Size>3</Size></Contents>"))
            .collect();
        let (truncated, token) = match next_token {
            Some(token) => (
                "true",
                format!("<NextContinuationToken>{token}</NextContinuationToken>"),
            ),
            None => ("false", String::new()),
        };
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <ListBucketResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\
             <Name>offers</Name><Prefix>jobs/</Prefix><KeyCount>{}</KeyCount>\
             <MaxKeys>1000</MaxKeys><IsTruncated>{truncated}</IsTruncated>{token}{contents}\
             </ListBucketResult>",
            keys.len()
        )
    }

    #[test]
    fn no_such_key_is_not_found() {
        let store = replay_store(vec![ReplayEvent::new(
            request("https://s3.us-east-1.amazonaws.com/offers/jobs/a.jsonl"),
            response(
                404,
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
                 <Error><Code>NoSuchKey</Code><Message>The specified key does not exist.</Message>\
                 <Key>jobs/a.jsonl</Key></Error>",
            ),
        )]);
        assert_eq!(store.get("jobs/a.jsonl").expect("get"), GetOutcome::NotFound);
    }

    #[test]
    fn found_object_returns_body() {
        let store = replay_store(vec![ReplayEvent::new(
            request("https://s3.us-east-1.amazonaws.com/offers/jobs/a.jsonl"),
            http::Response::builder()
                .status(200)
                .body(SdkBody::from("{\"slug\":\"a\"}\n"))
                .expect("response"),
        )]);
        assert_eq!(
            store.get("jobs/a.jsonl").expect("get"),
            GetOutcome::Found(b"{\"slug\":\"a\"}\n".to_vec())
        );
    }

    #[test]
    fn server_error_is_a_store_error_not_a_miss() {
        let store = replay_store(vec![ReplayEvent::new(
            request("https://s3.us-east-1.amazonaws.com/offers/jobs/a.jsonl"),
            response(
                500,
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
                 <Error><Code>InternalError</Code><Message>boom</Message></Error>",
            ),
        )]);
        match store.get("jobs/a.jsonl") {
            Err(StoreError::Backend { key, .. }) => assert_eq!(key, "jobs/a.jsonl"),
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[test]
    fn list_follows_continuation_tokens() {
        let uri = "https://s3.us-east-1.amazonaws.com/offers?list-type=2&prefix=jobs%2F";
        let store = replay_store(vec![
            ReplayEvent::new(
                request(uri),
                response(200, &list_page(&["jobs/c.jsonl", "jobs/a.jsonl"], Some("t1"))),
            ),
            ReplayEvent::new(
                request(uri),
                response(200, &list_page(&["jobs/e.log"], Some("t2"))),
            ),
            ReplayEvent::new(request(uri), response(200, &list_page(&["jobs/b.json"], None))),
        ]);

        let keys = store.list("jobs/").expect("list");
        assert_eq!(
            keys,
            vec![
                "jobs/a.jsonl".to_string(),
                "jobs/b.json".to_string(),
                "jobs/c.jsonl".to_string(),
                "jobs/e.log".to_string(),
            ]
        );
    }
}
