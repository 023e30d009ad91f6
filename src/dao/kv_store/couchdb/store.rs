use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode, Url};
use serde::{Serialize, de::DeserializeOwned};

use crate::dao::{kv_store::KeyValueStore, storage::StorageResult};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{CouchRevision, CouchValueDocument, value_doc_id},
};

/// CouchDB-backed key-value store, one document per key.
#[derive(Clone)]
pub struct CouchStore {
    client: Client,
    database_url: Arc<Url>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Url::parse(&config.base_url).map_err(|err| CouchDaoError::InvalidUrl {
            url: config.base_url.clone(),
            reason: err.to_string(),
        })?;
        let database_url = Arc::new(push_segments(&base_url, &[config.database.as_str()])?);
        let database = Arc::<str>::from(config.database);
        let auth = config
            .username
            .zip(config.password)
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        let store = Self {
            client,
            database_url,
            database,
            auth,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some((ref user, ref pass)) = self.auth {
            builder.basic_auth(user.as_ref(), Some(pass.as_ref()))
        } else {
            builder
        }
    }

    fn request(&self, method: Method, doc_id: &str) -> CouchResult<reqwest::RequestBuilder> {
        let url = push_segments(&self.database_url, &[doc_id])?;
        Ok(self.with_auth(self.client.request(method, url)))
    }

    fn database_url(&self) -> String {
        self.database_url.to_string()
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = self.database_url();

        let response = self
            .with_auth(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .with_auth(self.client.put(&url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.clone(),
                        source,
                    })?;
                if create.status().is_success() {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)?
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json::<T>().await.map(Some).map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_string(),
                        source,
                    }
                })
            }
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<()>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)?
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: response.status(),
            })
        }
    }

    async fn read_value(&self, key: &str) -> CouchResult<Option<Vec<u8>>> {
        let doc_id = value_doc_id(key);
        let document = self.get_document::<CouchValueDocument>(&doc_id).await?;
        Ok(document.map(|doc| doc.value.into_bytes()))
    }

    async fn write_value(&self, key: &str, value: Vec<u8>) -> CouchResult<()> {
        let doc_id = value_doc_id(key);
        let value = String::from_utf8(value).map_err(|source| CouchDaoError::NonUtf8Value {
            path: doc_id.clone(),
            source,
        })?;

        // Overwriting an existing document requires its current revision.
        let rev = self
            .get_document::<CouchRevision>(&doc_id)
            .await?
            .map(|existing| existing.rev);

        let document = CouchValueDocument {
            id: doc_id.clone(),
            rev,
            value,
        };
        self.put_document(&doc_id, &document).await
    }

    async fn ping(&self) -> CouchResult<()> {
        let url = self.database_url();
        let response = self
            .with_auth(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: url.clone(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: url,
                status: response.status(),
            })
        }
    }
}

/// Append each segment to `base`, escaping it so it cannot leave its path segment.
fn push_segments(base: &Url, segments: &[&str]) -> CouchResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| CouchDaoError::InvalidUrl {
            url: base.to_string(),
            reason: "url cannot carry a path".into(),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

impl KeyValueStore for CouchStore {
    fn get(&self, key: &str) -> BoxFuture<'static, StorageResult<Option<Vec<u8>>>> {
        let store = self.clone();
        let key = key.to_string();
        Box::pin(async move { store.read_value(&key).await.map_err(Into::into) })
    }

    fn set(&self, key: &str, value: Vec<u8>) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let key = key.to_string();
        Box::pin(async move { store.write_value(&key, value).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
