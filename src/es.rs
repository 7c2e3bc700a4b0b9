use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::{Value, json};

use crate::config::StoreConfig;
use crate::error::LoaderError;
use crate::store::{BulkReport, DocumentStore, Record, RoleGrant};

/// Records per `_bulk` request. The caller may submit far larger batches;
/// they are split here.
const BULK_CHUNK_SIZE: usize = 500;

/// Document store backed by an Elasticsearch-compatible search engine.
///
/// The deployment runs with self-signed certificates, so certificate
/// validation is disabled; credentials come from the environment.
pub struct EsStore {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl EsStore {
    pub fn new(config: &StoreConfig) -> Result<Self, LoaderError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("celldash-loader/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| LoaderError::StoreHttp(err.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(true)
            .timeout(config.timeout)
            .build()
            .map_err(|err| LoaderError::StoreHttp(err.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn send(&self, request: reqwest::blocking::RequestBuilder) -> Result<Response, LoaderError> {
        request
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .map_err(|err| LoaderError::StoreHttp(err.to_string()))
    }

    fn expect_success(&self, response: Response) -> Result<Response, LoaderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .text()
            .unwrap_or_else(|_| "store request failed".to_string());
        Err(LoaderError::StoreStatus {
            status: status.as_u16(),
            message,
        })
    }

    fn json_body(&self, response: Response) -> Result<Value, LoaderError> {
        self.expect_success(response)?
            .json::<Value>()
            .map_err(|err| LoaderError::StoreHttp(err.to_string()))
    }

    fn bulk_chunk(&self, collection: &str, records: &[Record]) -> Result<BulkReport, LoaderError> {
        let body = build_bulk_body(collection, records)
            .map_err(|err| LoaderError::StoreHttp(err.to_string()))?;
        let response = self.send(
            self.client
                .post(self.url("_bulk?refresh=true"))
                .header("content-type", "application/x-ndjson")
                .body(body),
        )?;
        let body = self.json_body(response)?;

        let mut loaded = 0usize;
        if let Some(items) = body["items"].as_array() {
            for (position, item) in items.iter().enumerate() {
                let index_result = &item["index"];
                let status = index_result["status"].as_u64().unwrap_or(0);
                if (200..300).contains(&status) {
                    loaded += 1;
                } else if let Some(record) = records.get(position) {
                    let record = Value::Object(record.clone());
                    tracing::warn!(
                        collection,
                        status,
                        error = %index_result["error"],
                        record = %record,
                        "record failed during bulk load"
                    );
                }
            }
        }
        Ok(BulkReport {
            submitted: records.len(),
            loaded,
        })
    }
}

impl DocumentStore for EsStore {
    fn collection_exists(&self, name: &str) -> Result<bool, LoaderError> {
        let response = self.send(self.client.head(self.url(name)))?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(LoaderError::StoreStatus {
                status: status.as_u16(),
                message: "collection existence check failed".to_string(),
            }),
        }
    }

    fn create_collection(&self, name: &str, schema: &Value) -> Result<(), LoaderError> {
        let response = self.send(self.client.put(self.url(name)).json(schema))?;
        self.expect_success(response).map(|_| ())
    }

    fn delete_collection(&self, name: &str) -> Result<(), LoaderError> {
        let response = self.send(self.client.delete(self.url(name)))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        self.expect_success(response).map(|_| ())
    }

    fn collection_fields(&self, name: &str) -> Result<Vec<String>, LoaderError> {
        let response = self.send(self.client.get(self.url(&format!("{name}/_mapping"))))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let body = self.json_body(response)?;

        let mut fields = Vec::new();
        if let Some(indices) = body.as_object() {
            for index in indices.values() {
                if let Some(properties) = index["mappings"]["properties"].as_object() {
                    fields.extend(properties.keys().cloned());
                }
            }
        }
        fields.sort();
        fields.dedup();
        Ok(fields)
    }

    fn get_record(&self, collection: &str, id: &str) -> Result<Option<Record>, LoaderError> {
        let response = self.send(self.client.get(self.url(&format!("{collection}/_doc/{id}"))))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = self.json_body(response)?;
        match &body["_source"] {
            Value::Object(record) => Ok(Some(record.clone())),
            _ => Ok(None),
        }
    }

    fn put_record(&self, collection: &str, id: &str, record: &Record) -> Result<(), LoaderError> {
        let response = self.send(
            self.client
                .put(self.url(&format!("{collection}/_doc/{id}?refresh=true")))
                .json(record),
        )?;
        self.expect_success(response).map(|_| ())
    }

    fn delete_record(&self, collection: &str, id: &str) -> Result<(), LoaderError> {
        let response = self.send(
            self.client
                .delete(self.url(&format!("{collection}/_doc/{id}?refresh=true"))),
        )?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        self.expect_success(response).map(|_| ())
    }

    fn list_record_ids(&self, collection: &str) -> Result<Vec<String>, LoaderError> {
        let response = self.send(
            self.client
                .post(self.url(&format!("{collection}/_search")))
                .json(&json!({ "size": 10_000, "_source": false })),
        )?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let body = self.json_body(response)?;

        let mut ids = Vec::new();
        if let Some(hits) = body["hits"]["hits"].as_array() {
            for hit in hits {
                if let Some(id) = hit["_id"].as_str() {
                    ids.push(id.to_string());
                }
            }
        }
        Ok(ids)
    }

    fn bulk_insert(&self, collection: &str, records: &[Record]) -> Result<BulkReport, LoaderError> {
        let mut report = BulkReport::default();
        for chunk in records.chunks(BULK_CHUNK_SIZE) {
            report.absorb(self.bulk_chunk(collection, chunk)?);
        }
        Ok(report)
    }

    fn count_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<u64, LoaderError> {
        let response = self.send(
            self.client
                .post(self.url(&format!("{collection}/_count")))
                .json(&term_query(field, value)),
        )?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(0);
        }
        let body = self.json_body(response)?;
        Ok(body["count"].as_u64().unwrap_or(0))
    }

    fn delete_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<(), LoaderError> {
        let response = self.send(
            self.client
                .post(self.url(&format!("{collection}/_delete_by_query?refresh=true")))
                .json(&term_query(field, value)),
        )?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        self.expect_success(response).map(|_| ())
    }

    fn get_role(&self, name: &str) -> Result<Option<RoleGrant>, LoaderError> {
        let response = self.send(self.client.get(self.url(&format!("_security/role/{name}"))))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = self.json_body(response)?;
        Ok(grant_from_role(&body[name]))
    }

    fn put_role(&self, name: &str, grant: &RoleGrant) -> Result<(), LoaderError> {
        let response = self.send(
            self.client
                .put(self.url(&format!("_security/role/{name}")))
                .json(&role_body(grant)),
        )?;
        self.expect_success(response).map(|_| ())
    }

    fn delete_role(&self, name: &str) -> Result<(), LoaderError> {
        let response = self.send(
            self.client
                .delete(self.url(&format!("_security/role/{name}"))),
        )?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        self.expect_success(response).map(|_| ())
    }

    fn list_roles(&self) -> Result<Vec<String>, LoaderError> {
        let response = self.send(self.client.get(self.url("_security/role")))?;
        let body = self.json_body(response)?;
        Ok(body
            .as_object()
            .map(|roles| roles.keys().cloned().collect())
            .unwrap_or_default())
    }
}

fn term_query(field: &str, value: &str) -> Value {
    json!({
        "query": {
            "bool": {
                "filter": {
                    "term": {
                        field: value
                    }
                }
            }
        }
    })
}

fn role_body(grant: &RoleGrant) -> Value {
    json!({
        "indices": [
            {
                "names": grant.collections,
                "privileges": grant.privileges
            }
        ]
    })
}

fn grant_from_role(role: &Value) -> Option<RoleGrant> {
    let indices = role["indices"].as_array()?.first()?;
    let names = indices["names"]
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();
    let privileges = indices["privileges"]
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();
    Some(RoleGrant {
        collections: names,
        privileges,
    })
}

fn build_bulk_body(collection: &str, records: &[Record]) -> Result<String, serde_json::Error> {
    let mut body = String::new();
    let action = json!({ "index": { "_index": collection } });
    for record in records {
        body.push_str(&serde_json::to_string(&action)?);
        body.push('\n');
        body.push_str(&serde_json::to_string(record)?);
        body.push('\n');
    }
    Ok(body)
}
