//! HTTP client for the platform's public API.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use super::{free_name, DatasetInfo, ProjectInfo, UploadClient};
use crate::error::TrashcanError;
use crate::sly::{Annotation, ProjectMeta};

const MULTIPART_BOUNDARY: &str = "----trashcan-upload-boundary-7f3a91c2";

/// [`UploadClient`] backed by `<server>/public/api/v3`.
pub struct SuperviselyApi {
    agent: ureq::Agent,
    base_url: String,
    token: String,
    /// Image id -> dataset id, filled by `upload_images`.
    image_datasets: BTreeMap<u64, u64>,
}

impl SuperviselyApi {
    pub fn new(server_address: &str, token: &str) -> Result<Self, TrashcanError> {
        let parsed = url::Url::parse(server_address).map_err(|source| {
            TrashcanError::InvalidSettings(format!(
                "invalid server address '{server_address}': {source}"
            ))
        })?;
        if token.is_empty() {
            return Err(TrashcanError::InvalidSettings(
                "API token must not be empty".to_string(),
            ));
        }

        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(300)))
            .build();

        Ok(Self {
            agent: config.into(),
            base_url: format!(
                "{}/public/api/v3",
                parsed.as_str().trim_end_matches('/')
            ),
            token: token.to_string(),
            image_datasets: BTreeMap::new(),
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    fn post_json(&self, method: &str, body: &Value) -> Result<Value, TrashcanError> {
        let mut response = self
            .agent
            .post(&self.endpoint(method))
            .header("x-api-key", &self.token)
            .send_json(body)
            .map_err(|source| api_error(method, source))?;
        response
            .body_mut()
            .read_json::<Value>()
            .map_err(|source| api_error(method, source))
    }

    /// True when a `*.list` call filtered on `name` returns any entity.
    fn name_exists(&self, method: &str, mut body: Value, name: &str) -> Result<bool, TrashcanError> {
        body["filter"] = json!([{"field": "name", "operator": "=", "value": name}]);
        let response = self.post_json(method, &body)?;
        Ok(response
            .get("entities")
            .and_then(Value::as_array)
            .map(|entities| !entities.is_empty())
            .unwrap_or(false))
    }

    fn existing_hashes(&self, hashes: &[String]) -> Result<HashSet<String>, TrashcanError> {
        let response = self.post_json("images.internal.hashes.list", &json!(hashes))?;
        let mut known = HashSet::new();
        if let Some(items) = response.as_array() {
            for item in items {
                let hash = item
                    .as_str()
                    .or_else(|| item.get("hash").and_then(Value::as_str));
                if let Some(hash) = hash {
                    known.insert(hash.to_string());
                }
            }
        }
        Ok(known)
    }

    fn upload_blobs(&self, blobs: &[&[u8]]) -> Result<(), TrashcanError> {
        let method = "images.bulk.upload";
        let body = multipart_body(blobs);
        self.agent
            .post(&self.endpoint(method))
            .header("x-api-key", &self.token)
            .header(
                "Content-Type",
                &format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
            )
            .send(body.as_slice())
            .map_err(|source| api_error(method, source))?;
        Ok(())
    }
}

fn api_error(method: &str, source: impl std::fmt::Display) -> TrashcanError {
    TrashcanError::Api {
        method: method.to_string(),
        message: source.to_string(),
    }
}

fn entity_info(method: &str, response: &Value) -> Result<(u64, String), TrashcanError> {
    let id = response
        .get("id")
        .and_then(Value::as_u64)
        .ok_or_else(|| api_error(method, "response has no 'id'"))?;
    let name = response
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Ok((id, name))
}

/// Platform content hash: base64 of the SHA-256 digest.
pub(crate) fn content_hash(bytes: &[u8]) -> String {
    STANDARD.encode(Sha256::digest(bytes))
}

/// One `<idx>-file` part per blob.
fn multipart_body(blobs: &[&[u8]]) -> Vec<u8> {
    let mut body = Vec::new();
    for (idx, blob) in blobs.iter().enumerate() {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"{idx}-file\"; filename=\"{idx}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(blob);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

fn image_ids(response: &Value) -> Result<Vec<u64>, TrashcanError> {
    let items = response
        .as_array()
        .ok_or_else(|| api_error("images.bulk.add", "expected a list of images"))?;
    items
        .iter()
        .map(|item| {
            item.get("id")
                .and_then(Value::as_u64)
                .ok_or_else(|| api_error("images.bulk.add", "image entry has no 'id'"))
        })
        .collect()
}

impl UploadClient for SuperviselyApi {
    fn create_project(
        &mut self,
        workspace_id: u64,
        name: &str,
    ) -> Result<ProjectInfo, TrashcanError> {
        let name = free_name(name, |candidate| {
            self.name_exists(
                "projects.list",
                json!({"workspaceId": workspace_id}),
                candidate,
            )
        })?;

        let method = "projects.add";
        let response = self.post_json(
            method,
            &json!({
                "workspaceId": workspace_id,
                "name": name,
                "description": "",
                "type": "images",
            }),
        )?;
        let (id, created) = entity_info(method, &response)?;
        log::info!("Created project '{}' (id {})", created, id);
        Ok(ProjectInfo {
            id,
            name: if created.is_empty() { name } else { created },
        })
    }

    fn update_project_meta(
        &mut self,
        project_id: u64,
        meta: &ProjectMeta,
    ) -> Result<(), TrashcanError> {
        self.post_json(
            "projects.meta.update",
            &json!({"id": project_id, "meta": meta.to_json()}),
        )?;
        Ok(())
    }

    fn create_dataset(
        &mut self,
        project_id: u64,
        name: &str,
    ) -> Result<DatasetInfo, TrashcanError> {
        let name = free_name(name, |candidate| {
            self.name_exists("datasets.list", json!({"projectId": project_id}), candidate)
        })?;

        let method = "datasets.add";
        let response = self.post_json(
            method,
            &json!({"projectId": project_id, "name": name, "description": ""}),
        )?;
        let (id, created) = entity_info(method, &response)?;
        log::info!("Created dataset '{}' (id {})", created, id);
        Ok(DatasetInfo {
            id,
            name: if created.is_empty() { name } else { created },
        })
    }

    fn upload_images(
        &mut self,
        dataset_id: u64,
        names: &[String],
        paths: &[PathBuf],
    ) -> Result<Vec<u64>, TrashcanError> {
        let mut contents = Vec::with_capacity(paths.len());
        for path in paths {
            contents.push(fs::read(path)?);
        }
        let hashes: Vec<String> = contents.iter().map(|bytes| content_hash(bytes)).collect();

        let known = self.existing_hashes(&hashes)?;
        let mut queued = HashSet::new();
        let missing: Vec<&[u8]> = hashes
            .iter()
            .zip(&contents)
            .filter(|(hash, _)| !known.contains(*hash) && queued.insert(hash.as_str()))
            .map(|(_, bytes)| bytes.as_slice())
            .collect();
        if !missing.is_empty() {
            self.upload_blobs(&missing)?;
        }

        let images: Vec<Value> = names
            .iter()
            .zip(&hashes)
            .map(|(name, hash)| json!({"title": name, "hash": hash}))
            .collect();
        let response = self.post_json(
            "images.bulk.add",
            &json!({"datasetId": dataset_id, "images": images}),
        )?;

        let ids = image_ids(&response)?;
        for id in &ids {
            self.image_datasets.insert(*id, dataset_id);
        }
        Ok(ids)
    }

    fn upload_annotations(
        &mut self,
        image_ids: &[u64],
        annotations: &[Annotation],
    ) -> Result<(), TrashcanError> {
        let mut by_dataset: BTreeMap<u64, Vec<Value>> = BTreeMap::new();
        for (id, annotation) in image_ids.iter().zip(annotations) {
            let dataset_id = self
                .image_datasets
                .get(id)
                .copied()
                .ok_or(TrashcanError::UnknownUploadedImage(*id))?;
            by_dataset
                .entry(dataset_id)
                .or_default()
                .push(json!({"imageId": id, "annotation": annotation.to_json()}));
        }

        for (dataset_id, batch) in by_dataset {
            self.post_json(
                "annotations.bulk.add",
                &json!({"datasetId": dataset_id, "annotations": batch}),
            )?;
        }
        Ok(())
    }
}
