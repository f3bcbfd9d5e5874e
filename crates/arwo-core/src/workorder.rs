//! Work-order create, modify, and attach operations.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::config::RemedyConfig;
use crate::endpoints::{self, CREATE_FORM, WORK_INFO_FORM, WORK_ORDER_FORM};
use crate::entry::EntryResolver;
use crate::error::RemedyError;
use crate::session;
use crate::token::TokenStore;
use crate::transport::{ApiRequest, Method, RequestBody, Transport};

/// Fixed multipart boundary the attachment endpoint expects.
const ATTACHMENT_BOUNDARY: &str = "wL36Yn8afVp8Ag7AmP8qZ0SA4n1v9T";

/// Attachment field on the work-info form.
const ATTACHMENT_FIELD: &str = "z2AF Work Log01";

#[derive(Debug, Deserialize)]
struct CreateResponse {
    values: CreateValues,
}

#[derive(Debug, Deserialize)]
struct CreateValues {
    #[serde(rename = "WorkOrder_ID")]
    work_order_id: String,
}

/// A file attachment destined for a work order.
///
/// The file content is read once, up front; a retried attach rebuilds the
/// multipart body from these same bytes instead of re-reading the file.
#[derive(Debug, Clone)]
pub struct AttachmentRequest {
    /// Structured work-info fields. The ticket ids and file name are
    /// injected into `values` before upload.
    pub fields: serde_json::Value,

    /// Base name recorded on the work-info entry.
    pub file_name: String,

    /// File content, sent verbatim.
    pub file_bytes: Vec<u8>,
}

impl AttachmentRequest {
    /// Reads the file at `path` into memory.
    ///
    /// # Errors
    ///
    /// Returns an error when the path has no usable file name or cannot be
    /// read.
    pub fn read_from(path: &Path, fields: serde_json::Value) -> std::io::Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("path has no usable file name: {}", path.display()),
                )
            })?
            .to_string();
        let file_bytes = std::fs::read(path)?;
        Ok(Self {
            fields,
            file_name,
            file_bytes,
        })
    }
}

/// Create, modify, and attach operations against the work-order forms.
///
/// Every operation re-reads the bearer token from the store immediately
/// before building headers, so a refresh performed between retry attempts
/// (by this process or a sibling) is picked up automatically.
pub struct WorkOrderClient {
    transport: Arc<dyn Transport>,
    store: TokenStore,
    resolver: EntryResolver,
}

impl WorkOrderClient {
    /// Creates a client over the given transport and token store.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, store: TokenStore) -> Self {
        let resolver = EntryResolver::new(transport.clone(), store.clone());
        Self {
            transport,
            store,
            resolver,
        }
    }

    /// Creates a work order and returns its public id.
    ///
    /// Uses the long creation deadline; the server does noticeably more
    /// work here than on modify or attach.
    ///
    /// # Errors
    ///
    /// Returns [`RemedyError::Api`] on any status other than 201.
    pub fn create(
        &self,
        config: &RemedyConfig,
        fields: &serde_json::Value,
    ) -> Result<String, RemedyError> {
        let bearer = session::bearer_value(&self.store, &config.user)?;
        let request = ApiRequest::new(
            Method::Post,
            endpoints::entry_url(&config.api_base, CREATE_FORM),
        )
        .query("fields", "values(WorkOrder_ID)")
        .header("Authorization", bearer)
        .body(RequestBody::Json(fields.clone()))
        .timeout(config.create_timeout);

        let response = self.transport.execute(&request)?;
        if response.status != 201 {
            return Err(RemedyError::Api {
                status: response.status,
                body: response.text(),
            });
        }
        let created: CreateResponse = response.json().map_err(|error| RemedyError::Parse {
            context: "work order creation response".to_string(),
            detail: error.to_string(),
        })?;
        Ok(created.values.work_order_id)
    }

    /// Modifies an existing work order.
    ///
    /// Resolves the internal entry id first; an unresolvable public id
    /// aborts before any mutation is sent. Success is the no-content
    /// status, 204.
    ///
    /// # Errors
    ///
    /// Returns [`RemedyError::NotFound`] when the public id does not
    /// resolve and [`RemedyError::Api`] on any status other than 204.
    pub fn modify(
        &self,
        config: &RemedyConfig,
        public_id: &str,
        fields: &serde_json::Value,
    ) -> Result<(), RemedyError> {
        let reference = self.resolver.resolve(config, public_id)?;
        let bearer = session::bearer_value(&self.store, &config.user)?;
        let request = ApiRequest::new(
            Method::Put,
            endpoints::entry_item_url(&config.api_base, WORK_ORDER_FORM, &reference.internal_id),
        )
        .header("Authorization", bearer)
        .body(RequestBody::Json(fields.clone()))
        .timeout(config.request_timeout);

        let response = self.transport.execute(&request)?;
        if response.status != 204 {
            return Err(RemedyError::Api {
                status: response.status,
                body: response.text(),
            });
        }
        Ok(())
    }

    /// Attaches a file to an existing work order.
    ///
    /// The internal id resolution is an existence check only; the upload
    /// addresses the ticket by its public id in the injected fields. The
    /// two-part body goes over a dedicated connection under the fixed
    /// boundary the endpoint expects.
    ///
    /// # Errors
    ///
    /// Returns [`RemedyError::NotFound`] when the public id does not
    /// resolve and [`RemedyError::Api`] on any status other than 201.
    pub fn attach(
        &self,
        config: &RemedyConfig,
        public_id: &str,
        attachment: &AttachmentRequest,
    ) -> Result<(), RemedyError> {
        let _reference = self.resolver.resolve(config, public_id)?;

        let entry = attachment_entry(&attachment.fields, public_id, &attachment.file_name)?;
        let body = build_multipart(&entry, &attachment.file_name, &attachment.file_bytes)?;
        let bearer = session::bearer_value(&self.store, &config.user)?;
        let request = ApiRequest::new(
            Method::Post,
            endpoints::entry_url(&config.api_base, WORK_INFO_FORM),
        )
        .header("Authorization", bearer)
        .header("Accept-Encoding", "gzip, deflate, br")
        .body(RequestBody::Raw {
            content_type: format!("multipart/form-data; boundary={ATTACHMENT_BOUNDARY}"),
            bytes: body,
        })
        .timeout(config.request_timeout)
        .dedicated();

        let response = self.transport.execute(&request)?;
        if response.status != 201 {
            return Err(RemedyError::Api {
                status: response.status,
                body: response.text(),
            });
        }
        Ok(())
    }
}

/// Injects the ticket ids and file name into the entry fields.
///
/// Both id fields carry the public id; the upstream form expects it there
/// even in the field named for the entry id.
fn attachment_entry(
    fields: &serde_json::Value,
    public_id: &str,
    file_name: &str,
) -> Result<serde_json::Value, RemedyError> {
    let mut body = fields.clone();
    let Some(root) = body.as_object_mut() else {
        return Err(RemedyError::Parse {
            context: "attachment fields".to_string(),
            detail: "expected a JSON object".to_string(),
        });
    };
    let values = root
        .entry("values")
        .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
    let Some(values) = values.as_object_mut() else {
        return Err(RemedyError::Parse {
            context: "attachment fields".to_string(),
            detail: "\"values\" must be a JSON object".to_string(),
        });
    };
    values.insert("Work Order ID".to_string(), public_id.into());
    values.insert("WorkOrder_EntryID".to_string(), public_id.into());
    values.insert(ATTACHMENT_FIELD.to_string(), file_name.into());
    Ok(body)
}

/// Assembles the fixed-boundary multipart body: a JSON `entry` part with
/// the structured fields, then the file bytes as an octet-stream part,
/// CRLF-joined with a trailing terminator line.
fn build_multipart(
    entry: &serde_json::Value,
    file_name: &str,
    file_bytes: &[u8],
) -> Result<Vec<u8>, RemedyError> {
    let entry_json = serde_json::to_vec(entry)?;
    let parts: Vec<Vec<u8>> = vec![
        format!("--{ATTACHMENT_BOUNDARY}").into_bytes(),
        b"Content-Disposition: form-data; name=\"entry\";".to_vec(),
        b"Content-Type: application/json".to_vec(),
        Vec::new(),
        entry_json,
        format!("--{ATTACHMENT_BOUNDARY}").into_bytes(),
        format!("Content-Disposition: form-data; name=\"attach-{ATTACHMENT_FIELD}\"; filename={file_name}")
            .into_bytes(),
        b"Content-Type: application/octet-stream".to_vec(),
        Vec::new(),
        file_bytes.to_vec(),
        format!("--{ATTACHMENT_BOUNDARY}--").into_bytes(),
        Vec::new(),
    ];
    Ok(parts.join(&b"\r\n"[..]))
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use serde_json::json;

    use super::*;
    use crate::transport::{ApiResponse, ConnectionMode, MockTransport};

    const RESOLVE_BODY: &str = r#"{"entries":[{"values":{"Request ID":"WO0000000042|42"}}]}"#;

    fn test_config(dir: &tempfile::TempDir) -> RemedyConfig {
        RemedyConfig::new(
            "https://remedy.example.com",
            dir.path(),
            "svc_arwo",
            SecretString::from("pw".to_string()),
        )
    }

    fn client_with(dir: &tempfile::TempDir, mock: Arc<MockTransport>) -> WorkOrderClient {
        let store = TokenStore::new(dir.path());
        store.write("svc_arwo", "tok").unwrap();
        WorkOrderClient::new(mock, store)
    }

    #[test]
    fn test_create_returns_new_public_id() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let mock = Arc::new(MockTransport::always(
            201,
            r#"{"values":{"WorkOrder_ID":"WO00001"}}"#,
        ));
        let client = client_with(&dir, mock.clone());

        let public_id = client
            .create(&config, &json!({"values": {"Summary": "disk full"}}))
            .unwrap();
        assert_eq!(public_id, "WO00001");

        let recorded = mock.requests();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].method, Method::Post);
        assert!(
            recorded[0]
                .url
                .ends_with("/api/arsys/v1/entry/WOI:WorkOrderInterface_Create")
        );
        assert_eq!(
            recorded[0].query[0],
            ("fields".to_string(), "values(WorkOrder_ID)".to_string())
        );
        assert_eq!(recorded[0].timeout, Some(config.create_timeout));
    }

    #[test]
    fn test_create_error_status_surfaces_as_api_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let mock = Arc::new(MockTransport::always(400, "field Summary is required"));
        let client = client_with(&dir, mock);

        match client.create(&config, &json!({"values": {}})) {
            Err(RemedyError::Api { status, body }) => {
                assert_eq!(status, 400);
                assert!(body.contains("Summary"));
            },
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn test_modify_resolves_then_puts_to_internal_id() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let mock = Arc::new(MockTransport::new(|request| {
            if request.method == Method::Get {
                Ok(ApiResponse::new(200, RESOLVE_BODY))
            } else {
                Ok(ApiResponse::new(204, ""))
            }
        }));
        let client = client_with(&dir, mock.clone());

        client
            .modify(&config, "WO0000000042", &json!({"values": {"Status": "Closed"}}))
            .unwrap();

        let recorded = mock.requests();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].method, Method::Get);
        assert_eq!(recorded[1].method, Method::Put);
        assert!(
            recorded[1]
                .url
                .ends_with("/api/arsys/v1/entry/WOI:WorkOrder/WO0000000042|42")
        );
    }

    #[test]
    fn test_modify_unresolvable_id_never_issues_the_put() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let mock = Arc::new(MockTransport::always(200, r#"{"entries":[]}"#));
        let client = client_with(&dir, mock.clone());

        let result = client.modify(&config, "WO0000009999", &json!({"values": {}}));
        assert!(matches!(result, Err(RemedyError::NotFound { .. })));

        let recorded = mock.requests();
        assert_eq!(recorded.len(), 1, "only the resolve query may be sent");
        assert_eq!(recorded[0].method, Method::Get);
    }

    #[test]
    fn test_modify_requires_the_no_content_status() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let mock = Arc::new(MockTransport::new(|request| {
            if request.method == Method::Get {
                Ok(ApiResponse::new(200, RESOLVE_BODY))
            } else {
                Ok(ApiResponse::new(200, "unexpected body"))
            }
        }));
        let client = client_with(&dir, mock);

        match client.modify(&config, "WO0000000042", &json!({"values": {}})) {
            Err(RemedyError::Api { status, .. }) => assert_eq!(status, 200),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn test_attach_builds_the_exact_multipart_body() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let mock = Arc::new(MockTransport::new(|request| {
            if request.method == Method::Get {
                Ok(ApiResponse::new(200, RESOLVE_BODY))
            } else {
                Ok(ApiResponse::new(201, ""))
            }
        }));
        let client = client_with(&dir, mock.clone());

        let attachment = AttachmentRequest {
            fields: json!({"values": {"Detailed Description": "log excerpt"}}),
            file_name: "report.txt".to_string(),
            file_bytes: b"hello".to_vec(),
        };
        client.attach(&config, "WO0000000042", &attachment).unwrap();

        let recorded = mock.requests();
        assert_eq!(recorded.len(), 2);
        let upload = &recorded[1];
        assert_eq!(upload.method, Method::Post);
        assert!(upload.url.ends_with("/api/arsys/v1/entry/WOI:WorkInfo"));
        assert_eq!(upload.connection, ConnectionMode::Dedicated);

        let RequestBody::Raw {
            content_type,
            bytes,
        } = &upload.body
        else {
            panic!("expected raw multipart body, got {:?}", upload.body);
        };
        assert_eq!(
            content_type,
            "multipart/form-data; boundary=wL36Yn8afVp8Ag7AmP8qZ0SA4n1v9T"
        );

        let expected = "--wL36Yn8afVp8Ag7AmP8qZ0SA4n1v9T\r\n\
             Content-Disposition: form-data; name=\"entry\";\r\n\
             Content-Type: application/json\r\n\
             \r\n\
             {\"values\":{\"Detailed Description\":\"log excerpt\",\"Work Order ID\":\"WO0000000042\",\"WorkOrder_EntryID\":\"WO0000000042\",\"z2AF Work Log01\":\"report.txt\"}}\r\n\
             --wL36Yn8afVp8Ag7AmP8qZ0SA4n1v9T\r\n\
             Content-Disposition: form-data; name=\"attach-z2AF Work Log01\"; filename=report.txt\r\n\
             Content-Type: application/octet-stream\r\n\
             \r\n\
             hello\r\n\
             --wL36Yn8afVp8Ag7AmP8qZ0SA4n1v9T--\r\n";
        assert_eq!(String::from_utf8_lossy(bytes), expected);
    }

    #[test]
    fn test_attach_body_is_identical_across_retried_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let mock = Arc::new(MockTransport::new(|request| {
            if request.method == Method::Get {
                Ok(ApiResponse::new(200, RESOLVE_BODY))
            } else {
                Ok(ApiResponse::new(201, ""))
            }
        }));
        let client = client_with(&dir, mock.clone());

        let attachment = AttachmentRequest {
            fields: json!({"values": {"Detailed Description": "same bytes"}}),
            file_name: "dump.bin".to_string(),
            file_bytes: vec![0x00, 0xff, 0x10, 0x7f],
        };
        client.attach(&config, "WO0000000042", &attachment).unwrap();
        client.attach(&config, "WO0000000042", &attachment).unwrap();

        let recorded = mock.requests();
        let bodies: Vec<&Vec<u8>> = recorded
            .iter()
            .filter_map(|request| match &request.body {
                RequestBody::Raw { bytes, .. } => Some(bytes),
                _ => None,
            })
            .collect();
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0], bodies[1]);
    }

    #[test]
    fn test_attach_unresolvable_id_never_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let mock = Arc::new(MockTransport::always(200, r#"{"entries":[]}"#));
        let client = client_with(&dir, mock.clone());

        let attachment = AttachmentRequest {
            fields: json!({"values": {}}),
            file_name: "report.txt".to_string(),
            file_bytes: b"hello".to_vec(),
        };
        let result = client.attach(&config, "WO0000009999", &attachment);
        assert!(matches!(result, Err(RemedyError::NotFound { .. })));
        assert_eq!(mock.requests().len(), 1);
    }

    #[test]
    fn test_attachment_request_reads_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"file content").unwrap();

        let attachment = AttachmentRequest::read_from(&path, json!({"values": {}})).unwrap();
        assert_eq!(attachment.file_name, "notes.txt");
        assert_eq!(attachment.file_bytes, b"file content");

        // The bytes stay usable even after the file is gone.
        std::fs::remove_file(&path).unwrap();
        assert_eq!(attachment.file_bytes, b"file content");
    }

    #[test]
    fn test_attachment_fields_must_be_an_object() {
        let result = attachment_entry(&json!("not an object"), "WO1", "a.txt");
        assert!(matches!(result, Err(RemedyError::Parse { .. })));

        let result = attachment_entry(&json!({"values": 7}), "WO1", "a.txt");
        assert!(matches!(result, Err(RemedyError::Parse { .. })));
    }
}
