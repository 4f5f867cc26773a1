use async_trait::async_trait;
use bytes::Bytes;
use cloudrt_core::{Error, JobHandle, JobStatus, PollJob, Result};
use serde::Deserialize;

use crate::constants::*;
use crate::Client;

const DESCRIBE_TASK_ATTRIBUTE: &str = "DescribeTaskAttribute";
const DEFAULT_FAILURE_CODE: &str = "TaskFailed";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TaskAttribute {
    task_status: String,
    #[serde(default)]
    failed_task_set: FailedTaskSet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct FailedTaskSet {
    failed_task: Vec<FailedTask>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct FailedTask {
    #[serde(alias = "Code")]
    error_code: String,
    #[serde(alias = "Message")]
    error_msg: String,
}

/// TaskStatusPoller checks an async task with `DescribeTaskAttribute`.
///
/// | `TaskStatus` | status |
/// |---|---|
/// | `Waiting`, `Processing`, `Pending` | [`JobStatus::Pending`] |
/// | `Finished` | [`JobStatus::Succeeded`] with the raw response body |
/// | `Failed` | [`JobStatus::Failed`] with the code of the first failed task |
///
/// Any other status is an `ErrorKind::Unexpected` error.
#[derive(Debug, Clone)]
pub struct TaskStatusPoller {
    client: Client,
    region_id: String,
}

impl TaskStatusPoller {
    /// Create a poller for tasks in `region_id`.
    pub fn new(client: Client, region_id: impl Into<String>) -> Self {
        Self {
            client,
            region_id: region_id.into(),
        }
    }
}

#[async_trait]
impl PollJob for TaskStatusPoller {
    type Output = Bytes;

    async fn poll(&self, handle: &JobHandle) -> Result<JobStatus<Bytes>> {
        let req = self
            .client
            .request(DESCRIBE_TASK_ATTRIBUTE)
            .param(REGION_ID, &self.region_id)
            .param(TASK_ID, handle.as_str());

        let body = self.client.call(req).await?;
        parse_task_status(handle, body)
    }
}

fn parse_task_status(handle: &JobHandle, body: Bytes) -> Result<JobStatus<Bytes>> {
    let attr: TaskAttribute = serde_json::from_slice(&body).map_err(|e| {
        Error::unexpected(format!("decode status of task {handle} failed")).with_source(e)
    })?;

    match attr.task_status.as_str() {
        "Waiting" | "Processing" | "Pending" => Ok(JobStatus::Pending),
        "Finished" => Ok(JobStatus::Succeeded(body)),
        "Failed" => {
            let failed = attr
                .failed_task_set
                .failed_task
                .into_iter()
                .next()
                .unwrap_or_default();
            let code = if failed.error_code.is_empty() {
                DEFAULT_FAILURE_CODE.to_string()
            } else {
                failed.error_code
            };
            let message = if failed.error_msg.is_empty() {
                format!("task {handle} failed")
            } else {
                failed.error_msg
            };
            Ok(JobStatus::Failed { code, message })
        }
        other => Err(Error::unexpected(format!(
            "task {handle} reported unknown status {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudrt_core::ErrorKind;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn handle() -> JobHandle {
        JobHandle::new("t-bp1dm1n7q5ak1aj3k0vq")
    }

    #[test_case("Waiting" ; "waiting")]
    #[test_case("Processing" ; "processing")]
    #[test_case("Pending" ; "pending")]
    fn test_pending_statuses(status: &str) {
        let body = format!(r#"{{"TaskId":"t-1","TaskStatus":"{status}"}}"#);
        assert_eq!(
            parse_task_status(&handle(), Bytes::from(body)).unwrap(),
            JobStatus::Pending
        );
    }

    #[test]
    fn test_finished_returns_body() {
        let body = Bytes::from_static(br#"{"TaskId":"t-1","TaskStatus":"Finished","SuccessCount":1}"#);
        assert_eq!(
            parse_task_status(&handle(), body.clone()).unwrap(),
            JobStatus::Succeeded(body)
        );
    }

    #[test]
    fn test_failed_carries_code() {
        let body = Bytes::from_static(
            br#"{
                "TaskId": "t-1",
                "TaskStatus": "Failed",
                "FailedTaskSet": {
                    "FailedTask": [
                        {"ErrorCode": "InvalidImage.NotFound", "ErrorMsg": "image not found"}
                    ]
                }
            }"#,
        );

        assert_eq!(
            parse_task_status(&handle(), body).unwrap(),
            JobStatus::Failed {
                code: "InvalidImage.NotFound".to_string(),
                message: "image not found".to_string(),
            }
        );
    }

    #[test]
    fn test_failed_without_details() {
        let body = Bytes::from_static(br#"{"TaskId":"t-1","TaskStatus":"Failed"}"#);

        assert_eq!(
            parse_task_status(&handle(), body).unwrap(),
            JobStatus::Failed {
                code: "TaskFailed".to_string(),
                message: "task t-bp1dm1n7q5ak1aj3k0vq failed".to_string(),
            }
        );
    }

    #[test_case(r#"{"TaskId":"t-1","TaskStatus":"Exploded"}"# ; "unknown status")]
    #[test_case(r#"{"TaskId":"t-1"}"# ; "missing status")]
    #[test_case("not json" ; "garbage")]
    fn test_unexpected_responses(body: &'static str) {
        let err = parse_task_status(&handle(), Bytes::from_static(body.as_bytes())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unexpected);
    }
}
