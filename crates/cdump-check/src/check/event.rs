use std::io::Read;

use cdump_model::{CheckResult, Info};
use serde::Deserialize;
use tracing::trace;

use super::Check;
use crate::error::CheckError;

const EVENTS_FILE: &str = "events.json";

/// The subset of a cluster event list the checks look at.
#[derive(Debug, Default, Deserialize)]
pub struct EventList {
    #[serde(default)]
    pub items: Vec<Event>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default)]
    pub involved_object: InvolvedObject,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct InvolvedObject {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub name: String,
}

/// Matches events by reason and a substring of their message.
#[derive(Debug, Clone)]
pub struct EventCheck {
    reason: &'static str,
    needle: &'static str,
    result: CheckResult,
}

impl EventCheck {
    pub fn new(name: &'static str, reason: &'static str, needle: &'static str) -> Self {
        Self {
            reason,
            needle,
            result: CheckResult::new(name),
        }
    }

    fn matches(&self, event: &Event) -> bool {
        event.reason == self.reason && event.message.contains(self.needle)
    }
}

impl Check for EventCheck {
    fn name(&self) -> &str {
        &self.result.check_name
    }

    fn required_files(&self) -> &[&str] {
        &[EVENTS_FILE]
    }

    fn examine(&mut self, file: &str, reader: &mut dyn Read) -> Result<(), CheckError> {
        let events: EventList = serde_json::from_reader(reader).map_err(|source| CheckError::Parse {
            file: file.to_string(),
            source,
        })?;

        let found: Vec<Info> = events
            .items
            .into_iter()
            .filter(|e| self.matches(e))
            .map(|e| Info {
                file: file.to_string(),
                entry: e.message,
                object_name: e.involved_object.name,
                namespace: e.involved_object.namespace,
                count: e.count,
            })
            .collect();
        trace!(target: "cdump.check", check = %self.result.check_name, file, found = found.len(), "examined");
        self.result.record(found);
        Ok(())
    }

    fn result(&self) -> CheckResult {
        self.result.clone()
    }
}

#[cfg(test)]
mod tests {
    use cdump_model::{CheckStatus, DETECTED_MESSAGE, NOT_DETECTED_MESSAGE};

    use super::*;
    use crate::check::image_pull_back_off;

    const IMAGE_PULL_EVENTS: &str = r#"
    {
        "kind": "List",
        "apiVersion": "v1",
        "metadata": {},
        "items": [
            {
                "kind": "Event",
                "apiVersion": "v1",
                "metadata": {
                    "name": "fh-aaa-4-0w1q2.14656378b8b4a890",
                    "namespace": "phils-core",
                    "resourceVersion": "47238",
                    "creationTimestamp": "2016-07-28T07:17:03Z"
                },
                "involvedObject": {
                    "kind": "Pod",
                    "namespace": "phils-core",
                    "name": "fh-aaa-4-0w1q2",
                    "apiVersion": "v1"
                },
                "reason": "FailedSync",
                "message": "Error syncing pod, skipping: failed to \"StartContainer\" for \"fh-aaa\" with ImagePullBackOff: \"Back-off pulling image \\\"docker.io/rhmap/fh-aaa:0.3.0-349-234\\\"\"\n",
                "source": {
                    "component": "kubelet",
                    "host": "local.feedhenry.io"
                },
                "count": 47,
                "type": "Warning"
            }
        ]
    }"#;

    const SCALED_EVENTS: &str = r#"
    {
        "kind": "List",
        "items": [
            {
                "kind": "Event",
                "involvedObject": {
                    "kind": "DeploymentConfig",
                    "namespace": "phils-core",
                    "name": "fh-aaa"
                },
                "reason": "DeploymentScaled",
                "message": "Scaled deployment \"fh-aaa-4\" from 1 to 0",
                "count": 1,
                "type": "Normal"
            }
        ]
    }"#;

    const EVENTS_PATH: &str = "projects/phils-core/definitions/events.json";

    #[test]
    fn starts_not_detected() {
        let check = image_pull_back_off();
        let r = check.result();
        assert_eq!(r.check_name, "ImagePullBackOff");
        assert_eq!(r.status, CheckStatus::NotDetected);
        assert_eq!(r.status_message, NOT_DETECTED_MESSAGE);
        assert_eq!(check.required_files(), ["events.json"]);
    }

    #[test]
    fn detects_image_pull_back_off() {
        let mut check = image_pull_back_off();
        check
            .examine(EVENTS_PATH, &mut IMAGE_PULL_EVENTS.as_bytes())
            .unwrap();

        let r = check.result();
        assert_eq!(r.status, CheckStatus::Detected);
        assert_eq!(r.status_message, DETECTED_MESSAGE);
        assert_eq!(r.info.len(), 1);
        let info = &r.info[0];
        assert_eq!(info.count, 47);
        assert_eq!(info.object_name, "fh-aaa-4-0w1q2");
        assert_eq!(info.namespace, "phils-core");
        assert_eq!(info.file, EVENTS_PATH);
        assert!(info.entry.contains("Back-off pulling image"));
    }

    #[test]
    fn ignores_unrelated_events() {
        let mut check = image_pull_back_off();
        check.examine(EVENTS_PATH, &mut SCALED_EVENTS.as_bytes()).unwrap();
        let r = check.result();
        assert_eq!(r.status, CheckStatus::NotDetected);
        assert!(r.info.is_empty());
    }

    #[test]
    fn bad_json_leaves_result_unchanged() {
        let mut check = image_pull_back_off();
        check
            .examine(EVENTS_PATH, &mut IMAGE_PULL_EVENTS.as_bytes())
            .unwrap();
        let before = check.result();

        let err = check.examine("broken/events.json", &mut "{]".as_bytes()).unwrap_err();
        assert!(matches!(err, CheckError::Parse { ref file, .. } if file == "broken/events.json"));
        assert_eq!(check.result(), before);
    }

    #[test]
    fn needle_must_match_reason_too() {
        let mut check = EventCheck::new("CrashLoopBackOff", "FailedSync", "CrashLoopBackOff");
        let events = r#"{"items":[
            {"reason":"BackOff","message":"CrashLoopBackOff","count":2,
             "involvedObject":{"namespace":"core","name":"a"}},
            {"reason":"FailedSync","message":"with CrashLoopBackOff: back-off 5m0s","count":9,
             "involvedObject":{"namespace":"core","name":"b"}}
        ]}"#;
        check.examine("events.json", &mut events.as_bytes()).unwrap();
        let r = check.result();
        assert_eq!(r.info.len(), 1);
        assert_eq!(r.info[0].object_name, "b");
        assert_eq!(r.info[0].count, 9);
    }
}
