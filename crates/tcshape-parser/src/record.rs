//! Parsed traffic-control rows.

use serde::Serialize;
use std::collections::BTreeMap;

/// Opaque kind-specific parameters, kept exactly as `tc` printed them.
pub type Params = BTreeMap<String, String>;

/// One scheduling node of a device's qdisc tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QdiscRecord {
    pub device: String,
    /// Handle of this qdisc (e.g. `1a1a:`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    /// Parent class or qdisc; `None` for a root qdisc.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Scheduler algorithm (e.g. `htb`, `netem`, `tbf`).
    pub kind: String,
    #[serde(flatten)]
    pub params: Params,
}

/// One bandwidth/priority class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassRecord {
    pub device: String,
    #[serde(rename = "classid")]
    pub class_id: String,
    /// Parent class or qdisc; `None` for a root class.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub kind: String,
    #[serde(flatten)]
    pub params: Params,
}

/// One classifier rule routing packets into a class or qdisc.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterRecord {
    pub device: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(rename = "flowid", skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<String>,
    #[serde(rename = "classid", skip_serializing_if = "Option::is_none")]
    pub class_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_port: Option<u16>,
    /// Packet mark matched by an `fw` classifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<u32>,
}

impl FilterRecord {
    /// Creates an empty filter row for `device`.
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Default::default()
        }
    }

    /// Returns true if `id` equals this filter's flow id or class id.
    ///
    /// An absent identifier on either side never matches.
    pub fn targets(&self, id: Option<&str>) -> bool {
        let Some(id) = id else {
            return false;
        };
        self.flow_id.as_deref() == Some(id) || self.class_id.as_deref() == Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_filter_targets() {
        let filter = FilterRecord {
            flow_id: Some("1:10".to_string()),
            ..FilterRecord::new("eth0")
        };
        assert!(filter.targets(Some("1:10")));
        assert!(!filter.targets(Some("1:1")));
        assert!(!filter.targets(None));

        let fw = FilterRecord {
            class_id: Some("1:20".to_string()),
            handle: Some(10),
            ..FilterRecord::new("eth0")
        };
        assert!(fw.targets(Some("1:20")));
        assert!(!FilterRecord::new("eth0").targets(None));
    }

    #[test]
    fn test_record_serialization_names() {
        let filter = FilterRecord {
            filter_id: Some("800::800".to_string()),
            flow_id: Some("1:10".to_string()),
            dst_network: Some("192.0.2.0/24".to_string()),
            ..FilterRecord::new("eth0")
        };
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "device": "eth0",
                "filter_id": "800::800",
                "flowid": "1:10",
                "dst_network": "192.0.2.0/24",
            })
        );

        let mut params = Params::new();
        params.insert("rate".to_string(), "1Mbit".to_string());
        let class = ClassRecord {
            device: "eth0".to_string(),
            class_id: "1:10".to_string(),
            parent: Some("1:".to_string()),
            kind: "htb".to_string(),
            params,
        };
        let json = serde_json::to_value(&class).unwrap();
        assert_eq!(json["classid"], "1:10");
        assert_eq!(json["rate"], "1Mbit");
    }
}
