//! Service introspection (`/v0/inspect`): setting definitions and, for
//! running workers, the connector classes they host.

use crate::client::Configurator;
use crate::error::ClientError;
use crate::transport::Request;
use crate::url;
use om_core::{ActionResult, ObjectKey, ResourceKind, SettingDefinition, Subject, Verb};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassInfo {
    pub class_name: String,
    #[serde(default)]
    pub class_type: Option<String>,
    #[serde(default)]
    pub setting_definitions: Vec<SettingDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    #[serde(default)]
    pub image_name: Option<String>,
    #[serde(default)]
    pub setting_definitions: Vec<SettingDefinition>,
    #[serde(default)]
    pub class_infos: Vec<ClassInfo>,
}

impl ServiceInfo {
    /// Definitions of the service itself, falling back to those of its
    /// first class when the top level carries none.
    pub fn definitions(&self) -> &[SettingDefinition] {
        if !self.setting_definitions.is_empty() {
            return &self.setting_definitions;
        }
        self.class_infos
            .first()
            .map(|class| class.setting_definitions.as_slice())
            .unwrap_or(&[])
    }

    pub fn class_names(&self) -> Vec<&str> {
        self.class_infos.iter().map(|c| c.class_name.as_str()).collect()
    }
}

pub struct InspectApi {
    configurator: Configurator,
}

impl InspectApi {
    pub fn new(configurator: Configurator) -> Self {
        Self { configurator }
    }

    pub async fn info(&self, kind: ResourceKind) -> Result<ActionResult<ServiceInfo>, ClientError> {
        let subject = Subject::new(Verb::Get, kind, "info");
        let response = self.configurator.send(Request::get(url::inspect(kind))).await?;
        Ok(response.into_result(&subject))
    }

    /// Inspection of one running worker cluster.
    pub async fn worker(&self, key: &ObjectKey) -> Result<ActionResult<ServiceInfo>, ClientError> {
        let subject = Subject::new(Verb::Get, ResourceKind::Worker, format!("{} info", key));
        let request = Request::get(url::inspect_object(ResourceKind::Worker, &key.name))
            .with_query(url::group_query(key));
        let response = self.configurator.send(request).await?;
        Ok(response.into_result(&subject))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_definitions_fallback_to_first_class() {
        let info: ServiceInfo = serde_json::from_value(json!({
            "classInfos": [{
                "className": "oharastream.ohara.connector.perf.PerfSource",
                "classType": "source",
                "settingDefinitions": [{"key": "perf.batch", "valueType": "INT", "defaultValue": 10}]
            }]
        }))
        .unwrap();
        assert_eq!(info.definitions()[0].key, "perf.batch");
        assert_eq!(info.class_names(), vec!["oharastream.ohara.connector.perf.PerfSource"]);

        let empty = ServiceInfo::default();
        assert!(empty.definitions().is_empty());
    }
}
