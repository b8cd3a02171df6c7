use crate::{Kind, Metadata, Object, Plugins, Resource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A client identity, keyed by username rather than by a derived ID.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Consumer {
    pub username: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,

    #[serde(skip_serializing_if = "Plugins::is_empty")]
    pub plugins: Plugins,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// The name of the cluster that owns the consumer.
    #[serde(skip)]
    pub group: String,
}

impl Resource for Consumer {
    const KIND: Kind = Kind::Consumer;

    fn metadata(&self) -> Option<&Metadata> {
        None
    }

    fn metadata_mut(&mut self) -> Option<&mut Metadata> {
        None
    }

    fn into_object(self) -> Object {
        Object::Consumer(self)
    }

    fn from_object(obj: Object) -> Option<Self> {
        match obj {
            Object::Consumer(c) => Some(c),
            _ => None,
        }
    }

    fn id(&self) -> &str {
        &self.username
    }

    fn name(&self) -> Option<&str> {
        Some(&self.username).filter(|u| !u.is_empty()).map(String::as_str)
    }

    fn id_for_name(name: &str) -> String {
        name.to_string()
    }

    fn adopt(&mut self, id: &str, cluster: &str) {
        if self.username.is_empty() {
            self.username = id.to_string();
        }
        self.group = cluster.to_string();
    }
}
