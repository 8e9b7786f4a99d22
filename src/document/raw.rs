//! Raw document shapes, exactly as they appear in the user's YAML.
//!
//! YAML shape:
//! logging:
//!   receivers:
//!     syslog:
//!       type: files
//!       include_paths: [/var/log/syslog]
//!   exporters:
//!     google:
//!       type: google_cloud_logging
//!   service:
//!     pipelines:
//!       default_pipeline:
//!         receivers: [syslog]
//!         exporters: [google]
//! metrics:
//!   ...
//!
//! Nothing here is validated beyond shape. Field maps stay untyped until the
//! resolver checks them against the registry.

use crate::registry::Kind;
use serde::Deserialize;
use serde::de::{Deserializer, MapAccess, Visitor};
use std::fmt;
use std::marker::PhantomData;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawDocument {
    #[serde(default)]
    pub logging: Option<RawSection>,

    #[serde(default)]
    pub metrics: Option<RawSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSection {
    #[serde(default)]
    pub receivers: Entries<RawComponent>,

    #[serde(default)]
    pub processors: Entries<RawComponent>,

    #[serde(default)]
    pub exporters: Entries<RawComponent>,

    #[serde(default)]
    pub service: RawService,
}

impl RawSection {
    pub fn table(&self, kind: Kind) -> &Entries<RawComponent> {
        match kind {
            Kind::Receiver => &self.receivers,
            Kind::Processor => &self.processors,
            Kind::Exporter => &self.exporters,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawService {
    #[serde(default)]
    pub pipelines: Entries<RawPipeline>,
}

/// One receiver/processor/exporter declaration. `type` is split out; every
/// other key lands in `fields`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawComponent {
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,

    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPipeline {
    #[serde(default)]
    pub receivers: Vec<String>,

    #[serde(default)]
    pub processors: Vec<String>,

    #[serde(default)]
    pub exporters: Vec<String>,
}

impl RawPipeline {
    pub fn refs(&self, kind: Kind) -> &[String] {
        match kind {
            Kind::Receiver => &self.receivers,
            Kind::Processor => &self.processors,
            Kind::Exporter => &self.exporters,
        }
    }
}

/// A mapping kept as an ordered list of entries.
///
/// Repeated keys are kept, so the resolver can report them as duplicate IDs
/// instead of silently keeping the last one. A YAML `null` is an empty map.
#[derive(Debug, Clone)]
pub struct Entries<T>(pub Vec<(String, T)>);

impl<T> Default for Entries<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> Entries<T> {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<T> FromIterator<(String, T)> for Entries<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de, T> Deserialize<'de> for Entries<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor<T>(PhantomData<T>);

        impl<'de, T> Visitor<'de> for EntriesVisitor<T>
        where
            T: Deserialize<'de>,
        {
            type Value = Entries<T>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping of id to declaration")
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Entries::default())
            }

            fn visit_none<E>(self) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Entries::default())
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, T>()? {
                    out.push((key, value));
                }
                Ok(Entries(out))
            }
        }

        deserializer.deserialize_any(EntriesVisitor(PhantomData))
    }
}
