use std::{collections::BTreeMap, fmt};

use serde_json::{Map, Value};

use crate::{
    dynamic::{GenericDocument, GenericDocumentList},
    error::{ConversionError, ConversionFailure, ValueKind},
};

mod kinds;

/// A typed shape that can be filled from a generic document.
pub trait Convertible: Default + Sized + 'static {
    /// Declared fields of the shape and how each one is coerced.
    fn schema() -> Schema<Self>;
}

/// Convert every item of `list` into `K`.
///
/// Fails on the first item that lacks a required field or carries a field of
/// the wrong shape; no partially filled record is ever returned.
pub fn convert<K: Convertible>(list: &GenericDocumentList) -> Result<Vec<K>, ConversionError> {
    K::schema().convert_all(&list.items)
}

/// Render typed records back into generic documents holding their declared fields.
pub fn to_documents<K: Convertible>(records: &[K]) -> Vec<GenericDocument> {
    let schema = K::schema();
    records.iter().map(|r| schema.to_document(r)).collect()
}

/// Dotted path into a document, e.g. `status.phase`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<String>,
}

enum Lookup<'a> {
    Found(&'a Value),
    /// Segment at this position is absent or `null`.
    Missing(usize),
    /// Value reached after this many segments is not a mapping.
    NotMapping(usize, ValueKind),
}

impl FieldPath {
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path.split('.').map(str::to_string).collect(),
        }
    }

    fn prefix(&self, len: usize) -> String {
        if len == 0 {
            String::from("<item>")
        } else {
            self.segments[..len].join(".")
        }
    }

    fn lookup<'a>(&self, document: &'a Value) -> Lookup<'a> {
        let mut current = document;
        for (depth, segment) in self.segments.iter().enumerate() {
            let Some(map) = current.as_object() else {
                return Lookup::NotMapping(depth, ValueKind::of(current));
            };
            match map.get(segment) {
                None | Some(Value::Null) => return Lookup::Missing(depth),
                Some(next) => current = next,
            }
        }
        Lookup::Found(current)
    }

    /// Value at this path, if every segment is present.
    pub fn get<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        match self.lookup(document) {
            Lookup::Found(value) => Some(value),
            _ => None,
        }
    }

    fn insert(&self, document: &mut Value, value: Value) {
        if !self.segments.is_empty() {
            insert_at(document, &self.segments, value);
        }
    }
}

/// Place `value` under `segments`, turning anything on the way that is not a mapping into one.
fn insert_at(target: &mut Value, segments: &[String], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *target = value;
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        let slot = map.entry(first.clone()).or_insert(Value::Null);
        insert_at(slot, rest, value);
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

type Reader<K> = Box<dyn Fn(&mut K, &Value) -> Result<(), ConversionFailure> + Send + Sync>;
type Writer<K> = Box<dyn Fn(&K) -> Option<Value> + Send + Sync>;

/// How one declared field moves between a generic value and the typed record.
pub struct Coerce<K> {
    expected: ValueKind,
    read: Reader<K>,
    write: Writer<K>,
}

fn mismatch(expected: ValueKind, value: &Value) -> ConversionFailure {
    ConversionFailure::TypeMismatch {
        expected,
        found: ValueKind::of(value),
    }
}

impl<K: 'static> Coerce<K> {
    pub fn string(get: fn(&K) -> Option<String>, set: fn(&mut K, String)) -> Self {
        Self {
            expected: ValueKind::String,
            read: Box::new(move |record, value| {
                let s = value
                    .as_str()
                    .ok_or_else(|| mismatch(ValueKind::String, value))?;
                set(record, s.to_string());
                Ok(())
            }),
            write: Box::new(move |record| get(record).map(Value::String)),
        }
    }

    pub fn boolean(get: fn(&K) -> Option<bool>, set: fn(&mut K, bool)) -> Self {
        Self {
            expected: ValueKind::Bool,
            read: Box::new(move |record, value| {
                let b = value
                    .as_bool()
                    .ok_or_else(|| mismatch(ValueKind::Bool, value))?;
                set(record, b);
                Ok(())
            }),
            write: Box::new(move |record| get(record).map(Value::Bool)),
        }
    }

    /// Whole numbers only; values that do not fit `T` are out of range.
    pub fn integer<T>(get: fn(&K) -> Option<T>, set: fn(&mut K, T)) -> Self
    where
        T: TryFrom<i64> + Into<i64> + 'static,
    {
        Self {
            expected: ValueKind::Integer,
            read: Box::new(move |record, value| {
                let n = match value.as_i64() {
                    Some(n) => n,
                    None if value.is_u64() => return Err(ConversionFailure::OutOfRange),
                    None => return Err(mismatch(ValueKind::Integer, value)),
                };
                let n = T::try_from(n).map_err(|_| ConversionFailure::OutOfRange)?;
                set(record, n);
                Ok(())
            }),
            write: Box::new(move |record| get(record).map(|n| Value::from(Into::<i64>::into(n)))),
        }
    }

    pub fn strings(get: fn(&K) -> Option<Vec<String>>, set: fn(&mut K, Vec<String>)) -> Self {
        Self {
            expected: ValueKind::Sequence,
            read: Box::new(move |record, value| {
                let items = value
                    .as_array()
                    .ok_or_else(|| mismatch(ValueKind::Sequence, value))?;
                let strings = items
                    .iter()
                    .map(|item| {
                        item.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| mismatch(ValueKind::String, item))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                set(record, strings);
                Ok(())
            }),
            write: Box::new(move |record| {
                get(record).map(|items| Value::Array(items.into_iter().map(Value::String).collect()))
            }),
        }
    }

    pub fn string_map(
        get: fn(&K) -> Option<BTreeMap<String, String>>,
        set: fn(&mut K, BTreeMap<String, String>),
    ) -> Self {
        Self {
            expected: ValueKind::Mapping,
            read: Box::new(move |record, value| {
                let entries = value
                    .as_object()
                    .ok_or_else(|| mismatch(ValueKind::Mapping, value))?;
                let map = entries
                    .iter()
                    .map(|(k, v)| {
                        v.as_str()
                            .map(|s| (k.clone(), s.to_string()))
                            .ok_or_else(|| mismatch(ValueKind::String, v))
                    })
                    .collect::<Result<BTreeMap<_, _>, _>>()?;
                set(record, map);
                Ok(())
            }),
            write: Box::new(move |record| {
                get(record).map(|map| {
                    Value::Object(map.into_iter().map(|(k, v)| (k, Value::String(v))).collect())
                })
            }),
        }
    }

    pub fn expected(&self) -> ValueKind {
        self.expected
    }
}

struct FieldRule<K> {
    path: FieldPath,
    required: bool,
    coerce: Coerce<K>,
}

/// Declared fields of a typed shape, evaluated in declaration order.
pub struct Schema<K> {
    fields: Vec<FieldRule<K>>,
}

impl<K: Default> Schema<K> {
    pub fn builder() -> SchemaBuilder<K> {
        SchemaBuilder { fields: Vec::new() }
    }

    /// Paths of every declared field.
    pub fn paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.fields.iter().map(|f| &f.path)
    }

    /// Fill a fresh record from the document at position `index`.
    pub fn from_document(&self, index: usize, document: &Value) -> Result<K, ConversionError> {
        let mut record = K::default();
        for field in &self.fields {
            let failed = |path: String, failure| ConversionError {
                index,
                path,
                failure,
            };
            match field.path.lookup(document) {
                Lookup::Found(value) => (field.coerce.read)(&mut record, value)
                    .map_err(|failure| failed(field.path.to_string(), failure))?,
                Lookup::Missing(_) if !field.required => {}
                Lookup::Missing(depth) => {
                    return Err(failed(
                        field.path.prefix(depth + 1),
                        ConversionFailure::Missing,
                    ));
                }
                Lookup::NotMapping(depth, found) => {
                    return Err(failed(
                        field.path.prefix(depth),
                        ConversionFailure::TypeMismatch {
                            expected: ValueKind::Mapping,
                            found,
                        },
                    ));
                }
            }
        }
        Ok(record)
    }

    pub fn convert_all(&self, documents: &[Value]) -> Result<Vec<K>, ConversionError> {
        documents
            .iter()
            .enumerate()
            .map(|(index, document)| self.from_document(index, document))
            .collect()
    }

    /// Generic document holding every declared field that `record` has a value for.
    pub fn to_document(&self, record: &K) -> GenericDocument {
        let mut document = Value::Object(Map::new());
        for field in &self.fields {
            if let Some(value) = (field.coerce.write)(record) {
                field.path.insert(&mut document, value);
            }
        }
        document
    }
}

/// Registers the declared fields of a [`Schema`].
pub struct SchemaBuilder<K> {
    fields: Vec<FieldRule<K>>,
}

impl<K: Default> SchemaBuilder<K> {
    /// Field that must be present and non-null in every document.
    pub fn required(self, path: &str, coerce: Coerce<K>) -> Self {
        self.field(path, true, coerce)
    }

    /// Field that may be absent or null; a present value must still have the right shape.
    pub fn optional(self, path: &str, coerce: Coerce<K>) -> Self {
        self.field(path, false, coerce)
    }

    fn field(mut self, path: &str, required: bool, coerce: Coerce<K>) -> Self {
        self.fields.push(FieldRule {
            path: FieldPath::parse(path),
            required,
            coerce,
        });
        self
    }

    pub fn build(self) -> Schema<K> {
        Schema {
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::{
        apps::v1::Deployment,
        core::v1::{Namespace, Pod},
    };
    use serde_json::json;

    use super::*;

    fn pod_document(name: &str, namespace: &str, phase: &str) -> Value {
        json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {
                "name": name,
                "namespace": namespace,
                "uid": "8a1b",
                "labels": {"app": "web", "tier": "frontend"}
            },
            "spec": {
                "nodeName": "node-1",
                "hostNetwork": false,
                "containers": [{"name": "web", "image": "nginx"}]
            },
            "status": {"phase": phase, "podIP": "10.0.0.7", "qosClass": "BestEffort"}
        })
    }

    fn list_of(items: Vec<Value>) -> GenericDocumentList {
        GenericDocumentList {
            api_version: String::from("v1"),
            kind: String::from("List"),
            items,
            ..Default::default()
        }
    }

    #[test]
    fn converts_pods_field_by_field() {
        let list = list_of(vec![
            pod_document("web-0", "default", "Running"),
            pod_document("web-1", "default", "Pending"),
        ]);
        let pods: Vec<Pod> = convert(&list).unwrap();

        assert_eq!(pods.len(), 2);
        assert_eq!(pods[0].metadata.name.as_deref(), Some("web-0"));
        assert_eq!(pods[0].metadata.namespace.as_deref(), Some("default"));
        assert_eq!(
            pods[1].status.as_ref().and_then(|s| s.phase.as_deref()),
            Some("Pending")
        );
        let labels = pods[0].metadata.labels.as_ref().unwrap();
        assert_eq!(labels.get("tier").map(String::as_str), Some("frontend"));
        assert_eq!(
            pods[0].spec.as_ref().and_then(|s| s.host_network),
            Some(false)
        );
        // undeclared fields are ignored
        assert_eq!(pods[0].metadata.uid, None);
    }

    #[test]
    fn missing_status_names_status() {
        let mut document = pod_document("web-0", "default", "Running");
        document.as_object_mut().unwrap().remove("status");
        let list = list_of(vec![pod_document("ok", "default", "Running"), document]);

        let err = convert::<Pod>(&list).expect_err("status is required");
        assert_eq!(err.index, 1);
        assert_eq!(err.path, "status");
        assert_eq!(err.failure, ConversionFailure::Missing);
    }

    #[test]
    fn null_required_field_is_missing() {
        let mut document = pod_document("web-0", "default", "Running");
        document["status"]["phase"] = Value::Null;

        let err = convert::<Pod>(&list_of(vec![document])).unwrap_err();
        assert_eq!(err.path, "status.phase");
        assert_eq!(err.failure, ConversionFailure::Missing);
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let document = json!({
            "metadata": {"name": "web-0", "namespace": "default"},
            "status": {"phase": "Running"}
        });
        let pods: Vec<Pod> = convert(&list_of(vec![document])).unwrap();
        assert_eq!(pods[0].metadata.labels, None);
        assert_eq!(pods[0].spec, None);
    }

    #[test]
    fn wrong_shapes_fail() {
        let mut document = pod_document("web-0", "default", "Running");
        document["status"]["phase"] = json!(7);
        let err = convert::<Pod>(&list_of(vec![document])).unwrap_err();
        assert_eq!(err.path, "status.phase");
        assert_eq!(
            err.failure,
            ConversionFailure::TypeMismatch {
                expected: ValueKind::String,
                found: ValueKind::Integer
            }
        );

        let mut document = pod_document("web-0", "default", "Running");
        document["status"] = json!("Running");
        let err = convert::<Pod>(&list_of(vec![document])).unwrap_err();
        assert_eq!(err.path, "status");
        assert!(matches!(
            err.failure,
            ConversionFailure::TypeMismatch {
                expected: ValueKind::Mapping,
                found: ValueKind::String
            }
        ));

        let err = convert::<Pod>(&list_of(vec![json!(["not", "a", "mapping"])])).unwrap_err();
        assert_eq!(err.path, "<item>");
    }

    #[test]
    fn optional_field_with_wrong_shape_fails() {
        let mut document = pod_document("web-0", "default", "Running");
        document["metadata"]["labels"] = json!({"app": 1});
        let err = convert::<Pod>(&list_of(vec![document])).unwrap_err();
        assert_eq!(err.path, "metadata.labels");
    }

    #[test]
    fn deployment_replicas_range_is_checked() {
        let deployment = |replicas: Value| {
            json!({
                "metadata": {"name": "api", "namespace": "default"},
                "spec": {"replicas": replicas},
                "status": {"readyReplicas": 2}
            })
        };

        let ok: Vec<Deployment> = convert(&list_of(vec![deployment(json!(3))])).unwrap();
        assert_eq!(ok[0].spec.as_ref().and_then(|s| s.replicas), Some(3));
        assert_eq!(ok[0].status.as_ref().and_then(|s| s.ready_replicas), Some(2));

        let err = convert::<Deployment>(&list_of(vec![deployment(json!(1_i64 << 40))])).unwrap_err();
        assert_eq!(err.failure, ConversionFailure::OutOfRange);

        let err = convert::<Deployment>(&list_of(vec![deployment(json!(1.5))])).unwrap_err();
        assert_eq!(err.path, "spec.replicas");
        assert!(matches!(err.failure, ConversionFailure::TypeMismatch { .. }));
    }

    #[test]
    fn round_trip_keeps_declared_fields() {
        let original = pod_document("web-0", "default", "Running");
        let pods: Vec<Pod> = convert(&list_of(vec![original.clone()])).unwrap();
        let rendered = to_documents(&pods);

        let schema = Pod::schema();
        for path in schema.paths() {
            assert_eq!(
                path.get(&rendered[0]),
                path.get(&original),
                "field {path} changed"
            );
        }
        assert!(rendered[0].get("kind").is_none());
    }

    #[test]
    fn namespaces_convert_without_namespace_field() {
        let document = json!({
            "metadata": {"name": "kube-system"},
            "spec": {"finalizers": ["kubernetes"]},
            "status": {"phase": "Active"}
        });
        let namespaces: Vec<Namespace> = convert(&list_of(vec![document.clone()])).unwrap();
        assert_eq!(namespaces[0].metadata.name.as_deref(), Some("kube-system"));
        assert_eq!(
            namespaces[0].spec.as_ref().and_then(|s| s.finalizers.clone()),
            Some(vec![String::from("kubernetes")])
        );
        assert_eq!(to_documents(&namespaces)[0], document);
    }

    #[test]
    fn insert_builds_nested_mappings() {
        let mut document = Value::Object(Map::new());
        FieldPath::parse("status.phase").insert(&mut document, json!("Running"));
        FieldPath::parse("status.podIP").insert(&mut document, json!("10.0.0.1"));
        assert_eq!(
            document,
            json!({"status": {"phase": "Running", "podIP": "10.0.0.1"}})
        );
    }

    #[test]
    fn insert_replaces_scalar_parents() {
        let mut document = json!({"status": "unknown", "metadata": {"name": "web-0"}});
        FieldPath::parse("status.phase").insert(&mut document, json!("Running"));
        FieldPath::parse("metadata.labels.app").insert(&mut document, json!("web"));
        assert_eq!(
            document,
            json!({
                "status": {"phase": "Running"},
                "metadata": {"name": "web-0", "labels": {"app": "web"}}
            })
        );

        let mut scalar = json!(7);
        FieldPath::parse("spec.replicas").insert(&mut scalar, json!(3));
        assert_eq!(scalar, json!({"spec": {"replicas": 3}}));
    }
}
