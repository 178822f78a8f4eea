//! Marshal / unmarshal engine

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument};

use observability::metrics::{
    record_marshal, record_unmarshal, CodecStatsAggregator, MarshalMode, UnmarshalOutcome,
};
use representation::{CodecConfig, EmissorError, MarshalOptions, Result, Untyped};

use crate::registry::TypeRegistry;
use crate::schema::Structured;

/// Result of loading a document with a target type
#[derive(Debug, Clone, PartialEq)]
pub enum Document<T> {
    /// Top-level `null`
    Empty,
    /// Top-level string, number or boolean, returned unchanged
    Scalar(Value),
    One(T),
    Many(Vec<T>),
}

impl<T> Document<T> {
    /// The single record of the document.
    ///
    /// # Errors
    /// `Parse` if the document is not a single record
    pub fn into_one(self) -> Result<T> {
        match self {
            Document::One(value) => Ok(value),
            other => Err(shape_error("a single record", other.describe())),
        }
    }

    /// All records of the document; a single record becomes a one-element
    /// list and `null` an empty one.
    ///
    /// # Errors
    /// `Parse` for scalar documents
    pub fn into_many(self) -> Result<Vec<T>> {
        match self {
            Document::Many(values) => Ok(values),
            Document::One(value) => Ok(vec![value]),
            Document::Empty => Ok(Vec::new()),
            other => Err(shape_error("records", other.describe())),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Document::Empty => "null",
            Document::Scalar(_) => "a scalar",
            Document::One(_) => "a single record",
            Document::Many(_) => "a list",
        }
    }
}

fn shape_error(expected: &str, found: &str) -> EmissorError {
    EmissorError::Parse {
        message: format!("expected {expected}, found {found}"),
        source: None,
    }
}

/// JSON codec over a shared [`TypeRegistry`]
#[derive(Debug, Clone)]
pub struct Codec {
    registry: Arc<TypeRegistry>,
    options: MarshalOptions,
    stats: Option<Arc<Mutex<CodecStatsAggregator>>>,
}

impl Codec {
    pub fn new(registry: Arc<TypeRegistry>, options: MarshalOptions) -> Self {
        Self {
            registry,
            options,
            stats: None,
        }
    }

    /// Codec over the scenario model with default options
    pub fn emissor() -> Result<Self> {
        Ok(Self::new(Arc::new(TypeRegistry::emissor()?), MarshalOptions::default()))
    }

    /// Codec over the scenario model configured by `config`
    pub fn from_config(config: &CodecConfig) -> Result<Self> {
        let registry = TypeRegistry::builder()
            .linked_data(config.linked_data.clone())
            .register_emissor_types()
            .build()?;
        Ok(Self::new(Arc::new(registry), config.marshal.clone()))
    }

    /// Same registry, different output options
    pub fn with_options(&self, options: MarshalOptions) -> Self {
        Self {
            options,
            ..self.clone()
        }
    }

    /// Feed every typed marshal and unmarshal call into `stats`
    pub fn with_stats(mut self, stats: Arc<Mutex<CodecStatsAggregator>>) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn options(&self) -> &MarshalOptions {
        &self.options
    }

    /// Serialize a registered record.
    ///
    /// # Errors
    /// `UnsupportedType` if `T` is not registered
    #[instrument(skip_all, fields(type_name = std::any::type_name::<T>()))]
    pub fn marshal<T: Structured>(&self, obj: &T) -> Result<String> {
        let schema = self.registry.schema_of::<T>()?;
        let mut value = to_value(obj)?;
        if self.options.emit_linked_data {
            self.registry.decorate(&mut value, schema);
        }

        let json = self.write(&value)?;
        debug!(tag = schema.tag, bytes = json.len(), "marshalled record");
        record_marshal(schema.tag, MarshalMode::One, json.len());
        self.note_marshal(schema.tag, json.len());
        Ok(json)
    }

    /// Serialize a list of registered records
    #[instrument(skip_all, fields(type_name = std::any::type_name::<T>(), count = objs.len()))]
    pub fn marshal_many<T: Structured>(&self, objs: &[T]) -> Result<String> {
        let schema = self.registry.schema_of::<T>()?;
        let mut value = to_value(objs)?;
        if self.options.emit_linked_data {
            if let Value::Array(items) = &mut value {
                for item in items {
                    self.registry.decorate(item, schema);
                }
            }
        }

        let json = self.write(&value)?;
        debug!(tag = schema.tag, bytes = json.len(), "marshalled records");
        record_marshal(schema.tag, MarshalMode::Many, json.len());
        self.note_marshal(schema.tag, json.len());
        Ok(json)
    }

    /// Serialize any value without type information or linked data.
    ///
    /// Suitable for logs and debugging output; the result cannot be loaded
    /// back into a typed value reliably.
    pub fn marshal_untyped<S: Serialize + ?Sized>(&self, obj: &S) -> Result<String> {
        let value = to_value(obj)?;
        let json = self.write(&value)?;
        record_marshal("untyped", MarshalMode::Untyped, json.len());
        Ok(json)
    }

    /// Load a document as `T`.
    ///
    /// `null` and bare scalars are returned as they are; objects load as one
    /// record and lists as many. Unknown keys are ignored.
    ///
    /// # Errors
    /// `UnsupportedType` if `T` is not registered, `Parse` for malformed JSON
    /// or a document that does not match `T`
    #[instrument(skip_all, fields(type_name = std::any::type_name::<T>(), bytes = json.len()))]
    pub fn unmarshal<T: Structured>(&self, json: &str) -> Result<Document<T>> {
        let schema = self.registry.schema_of::<T>()?;
        let value: Value = match serde_json::from_str(json) {
            Ok(value) => value,
            Err(e) => {
                self.note_unmarshal(schema.tag, UnmarshalOutcome::Malformed);
                return Err(EmissorError::parse("malformed JSON document", e));
            }
        };

        let loaded = match value {
            Value::Null => Ok(Document::Empty),
            scalar @ (Value::Bool(_) | Value::Number(_) | Value::String(_)) => {
                Ok(Document::Scalar(scalar))
            }
            Value::Object(_) => from_value(value, schema.tag).map(Document::One),
            Value::Array(_) => from_value(value, schema.tag).map(Document::Many),
        };
        let document = match loaded {
            Ok(document) => document,
            Err(e) => {
                self.note_unmarshal(schema.tag, UnmarshalOutcome::Mismatch);
                return Err(e);
            }
        };

        debug!(tag = schema.tag, shape = document.describe(), "unmarshalled document");
        self.note_unmarshal(schema.tag, UnmarshalOutcome::Ok);
        Ok(document)
    }

    /// Load a document without a target type.
    ///
    /// Objects keep only keys that are identifiers and do not start with `_`.
    pub fn unmarshal_untyped(&self, json: &str) -> Result<Untyped> {
        let value: Value = serde_json::from_str(json).map_err(|e| {
            record_unmarshal("untyped", UnmarshalOutcome::Malformed);
            EmissorError::parse("malformed JSON document", e)
        })?;
        record_unmarshal("untyped", UnmarshalOutcome::Ok);
        Ok(Untyped::from(value))
    }

    fn note_marshal(&self, tag: &str, bytes: usize) {
        if let Some(Ok(mut stats)) = self.stats.as_ref().map(|stats| stats.lock()) {
            stats.record_marshal(tag, bytes);
        }
    }

    fn note_unmarshal(&self, tag: &'static str, outcome: UnmarshalOutcome) {
        record_unmarshal(tag, outcome);
        if let Some(Ok(mut stats)) = self.stats.as_ref().map(|stats| stats.lock()) {
            stats.record_unmarshal(tag, outcome);
        }
    }

    fn write(&self, value: &Value) -> Result<String> {
        if self.options.indent == 0 {
            return serde_json::to_string(value)
                .map_err(|e| EmissorError::parse("failed to write JSON", e));
        }

        let indent = vec![b' '; self.options.indent];
        let mut buf = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(&indent));
        value
            .serialize(&mut serializer)
            .map_err(|e| EmissorError::parse("failed to write JSON", e))?;
        String::from_utf8(buf).map_err(|e| EmissorError::Other(e.to_string()))
    }
}

fn to_value<S: Serialize + ?Sized>(obj: &S) -> Result<Value> {
    serde_json::to_value(obj).map_err(|e| EmissorError::parse("failed to serialize value", e))
}

fn from_value<T: serde::de::DeserializeOwned>(value: Value, tag: &'static str) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| EmissorError::parse(format!("document does not match {tag}"), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array3, ArrayD, IxDyn};
    use representation::{
        Annotation, AnnotationValue, ArrayContainer, AtomicContainer, AtomicRuler, Container,
        Display, Entity, EntityLink, EntityType, Friend, Gender, ImageSignal, Index, Mention,
        MultiIndex, Ner, Object, Person, Scenario, ScenarioContext, Segment, Sequence,
        TemporalContainer, TemporalRuler, TextSignal, Token, Triple,
    };
    use serde_json::json;
    use std::collections::{BTreeMap, BTreeSet};

    fn codec() -> Codec {
        Codec::emissor().unwrap()
    }

    fn round_trip<T: Structured + PartialEq + std::fmt::Debug>(codec: &Codec, value: &T) -> T {
        let json = codec.marshal(value).unwrap();
        codec.unmarshal::<T>(&json).unwrap().into_one().unwrap()
    }

    #[test]
    fn sequence_round_trip() {
        let codec = codec();
        let tokens = Sequence::from_seq(["I", "am", "in", "Amsterdam"].map(String::from));
        assert_eq!(round_trip(&codec, &tokens), tokens);

        let numbers = Sequence::from_seq([1.1, 2.2, 3.3]);
        assert_eq!(round_trip(&codec, &numbers), numbers);
    }

    #[test]
    fn records_carry_linked_data() {
        let codec = codec();
        let tokens = Sequence::from_seq(["a".to_string()]);
        let json: Value = serde_json::from_str(&codec.marshal(&tokens).unwrap()).unwrap();

        assert_eq!(json["@type"], "Sequence");
        assert_eq!(json["@context"]["Sequence"], "https://emissor.org#Sequence");
        assert_eq!(json["@context"]["seq"], "https://emissor.org#seq");
        assert_eq!(json["@context"]["id"], "@id");
        assert_eq!(json["ruler"]["@type"], "Index");
        assert_eq!(
            json["ruler"]["@context"]["container_id"],
            json!({"@id": "https://emissor.org#container_id", "@type": "@id"})
        );
    }

    #[test]
    fn linked_data_can_be_disabled() {
        let codec = codec().with_options(MarshalOptions {
            indent: 0,
            emit_linked_data: false,
        });
        let json = codec.marshal(&TemporalRuler::new("c", 0, 1)).unwrap();
        assert_eq!(json, r#"{"container_id":"c","end":1,"start":0}"#);
    }

    #[test]
    fn array_container_round_trip() {
        let codec = codec();
        let mut values = Array3::<f64>::zeros((5, 5, 3));
        values[[0, 1, 2]] = 1.5;
        let array = ArrayContainer::from_array(values.into_dyn()).unwrap();

        let clone = round_trip(&codec, &array);
        assert_eq!(clone, array);
        assert_eq!(clone.array.as_ref().unwrap().shape(), &[5, 5, 3]);

        let bbox = clone.ruler().get_area_bounding_box(0, 0, 2, 2).unwrap();
        let area = clone.get_segment(&bbox).unwrap();
        assert_eq!(area.shape(), &[2, 2, 3]);
        assert_eq!(area[IxDyn(&[0, 1, 2])], 1.5);
    }

    #[test]
    fn two_dimensional_array_round_trip() {
        let codec = codec();
        let values = ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![1.1, 2.2, 3.3, 4.4]).unwrap();
        let array = ArrayContainer::from_array(values).unwrap();
        assert_eq!(round_trip(&codec, &array), array);
    }

    #[test]
    fn missing_array_is_empty_string() {
        let codec = codec();
        let signal = ImageSignal::for_scenario("s", 0, 1, "file.png", [1, 2, 3, 4], vec![], None);
        let json: Value = serde_json::from_str(&codec.marshal(&signal).unwrap()).unwrap();
        assert_eq!(json["array"], "");
        assert_eq!(json["modality"], "image");
        assert_eq!(round_trip(&codec, &signal), signal);
    }

    #[test]
    fn temporal_and_atomic_round_trip() {
        let codec = codec();
        let period = TemporalContainer::from_range(0, 1000);
        assert_eq!(round_trip(&codec, &period), period);

        let atomic = AtomicContainer::new("id", "1".to_string());
        assert_eq!(round_trip(&codec, &atomic), atomic);
        let atomic = AtomicContainer::new("id", 1_i64);
        assert_eq!(round_trip(&codec, &atomic), atomic);

        let ruler = AtomicRuler::new("container_id");
        assert_eq!(round_trip(&codec, &ruler), ruler);
    }

    #[test]
    fn polymorphic_value_keeps_its_type() {
        let codec = codec();
        let person = Person::new("p1", "Carl", 0, Gender::Undefined);
        let annotation: Annotation =
            Annotation::new("person", person.into(), "annotation_tool", 1_700_000_000);

        let json: Value = serde_json::from_str(&codec.marshal(&annotation).unwrap()).unwrap();
        assert_eq!(json["type"], "person");
        assert_eq!(json["value"]["_type"], "entity-Person");
        assert_eq!(json["value"]["name"], "Carl");
        assert_eq!(json["value"]["@type"], "Person");
        assert_eq!(
            json["value"]["@context"]["name"],
            "http://cltl.nl/leolani/n2mu#name"
        );

        let clone = round_trip(&codec, &annotation);
        assert_eq!(clone, annotation);
        assert!(matches!(clone.value, AnnotationValue::Person(_)));
    }

    #[test]
    fn mention_segments_keep_their_ruler_kind() {
        let codec = codec();
        let mention = Mention::new(
            "m1",
            vec![
                Segment::from(Index::new("sig", 0, 1)),
                Segment::from(MultiIndex::new("img", [0, 0, 1, 1])),
            ],
            vec![Annotation::new("type", "val".into(), "source", 0)],
        );

        let json: Value = serde_json::from_str(&codec.marshal(&mention).unwrap()).unwrap();
        assert_eq!(json["segment"][0]["_type"], "container-Index");
        assert_eq!(json["segment"][1]["@type"], "MultiIndex");
        assert_eq!(json["annotations"][0]["value"], "val");
        assert_eq!(json["annotations"][0]["@type"], "Annotation");

        assert_eq!(round_trip(&codec, &mention), mention);
    }

    #[test]
    fn unresolvable_value_degrades_without_failing() {
        let codec = codec();
        let json = r#"{
            "id": "m1",
            "segment": [{"_type": "container-Polygon", "points": [1, 2]}],
            "annotations": [
                {"type": "x", "value": {"_type": "plugin-Hologram", "x": "1"}, "source": "t", "timestamp": 0},
                {"type": "display", "value": "shown", "source": "t", "timestamp": 0}
            ]
        }"#;

        let mention: Mention = codec.unmarshal(json).unwrap().into_one().unwrap();
        assert!(!mention.segment[0].is_resolved());
        assert!(mention.annotations[0].value.is_untyped());
        assert_eq!(mention.annotations[1].value.as_str(), Some("shown"));
    }

    #[test]
    fn none_fields_round_trip() {
        let codec = codec();
        let context = ScenarioContext {
            agent: None,
            speaker: None,
            persons: vec![],
            objects: vec![],
        };
        let json: Value = serde_json::from_str(&codec.marshal(&context).unwrap()).unwrap();
        assert!(json["speaker"].is_null());
        assert_eq!(round_trip(&codec, &context), context);

        let annotation: Annotation = Annotation::new("display", AnnotationValue::Null, "", 0);
        assert_eq!(round_trip(&codec, &annotation), annotation);
    }

    #[test]
    fn scenario_round_trip() {
        let codec = codec();
        let context =
            ScenarioContext::new("agent", Some(Person::new("id", "name", 18, Gender::Male)));
        let mut signals = BTreeMap::new();
        signals.insert("text".to_string(), "scenario1/text.json".to_string());
        let scenario = Scenario::new_instance("scenario1", 0, 10, context, signals);

        let json: Value = serde_json::from_str(&codec.marshal(&scenario).unwrap()).unwrap();
        assert_eq!(json["@type"], "Scenario");
        assert_eq!(json["context"]["speaker"]["@type"], "Person");
        assert_eq!(round_trip(&codec, &scenario), scenario);
    }

    #[test]
    fn text_signal_with_mentions_round_trip() {
        let codec = codec();
        let signal = TextSignal::for_scenario(
            "id",
            0,
            1,
            "file.txt",
            "text",
            vec![Mention::new(
                "id",
                vec![Index::from_range(0, 1).into()],
                vec![Annotation::new("type", "val".into(), "source", 0)],
            )],
            None,
        );
        assert_eq!(round_trip(&codec, &signal), signal);
    }

    #[test]
    fn many_records() {
        let codec = codec();
        let rulers = vec![TemporalRuler::new("a", 0, 1), TemporalRuler::new("b", 1, 2)];
        let json = codec.marshal_many(&rulers).unwrap();

        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[1]["@type"], "TemporalRuler");

        let document = codec.unmarshal::<TemporalRuler>(&json).unwrap();
        assert!(matches!(document, Document::Many(_)));
        assert_eq!(document.into_many().unwrap(), rulers);
    }

    #[test]
    fn null_and_scalars_are_returned_unchanged() {
        let codec = codec();
        assert_eq!(codec.unmarshal::<Person>("null").unwrap(), Document::Empty);
        assert_eq!(
            codec.unmarshal::<Person>("42").unwrap(),
            Document::Scalar(json!(42))
        );
        assert_eq!(
            codec.unmarshal::<Person>(r#""text""#).unwrap(),
            Document::Scalar(json!("text"))
        );
        assert!(codec.unmarshal::<Person>("true").unwrap().into_one().is_err());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let codec = codec();
        let person: Person = codec
            .unmarshal(r#"{"id": "p", "name": "Ann", "age": 3, "gender": "female", "shoe_size": 38}"#)
            .unwrap()
            .into_one()
            .unwrap();
        assert_eq!(person, Person::new("p", "Ann", 3, Gender::Female));
    }

    #[test]
    fn unregistered_type_is_unsupported() {
        let registry = TypeRegistry::builder().register::<Index>().build().unwrap();
        let codec = Codec::new(Arc::new(registry), MarshalOptions::default());

        let period = TemporalContainer::from_range(0, 1);
        let err = codec.marshal(&period).unwrap_err();
        assert!(matches!(err, EmissorError::UnsupportedType { .. }));
        let err = codec.unmarshal::<TemporalContainer>("{}").unwrap_err();
        assert!(matches!(err, EmissorError::UnsupportedType { .. }));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let codec = codec();
        let err = codec.unmarshal::<Person>("{not json").unwrap_err();
        assert!(matches!(err, EmissorError::Parse { source: Some(_), .. }));
        assert!(codec.unmarshal_untyped("[1,").is_err());
    }

    #[test]
    fn mismatched_document_is_a_parse_error() {
        let codec = codec();
        let err = codec
            .unmarshal::<TemporalRuler>(r#"{"start": "early", "end": 1}"#)
            .unwrap_err();
        assert!(matches!(err, EmissorError::Parse { .. }));
    }

    #[test]
    fn untyped_loading_hides_reserved_keys() {
        let codec = codec();
        let annotation: Annotation = Annotation::new(
            "person",
            Person::new("p1", "Carl", 0, Gender::Undefined).into(),
            "tool",
            0,
        );
        let json = codec.marshal(&annotation).unwrap();

        let untyped = codec.unmarshal_untyped(&json).unwrap();
        let record = untyped.as_record().unwrap();
        assert!(record.get("@context").is_none());
        assert_eq!(record.get("type").and_then(Untyped::as_str), Some("person"));

        let value = untyped.get("value").unwrap();
        assert_eq!(value.get("name").and_then(Untyped::as_str), Some("Carl"));
        assert!(value.get("_type").is_none());
    }

    #[test]
    fn untyped_marshal_has_no_linked_data() {
        let codec = codec().with_options(MarshalOptions::compact());
        let json = codec.marshal_untyped(&Person::new("p", "Ann", 3, Gender::Female)).unwrap();
        assert_eq!(json, r#"{"age":3,"gender":"female","id":"p","name":"Ann"}"#);
    }

    #[test]
    fn indentation_follows_options() {
        let ruler = TemporalRuler::new("c", 0, 1);
        let compact = codec().with_options(MarshalOptions::compact());
        assert!(!compact.marshal(&ruler).unwrap().contains('\n'));

        let wide = codec().with_options(MarshalOptions {
            indent: 4,
            emit_linked_data: false,
        });
        let json = wide.marshal(&ruler).unwrap();
        assert!(json.contains("\n    \"container_id\": \"c\""), "got {json}");
    }

    #[test]
    fn codec_from_config() {
        let mut config = CodecConfig::default();
        config.linked_data.namespace = "http://example.org/".into();
        let codec = Codec::from_config(&config).unwrap();

        let json: Value =
            serde_json::from_str(&codec.marshal(&TemporalRuler::new("c", 0, 1)).unwrap()).unwrap();
        assert_eq!(json["@context"]["start"], "http://example.org/start");
    }

    #[test]
    fn degraded_values_persist_unchanged() {
        let codec = codec();
        let json = r#"{
            "id": "m1",
            "segment": [{"_type": "container-Polygon", "points": [1, 2]}],
            "annotations": [
                {"type": "face", "value": {"_type": "plugin-FaceEmbedding", "model": "facenet", "bbox-x": 3}, "source": "t", "timestamp": 0}
            ]
        }"#;

        let mention: Mention = codec.unmarshal(json).unwrap().into_one().unwrap();
        let written: Value = serde_json::from_str(&codec.marshal(&mention).unwrap()).unwrap();

        assert_eq!(
            written["segment"][0],
            json!({"_type": "container-Polygon", "points": [1, 2]})
        );
        assert_eq!(
            written["annotations"][0]["value"],
            json!({"_type": "plugin-FaceEmbedding", "model": "facenet", "bbox-x": 3})
        );
        assert_eq!(round_trip(&codec, &mention), mention);
    }

    fn assert_fields_agree<T: Structured>(value: &T) {
        let serialized: BTreeSet<String> = match serde_json::to_value(value).unwrap() {
            Value::Object(map) => map.keys().cloned().collect(),
            other => panic!("{} is not a record: {other}", T::TYPE_TAG),
        };
        let described: BTreeSet<String> = T::fields().iter().map(|f| f.name.to_string()).collect();
        assert_eq!(serialized, described, "serde keys vs field list of {}", T::TYPE_TAG);

        let context = T::ld_context().unwrap();
        let declared: BTreeSet<String> = context
            .iter()
            .map(|(name, _)| name.to_string())
            .filter(|name| name != context.type_name() && name != "id")
            .collect();
        let mut expected = described;
        expected.remove("id");
        assert_eq!(declared, expected, "context terms vs field list of {}", T::TYPE_TAG);
    }

    #[test]
    fn record_fields_agree_with_their_declarations() {
        assert_fields_agree(&Index::new("c", 0, 1));
        assert_fields_agree(&MultiIndex::new("c", [0, 0, 1, 1]));
        assert_fields_agree(&TemporalRuler::new("c", 0, 1));
        assert_fields_agree(&AtomicRuler::new("c"));
        assert_fields_agree(&Sequence::from_seq(["a".to_string()]));
        assert_fields_agree(&ArrayContainer::detached("a", [0, 0, 1, 1]));
        assert_fields_agree(&TemporalContainer::new("t", 0, 1));
        assert_fields_agree(&AtomicContainer::new("v", 1_i64));
        assert_fields_agree(&Entity::new("e", EntityType::Object));
        assert_fields_agree(&Person::new("p", "Ann", 3, Gender::Female));
        assert_fields_agree(&Friend(Person::new("f", "Bo", 4, Gender::Male)));
        assert_fields_agree(&Object::new("o", "cup"));
        assert_fields_agree(&EntityLink::new("l"));
        assert_fields_agree(&Token::for_string("Amsterdam"));
        assert_fields_agree(&Ner::for_string("Amsterdam"));
        assert_fields_agree(&Triple::from_friends("carl", "knows", "lea"));
        assert_fields_agree(&Display::new("shown"));
        assert_fields_agree(&Annotation::new("display", AnnotationValue::from("val"), "tool", 0));
        assert_fields_agree(&Mention::new("m", Vec::new(), Vec::new()));
        assert_fields_agree(&TextSignal::for_scenario("s", 0, 1, "f.txt", "hi", Vec::new(), None));
        assert_fields_agree(&ImageSignal::for_scenario(
            "s",
            0,
            1,
            "f.png",
            [0, 0, 2, 2],
            Vec::new(),
            None,
        ));
        assert_fields_agree(&ScenarioContext::new("agent", None));
        assert_fields_agree(&Scenario::new_instance(
            "s",
            0,
            1,
            ScenarioContext::default(),
            BTreeMap::new(),
        ));
    }

    #[test]
    fn codec_feeds_its_statistics() {
        let stats = Arc::new(Mutex::new(CodecStatsAggregator::new()));
        let codec = codec().with_stats(Arc::clone(&stats));
        let ruler = TemporalRuler::new("c", 0, 1);

        let json = codec.marshal(&ruler).unwrap();
        codec.unmarshal::<TemporalRuler>(&json).unwrap();
        assert!(codec.unmarshal::<TemporalRuler>("{").is_err());
        assert!(codec.unmarshal::<TemporalRuler>(r#"{"start": "soon"}"#).is_err());

        let summary = stats.lock().unwrap().summary();
        assert_eq!(summary.total_marshalled, 1);
        assert_eq!(summary.total_unmarshalled, 3);
        assert_eq!(summary.total_failed, 2);
        assert_eq!(summary.type_counts.get("container-TemporalRuler"), Some(&2));

        let quiet = codec.with_options(MarshalOptions::default());
        quiet.marshal(&ruler).unwrap();
        assert_eq!(stats.lock().unwrap().summary().total_marshalled, 2);
    }

    fn array_document(array: Value) -> String {
        let container = ArrayContainer::detached("a", [0, 0, 1, 1]);
        let mut document = serde_json::to_value(&container).unwrap();
        document["array"] = array;
        document.to_string()
    }

    #[test]
    fn hostile_arrays_are_parse_errors() {
        let codec = codec();

        let mut deep = json!(0);
        for _ in 0..10 {
            let mut items = vec![deep];
            items.extend((1..100).map(|i| json!(i)));
            deep = Value::Array(items);
        }

        for array in [deep, json!([[1, 2], [3]]), json!([[1, "x"]]), json!([null])] {
            let err = codec
                .unmarshal::<ArrayContainer>(&array_document(array))
                .unwrap_err();
            assert!(matches!(err, EmissorError::Parse { .. }), "got: {err:?}");
        }
    }

    #[test]
    fn non_finite_values_fail_to_marshal() {
        let codec = codec();

        let array = ArrayContainer::from_array(ArrayD::from_elem(IxDyn(&[2, 2]), f64::NAN)).unwrap();
        assert!(matches!(
            codec.marshal(&array).unwrap_err(),
            EmissorError::Parse { .. }
        ));

        let annotation = Annotation::new("score", AnnotationValue::Float(f64::INFINITY), "t", 0);
        assert!(codec.marshal(&annotation).is_err());
    }
}
