//! # Integration Tests
//!
//! Cross-crate tests over the whole scenario model.
//!
//! Covers:
//! - Scenario and signal round trips with mentions and annotations
//! - Annotate, persist and reload through the file system
//! - Degrading unresolved polymorphic values inside documents, and writing
//!   them back unchanged
//! - Rejecting malformed arrays and non-finite numbers
//! - JSON-LD shape of nested records and the triples they yield
//! - Sharing one codec across threads

#[cfg(test)]
mod fixtures {
    use ndarray::{ArrayD, IxDyn};
    use representation::{
        Annotation, Gender, ImageSignal, Index, Mention, MultiIndex, Person, Scenario,
        ScenarioContext, TextSignal,
    };
    use std::collections::BTreeMap;

    pub const SCENARIO_ID: &str = "test_scenario";

    pub fn speaker() -> Person {
        Person::new("speaker", "Lenka", 31, Gender::Female)
    }

    pub fn scenario() -> Scenario {
        let context = ScenarioContext::new("leolani", Some(speaker()));
        let mut signals = BTreeMap::new();
        signals.insert("text".to_string(), "./text.json".to_string());
        signals.insert("image".to_string(), "./image.json".to_string());
        Scenario::new_instance(SCENARIO_ID, 0, 10_000, context, signals)
    }

    pub fn text_signal() -> TextSignal {
        let mention = Mention::new(
            "mention_lenka",
            vec![Index::new("text_1", 0, 5).into()],
            vec![Annotation::new("person", speaker().into(), "annotator", 1_600_000_000)],
        );
        TextSignal::for_scenario(
            SCENARIO_ID,
            1_000,
            2_000,
            "text/1.txt",
            "Lenka is in Amsterdam",
            vec![mention],
            Some("text_1".into()),
        )
    }

    pub fn image_signal() -> ImageSignal {
        let mention = Mention::new(
            "mention_face",
            vec![MultiIndex::new("image_1", [1, 1, 3, 3]).into()],
            vec![Annotation::new("display", "face".into(), "face_detector", 1_600_000_000)],
        );
        let pixels = ArrayD::from_shape_fn(IxDyn(&[4, 4, 3]), |ix| (ix[0] * 10 + ix[1]) as f64);
        ImageSignal::for_scenario(
            SCENARIO_ID,
            1_500,
            1_500,
            "image/1.png",
            [0, 0, 4, 4],
            vec![mention],
            Some("image_1".into()),
        )
        .with_array(pixels)
    }
}

#[cfg(test)]
mod round_trip_tests {
    use super::fixtures;
    use marshal::Codec;
    use ndarray::IxDyn;
    use representation::{
        AnnotationValue, Container, ImageSignal, Modality, Ruler, Scenario, Segment, Signal,
        TextSignal,
    };

    #[test]
    fn test_scenario_round_trip() {
        let codec = Codec::emissor().unwrap();
        let scenario = fixtures::scenario();

        let json = codec.marshal(&scenario).unwrap();
        let loaded: Scenario = codec.unmarshal(&json).unwrap().into_one().unwrap();

        assert_eq!(loaded, scenario);
        assert_eq!(loaded.signal_path(Modality::Text), Some("./text.json"));
        assert_eq!(loaded.ruler().container_id().map(|id| id.as_str()), Some(fixtures::SCENARIO_ID));
        assert_eq!(loaded.context.speaker.as_ref(), Some(&fixtures::speaker()));
    }

    #[test]
    fn test_text_signal_round_trip() {
        let codec = Codec::emissor().unwrap();
        let signal = fixtures::text_signal();

        let json = codec.marshal(&signal).unwrap();
        let loaded: TextSignal = codec.unmarshal(&json).unwrap().into_one().unwrap();
        assert_eq!(loaded, signal);

        let mention = loaded.mention("mention_lenka").unwrap();
        let Segment::Index(index) = &mention.segment[0] else {
            panic!("expected index segment, got {:?}", mention.segment[0]);
        };
        assert_eq!(loaded.text_segment(index).unwrap(), "Lenka");

        let person = mention.annotations[0].value.as_person().unwrap();
        assert_eq!(person.name, "Lenka");
    }

    #[test]
    fn test_image_signal_round_trip() {
        let codec = Codec::emissor().unwrap();
        let signal = fixtures::image_signal();

        let json = codec.marshal(&signal).unwrap();
        let loaded: ImageSignal = codec.unmarshal(&json).unwrap().into_one().unwrap();
        assert_eq!(loaded, signal);
        assert_eq!(loaded.time().start, 1_500);

        let mention = loaded.mention("mention_face").unwrap();
        let Segment::MultiIndex(bbox) = &mention.segment[0] else {
            panic!("expected bounding box, got {:?}", mention.segment[0]);
        };
        let face = loaded.get_segment(bbox).unwrap();
        assert_eq!(face.shape(), &[2, 2, 3]);
        assert_eq!(face[IxDyn(&[0, 0, 0])], 11.0);
        assert!(matches!(
            mention.annotations[0].value,
            AnnotationValue::Text(ref text) if text == "face"
        ));
    }

    #[test]
    fn test_signals_as_list() {
        let codec = Codec::emissor().unwrap();
        let signals = vec![fixtures::text_signal(), fixtures::text_signal()];

        let json = codec.marshal_many(&signals).unwrap();
        let loaded = codec.unmarshal::<TextSignal>(&json).unwrap().into_many().unwrap();
        assert_eq!(loaded, signals);
    }
}

#[cfg(test)]
mod persistence_tests {
    use super::fixtures;
    use marshal::Codec;
    use observability::CodecStatsAggregator;
    use representation::{
        new_annotation, new_mention, new_segment, AnnotationType, EmissorError, Signal,
        TextSignal,
    };
    use std::fs;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_annotate_persist_reload() {
        let stats = Arc::new(Mutex::new(CodecStatsAggregator::new()));
        let codec = Codec::emissor().unwrap().with_stats(Arc::clone(&stats));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("text.json");

        let json = codec.marshal(&fixtures::text_signal()).unwrap();
        fs::write(&path, json).unwrap();

        let mut signal: TextSignal = codec
            .unmarshal(&fs::read_to_string(&path).unwrap())
            .unwrap()
            .into_one()
            .unwrap();

        let mut mention = new_mention();
        mention.segment.push(new_segment("index", &signal, None).unwrap());
        let mention_id = mention.id.clone();
        signal.add_mention(mention);
        signal
            .add_annotation(&mention_id, new_annotation("emotion", "annotator").unwrap())
            .unwrap();

        let json = codec.marshal(&signal).unwrap();
        fs::write(&path, json).unwrap();

        let reloaded: TextSignal = codec
            .unmarshal(&fs::read_to_string(&path).unwrap())
            .unwrap()
            .into_one()
            .unwrap();
        assert_eq!(reloaded, signal);

        let mention = reloaded.mention(&mention_id).unwrap();
        let emotion: Vec<_> = mention
            .annotations_of_type(AnnotationType::Emotion.as_str())
            .collect();
        assert_eq!(emotion.len(), 1);
        assert_eq!(emotion[0].value.as_str(), Some("neutral"));

        let summary = stats.lock().unwrap().summary();
        assert_eq!(summary.total_marshalled, 2);
        assert_eq!(summary.total_unmarshalled, 2);
        assert_eq!(summary.total_failed, 0);
    }

    #[test]
    fn test_annotation_for_missing_mention() {
        let mut signal = fixtures::text_signal();
        let err = signal
            .add_annotation("no_such_mention", new_annotation("display", "tool").unwrap())
            .unwrap_err();
        assert!(matches!(err, EmissorError::NotFound { .. }));
    }
}

#[cfg(test)]
mod degrade_tests {
    use marshal::Codec;
    use representation::{Signal, TextSignal, Untyped};
    use serde_json::{json, Value};

    #[test]
    fn test_unknown_value_type_inside_signal() {
        let codec = Codec::emissor().unwrap();
        let mut document: Value =
            serde_json::from_str(&codec.marshal(&super::fixtures::text_signal()).unwrap()).unwrap();
        document["mentions"][0]["annotations"][0]["value"] = json!({
            "_type": "plugin-FaceEmbedding",
            "vector": [0.1, 0.2],
            "model": "facenet"
        });

        let signal: TextSignal = codec
            .unmarshal(&document.to_string())
            .unwrap()
            .into_one()
            .unwrap();

        let value = &signal.mentions()[0].annotations[0].value;
        assert!(value.is_untyped());
        let representation::AnnotationValue::Untyped(Untyped::Record(record)) = value else {
            panic!("expected untyped record, got {value:?}");
        };
        assert_eq!(record.get("model").and_then(Untyped::as_str), Some("facenet"));
        assert!(record.get("_type").is_none());
    }

    #[test]
    fn test_degraded_value_survives_repersist() {
        let codec = Codec::emissor().unwrap();
        let embedding = json!({"_type": "plugin-FaceEmbedding", "model": "facenet", "bbox-x": 3});
        let mut document: Value =
            serde_json::from_str(&codec.marshal(&super::fixtures::text_signal()).unwrap()).unwrap();
        document["mentions"][0]["annotations"][0]["value"] = embedding.clone();

        let mut signal: TextSignal = codec
            .unmarshal(&document.to_string())
            .unwrap()
            .into_one()
            .unwrap();
        signal
            .add_annotation(
                "mention_lenka",
                representation::new_annotation("display", "annotator").unwrap(),
            )
            .unwrap();

        let written: Value = serde_json::from_str(&codec.marshal(&signal).unwrap()).unwrap();
        let annotations = &written["mentions"][0]["annotations"];
        assert_eq!(annotations[0]["value"], embedding);
        assert_eq!(annotations[1]["type"], "display");

        let reloaded: TextSignal = codec
            .unmarshal(&written.to_string())
            .unwrap()
            .into_one()
            .unwrap();
        assert_eq!(reloaded, signal);
    }

    #[test]
    fn test_untyped_document_view() {
        let codec = Codec::emissor().unwrap();
        let json = codec.marshal(&super::fixtures::scenario()).unwrap();

        let untyped = codec.unmarshal_untyped(&json).unwrap();
        let context = untyped.get("context").unwrap();
        let speaker = context.get("speaker").unwrap();
        assert_eq!(speaker.get("name").and_then(Untyped::as_str), Some("Lenka"));
        assert!(untyped.as_record().unwrap().get("@type").is_none());
    }
}

#[cfg(test)]
mod hostile_input_tests {
    use marshal::Codec;
    use ndarray::{ArrayD, IxDyn};
    use representation::{
        Annotation, AnnotationValue, EmissorError, ImageSignal, Mention, Signal,
    };
    use serde_json::{json, Value};

    fn image_document(array: Value) -> String {
        let codec = Codec::emissor().unwrap();
        let mut document: Value =
            serde_json::from_str(&codec.marshal(&super::fixtures::image_signal()).unwrap()).unwrap();
        document["array"] = array;
        document.to_string()
    }

    #[test]
    fn test_malformed_arrays_are_rejected() {
        let codec = Codec::emissor().unwrap();

        // 100^10 elements implied by the first entries alone
        let mut oversized = json!(0);
        for _ in 0..10 {
            let mut items = vec![oversized];
            items.extend((1..100).map(|i| json!(i)));
            oversized = Value::Array(items);
        }

        for array in [
            oversized,
            json!([[[1.0], [2.0]], [[3.0]]]),
            json!([[[1.0, "red"]]]),
            json!([[[null]]]),
            json!({"shape": [4, 4, 3]}),
        ] {
            let err = codec
                .unmarshal::<ImageSignal>(&image_document(array))
                .unwrap_err();
            assert!(matches!(err, EmissorError::Parse { .. }), "got: {err:?}");
        }
    }

    #[test]
    fn test_missing_array_loads_as_detached() {
        let codec = Codec::emissor().unwrap();
        let signal: ImageSignal = codec
            .unmarshal(&image_document(json!("")))
            .unwrap()
            .into_one()
            .unwrap();
        assert!(signal.container.array.is_none());
        assert_eq!(signal.bounds(), [0, 0, 4, 4]);
    }

    #[test]
    fn test_non_finite_numbers_are_not_persisted() {
        let codec = Codec::emissor().unwrap();

        let mut pixels = ArrayD::zeros(IxDyn(&[4, 4, 3]));
        pixels[IxDyn(&[2, 2, 1])] = f64::NAN;
        let image = super::fixtures::image_signal().with_array(pixels);
        assert!(codec.marshal(&image).is_err());

        let mut text = super::fixtures::text_signal();
        let mut mention = Mention::new("scored", Vec::new(), Vec::new());
        mention.annotations.push(Annotation::new(
            "score",
            AnnotationValue::Float(f64::INFINITY),
            "scorer",
            0,
        ));
        text.add_mention(mention);
        let err = codec.marshal(&text).unwrap_err();
        assert!(
            matches!(&err, EmissorError::Parse { source: Some(e), .. } if e.to_string().contains("not finite")),
            "got: {err:?}"
        );
    }
}

#[cfg(test)]
mod linked_data_tests {
    use marshal::{Codec, LD_CONTEXT_KEY, LD_TYPE_KEY};
    use serde_json::{Map, Value};

    const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

    type Triple = (String, String, String);

    /// Triples of a decorated document, reading each record with its own
    /// `@context`. Keys without a term are reported in `unmapped`.
    struct Extraction {
        triples: Vec<Triple>,
        unmapped: Vec<String>,
        blank_nodes: usize,
    }

    impl Extraction {
        fn of(document: &Value) -> Self {
            let mut extraction = Self {
                triples: Vec::new(),
                unmapped: Vec::new(),
                blank_nodes: 0,
            };
            extraction.node(document);
            extraction
        }

        fn node(&mut self, value: &Value) -> Option<String> {
            let Value::Object(map) = value else {
                return None;
            };
            let Some(Value::Object(context)) = map.get(LD_CONTEXT_KEY) else {
                return None;
            };

            let subject = match map.get("id").and_then(Value::as_str) {
                Some(id) => id.to_string(),
                None => {
                    self.blank_nodes += 1;
                    format!("_:b{}", self.blank_nodes)
                }
            };

            if let Some(type_iri) = map
                .get(LD_TYPE_KEY)
                .and_then(Value::as_str)
                .and_then(|name| context.get(name))
                .and_then(Value::as_str)
            {
                self.triples
                    .push((subject.clone(), RDF_TYPE.to_string(), type_iri.to_string()));
            }

            for (key, value) in map {
                if key.starts_with('@') || key.starts_with('_') || key == "id" {
                    continue;
                }
                let Some((predicate, id_valued)) = term(context, key) else {
                    self.unmapped.push(key.clone());
                    continue;
                };
                let items: Vec<&Value> = match value {
                    Value::Array(items) => items.iter().collect(),
                    other => vec![other],
                };
                for item in items {
                    let object = match item {
                        Value::Null => continue,
                        Value::String(s) if id_valued => s.clone(),
                        Value::Object(_) => match self.node(item) {
                            Some(node) => node,
                            None => continue,
                        },
                        literal => literal.to_string(),
                    };
                    self.triples.push((subject.clone(), predicate.clone(), object));
                }
            }
            Some(subject)
        }
    }

    fn term(context: &Map<String, Value>, key: &str) -> Option<(String, bool)> {
        match context.get(key)? {
            Value::String(iri) => Some((iri.clone(), false)),
            Value::Object(definition) => {
                let iri = definition.get("@id")?.as_str()?.to_string();
                let id_valued = definition.get("@type").and_then(Value::as_str) == Some("@id");
                Some((iri, id_valued))
            }
            _ => None,
        }
    }

    fn contains(triples: &[Triple], s: &str, p: &str, o: &str) -> bool {
        triples.iter().any(|(ts, tp, to)| ts == s && tp == p && to == o)
    }

    #[test]
    fn test_persisted_signal_yields_triples() {
        let codec = Codec::emissor().unwrap();
        let json = codec.marshal(&super::fixtures::text_signal()).unwrap();
        let extraction = Extraction::of(&serde_json::from_str(&json).unwrap());
        let triples = &extraction.triples;

        assert!(!triples.is_empty());
        assert!(extraction.unmapped.is_empty(), "unmapped keys: {:?}", extraction.unmapped);
        for (_, predicate, _) in triples {
            assert!(predicate.contains("://"), "relative predicate {predicate}");
        }

        assert!(contains(triples, "text_1", RDF_TYPE, "https://emissor.org#TextSignal"));
        assert!(contains(
            triples,
            "text_1",
            "https://emissor.org#mentions",
            "mention_lenka"
        ));
        assert!(contains(triples, "mention_lenka", RDF_TYPE, "https://emissor.org#Mention"));
        assert!(contains(
            triples,
            "speaker",
            "http://cltl.nl/leolani/n2mu#name",
            "\"Lenka\""
        ));
        assert!(triples.iter().any(|(_, p, o)| {
            p == "https://emissor.org#container_id" && o == super::fixtures::SCENARIO_ID
        }));
    }

    #[test]
    fn test_persisted_scenario_yields_triples() {
        let codec = Codec::emissor().unwrap();
        let json = codec.marshal(&super::fixtures::scenario()).unwrap();
        let extraction = Extraction::of(&serde_json::from_str(&json).unwrap());

        assert!(extraction.unmapped.is_empty(), "unmapped keys: {:?}", extraction.unmapped);
        assert!(contains(
            &extraction.triples,
            super::fixtures::SCENARIO_ID,
            RDF_TYPE,
            "https://emissor.org#Scenario"
        ));
        assert!(extraction
            .triples
            .iter()
            .any(|(_, p, o)| p == "https://emissor.org#agent" && o == "leolani"));
    }

    #[test]
    fn test_every_record_is_decorated() {
        let codec = Codec::emissor().unwrap();
        let json = codec.marshal(&super::fixtures::text_signal()).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value[LD_TYPE_KEY], "TextSignal");
        assert_eq!(value["time"][LD_TYPE_KEY], "TemporalRuler");
        let mention = &value["mentions"][0];
        assert_eq!(mention[LD_TYPE_KEY], "Mention");
        assert_eq!(mention["segment"][0][LD_TYPE_KEY], "Index");
        assert_eq!(mention["annotations"][0][LD_TYPE_KEY], "Annotation");
        assert_eq!(mention["annotations"][0]["value"][LD_TYPE_KEY], "Person");

        let context = &value[LD_CONTEXT_KEY];
        assert_eq!(context["id"], "@id");
        assert_eq!(context["TextSignal"], "https://emissor.org#TextSignal");
        assert_eq!(context["mentions"], "https://emissor.org#mentions");
    }

    #[test]
    fn test_configured_namespace() {
        let config = config_loader::ConfigLoader::load_from_str(
            "[linked_data]\nnamespace = \"http://example.org/emissor/\"\n",
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();
        let codec = Codec::from_config(&config).unwrap();

        let json = codec.marshal(&super::fixtures::scenario()).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value[LD_CONTEXT_KEY]["Scenario"],
            "http://example.org/emissor/Scenario"
        );
        assert_eq!(
            value["context"]["speaker"][LD_CONTEXT_KEY]["name"],
            "http://cltl.nl/leolani/n2mu#name"
        );
    }
}

#[cfg(test)]
mod concurrency_tests {
    use marshal::Codec;
    use representation::{Scenario, TextSignal};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_shared_codec_across_threads() {
        let codec = Arc::new(Codec::emissor().unwrap());
        let expected = Codec::emissor()
            .unwrap()
            .marshal(&super::fixtures::text_signal())
            .unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let codec = Arc::clone(&codec);
                thread::spawn(move || {
                    let signal = super::fixtures::text_signal();
                    let json = codec.marshal(&signal).unwrap();
                    let loaded: TextSignal = codec.unmarshal(&json).unwrap().into_one().unwrap();
                    assert_eq!(loaded, signal);

                    let scenario: Scenario = codec
                        .unmarshal(&codec.marshal(&super::fixtures::scenario()).unwrap())
                        .unwrap()
                        .into_one()
                        .unwrap();
                    assert_eq!(scenario, super::fixtures::scenario());
                    json
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }
}
