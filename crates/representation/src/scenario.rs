//! Scenario - the temporal frame all signals are anchored in

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::codec::{identifier_field, Tagged};
use crate::container::{Container, TemporalContainer};
use crate::ld::{LdDeclaration, LdProperty, LinkedDataType};
use crate::signal::Modality;
use crate::{Identifier, Object, Person, Result, TemporalRuler};

/// Participants of a scenario
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioContext {
    #[serde(default, with = "identifier_field")]
    pub agent: Option<Identifier>,
    #[serde(default)]
    pub speaker: Option<Person>,
    #[serde(default)]
    pub persons: Vec<Person>,
    #[serde(default)]
    pub objects: Vec<Object>,
}

impl ScenarioContext {
    pub fn new(agent: impl Into<Identifier>, speaker: Option<Person>) -> Self {
        Self {
            agent: Some(agent.into()),
            speaker,
            persons: Vec::new(),
            objects: Vec::new(),
        }
    }
}

impl Tagged for ScenarioContext {
    const TYPE_TAG: &'static str = "scenario-ScenarioContext";
}

impl LinkedDataType for ScenarioContext {
    fn ld_declaration() -> LdDeclaration {
        LdDeclaration::new("ScenarioContext")
            .property(LdProperty::new("agent").id_ref())
            .field("speaker")
            .field("persons")
            .field("objects")
    }
}

/// A recorded interaction: time span, participants and the relative path of
/// each modality's signal file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(flatten)]
    pub container: TemporalContainer,
    #[serde(default)]
    pub context: ScenarioContext,
    #[serde(default)]
    pub signals: BTreeMap<String, String>,
}

impl Scenario {
    pub fn new_instance(
        scenario_id: impl Into<Identifier>,
        start: i64,
        end: i64,
        context: ScenarioContext,
        signals: BTreeMap<String, String>,
    ) -> Self {
        Self {
            container: TemporalContainer::new(scenario_id, start, end),
            context,
            signals,
        }
    }

    pub fn start(&self) -> i64 {
        self.container.start()
    }

    pub fn end(&self) -> i64 {
        self.container.end()
    }

    /// Relative path of the signal file of `modality`
    pub fn signal_path(&self, modality: Modality) -> Option<&str> {
        self.signals.get(modality.as_str()).map(String::as_str)
    }

    pub fn set_signal_path(&mut self, modality: Modality, path: impl Into<String>) {
        self.signals.insert(modality.as_str().to_string(), path.into());
    }
}

impl Container for Scenario {
    type Ruler = TemporalRuler;
    type Segment<'a> = TemporalRuler;

    fn id(&self) -> &Identifier {
        &self.container.id
    }

    fn ruler(&self) -> &TemporalRuler {
        &self.container.ruler
    }

    fn get_segment<'a>(&'a self, segment: &TemporalRuler) -> Result<TemporalRuler> {
        self.container.get_segment(segment)
    }
}

impl Tagged for Scenario {
    const TYPE_TAG: &'static str = "scenario-Scenario";
}

impl LinkedDataType for Scenario {
    fn ld_declaration() -> LdDeclaration {
        LdDeclaration::new("Scenario")
            .field("context")
            .field("signals")
            .extends(TemporalContainer::ld_declaration())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Gender;

    fn scenario() -> Scenario {
        let context = ScenarioContext::new("agent", Some(Person::new("id", "name", 18, Gender::Male)));
        Scenario::new_instance("scenario1", 0, 10, context, BTreeMap::new())
    }

    #[test]
    fn new_instance_spans_range() {
        let scenario = scenario();
        assert_eq!(scenario.id(), &"scenario1");
        assert_eq!(scenario.start(), 0);
        assert_eq!(scenario.end(), 10);
        assert_eq!(scenario.ruler().container_id.as_deref(), Some("scenario1"));
    }

    #[test]
    fn signal_paths_by_modality() {
        let mut scenario = scenario();
        assert_eq!(scenario.signal_path(Modality::Text), None);
        scenario.set_signal_path(Modality::Text, "scenario1/text.json");
        assert_eq!(scenario.signal_path(Modality::Text), Some("scenario1/text.json"));

        let json = serde_json::to_value(&scenario).unwrap();
        assert_eq!(json["signals"]["text"], "scenario1/text.json");
        assert_eq!(json["id"], "scenario1");
        assert_eq!(json["ruler"]["end"], 10);
    }

    #[test]
    fn missing_speaker_reads_as_none() {
        let context: ScenarioContext =
            serde_json::from_str(r#"{"agent": "leolani", "persons": []}"#).unwrap();
        assert_eq!(context.agent.as_deref(), Some("leolani"));
        assert_eq!(context.speaker, None);
    }
}
