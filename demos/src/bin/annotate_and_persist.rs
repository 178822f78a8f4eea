//! Build a scenario with a text and an image signal, annotate both, write
//! everything to disk and read it back.
//!
//! Layout of the output directory:
//!
//! ```text
//! <output>/<scenario_id>/<scenario_id>.json
//! <output>/<scenario_id>/text.json
//! <output>/<scenario_id>/image.json
//! ```

use anyhow::{anyhow, ensure, Context, Result};
use clap::Parser;
use config_loader::{CodecConfig, ConfigLoader};
use emissor_demos::ObservabilityArgs;
use marshal::{Codec, Structured};
use ndarray::{ArrayD, IxDyn};
use observability::CodecStatsAggregator;
use representation::{
    new_annotation, new_mention, new_segment, Annotation, Container, Gender, Identifier,
    ImageSignal, Modality, Person, Scenario, ScenarioContext, Segment, Signal, TextSignal,
};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Annotate and persist a scenario
#[derive(Parser, Debug)]
#[command(name = "annotate-and-persist", version, about)]
struct Cli {
    #[command(flatten)]
    observability: ObservabilityArgs,

    /// Codec configuration file (TOML or JSON)
    #[arg(short, long, env = "EMISSOR_CONFIG")]
    config: Option<PathBuf>,

    /// Directory the scenario is written to
    #[arg(short, long, default_value = "scenarios")]
    output: PathBuf,

    /// Scenario identifier, generated if absent
    #[arg(long)]
    scenario_id: Option<String>,

    /// Annotation source recorded on every annotation
    #[arg(long, default_value = "annotate-and-persist")]
    source: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.observability.init()?;

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => CodecConfig::default(),
    };
    let stats = Arc::new(Mutex::new(CodecStatsAggregator::new()));
    let codec = Codec::from_config(&config)
        .context("failed to build codec")?
        .with_stats(Arc::clone(&stats));

    let scenario_id: Identifier = cli
        .scenario_id
        .as_deref()
        .map(Identifier::from)
        .unwrap_or_else(Identifier::generate);
    let dir = cli.output.join(scenario_id.as_str());
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let mut scenario = new_scenario(&scenario_id);

    // Text: one mention over the whole text, one over the speaker's name
    let mut text = TextSignal::for_scenario(
        scenario_id.clone(),
        0,
        1_000,
        "text/utterance_1.txt",
        "Lenka is in Amsterdam",
        Vec::new(),
        None,
    );
    annotate_whole_signal(&mut text, "display", &cli.source)?;

    let name_segment = text.ruler().get_offset(0, 5)?;
    let mut mention = new_mention();
    mention.segment.push(name_segment.clone().into());
    let mention_id = mention.id.clone();
    text.add_mention(mention);
    text.add_annotation(
        &mention_id,
        Annotation::typed(speaker(), cli.source.as_str())?,
    )?;
    info!(segment = %text.text_segment(&name_segment)?, "annotated speaker name");

    // Image: a mention over the whole frame
    let pixels = ArrayD::from_shape_fn(IxDyn(&[8, 8, 3]), |ix| (ix[0] + ix[1] + ix[2]) as f64);
    let mut image = ImageSignal::for_scenario(
        scenario_id.clone(),
        500,
        500,
        "image/frame_1.png",
        [0, 0, 8, 8],
        Vec::new(),
        None,
    )
    .with_array(pixels);
    annotate_whole_signal(&mut image, "person", &cli.source)?;

    scenario.set_signal_path(Modality::Text, "./text.json");
    scenario.set_signal_path(Modality::Image, "./image.json");

    let scenario_file = dir.join(format!("{scenario_id}.json"));
    persist_and_reload(&codec, &scenario, &scenario_file)?;
    persist_and_reload(&codec, &text, &dir.join("text.json"))?;
    persist_and_reload(&codec, &image, &dir.join("image.json"))?;

    info!(dir = %dir.display(), "scenario written");
    let summary = stats
        .lock()
        .map_err(|_| anyhow!("codec statistics are unavailable"))?
        .summary();
    println!("{summary}");
    Ok(())
}

fn speaker() -> Person {
    Person::new(Identifier::generate(), "Lenka", 31, Gender::Female)
}

fn new_scenario(scenario_id: &Identifier) -> Scenario {
    let context = ScenarioContext::new("leolani", Some(speaker()));
    Scenario::new_instance(scenario_id.clone(), 0, 1_000, context, BTreeMap::new())
}

/// Add a mention spanning all of `signal` with a default annotation of
/// `category`
fn annotate_whole_signal<S>(signal: &mut S, category: &str, source: &str) -> Result<()>
where
    S: Signal,
    S::Ruler: Clone + Into<Segment>,
{
    let kind = match signal.modality() {
        Modality::Text => "index",
        _ => "multiindex",
    };

    let mut mention = new_mention();
    mention.segment.push(new_segment(kind, &*signal, None)?);
    let mention_id = mention.id.clone();
    signal.add_mention(mention);
    signal.add_annotation(&mention_id, new_annotation(category, source)?)?;
    Ok(())
}

fn persist_and_reload<T>(codec: &Codec, value: &T, path: &Path) -> Result<()>
where
    T: Structured + PartialEq + Debug,
{
    let json = codec.marshal(value)?;
    fs::write(path, &json).with_context(|| format!("failed to write {}", path.display()))?;

    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let loaded = codec
        .unmarshal::<T>(&content)
        .and_then(|doc| doc.into_one())
        .with_context(|| format!("failed to reload {}", path.display()))?;

    ensure!(&loaded == value, "{} changed on reload", path.display());
    info!(path = %path.display(), bytes = json.len(), "persisted");
    Ok(())
}
