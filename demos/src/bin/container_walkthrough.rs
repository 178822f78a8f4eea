//! Walk through the container kinds: build each one, cut a segment out of
//! it and round-trip it through the codec.

use anyhow::{ensure, Context, Result};
use clap::Parser;
use emissor_demos::ObservabilityArgs;
use marshal::{Codec, Structured};
use ndarray::{Array3, ArrayD, IxDyn};
use representation::{ArrayContainer, AtomicContainer, Container, Sequence, TemporalContainer};
use std::fmt::Debug;
use tracing::info;

/// Container walkthrough
#[derive(Parser, Debug)]
#[command(name = "container-walkthrough", version, about)]
struct Cli {
    #[command(flatten)]
    observability: ObservabilityArgs,

    /// Print the marshalled documents
    #[arg(long)]
    show_json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.observability.init()?;

    let codec = Codec::emissor().context("failed to build type registry")?;

    // Token sequence
    let tokens = Sequence::from_seq(["I", "am", "in", "Amsterdam"].map(String::from));
    let offset = tokens.ruler().get_offset(0, 1)?;
    let first = tokens.get_segment(&offset)?;
    info!(?offset, segment = ?first, "sequence segment");
    round_trip(&codec, &tokens, cli.show_json)?;

    let numbers = Sequence::from_seq([1.1, 2.2, 3.3]);
    round_trip(&codec, &numbers, cli.show_json)?;

    // Image-like array
    let image = ArrayContainer::from_array(Array3::<f64>::zeros((5, 5, 3)).into_dyn())?;
    let bbox = image.ruler().get_area_bounding_box(0, 0, 2, 2)?;
    let area = image.get_segment(&bbox)?;
    info!(bounds = ?bbox.bounds, shape = ?area.shape(), "array segment");
    ensure!(area.shape() == [2, 2, 3], "unexpected segment shape {:?}", area.shape());
    round_trip(&codec, &image, cli.show_json)?;

    let matrix = ArrayContainer::from_array(ArrayD::from_shape_vec(
        IxDyn(&[2, 2]),
        vec![1.1, 2.2, 3.3, 4.4],
    )?)?;
    round_trip(&codec, &matrix, cli.show_json)?;

    // Time span
    let period = TemporalContainer::from_range(0, 1000);
    let window = period.ruler().get_time_segment(100, 200)?;
    info!(start = window.start, end = window.end, "time segment");
    round_trip(&codec, &period, cli.show_json)?;

    // Single value
    let atomic = AtomicContainer::for_value("1".to_string());
    let value = atomic.get_segment(atomic.ruler())?;
    info!(value = %value, "atomic value");
    round_trip(&codec, &atomic, cli.show_json)?;

    info!("walkthrough complete");
    Ok(())
}

fn round_trip<T>(codec: &Codec, value: &T, show: bool) -> Result<()>
where
    T: Structured + PartialEq + Debug,
{
    let json = codec.marshal(value)?;
    if show {
        println!("{json}");
    }

    let loaded: T = codec.unmarshal(&json)?.into_one()?;
    ensure!(&loaded == value, "round trip changed the value: {loaded:?}");
    info!(type_tag = T::TYPE_TAG, bytes = json.len(), "round trip ok");
    Ok(())
}
