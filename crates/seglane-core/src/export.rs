use std::{
    fs,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::{
    combine::combine_tracks,
    model::{BinaryTrack, ContinuousTrack, Track, UnsignedTrack, UnsignedVcdRepr},
    segment::{SegmentError, Value},
    time::vcd_timescale,
};

pub const DEFAULT_VCD_MODULE: &str = "top";

const IDENTIFIER_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub trait VcdSignal {
    /// Variable type and width, such as `wire 1`.
    fn vcd_type(&self) -> String;

    fn vcd_name(&self) -> String;

    /// Value text written in front of the identifier, including any
    /// separator the value kind requires.
    fn vcd_value(&self, value: Value) -> String;
}

pub trait VcdTrack: Track + VcdSignal {}

impl<T: Track + VcdSignal + ?Sized> VcdTrack for T {}

impl VcdSignal for BinaryTrack {
    fn vcd_type(&self) -> String {
        "wire 1".to_owned()
    }

    fn vcd_name(&self) -> String {
        self.name().to_owned()
    }

    fn vcd_value(&self, value: Value) -> String {
        value.to_unsigned_lossy().to_string()
    }
}

impl VcdSignal for UnsignedTrack {
    fn vcd_type(&self) -> String {
        match self.vcd_repr() {
            UnsignedVcdRepr::BitVector => format!("reg {}", self.width()),
            UnsignedVcdRepr::Real => "real 1".to_owned(),
        }
    }

    fn vcd_name(&self) -> String {
        match self.vcd_repr() {
            UnsignedVcdRepr::BitVector => {
                format!("{}[{}:0]", self.name(), self.width().saturating_sub(1))
            }
            UnsignedVcdRepr::Real => self.name().to_owned(),
        }
    }

    fn vcd_value(&self, value: Value) -> String {
        let value = value.to_unsigned_lossy();
        match self.vcd_repr() {
            UnsignedVcdRepr::Real => format!("r{value} "),
            UnsignedVcdRepr::BitVector if self.hi_z() == Some(value) => {
                let width = usize::try_from(self.width()).unwrap_or(0);
                format!("b{} ", "z".repeat(width))
            }
            UnsignedVcdRepr::BitVector => {
                let width = usize::try_from(self.width()).unwrap_or(0);
                format!("b{value:0width$b} ")
            }
        }
    }
}

impl VcdSignal for ContinuousTrack {
    fn vcd_type(&self) -> String {
        "real 32".to_owned()
    }

    fn vcd_name(&self) -> String {
        self.name().to_owned()
    }

    fn vcd_value(&self, value: Value) -> String {
        format!("r{} ", value.as_f64())
    }
}

/// Identifier of the `index`-th variable: `a`..`Z`, then `aa`, `ab`, ...
#[must_use]
pub fn vcd_identifier(index: usize) -> String {
    let base = IDENTIFIER_ALPHABET.len();
    let mut remaining = index;
    let mut identifier = Vec::new();
    loop {
        identifier.push(IDENTIFIER_ALPHABET[remaining % base]);
        if remaining < base {
            break;
        }
        remaining = remaining / base - 1;
    }
    identifier.reverse();
    String::from_utf8_lossy(&identifier).into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcdOptions {
    pub module: String,
    pub comment: String,
    /// Written as `$date`; the current time when unset.
    pub date: Option<DateTime<Utc>>,
}

impl Default for VcdOptions {
    fn default() -> Self {
        Self {
            module: DEFAULT_VCD_MODULE.to_owned(),
            comment: format!("generated by seglane/{}", env!("CARGO_PKG_VERSION")),
            date: None,
        }
    }
}

impl VcdOptions {
    #[must_use]
    pub fn with_module(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            ..Self::default()
        }
    }
}

/// Writes `tracks` as one VCD document.
///
/// All tracks must share a timebase that divides one of the power-of-ten
/// timescales. Timestamps are written only where some track changes value,
/// followed by a final timestamp marking the end of the data.
#[instrument(skip(out, tracks, options), fields(tracks = tracks.len(), module = %options.module))]
pub fn write_vcd<W: Write>(out: &mut W, tracks: &[&dyn VcdTrack], options: &VcdOptions) -> Result<()> {
    let Some(first) = tracks.first() else {
        bail!("vcd export requires at least one track");
    };
    let timescale = vcd_timescale(first.timebase())?;
    let mut combined = combine_tracks(tracks)?;
    let date = options.date.unwrap_or_else(Utc::now);

    writeln!(out, "$date\n\t{}\n$end", date.format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(out, "$comment\n\t{}\n$end", options.comment)?;
    writeln!(out, "$timescale {timescale} $end")?;
    writeln!(out, "$scope module {} $end", options.module)?;
    let identifiers: Vec<String> = (0..tracks.len()).map(vcd_identifier).collect();
    for (track, identifier) in tracks.iter().zip(&identifiers) {
        writeln!(
            out,
            "$var {} {} {} $end",
            track.vcd_type(),
            identifier,
            track.vcd_name()
        )?;
    }
    writeln!(out, "$upscope $end")?;
    writeln!(out, "$enddefinitions $end")?;

    let mut previous: Vec<Option<Value>> = vec![None; tracks.len()];
    let mut position = 0_u64;
    let mut timestamps = 0_usize;
    while let Some(segment) = combined.try_next() {
        let segment = segment?;
        if segment.arity() != tracks.len() {
            return Err(SegmentError::ArityMismatch {
                expected: tracks.len(),
                found: segment.arity(),
            }
            .into());
        }

        let mut stamped = false;
        for (index, &value) in segment.values.iter().enumerate() {
            if previous[index] == Some(value) {
                continue;
            }
            if !stamped {
                writeln!(out, "#{}", position * timescale.factor)?;
                stamped = true;
                timestamps += 1;
            }
            writeln!(out, "{}{}", tracks[index].vcd_value(value), identifiers[index])?;
            previous[index] = Some(value);
        }
        position += segment.duration;
    }
    writeln!(out, "#{}", position * timescale.factor)?;

    debug!(timestamps, end = position, %timescale, "vcd body written");
    Ok(())
}

pub fn vcd_bytes(tracks: &[&dyn VcdTrack], options: &VcdOptions) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    write_vcd(&mut bytes, tracks, options).context("failed to encode vcd document")?;
    Ok(bytes)
}

#[instrument(skip(tracks, options), fields(tracks = tracks.len(), path = %path.display()))]
pub fn export_vcd(tracks: &[&dyn VcdTrack], path: &Path, options: &VcdOptions) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!(
                "failed to create vcd output directory: {}",
                parent.display()
            )
        })?;
    }

    let file = fs::File::create(path)
        .with_context(|| format!("failed to create vcd file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_vcd(&mut writer, tracks, options)?;
    writer
        .flush()
        .with_context(|| format!("failed to flush vcd file: {}", path.display()))?;
    info!("vcd export completed");
    Ok(())
}
